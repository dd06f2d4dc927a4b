//! Map clustering: offers that land on the same ~11 m cell share one marker.
//!
//! Coordinates are quantized to 4 decimal places. Each cluster is drawn at the
//! unrounded position of its first member so markers do not snap to the grid.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{GeoPoint, Offer};

pub const QUANT_DECIMALS: usize = 4;
pub const POPUP_LIMIT: usize = 5;

const QUANT_SCALE: f64 = 10_000.0;

/// A coordinate rounded to 4 decimals, kept as scaled integers so it hashes exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QuantKey {
    lat: i64,
    lon: i64,
}

impl QuantKey {
    pub fn lat(&self) -> f64 {
        self.lat as f64 / QUANT_SCALE
    }

    pub fn lon(&self) -> f64 {
        self.lon as f64 / QUANT_SCALE
    }
}

impl std::fmt::Display for QuantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.*},{:.*}", QUANT_DECIMALS, self.lat(), QUANT_DECIMALS, self.lon())
    }
}

pub fn quantize(point: GeoPoint) -> QuantKey {
    QuantKey {
        lat: (point.lat * QUANT_SCALE).round() as i64,
        lon: (point.lon * QUANT_SCALE).round() as i64,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeoCluster<'a> {
    pub key: QuantKey,
    pub position: GeoPoint,
    pub label: Option<String>,
    #[serde(serialize_with = "member_ids")]
    pub members: Vec<&'a Offer>,
}

impl GeoCluster<'_> {
    pub fn len(&self) -> usize {
        self.members.len()
    }
}

fn member_ids<S: serde::Serializer>(members: &[&Offer], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(members.iter().map(|o| o.id.as_str()))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterSet<'a> {
    pub clusters: Vec<GeoCluster<'a>>,
    pub bounds: Vec<GeoPoint>,
}

impl ClusterSet<'_> {
    pub fn member_count(&self) -> usize {
        self.clusters.iter().map(GeoCluster::len).sum()
    }
}

pub fn cluster_offers<'a, I>(offers: I) -> ClusterSet<'a>
where
    I: IntoIterator<Item = &'a Offer>,
{
    let mut index: HashMap<QuantKey, usize> = HashMap::new();
    let mut clusters: Vec<GeoCluster<'a>> = Vec::new();

    for offer in offers {
        let Some(position) = offer.mappable_position() else { continue };
        let key = quantize(position);

        match index.get(&key) {
            Some(&slot) => clusters[slot].members.push(offer),
            None => {
                index.insert(key, clusters.len());
                clusters.push(GeoCluster {
                    key,
                    position,
                    label: offer.location_city.clone(),
                    members: vec![offer],
                });
            }
        }
    }

    let bounds = clusters.iter().map(|c| c.position).collect();
    ClusterSet { clusters, bounds }
}

// --- Viewport fitting ---

#[derive(Debug, Clone, Serialize)]
pub struct ViewOptions {
    pub padding_px: u32,
    pub max_zoom: u8,
    pub default_center: GeoPoint,
    pub default_zoom: u8,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            padding_px: 50,
            max_zoom: 13,
            default_center: GeoPoint::new(46.603354, 1.888334),
            default_zoom: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ViewFit {
    /// Nothing to show; the renderer keeps whatever view it had.
    Keep,
    Fit {
        south_west: GeoPoint,
        north_east: GeoPoint,
        padding_px: u32,
        max_zoom: u8,
    },
}

/// A single point yields a degenerate box; the zoom cap keeps the renderer from
/// zooming all the way in on it.
pub fn fit_view(bounds: &[GeoPoint], options: &ViewOptions) -> ViewFit {
    let Some(first) = bounds.first() else {
        return ViewFit::Keep;
    };

    let (mut south, mut west, mut north, mut east) = (first.lat, first.lon, first.lat, first.lon);
    for point in &bounds[1..] {
        south = south.min(point.lat);
        north = north.max(point.lat);
        west = west.min(point.lon);
        east = east.max(point.lon);
    }

    ViewFit::Fit {
        south_west: GeoPoint::new(south, west),
        north_east: GeoPoint::new(north, east),
        padding_px: options.padding_px,
        max_zoom: options.max_zoom,
    }
}

// --- Popup ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupEntry {
    pub title: String,
    pub company: Option<String>,
    pub contract_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterPopup {
    pub heading: Option<String>,
    pub total: usize,
    pub entries: Vec<PopupEntry>,
    pub remaining: usize,
}

impl ClusterPopup {
    pub fn from_cluster(cluster: &GeoCluster<'_>) -> Self {
        let entries = cluster
            .members
            .iter()
            .take(POPUP_LIMIT)
            .map(|offer| PopupEntry {
                title: offer.display_title().to_string(),
                company: offer.company_name.clone(),
                contract_type: offer.contract_type.clone(),
            })
            .collect();

        Self {
            heading: cluster.label.clone(),
            total: cluster.len(),
            entries,
            remaining: cluster.len().saturating_sub(POPUP_LIMIT),
        }
    }

    pub fn summary(&self) -> String {
        let noun = if self.total > 1 { "offers" } else { "offer" };
        format!("{} {}", self.total, noun)
    }

    pub fn remainder_line(&self) -> Option<String> {
        (self.remaining > 0).then(|| format!("and {} more", self.remaining))
    }
}
