use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite, in range, and not the (0, 0) pair the ingest uses for "unset".
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
            && !(self.lat == 0.0 && self.lon == 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RemoteType {
    FullRemote,
    Hybrid,
    Occasional,
    Other(String),
}

impl RemoteType {
    pub const KNOWN: [RemoteType; 3] = [RemoteType::FullRemote, RemoteType::Hybrid, RemoteType::Occasional];

    pub fn as_str(&self) -> &str {
        match self {
            RemoteType::FullRemote => "full_remote",
            RemoteType::Hybrid => "hybrid",
            RemoteType::Occasional => "occasional",
            RemoteType::Other(s) => s,
        }
    }
}

impl From<String> for RemoteType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "full_remote" | "full-remote" => RemoteType::FullRemote,
            "hybrid" => RemoteType::Hybrid,
            "occasional" => RemoteType::Occasional,
            _ => RemoteType::Other(value),
        }
    }
}

impl From<RemoteType> for String {
    fn from(value: RemoteType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RemoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub location_city: Option<String>,
    #[serde(default)]
    pub location_department: Option<String>,
    #[serde(default)]
    pub location_region: Option<String>,
    // The listing endpoint nests coordinates, the detail endpoint flattens them.
    #[serde(default)]
    pub location_coordinates: Option<GeoPoint>,
    #[serde(default)]
    pub location_latitude: Option<f64>,
    #[serde(default)]
    pub location_longitude: Option<f64>,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub remote_type: Option<RemoteType>,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub salary_unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rome_code: Option<String>,
    #[serde(default)]
    pub rome_label: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Offer {
    /// Nested or flat coordinates, whichever is valid first; falls back to
    /// whatever raw pair is present.
    pub fn position(&self) -> Option<GeoPoint> {
        let nested = self.location_coordinates;
        let flat = match (self.location_latitude, self.location_longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        };
        nested
            .filter(GeoPoint::is_valid)
            .or(flat.filter(GeoPoint::is_valid))
            .or(nested)
            .or(flat)
    }

    /// Mappable offers carry a valid coordinate pair.
    pub fn mappable_position(&self) -> Option<GeoPoint> {
        self.position().filter(GeoPoint::is_valid)
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled offer")
    }
}

/// One page of the paginated offer listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferPage {
    pub items: Vec<Offer>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub pages: u32,
}

/// A (label, count) pair as returned by every analytics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsBucket {
    #[serde(alias = "skill", alias = "contract_type", alias = "location", alias = "date")]
    pub label: String,
    pub count: u64,
}

impl AnalyticsBucket {
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self { label: label.into(), count }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverviewStats {
    #[serde(default)]
    pub total_offers: u64,
    #[serde(default)]
    pub salary_median: Option<f64>,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub top_regions: Vec<AnalyticsBucket>,
    #[serde(default)]
    pub top_skills: Vec<AnalyticsBucket>,
    #[serde(default)]
    pub cdi_percentage: Option<f64>,
    #[serde(default)]
    pub contract_distribution: Vec<AnalyticsBucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub code: String,
    pub label: String,
}

impl Department {
    /// Parses the backend's "75 - Paris" form; a bare value doubles as code and label.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.split_once(" - ") {
            Some((code, label)) if !code.trim().is_empty() && !label.trim().is_empty() => Self {
                code: code.trim().to_string(),
                label: label.trim().to_string(),
            },
            _ => Self {
                code: raw.to_string(),
                label: raw.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacetOptions {
    pub job_labels: Vec<String>,
    pub departments: Vec<Department>,
    pub remote_types: Vec<RemoteType>,
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

#[cfg(test)]
pub(crate) fn offer(id: &str) -> Offer {
    Offer {
        id: id.to_string(),
        source: None,
        title: Some(format!("Offer {}", id)),
        company_name: None,
        location_city: None,
        location_department: None,
        location_region: None,
        location_coordinates: None,
        location_latitude: None,
        location_longitude: None,
        contract_type: None,
        remote_type: None,
        salary_min: None,
        salary_max: None,
        salary_unit: None,
        published_at: None,
        rome_code: None,
        rome_label: None,
        url: None,
    }
}

#[cfg(test)]
pub(crate) fn offer_at(id: &str, lat: f64, lon: f64, city: Option<&str>) -> Offer {
    Offer {
        location_coordinates: Some(GeoPoint::new(lat, lon)),
        location_city: city.map(str::to_string),
        ..offer(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_offer_deserializes_nested_coordinates() {
        let json = r#"{
            "id": "abc",
            "source": "france_travail",
            "title": "Data Engineer",
            "location_city": "75 - Paris",
            "location_coordinates": {"lat": 48.8566, "lon": 2.3522},
            "remote_type": "hybrid",
            "published_at": "2025-03-04T10:00:00Z"
        }"#;
        let offer: Offer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.position(), Some(GeoPoint::new(48.8566, 2.3522)));
        assert_eq!(offer.remote_type, Some(RemoteType::Hybrid));
        assert_eq!(offer.published_at.unwrap().day(), 4);
        assert!(offer.company_name.is_none());
    }

    #[test]
    fn test_offer_deserializes_flat_coordinates() {
        let json = r#"{"id": "x", "location_latitude": 45.764, "location_longitude": 4.8357}"#;
        let offer: Offer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.mappable_position(), Some(GeoPoint::new(45.764, 4.8357)));
    }

    #[test]
    fn test_valid_flat_pair_beats_unset_nested() {
        let offer = Offer {
            location_coordinates: Some(GeoPoint::new(0.0, 0.0)),
            location_latitude: Some(43.6047),
            location_longitude: Some(1.4442),
            ..offer("toulouse")
        };
        assert_eq!(offer.mappable_position(), Some(GeoPoint::new(43.6047, 1.4442)));

        let neither = Offer {
            location_latitude: Some(f64::NAN),
            location_longitude: Some(1.0),
            ..offer_at("none", 0.0, 0.0, None)
        };
        assert!(neither.mappable_position().is_none());
    }

    #[test]
    fn test_mappable_rejects_sentinel_and_non_finite() {
        assert!(!GeoPoint::new(0.0, 0.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 2.0).is_valid());
        assert!(!GeoPoint::new(48.0, f64::INFINITY).is_valid());
        assert!(!GeoPoint::new(120.0, 2.0).is_valid());
        assert!(GeoPoint::new(0.0, 2.0).is_valid());

        let mut half = offer("half");
        half.location_latitude = Some(48.0);
        assert!(half.mappable_position().is_none());
    }

    #[test]
    fn test_remote_type_unknown_is_preserved() {
        let parsed: RemoteType = serde_json::from_str("\"teletravail\"").unwrap();
        assert_eq!(parsed, RemoteType::Other("teletravail".to_string()));
        assert_eq!(serde_json::to_string(&RemoteType::FullRemote).unwrap(), "\"full_remote\"");
    }

    #[test]
    fn test_bucket_accepts_backend_keys() {
        let skills: Vec<AnalyticsBucket> =
            serde_json::from_str(r#"[{"skill": "Python", "count": 12}]"#).unwrap();
        let contracts: Vec<AnalyticsBucket> =
            serde_json::from_str(r#"[{"contract_type": "CDI", "count": 7}]"#).unwrap();
        let timeline: Vec<AnalyticsBucket> =
            serde_json::from_str(r#"[{"date": "2025-01-06T00:00:00.000Z", "count": 3}]"#).unwrap();
        assert_eq!(skills[0].label, "Python");
        assert_eq!(contracts[0].label, "CDI");
        assert_eq!(timeline[0].count, 3);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-01-06T00:00:00.000Z").is_some());
        assert_eq!(parse_timestamp("2025-01-06T08:30:00").unwrap().hour(), 8);
        assert_eq!(parse_timestamp("2025-01-06").unwrap().month(), 1);
        assert!(parse_timestamp("last week").is_none());
    }

    #[test]
    fn test_department_parse() {
        assert_eq!(
            Department::parse("75 - Paris"),
            Department { code: "75".to_string(), label: "Paris".to_string() }
        );
        assert_eq!(Department::parse("Gironde").code, "Gironde");
    }
}
