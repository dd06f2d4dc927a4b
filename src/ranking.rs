use serde::Serialize;
use std::collections::HashMap;

use crate::format::normalize_city;
use crate::models::Offer;

pub const TOP_CITIES: usize = 20;
pub const TOP_DEPARTMENTS: usize = 15;
pub const TOP_KPI: usize = 3;

pub const UNKNOWN_CITY: &str = "Unknown city";
pub const UNKNOWN_DEPARTMENT: &str = "Unknown department";
pub const UNKNOWN_REGION: &str = "Unknown region";

#[derive(Debug, Clone, Serialize)]
pub struct Group<'a> {
    pub label: String,
    #[serde(skip)]
    pub members: Vec<&'a Offer>,
    pub count: usize,
}

/// Groups in first-seen order. Offers without a usable label land in `unknown`.
pub fn group_by<'a, I, F>(offers: I, key: F, unknown: &str) -> Vec<Group<'a>>
where
    I: IntoIterator<Item = &'a Offer>,
    F: Fn(&Offer) -> Option<String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();

    for offer in offers {
        let label = key(offer)
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| unknown.to_string());

        match index.get(&label) {
            Some(&slot) => {
                groups[slot].members.push(offer);
                groups[slot].count += 1;
            }
            None => {
                index.insert(label.clone(), groups.len());
                groups.push(Group { label, members: vec![offer], count: 1 });
            }
        }
    }

    groups
}

/// Descending by count; `sort_by` is stable so ties keep first-seen order.
pub fn rank<'a>(mut groups: Vec<Group<'a>>, top_n: usize) -> Vec<Group<'a>> {
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups.truncate(top_n);
    groups
}

pub fn city_label(offer: &Offer) -> Option<String> {
    offer.location_city.as_deref().map(normalize_city)
}

pub fn rank_cities<'a, I>(offers: I, top_n: usize) -> Vec<Group<'a>>
where
    I: IntoIterator<Item = &'a Offer>,
{
    rank(group_by(offers, city_label, UNKNOWN_CITY), top_n)
}

pub fn rank_departments<'a, I>(offers: I, top_n: usize) -> Vec<Group<'a>>
where
    I: IntoIterator<Item = &'a Offer>,
{
    rank(
        group_by(offers, |o| o.location_department.clone(), UNKNOWN_DEPARTMENT),
        top_n,
    )
}

pub fn rank_regions<'a, I>(offers: I, top_n: usize) -> Vec<Group<'a>>
where
    I: IntoIterator<Item = &'a Offer>,
{
    rank(group_by(offers, |o| o.location_region.clone(), UNKNOWN_REGION), top_n)
}

// --- Selection ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    City,
    Department,
    Region,
}

impl Dimension {
    pub fn label_of(&self, offer: &Offer) -> Option<String> {
        match self {
            Dimension::City => city_label(offer),
            Dimension::Department => offer.location_department.clone(),
            Dimension::Region => offer.location_region.clone(),
        }
    }

    pub fn unknown(&self) -> &'static str {
        match self {
            Dimension::City => UNKNOWN_CITY,
            Dimension::Department => UNKNOWN_DEPARTMENT,
            Dimension::Region => UNKNOWN_REGION,
        }
    }

    /// User input in the same shape as grouped labels.
    fn canonical(&self, input: &str) -> String {
        match self {
            Dimension::City => normalize_city(input),
            Dimension::Department | Dimension::Region => input.to_string(),
        }
    }

    fn resolved_label(&self, offer: &Offer) -> String {
        self.label_of(offer)
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.unknown().to_string())
    }
}

/// Single-value selection over one grouping dimension. Selecting the same value
/// again, an empty value, or a value no offer carries clears it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    dimension: Dimension,
    active: Option<String>,
}

impl Selection {
    pub fn new(dimension: Dimension) -> Self {
        Self { dimension, active: None }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn select(&mut self, label: Option<&str>, offers: &[Offer]) {
        let found = label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .and_then(|l| {
                let wanted = self.dimension.canonical(l);
                offers
                    .iter()
                    .map(|o| self.dimension.resolved_label(o))
                    .find(|r| r == l || *r == wanted)
            });
        self.active = match found {
            Some(f) if self.active.as_deref() == Some(f.as_str()) => None,
            other => other,
        };
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn apply<'a>(&self, offers: &'a [Offer]) -> Vec<&'a Offer> {
        match &self.active {
            None => offers.iter().collect(),
            Some(label) => offers
                .iter()
                .filter(|o| &self.dimension.resolved_label(o) == label)
                .collect(),
        }
    }
}
