use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::api::{OfferSource, PageRequest};
use crate::config::MAX_PAGE_SIZE;
use crate::error::Result;
use crate::facets::FacetSelection;
use crate::models::Offer;

/// Deduplicated, ordered collection of offers loaded for the current view.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkingSet {
    offers: Vec<Offer>,
    #[serde(skip)]
    ids: HashSet<String>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first occurrence of each id; returns false for a duplicate.
    pub fn push(&mut self, offer: Offer) -> bool {
        if self.ids.contains(&offer.id) {
            return false;
        }
        self.ids.insert(offer.id.clone());
        self.offers.push(offer);
        true
    }

    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.offers.iter().map(|o| o.id.as_str()).collect()
    }
}

impl FromIterator<Offer> for WorkingSet {
    fn from_iter<I: IntoIterator<Item = Offer>>(iter: I) -> Self {
        let mut set = WorkingSet::new();
        for offer in iter {
            set.push(offer);
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatePlan {
    pub page_size: u32,
    pub max_pages: u32,
    pub filters: FacetSelection,
}

impl AccumulatePlan {
    pub fn new(page_size: u32, max_pages: u32) -> Self {
        Self {
            page_size,
            max_pages,
            filters: FacetSelection::default(),
        }
    }

    pub fn with_filters(mut self, filters: FacetSelection) -> Self {
        self.filters = filters;
        self
    }

    pub fn capacity(&self) -> usize {
        self.effective_page_size() as usize * self.effective_max_pages() as usize
    }

    fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    fn effective_max_pages(&self) -> u32 {
        self.max_pages.max(1)
    }
}

/// Pulls pages 1..=max_pages until a short page signals the end of the listing.
/// Any page failure fails the whole run; nothing partial is returned.
pub async fn accumulate(source: &dyn OfferSource, plan: &AccumulatePlan) -> Result<WorkingSet> {
    let size = plan.effective_page_size();
    let max_pages = plan.effective_max_pages();

    let mut set = WorkingSet::new();
    let mut duplicates = 0usize;
    let mut fetched_pages = 0u32;

    for page in 1..=max_pages {
        let request = PageRequest {
            page,
            size,
            filters: plan.filters.clone(),
        };
        let result = source.fetch_page(&request).await?;
        fetched_pages += 1;

        let returned = result.items.len();
        if returned > size as usize {
            debug!(page, returned, size, "oversized page, keeping the requested size");
        }
        for offer in result.items.into_iter().take(size as usize) {
            if !set.push(offer) {
                duplicates += 1;
            }
        }

        if returned < size as usize {
            debug!(page, returned, "short page, source exhausted");
            break;
        }
    }

    if duplicates > 0 {
        debug!(duplicates, "dropped offers repeated across pages");
    }
    info!(pages = fetched_pages, offers = set.len(), "accumulated working set");

    Ok(set)
}
