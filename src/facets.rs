use serde::Serialize;
use tracing::{debug, warn};

use crate::accumulator::{accumulate, AccumulatePlan, WorkingSet};
use crate::api::{OfferSource, PageRequest};
use crate::error::Result;
use crate::models::RemoteType;

/// Active facet filters. Every field unset means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetSelection {
    pub job_label: Option<String>,
    pub department: Option<String>,
    pub remote_type: Option<RemoteType>,
}

impl FacetSelection {
    pub fn is_empty(&self) -> bool {
        self.job_label.is_none() && self.department.is_none() && self.remote_type.is_none()
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    NoFilter,
    Active,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewMode {
    /// One page of the listing at the current page index.
    Listing { page_size: u32 },
    /// Everything the accumulator can pull; the page index is ignored.
    Map(AccumulatePlan),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Empty,
    Failed(String),
}

impl LoadStatus {
    pub fn message(&self) -> Option<&str> {
        match self {
            LoadStatus::Loading => Some("Loading offers..."),
            LoadStatus::Empty => Some("No offers match the current filters"),
            LoadStatus::Failed(msg) => Some(msg.as_str()),
            LoadStatus::Idle | LoadStatus::Ready => None,
        }
    }
}

/// What a successful fetch brings back.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub offers: WorkingSet,
    pub total: u64,
    pub pages: u32,
}

/// A fetch issued for one filter/page combination. Executing it does not borrow
/// the controller, so several tickets can be in flight at once.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub generation: u64,
    pub selection: FacetSelection,
    pub page: u32,
    pub mode: ViewMode,
}

impl FetchTicket {
    pub async fn execute(&self, source: &dyn OfferSource) -> Result<Snapshot> {
        match &self.mode {
            ViewMode::Listing { page_size } => {
                let request = PageRequest {
                    page: self.page,
                    size: *page_size,
                    filters: self.selection.clone(),
                };
                let page = source.fetch_page(&request).await?;
                Ok(Snapshot {
                    offers: page.items.into_iter().collect(),
                    total: page.total,
                    pages: page.pages,
                })
            }
            ViewMode::Map(plan) => {
                let plan = plan.clone().with_filters(self.selection.clone());
                let offers = accumulate(source, &plan).await?;
                Ok(Snapshot {
                    total: offers.len() as u64,
                    pages: 1,
                    offers,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied,
    Stale,
    Failed(String),
}

pub const FETCH_FAILED_MESSAGE: &str = "Failed to load offers";

/// Owns the facet selection, the page index and the working set. Each transition
/// hands back exactly one ticket; only the newest ticket's result is ever applied.
#[derive(Debug)]
pub struct FilterController {
    selection: FacetSelection,
    page: u32,
    mode: ViewMode,
    generation: u64,
    working_set: WorkingSet,
    total: u64,
    pages: u32,
    status: LoadStatus,
}

impl FilterController {
    pub fn new(mode: ViewMode) -> Self {
        Self {
            selection: FacetSelection::default(),
            page: 1,
            mode,
            generation: 0,
            working_set: WorkingSet::new(),
            total: 0,
            pages: 0,
            status: LoadStatus::Idle,
        }
    }

    /// Starts from an existing selection without issuing a fetch.
    pub fn with_selection(mut self, selection: FacetSelection) -> Self {
        self.selection = FacetSelection {
            job_label: clean(selection.job_label),
            department: clean(selection.department),
            remote_type: selection.remote_type,
        };
        self
    }

    pub fn selection(&self) -> &FacetSelection {
        &self.selection
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn state(&self) -> FilterState {
        if self.selection.is_empty() {
            FilterState::NoFilter
        } else {
            FilterState::Active
        }
    }

    /// Initial load with whatever is currently selected.
    pub fn refresh(&mut self) -> FetchTicket {
        self.issue()
    }

    pub fn set_job_label(&mut self, value: Option<String>) -> FetchTicket {
        self.selection.job_label = clean(value);
        self.page = 1;
        self.issue()
    }

    pub fn set_department(&mut self, value: Option<String>) -> FetchTicket {
        self.selection.department = clean(value);
        self.page = 1;
        self.issue()
    }

    pub fn set_remote_type(&mut self, value: Option<RemoteType>) -> FetchTicket {
        self.selection.remote_type = value;
        self.page = 1;
        self.issue()
    }

    pub fn clear_all(&mut self) -> FetchTicket {
        self.selection = FacetSelection::default();
        self.page = 1;
        self.issue()
    }

    pub fn set_page(&mut self, page: u32) -> FetchTicket {
        self.page = page.max(1);
        self.issue()
    }

    fn issue(&mut self) -> FetchTicket {
        self.generation += 1;
        self.status = LoadStatus::Loading;
        debug!(generation = self.generation, page = self.page, selection = ?self.selection, "issuing fetch");
        FetchTicket {
            generation: self.generation,
            selection: self.selection.clone(),
            page: self.page,
            mode: self.mode.clone(),
        }
    }

    pub fn apply(&mut self, ticket: &FetchTicket, result: Result<Snapshot>) -> ApplyOutcome {
        if ticket.generation != self.generation {
            debug!(
                generation = ticket.generation,
                latest = self.generation,
                "dropping stale response"
            );
            return ApplyOutcome::Stale;
        }

        match result {
            Ok(snapshot) => {
                self.status = if snapshot.offers.is_empty() {
                    LoadStatus::Empty
                } else {
                    LoadStatus::Ready
                };
                self.total = snapshot.total;
                self.pages = snapshot.pages;
                self.working_set = snapshot.offers;
                ApplyOutcome::Applied
            }
            Err(e) => {
                warn!(generation = ticket.generation, error = %e, "fetch failed");
                self.status = LoadStatus::Failed(FETCH_FAILED_MESSAGE.to_string());
                ApplyOutcome::Failed(e.to_string())
            }
        }
    }

    /// Convenience for callers that never overlap requests.
    pub async fn run(&mut self, ticket: FetchTicket, source: &dyn OfferSource) -> ApplyOutcome {
        let result = ticket.execute(source).await;
        self.apply(&ticket, result)
    }
}
