//! Turns raw (label, count) collections from the analytics endpoints into
//! ranked, percentage-bearing view models. Everything here is total: empty or
//! all-zero input gives empty or zero output, never NaN.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{parse_timestamp, AnalyticsBucket, OverviewStats};

pub const TOP_SKILLS: usize = 20;
pub const TOP_GEOGRAPHY: usize = 15;
pub const TOP_KPI: usize = 3;
pub const KPI_CONTRACTS: usize = 4;
pub const TIMELINE_WINDOW_DAYS: i64 = 90;
pub const TIMELINE_MIN_WIDTH: f64 = 5.0;

/// Stable descending sort by count, truncated to `top_n`.
pub fn rank(buckets: &[AnalyticsBucket], top_n: usize) -> Vec<AnalyticsBucket> {
    let mut ranked = buckets.to_vec();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(top_n);
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub label: String,
    pub count: u64,
    /// Percentage of the collection total, one decimal.
    pub percent: f64,
}

/// Percent of total per bucket, each rounded to one decimal on its own, so the
/// sum may land anywhere in [99.9, 100.1]. A zero total gives 0 everywhere.
pub fn contract_shares(buckets: &[AnalyticsBucket]) -> Vec<Share> {
    let total: u64 = buckets.iter().map(|b| b.count).sum();
    buckets
        .iter()
        .map(|b| Share {
            label: b.label.clone(),
            count: b.count,
            percent: percent_of(b.count, total),
        })
        .collect()
}

fn percent_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 * 1000.0 / total as f64).round() / 10.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub count: u64,
    /// Relative width in percent of the largest count.
    pub width: f64,
}

pub fn skill_bars(buckets: &[AnalyticsBucket]) -> Vec<Bar> {
    let max = buckets.iter().map(|b| b.count).max().unwrap_or(0);
    buckets
        .iter()
        .map(|b| Bar {
            label: b.label.clone(),
            count: b.count,
            width: relative_width(b.count, max),
        })
        .collect()
}

fn relative_width(count: u64, max: u64) -> f64 {
    if max == 0 {
        0.0
    } else {
        count as f64 / max as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimelineView {
    Points { bars: Vec<TimelineBar> },
    /// There is activity, just none inside the window.
    NoRecentData { window_days: i64 },
    NoData,
}

impl TimelineView {
    pub fn message(&self) -> Option<String> {
        match self {
            TimelineView::Points { .. } => None,
            TimelineView::NoRecentData { window_days } => {
                Some(format!("No activity in the last {} days", window_days))
            }
            TimelineView::NoData => Some("No timeline data".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineBar {
    pub date: DateTime<Utc>,
    pub count: u64,
    pub width: f64,
}

/// Keeps non-zero points dated within `window_days` before `now`, oldest first.
/// Labels that are not dates are ignored.
pub fn timeline_window(points: &[AnalyticsBucket], now: DateTime<Utc>, window_days: i64) -> TimelineView {
    let dated: Vec<(DateTime<Utc>, u64)> = points
        .iter()
        .filter(|p| p.count > 0)
        .filter_map(|p| parse_timestamp(&p.label).map(|d| (d, p.count)))
        .collect();

    if dated.is_empty() {
        return TimelineView::NoData;
    }

    // A window too large to subtract from `now` has no lower bound.
    let cutoff = Duration::try_days(window_days).and_then(|span| now.checked_sub_signed(span));
    let mut recent: Vec<(DateTime<Utc>, u64)> = dated
        .into_iter()
        .filter(|(d, _)| cutoff.is_none_or(|c| *d >= c) && *d <= now)
        .collect();

    if recent.is_empty() {
        return TimelineView::NoRecentData { window_days };
    }

    recent.sort_by_key(|(d, _)| *d);
    let max = recent.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let bars = recent
        .into_iter()
        .map(|(date, count)| TimelineBar {
            date,
            count,
            width: relative_width(count, max).max(TIMELINE_MIN_WIDTH),
        })
        .collect();

    TimelineView::Points { bars }
}

// --- View models ---

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub skills: Vec<Bar>,
    pub contracts: Vec<Share>,
    pub geography: Vec<AnalyticsBucket>,
}

impl AnalyticsReport {
    pub fn build(
        skills: &[AnalyticsBucket],
        contracts: &[AnalyticsBucket],
        geography: &[AnalyticsBucket],
    ) -> Self {
        Self {
            skills: skill_bars(&rank(skills, TOP_SKILLS)),
            contracts: contract_shares(contracts),
            geography: rank(geography, TOP_GEOGRAPHY),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KpiSummary {
    pub total_offers: u64,
    pub salary_median: Option<f64>,
    pub cdi_percent: f64,
    pub top_regions: Vec<AnalyticsBucket>,
    pub top_skills: Vec<AnalyticsBucket>,
    pub contracts: Vec<Share>,
}

pub fn kpi_summary(stats: &OverviewStats) -> KpiSummary {
    let shares = contract_shares(&stats.contract_distribution);
    let cdi_percent = stats.cdi_percentage.unwrap_or_else(|| {
        shares
            .iter()
            .find(|s| s.label.eq_ignore_ascii_case("CDI"))
            .map(|s| s.percent)
            .unwrap_or(0.0)
    });

    // Backend order, first few only.
    let mut contracts = shares;
    contracts.truncate(KPI_CONTRACTS);

    KpiSummary {
        total_offers: stats.total_offers,
        salary_median: stats.salary_median,
        cdi_percent,
        top_regions: rank(&stats.top_regions, TOP_KPI),
        top_skills: rank(&stats.top_skills, TOP_KPI),
        contracts,
    }
}
