use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

// "75 - PARIS 11", "2A - AJACCIO"
static DEPARTMENT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2,3}|2[AaBb])\s*-\s*(.+)$").expect("valid department regex"));

pub fn format_salary(min: Option<f64>, max: Option<f64>, unit: Option<&str>) -> String {
    let unit_label = match unit {
        Some("yearly") => "/year",
        Some("monthly") => "/month",
        _ => "/hour",
    };

    // Zero is what the ingest writes when the posting had no figure.
    let min = min.filter(|v| *v > 0.0);
    let max = max.filter(|v| *v > 0.0);

    match (min, max) {
        (Some(min), Some(max)) => format!(
            "{} - {} € {}",
            format_amount(min),
            format_amount(max),
            unit_label
        ),
        (Some(min), None) => format!("From {} € {}", format_amount(min), unit_label),
        (None, Some(max)) => format!("Up to {} € {}", format_amount(max), unit_label),
        (None, None) => "Not specified".to_string(),
    }
}

/// Rounds to whole units and groups thousands with spaces.
pub fn format_amount(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

pub fn format_relative_date(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return "Unknown date".to_string();
    };

    let days = (now - ts).num_days();
    match days {
        d if d <= 0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        d if d < 7 => format!("{} days ago", d),
        d if d < 30 => format!("{} weeks ago", d / 7),
        d if d < 365 => format!("{} months ago", d / 30),
        _ => ts.format("%d %B %Y").to_string(),
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Title-cases a city label, leaving any department prefix as is.
pub fn normalize_city(label: &str) -> String {
    let collapsed = label.split_whitespace().collect::<Vec<_>>().join(" ");
    match DEPARTMENT_PREFIX.captures(&collapsed) {
        Some(caps) => format!("{} - {}", caps[1].to_uppercase(), title_case(&caps[2])),
        None => title_case(&collapsed),
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_salary_variants() {
        assert_eq!(
            format_salary(Some(45000.0), Some(55000.4), Some("yearly")),
            "45 000 - 55 000 € /year"
        );
        assert_eq!(format_salary(Some(2500.0), None, Some("monthly")), "From 2 500 € /month");
        assert_eq!(format_salary(None, Some(14.5), None), "Up to 15 € /hour");
        assert_eq!(format_salary(None, None, Some("yearly")), "Not specified");
        assert_eq!(format_salary(Some(0.0), Some(0.0), None), "Not specified");
    }

    #[test]
    fn test_relative_dates() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
        assert_eq!(format_relative_date(Some(now), now), "Today");
        assert_eq!(format_relative_date(Some(now - Duration::days(1)), now), "Yesterday");
        assert_eq!(format_relative_date(Some(now - Duration::days(4)), now), "4 days ago");
        assert_eq!(format_relative_date(Some(now - Duration::days(15)), now), "2 weeks ago");
        assert_eq!(format_relative_date(Some(now - Duration::days(95)), now), "3 months ago");
        assert_eq!(format_relative_date(Some(now - Duration::days(400)), now), "26 May 2024");
        assert_eq!(format_relative_date(None, now), "Unknown date");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Data Engineer", 20), "Data Engineer");
        assert_eq!(truncate("Ingénieur données senior", 10), "Ingénie...");
    }

    #[test]
    fn test_normalize_city() {
        assert_eq!(normalize_city("75 - PARIS"), "75 - Paris");
        assert_eq!(normalize_city("75 - paris 11"), "75 - Paris 11");
        assert_eq!(normalize_city("2a - AJACCIO"), "2A - Ajaccio");
        assert_eq!(normalize_city("  saint-étienne  "), "Saint-Étienne");
        assert_eq!(normalize_city("Lyon"), "Lyon");
    }
}
