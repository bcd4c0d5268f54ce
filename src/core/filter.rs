use crate::domain::model::{parse_show_date, Performance};
use chrono::NaiveDate;

/// Status value meaning "no status filter".
pub const ALL_STATUSES: &str = "전체";

/// Client-side refinement of search results. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub regions: Vec<String>,
    pub date: Option<NaiveDate>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.status_criterion().is_none()
            && self.regions.is_empty()
            && self.date.is_none()
    }

    fn status_criterion(&self) -> Option<&str> {
        self.status
            .as_deref()
            .filter(|s| !s.is_empty() && *s != ALL_STATUSES)
    }

    pub fn matches(&self, performance: &Performance) -> bool {
        let genre_match = self.genres.is_empty() || self.genres.contains(&performance.genrenm);
        let status_match = self
            .status_criterion()
            .map_or(true, |status| performance.prfstate == status);
        let region_match = self.regions.is_empty()
            || self.regions.iter().any(|r| r == performance.region());
        let date_match = self.date.map_or(true, |date| runs_on(performance, date));

        genre_match && status_match && region_match && date_match
    }

    pub fn apply<'a>(&self, performances: &'a [Performance]) -> Vec<&'a Performance> {
        performances.iter().filter(|p| self.matches(p)).collect()
    }
}

fn runs_on(performance: &Performance, date: NaiveDate) -> bool {
    match (
        parse_show_date(&performance.prfpdfrom),
        parse_show_date(&performance.prfpdto),
    ) {
        (Some(from), Some(to)) => from <= date && date <= to,
        _ => false,
    }
}

/// Distinct genres in first-seen order.
pub fn available_genres(performances: &[Performance]) -> Vec<String> {
    distinct(performances.iter().map(|p| p.genrenm.as_str()))
}

/// Distinct regions (first token of `area`) in first-seen order.
pub fn available_regions(performances: &[Performance]) -> Vec<String> {
    distinct(performances.iter().map(|p| p.region()))
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in values.filter(|v| !v.is_empty()) {
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
