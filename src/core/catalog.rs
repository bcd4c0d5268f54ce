use crate::adapters::http::kopis_date;
use crate::domain::codes::{self, StatsPeriod};
use crate::domain::model::Performance;
use crate::utils::error::{Result, ScoutError};
use crate::utils::validation::Validate;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct BoxOfficeQuery {
    pub period: StatsPeriod,
    pub date: NaiveDate,
    pub genre: Option<String>,
    pub area: Option<String>,
}

impl BoxOfficeQuery {
    pub fn new(period: StatsPeriod, date: NaiveDate) -> Self {
        Self {
            period,
            date,
            genre: None,
            area: None,
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("ststype", self.period.as_str().to_string()),
            ("date", kopis_date(self.date)),
        ];
        if let Some(genre) = &self.genre {
            query.push(("catecode", genre.to_uppercase()));
        }
        if let Some(area) = &self.area {
            query.push(("area", area.clone()));
        }
        query
    }
}

impl Validate for BoxOfficeQuery {
    fn validate(&self) -> Result<()> {
        if let Some(genre) = &self.genre {
            if codes::genre_name(genre).is_none() {
                return Err(ScoutError::InvalidConfigValueError {
                    field: "genre".to_string(),
                    value: genre.clone(),
                    reason: "unknown genre code".to_string(),
                });
            }
        }
        if let Some(area) = &self.area {
            if codes::area_name(area).is_none() {
                return Err(ScoutError::InvalidConfigValueError {
                    field: "area".to_string(),
                    value: area.clone(),
                    reason: "unknown area code".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Performances starting after `today`, soonest first, at most `limit`.
/// Entries without a parseable start date are dropped.
pub fn upcoming_only(performances: Vec<Performance>, today: NaiveDate, limit: usize) -> Vec<Performance> {
    let mut upcoming: Vec<(NaiveDate, Performance)> = performances
        .into_iter()
        .filter_map(|p| p.starts_on().map(|start| (start, p)))
        .filter(|(start, _)| *start > today)
        .collect();

    upcoming.sort_by_key(|(start, _)| *start);
    upcoming.into_iter().take(limit).map(|(_, p)| p).collect()
}
