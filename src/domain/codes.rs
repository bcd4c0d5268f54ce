//! KOPIS genre (`catecode` / `shcate`) and area (`area`) code tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const GENRE_CODES: &[(&str, &str)] = &[
    ("AAAA", "연극"),
    ("BBBC", "무용(서양/한국무용)"),
    ("BBBE", "대중무용"),
    ("CCCA", "서양음악(클래식)"),
    ("CCCC", "한국음악(국악)"),
    ("CCCD", "대중음악"),
    ("EEEA", "복합"),
    ("EEEB", "서커스/마술"),
    ("GGGA", "뮤지컬"),
];

pub const AREA_CODES: &[(&str, &str)] = &[
    ("11", "서울"),
    ("26", "부산"),
    ("27", "대구"),
    ("28", "인천"),
    ("29", "광주"),
    ("30", "대전"),
    ("31", "울산"),
    ("36", "세종"),
    ("41", "경기"),
    ("51", "강원"),
    ("43", "충청북도"),
    ("44", "충청남도"),
    ("45", "전라북도"),
    ("46", "전라남도"),
    ("47", "경상북도"),
    ("48", "경상남도"),
    ("50", "제주"),
];

pub fn genre_name(code: &str) -> Option<&'static str> {
    lookup(GENRE_CODES, code)
}

pub fn area_name(code: &str) -> Option<&'static str> {
    lookup(AREA_CODES, code)
}

fn lookup(table: &'static [(&'static str, &'static str)], code: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

/// Box office aggregation window (`ststype`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    #[default]
    Day,
    Week,
    Month,
}

impl StatsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            _ => Err(format!("Unknown period '{}'. Use day, week or month.", s)),
        }
    }
}
