use crate::utils::error::{Result, ScoutError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A WGS84 point in degrees. Only constructible with finite, in-range values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = ScoutError;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let reason = if !latitude.is_finite() || !longitude.is_finite() {
            Some("coordinates must be finite numbers")
        } else if !(-90.0..=90.0).contains(&latitude) {
            Some("latitude must be within -90..90")
        } else if !(-180.0..=180.0).contains(&longitude) {
            Some("longitude must be within -180..180")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ScoutError::InvalidCoordinateError {
                latitude,
                longitude,
                reason: reason.to_string(),
            }),
            None => Ok(Self {
                latitude,
                longitude,
            }),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// KOPIS 公演場 (`mt10id`)。座標可能缺漏或不是數字
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    #[serde(rename = "mt10id", alias = "id")]
    pub id: String,
    #[serde(rename = "fcltynm", alias = "name", default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(rename = "adres", alias = "address", default, deserialize_with = "nullable_string")]
    pub address: String,
    #[serde(
        rename = "la",
        alias = "latitude",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub latitude: Option<f64>,
    #[serde(
        rename = "lo",
        alias = "longitude",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub longitude: Option<f64>,
}

impl Facility {
    /// The facility's position, or `None` when it cannot be ranked.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon).ok(),
            _ => None,
        }
    }
}

// API 有時回傳字串 "37.51"，有時回傳數字
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse::<f64>().ok(),
        Some(Raw::Other(_)) | None => None,
    })
}

// 文字欄位偶爾是 null，當成空字串
fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFacility {
    #[serde(flatten)]
    pub facility: Facility,
    pub distance_km: f64,
}

impl RankedFacility {
    pub fn formatted_distance(&self) -> String {
        format!("{:.2} km", self.distance_km)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Performance {
    #[serde(deserialize_with = "nullable_string")]
    pub mt20id: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfnm: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfpdfrom: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfpdto: String,
    #[serde(deserialize_with = "nullable_string")]
    pub fcltynm: String,
    #[serde(deserialize_with = "nullable_string")]
    pub poster: String,
    #[serde(deserialize_with = "nullable_string")]
    pub genrenm: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfstate: String,
    #[serde(deserialize_with = "nullable_string")]
    pub openrun: String,
    #[serde(deserialize_with = "nullable_string")]
    pub area: String,
}

impl Performance {
    pub fn starts_on(&self) -> Option<NaiveDate> {
        parse_show_date(&self.prfpdfrom)
    }

    pub fn ends_on(&self) -> Option<NaiveDate> {
        parse_show_date(&self.prfpdto)
    }

    /// First token of `area`, e.g. "서울특별시" for "서울특별시 종로구".
    pub fn region(&self) -> &str {
        self.area.split_whitespace().next().unwrap_or("")
    }
}

/// 支援 `2024.10.01`、`2024-10-01` 與 `20241001`
pub fn parse_show_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    ["%Y.%m.%d", "%Y-%m-%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceDetail {
    #[serde(deserialize_with = "nullable_string")]
    pub mt20id: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfnm: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfpdfrom: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfpdto: String,
    #[serde(deserialize_with = "nullable_string")]
    pub fcltynm: String,
    pub prfcast: Option<String>,
    pub prfcrew: Option<String>,
    #[serde(deserialize_with = "nullable_string")]
    pub prfruntime: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfage: String,
    #[serde(deserialize_with = "nullable_string")]
    pub entrpsnm: String,
    #[serde(deserialize_with = "nullable_string")]
    pub pcseguidance: String,
    #[serde(deserialize_with = "nullable_string")]
    pub poster: String,
    #[serde(deserialize_with = "nullable_string")]
    pub sty: String,
    #[serde(deserialize_with = "nullable_string")]
    pub genrenm: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfstate: String,
    #[serde(deserialize_with = "nullable_string")]
    pub openrun: String,
    #[serde(deserialize_with = "nullable_string")]
    pub dtguidance: String,
    pub styurls: serde_json::Value,
    pub relates: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxOfficeItem {
    pub rnum: u32,
    #[serde(deserialize_with = "nullable_string")]
    pub mt20id: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfnm: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfpd: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfpdfrom: String,
    #[serde(deserialize_with = "nullable_string")]
    pub prfpdto: String,
    #[serde(deserialize_with = "nullable_string")]
    pub fcltynm: String,
    #[serde(deserialize_with = "nullable_string")]
    pub poster: String,
    #[serde(deserialize_with = "nullable_string")]
    pub genrenm: String,
}

/// Reverse-geocoded address of the origin, for display only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub city: String,
    pub state: String,
    pub country: String,
}

impl LocationInfo {
    pub fn display_line(&self) -> String {
        [&self.city, &self.state, &self.country]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Everything the nearby pipeline needs before ranking.
#[derive(Debug, Clone)]
pub struct NearbyInput {
    pub origin: Option<Coordinate>,
    pub location: Option<LocationInfo>,
    pub facilities: Vec<Facility>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedPerformance {
    pub facility_id: String,
    pub performance: Performance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentFailure {
    pub facility_id: String,
    pub facility_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyReport {
    pub generated_at: DateTime<Utc>,
    pub origin: Option<Coordinate>,
    pub location: Option<LocationInfo>,
    pub facilities: Vec<RankedFacility>,
    pub related: Vec<RelatedPerformance>,
    pub failures: Vec<EnrichmentFailure>,
    pub skipped_facilities: usize,
}

impl NearbyReport {
    pub fn has_result(&self) -> bool {
        self.origin.is_some()
    }
}
