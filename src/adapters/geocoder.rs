//! Reverse geocoding via OpenStreetMap Nominatim (`/reverse?format=json`).

use crate::adapters::http::{ensure_success, join_url};
use crate::domain::model::{Coordinate, LocationInfo};
use crate::utils::error::Result;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
struct ReverseResponse {
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Deserialize, Default)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl From<NominatimAddress> for LocationInfo {
    fn from(address: NominatimAddress) -> Self {
        // 小地方沒有 city，依序退回 town、village
        let city = address
            .city
            .or(address.town)
            .or(address.village)
            .unwrap_or_default();
        Self {
            city,
            state: address.state.unwrap_or_default(),
            country: address.country.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// `client` should carry a User-Agent; Nominatim rejects anonymous requests.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn reverse(&self, position: Coordinate) -> Result<LocationInfo> {
        let response = self
            .client
            .get(join_url(&self.base_url, "/reverse"))
            .query(&[
                ("format", "json".to_string()),
                ("lat", position.latitude().to_string()),
                ("lon", position.longitude().to_string()),
            ])
            .send()
            .await?;
        let response = ensure_success(response, "/reverse")?;
        let body: ReverseResponse = response.json().await?;
        Ok(body.address.into())
    }
}
