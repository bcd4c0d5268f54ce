use crate::adapters::http::ensure_success;
use crate::domain::model::Coordinate;
use crate::domain::ports::Geolocator;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// A position supplied up front (e.g. `--lat/--lon`). An out-of-range
/// position locates to nothing, same as a failed IP lookup.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    requested: Option<(f64, f64)>,
}

impl FixedLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            requested: Some((latitude, longitude)),
        }
    }

    pub fn unavailable() -> Self {
        Self { requested: None }
    }
}

#[async_trait]
impl Geolocator for FixedLocation {
    async fn locate(&self) -> Result<Option<Coordinate>> {
        let Some((lat, lon)) = self.requested else {
            return Ok(None);
        };
        match Coordinate::new(lat, lon) {
            Ok(position) => Ok(Some(position)),
            Err(e) => {
                tracing::warn!("⚠️ Ignoring requested position: {}", e);
                Ok(None)
            }
        }
    }
}

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    country_name: Option<String>,
}

/// Approximate position from the caller's public IP (ipapi.co style JSON).
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    client: Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn lookup(&self) -> Result<IpApiResult> {
        let response = self.client.get(&self.url).send().await?;
        let response = ensure_success(response, &self.url)?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn locate(&self) -> Result<Option<Coordinate>> {
        // 定位失敗不算錯誤，只是沒有結果
        let result = match self.lookup().await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("⚠️ IP geolocation unavailable: {}", e);
                return Ok(None);
            }
        };

        let (Some(lat), Some(lon)) = (result.latitude, result.longitude) else {
            tracing::warn!("⚠️ IP geolocation response has no coordinates");
            return Ok(None);
        };

        match Coordinate::new(lat, lon) {
            Ok(position) => {
                tracing::info!(
                    "📍 Located via IP: {}, {} ({:.4}, {:.4})",
                    result.city.as_deref().unwrap_or("Unknown"),
                    result.country_name.as_deref().unwrap_or(""),
                    lat,
                    lon
                );
                Ok(Some(position))
            }
            Err(e) => {
                tracing::warn!("⚠️ IP geolocation returned an invalid position: {}", e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_location() {
        let located = FixedLocation::new(37.5665, 126.9780).locate().await.unwrap();
        assert_eq!(located.map(|c| c.latitude()), Some(37.5665));
        assert!(FixedLocation::unavailable().locate().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_fixed_location_is_unavailable() {
        assert!(FixedLocation::new(95.0, 0.0).locate().await.unwrap().is_none());
        assert!(FixedLocation::new(0.0, 180.5).locate().await.unwrap().is_none());
        assert!(FixedLocation::new(f64::NAN, 0.0).locate().await.unwrap().is_none());
    }
}
