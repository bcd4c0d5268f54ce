use crate::adapters::geocoder::NominatimGeocoder;
use crate::adapters::http::KopisClient;
use crate::core::enrich::{enrich_related, partition_outcomes, EnrichOptions};
use crate::core::ranker::NearestFacilityRanker;
use crate::domain::model::{
    Coordinate, LocationInfo, NearbyInput, NearbyReport, RankedFacility,
};
use crate::domain::ports::{ConfigProvider, Geolocator, Pipeline, Storage};
use crate::utils::error::{Result, ScoutError};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

pub const REPORT_JSON: &str = "nearby_report.json";
pub const REPORT_CSV: &str = "nearby_facilities.csv";

/// Locate → fetch facilities → rank → enrich → write report.
pub struct NearbyPipeline<S: Storage, C: ConfigProvider, G: Geolocator> {
    storage: S,
    config: C,
    geolocator: G,
    client: Arc<KopisClient>,
    geocoder: Option<NominatimGeocoder>,
    ranker: NearestFacilityRanker,
    date: NaiveDate,
}

impl<S: Storage, C: ConfigProvider, G: Geolocator> NearbyPipeline<S, C, G> {
    pub fn new(storage: S, config: C, geolocator: G, client: KopisClient, date: NaiveDate) -> Self {
        Self {
            storage,
            config,
            geolocator,
            client: Arc::new(client),
            geocoder: None,
            ranker: NearestFacilityRanker::new(),
            date,
        }
    }

    pub fn with_geocoder(mut self, geocoder: NominatimGeocoder) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    async fn describe(&self, origin: Coordinate) -> Option<LocationInfo> {
        let geocoder = self.geocoder.as_ref()?;
        match geocoder.reverse(origin).await {
            Ok(info) => Some(info),
            Err(e) => {
                // 只影響顯示，不影響排序
                tracing::warn!("⚠️ Reverse geocoding failed: {}", e);
                None
            }
        }
    }

    fn empty_report(&self, origin: Option<Coordinate>, location: Option<LocationInfo>) -> NearbyReport {
        NearbyReport {
            generated_at: Utc::now(),
            origin,
            location,
            facilities: Vec::new(),
            related: Vec::new(),
            failures: Vec::new(),
            skipped_facilities: 0,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, G: Geolocator> Pipeline for NearbyPipeline<S, C, G> {
    async fn extract(&self) -> Result<NearbyInput> {
        let Some(origin) = self.geolocator.locate().await? else {
            tracing::warn!("📍 Current position unavailable, nothing to rank");
            return Ok(NearbyInput {
                origin: None,
                location: None,
                facilities: Vec::new(),
            });
        };

        tracing::debug!(
            "Origin: ({:.4}, {:.4})",
            origin.latitude(),
            origin.longitude()
        );

        let (location, facilities) = tokio::join!(
            self.describe(origin),
            self.client.facilities(self.config.facility_rows())
        );

        Ok(NearbyInput {
            origin: Some(origin),
            location,
            facilities: facilities?,
        })
    }

    async fn transform(&self, input: NearbyInput) -> Result<NearbyReport> {
        let Some(origin) = input.origin else {
            return Ok(self.empty_report(None, None));
        };

        let ranking = self
            .ranker
            .rank_with_stats(origin, &input.facilities, self.config.top_n());
        if ranking.skipped > 0 {
            tracing::info!(
                "Skipped {} facilities without usable coordinates",
                ranking.skipped
            );
        }

        let options = EnrichOptions {
            date: self.date,
            rows: self.config.related_rows(),
            keep: self.config.related_per_facility(),
            concurrency: self.config.concurrent_requests(),
        };
        let outcomes = enrich_related(Arc::clone(&self.client), &ranking.facilities, options).await;
        let (related, failures) = partition_outcomes(outcomes);

        Ok(NearbyReport {
            facilities: ranking.facilities,
            related,
            failures,
            skipped_facilities: ranking.skipped,
            ..self.empty_report(Some(origin), input.location)
        })
    }

    async fn load(&self, report: &NearbyReport) -> Result<String> {
        let formats = self.config.output_formats();
        let mut written = Vec::new();

        if formats.iter().any(|f| f == "json") {
            let json_data = serde_json::to_string_pretty(report)?;
            self.storage.write_file(REPORT_JSON, json_data.as_bytes()).await?;
            written.push(REPORT_JSON);
        }

        if formats.iter().any(|f| f == "csv") {
            let csv_data = facilities_csv(&report.facilities)?;
            self.storage.write_file(REPORT_CSV, &csv_data).await?;
            written.push(REPORT_CSV);
        }

        tracing::debug!("Report files written: {:?}", written);

        let first = written.first().ok_or_else(|| ScoutError::ConfigError {
            message: "no output format selected".to_string(),
        })?;
        Ok(format!("{}/{}", self.config.output_path(), first))
    }
}

/// `rank,id,name,address,latitude,longitude,distance_km`
pub fn facilities_csv(facilities: &[RankedFacility]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "rank",
        "id",
        "name",
        "address",
        "latitude",
        "longitude",
        "distance_km",
    ])?;

    for (index, ranked) in facilities.iter().enumerate() {
        let facility = &ranked.facility;
        writer.write_record([
            (index + 1).to_string(),
            facility.id.clone(),
            facility.name.clone(),
            facility.address.clone(),
            facility.latitude.map(|v| v.to_string()).unwrap_or_default(),
            facility.longitude.map(|v| v.to_string()).unwrap_or_default(),
            format!("{:.2}", ranked.distance_km),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ScoutError::IoError(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::geolocation::FixedLocation;
    use crate::domain::model::Facility;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        output_path: String,
        output_formats: Vec<String>,
        top_n: usize,
    }

    impl MockConfig {
        fn new(top_n: usize) -> Self {
            Self {
                output_path: "test_output".to_string(),
                output_formats: vec!["json".to_string(), "csv".to_string()],
                top_n,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn output_formats(&self) -> &[String] {
            &self.output_formats
        }

        fn top_n(&self) -> usize {
            self.top_n
        }

        fn facility_rows(&self) -> usize {
            2000
        }

        fn related_rows(&self) -> usize {
            2
        }

        fn related_per_facility(&self) -> usize {
            1
        }

        fn concurrent_requests(&self) -> usize {
            3
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn seoul() -> FixedLocation {
        FixedLocation::new(37.5665, 126.9780)
    }

    fn facility(id: &str, name: &str, lat: f64, lon: f64) -> RankedFacility {
        RankedFacility {
            facility: Facility {
                id: id.to_string(),
                name: name.to_string(),
                address: "서울, 대한민국".to_string(),
                latitude: Some(lat),
                longitude: Some(lon),
            },
            distance_km: 1.23456,
        }
    }

    #[tokio::test]
    async fn test_extract_without_position_skips_requests() {
        let server = MockServer::start();
        let facilities_mock = server.mock(|when, then| {
            when.method(GET).path("/performance-facilities");
            then.status(200).json_body(serde_json::json!([]));
        });

        let pipeline = NearbyPipeline::new(
            MockStorage::default(),
            MockConfig::new(10),
            FixedLocation::unavailable(),
            KopisClient::new(server.base_url()),
            today(),
        );

        let input = pipeline.extract().await.unwrap();
        assert!(input.origin.is_none());
        assert!(input.facilities.is_empty());
        assert_eq!(facilities_mock.hits(), 0);

        let report = pipeline.transform(input).await.unwrap();
        assert!(!report.has_result());
        assert!(report.facilities.is_empty());
    }

    #[tokio::test]
    async fn test_extract_fetches_facilities_with_kopis_params() {
        let server = MockServer::start();
        let facilities_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/performance-facilities")
                .query_param("cpage", "1")
                .query_param("rows", "2000");
            then.status(200).json_body(serde_json::json!([
                {"mt10id": "FC1", "fcltynm": "세종문화회관", "adres": "종로구", "la": "37.5725", "lo": "126.9760"}
            ]));
        });

        let pipeline = NearbyPipeline::new(
            MockStorage::default(),
            MockConfig::new(10),
            seoul(),
            KopisClient::new(server.base_url()),
            today(),
        );

        let input = pipeline.extract().await.unwrap();
        facilities_mock.assert();
        assert_eq!(input.facilities.len(), 1);
        assert!(input.location.is_none());
    }

    #[tokio::test]
    async fn test_extract_propagates_facility_api_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/performance-facilities");
            then.status(502);
        });

        let pipeline = NearbyPipeline::new(
            MockStorage::default(),
            MockConfig::new(10),
            seoul(),
            KopisClient::new(server.base_url()),
            today(),
        );

        let result = pipeline.extract().await;
        assert!(matches!(
            result,
            Err(ScoutError::HttpStatusError { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_load_writes_json_and_csv() {
        let storage = MockStorage::default();
        let pipeline = NearbyPipeline::new(
            storage.clone(),
            MockConfig::new(10),
            seoul(),
            KopisClient::new("http://127.0.0.1:9"),
            today(),
        );

        let report = NearbyReport {
            facilities: vec![facility("FC1", "세종문화회관", 37.5725, 126.976)],
            ..pipeline.empty_report(Coordinate::new(37.5665, 126.978).ok(), None)
        };

        let path = pipeline.load(&report).await.unwrap();
        assert_eq!(path, "test_output/nearby_report.json");

        let json = storage.get_file(REPORT_JSON).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["facilities"][0]["mt10id"], "FC1");

        let csv = String::from_utf8(storage.get_file(REPORT_CSV).await.unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("rank,id,name,address,latitude,longitude,distance_km")
        );
        assert_eq!(
            lines.next(),
            Some("1,FC1,세종문화회관,\"서울, 대한민국\",37.5725,126.976,1.23")
        );
    }

    #[tokio::test]
    async fn test_load_without_formats_is_config_error() {
        let mut config = MockConfig::new(10);
        config.output_formats.clear();
        let pipeline = NearbyPipeline::new(
            MockStorage::default(),
            config,
            seoul(),
            KopisClient::new("http://127.0.0.1:9"),
            today(),
        );
        let report = pipeline.empty_report(None, None);
        assert!(matches!(
            pipeline.load(&report).await,
            Err(ScoutError::ConfigError { .. })
        ));
    }
}
