use httpmock::prelude::*;
use stage_scout::adapters::geocoder::NominatimGeocoder;
use stage_scout::adapters::geolocation::{FixedLocation, IpGeolocator};
use stage_scout::{KopisClient, LocalStorage, NearbyPipeline, ScoutConfig, ScoutEngine};
use chrono::NaiveDate;
use tempfile::TempDir;

fn listing_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn config_for(server: &MockServer, output_path: &str, top_n: usize) -> ScoutConfig {
    let toml = format!(
        r#"
[api]
base_url = "{base}"

[geocoder]
base_url = "{base}"
ip_geolocation_url = "{base}/json/"

[nearby]
top_n = {top_n}
concurrent_requests = 2

[output]
path = "{output_path}"
formats = ["json", "csv"]
"#,
        base = server.base_url(),
        top_n = top_n,
        output_path = output_path.replace('\\', "/"),
    );
    ScoutConfig::from_toml_str(&toml).unwrap()
}

fn mock_facilities(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/performance-facilities");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!([
                {"mt10id": "FC-FAR", "fcltynm": "HaeundaeHall", "adres": "Busan", "la": "35.1587", "lo": "129.1604"},
                {"mt10id": "FC-NEAR", "fcltynm": "SejongCenter", "adres": "Jongno-gu", "la": "37.5725", "lo": "126.9760"},
                {"mt10id": "FC-BAD", "fcltynm": "Nowhere", "adres": "", "la": "", "lo": "126.9"},
                {"mt10id": "FC-MID", "fcltynm": "ArtsCenter", "adres": "Seocho-gu", "la": 37.4786, "lo": 127.0114},
                {"mt10id": "FC-OUT", "fcltynm": "OffTheMap", "adres": "", "la": "91.0", "lo": "0"}
            ]));
    })
}

fn mock_listing<'a>(server: &'a MockServer, facility: &str, mt20id: &str) -> httpmock::Mock<'a> {
    let facility = facility.to_string();
    let mt20id = mt20id.to_string();
    server.mock(move |when, then| {
        when.method(GET)
            .path("/performances")
            .query_param("shprfnmfct", &facility)
            .query_param("stdate", "20240501")
            .query_param("eddate", "20240501")
            .query_param("rows", "2");
        then.status(200).json_body(serde_json::json!([
            {"mt20id": mt20id, "prfnm": "Opening Night", "fcltynm": facility},
            {"mt20id": "dropped", "prfnm": "Second", "fcltynm": facility}
        ]));
    })
}

#[tokio::test]
async fn test_nearby_end_to_end_with_partial_enrichment_failure() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let facilities_mock = mock_facilities(&server);
    let near_mock = mock_listing(&server, "SejongCenter", "PF-NEAR");
    let mid_mock = mock_listing(&server, "ArtsCenter", "PF-MID");
    let far_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/performances")
            .query_param("shprfnmfct", "HaeundaeHall");
        then.status(503);
    });
    let reverse_mock = server.mock(|when, then| {
        when.method(GET).path("/reverse").query_param("format", "json");
        then.status(200).json_body(serde_json::json!({
            "address": {"city": "Seoul", "country": "South Korea"}
        }));
    });

    let config = config_for(&server, &output_path, 10);
    let client = KopisClient::new(server.base_url());
    let geocoder = NominatimGeocoder::new(reqwest::Client::new(), server.base_url());
    let pipeline = NearbyPipeline::new(
        LocalStorage::new(output_path.clone()),
        config,
        FixedLocation::new(37.5665, 126.9780),
        client,
        listing_day(),
    )
    .with_geocoder(geocoder);

    let (report, path) = ScoutEngine::new(pipeline).run().await.unwrap();

    facilities_mock.assert();
    near_mock.assert();
    mid_mock.assert();
    far_mock.assert();
    reverse_mock.assert();

    // 排序：最近的在前，無效座標被排除
    let ids: Vec<&str> = report.facilities.iter().map(|f| f.facility.id.as_str()).collect();
    assert_eq!(ids, vec!["FC-NEAR", "FC-MID", "FC-FAR"]);
    assert_eq!(report.skipped_facilities, 2);
    assert!(report
        .facilities
        .windows(2)
        .all(|pair| pair[0].distance_km <= pair[1].distance_km));

    assert_eq!(report.location.as_ref().unwrap().display_line(), "Seoul, South Korea");

    let mut related: Vec<&str> = report
        .related
        .iter()
        .map(|r| r.performance.mt20id.as_str())
        .collect();
    related.sort();
    assert_eq!(related, vec!["PF-MID", "PF-NEAR"]);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].facility_id, "FC-FAR");

    assert!(path.ends_with("nearby_report.json"));
    let json_path = temp_dir.path().join("nearby_report.json");
    let saved: serde_json::Value =
        serde_json::from_slice(&std::fs::read(json_path).unwrap()).unwrap();
    assert_eq!(saved["facilities"][0]["mt10id"], "FC-NEAR");
    assert_eq!(saved["skipped_facilities"], 2);

    let csv_content = std::fs::read_to_string(temp_dir.path().join("nearby_facilities.csv")).unwrap();
    assert!(csv_content.starts_with("rank,id,name,address,latitude,longitude,distance_km"));
    assert!(csv_content.contains("1,FC-NEAR,SejongCenter"));
    assert_eq!(csv_content.lines().count(), 4);
}

#[tokio::test]
async fn test_nearby_top_n_limits_enrichment() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    mock_facilities(&server);
    let near_mock = mock_listing(&server, "SejongCenter", "PF-NEAR");
    let mid_mock = mock_listing(&server, "ArtsCenter", "PF-MID");

    let pipeline = NearbyPipeline::new(
        LocalStorage::new(output_path),
        config_for(&server, temp_dir.path().to_str().unwrap(), 1),
        FixedLocation::new(37.5665, 126.9780),
        KopisClient::new(server.base_url()),
        listing_day(),
    );

    let (report, _) = ScoutEngine::new(pipeline).run().await.unwrap();

    assert_eq!(report.facilities.len(), 1);
    assert_eq!(report.facilities[0].facility.id, "FC-NEAR");
    assert!(report.location.is_none());
    near_mock.assert();
    assert_eq!(mid_mock.hits(), 0);
}

#[tokio::test]
async fn test_nearby_without_position_reports_no_result() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let facilities_mock = mock_facilities(&server);
    let ip_mock = server.mock(|when, then| {
        when.method(GET).path("/json/");
        then.status(429);
    });

    let config = config_for(&server, &output_path, 10);
    let geolocator = IpGeolocator::new(
        reqwest::Client::new(),
        config.geocoder.ip_geolocation_url.clone(),
    );
    let pipeline = NearbyPipeline::new(
        LocalStorage::new(output_path.clone()),
        config,
        geolocator,
        KopisClient::new(server.base_url()),
        listing_day(),
    );

    let (report, _) = ScoutEngine::new(pipeline).run().await.unwrap();

    ip_mock.assert();
    assert_eq!(facilities_mock.hits(), 0);
    assert!(!report.has_result());
    assert!(report.facilities.is_empty());

    let saved: serde_json::Value = serde_json::from_slice(
        &std::fs::read(temp_dir.path().join("nearby_report.json")).unwrap(),
    )
    .unwrap();
    assert!(saved["origin"].is_null());
}

#[tokio::test]
async fn test_out_of_range_origin_writes_empty_report() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let facilities_mock = mock_facilities(&server);

    let pipeline = NearbyPipeline::new(
        LocalStorage::new(output_path.clone()),
        config_for(&server, &output_path, 10),
        FixedLocation::new(95.0, 0.0),
        KopisClient::new(server.base_url()),
        listing_day(),
    );

    let (report, path) = ScoutEngine::new(pipeline).run().await.unwrap();

    assert_eq!(facilities_mock.hits(), 0);
    assert!(!report.has_result());
    assert!(path.ends_with("nearby_report.json"));

    let saved: serde_json::Value = serde_json::from_slice(
        &std::fs::read(temp_dir.path().join("nearby_report.json")).unwrap(),
    )
    .unwrap();
    assert!(saved["origin"].is_null());
    assert_eq!(saved["facilities"], serde_json::json!([]));
}

#[tokio::test]
async fn test_nearby_from_ip_position() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    mock_facilities(&server);
    mock_listing(&server, "SejongCenter", "PF-NEAR");
    mock_listing(&server, "ArtsCenter", "PF-MID");
    server.mock(|when, then| {
        when.method(GET).path("/performances").query_param("shprfnmfct", "HaeundaeHall");
        then.status(200).json_body(serde_json::json!([]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/json/");
        then.status(200).json_body(serde_json::json!({
            "latitude": 35.1796, "longitude": 129.0756, "city": "Busan", "country_name": "South Korea"
        }));
    });

    let config = config_for(&server, &output_path, 10);
    let geolocator = IpGeolocator::new(
        reqwest::Client::new(),
        config.geocoder.ip_geolocation_url.clone(),
    );
    let pipeline = NearbyPipeline::new(
        LocalStorage::new(output_path),
        config,
        geolocator,
        KopisClient::new(server.base_url()),
        listing_day(),
    );

    let (report, _) = ScoutEngine::new(pipeline).run().await.unwrap();
    assert_eq!(report.facilities[0].facility.id, "FC-FAR");
    assert!(report.failures.is_empty());
}

#[test]
fn test_config_file_round_trip_through_tempdir() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("scout.toml");
    std::fs::write(
        &config_path,
        "[nearby]\ntop_n = 5\n\n[output]\nformats = [\"csv\"]\n",
    )?;

    let config = ScoutConfig::from_file(&config_path)?;
    assert_eq!(config.nearby.top_n, 5);
    assert_eq!(config.output.formats, vec!["csv".to_string()]);
    assert_eq!(config.nearby.concurrent_requests, 5);
    Ok(())
}

#[test]
fn test_fixed_location_resolves_synchronously() {
    use stage_scout::adapters::geolocation::FixedLocation;
    use stage_scout::domain::ports::Geolocator;

    let located = tokio_test::block_on(FixedLocation::new(-33.8568, 151.2153).locate()).unwrap();
    assert_eq!(located.map(|c| c.longitude()), Some(151.2153));
}
