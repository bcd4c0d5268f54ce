use clap::Parser;
use serde::Serialize;
use stage_scout::adapters::geocoder::NominatimGeocoder;
use stage_scout::adapters::geolocation::{FixedLocation, IpGeolocator};
use stage_scout::adapters::http::build_http_client;
use stage_scout::config::parse_cli_date;
use stage_scout::core::catalog::{upcoming_only, BoxOfficeQuery};
use stage_scout::core::filter::{available_genres, available_regions, SearchFilter};
use stage_scout::core::recommend::{AuthSession, GenreSelection, Recommendation, RecommendationService};
use stage_scout::domain::ports::Geolocator;
use stage_scout::utils::error::ErrorSeverity;
use stage_scout::utils::{logger, validation::Validate};
use stage_scout::{
    CliConfig, Command, KopisClient, LocalStorage, NearbyPipeline, Result, ScoutConfig, ScoutEngine,
    ScoutError,
};

const CATEGORY_ROWS: usize = 100;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting stage-scout CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: CliConfig) -> Result<()> {
    // 驗證配置
    let config = cli.load_config()?;
    config.validate()?;

    let http = build_http_client(&config.api)?;
    let client = KopisClient::with_client(http.clone(), config.api.base_url.clone());

    match cli.command {
        Command::Nearby {
            lat,
            lon,
            auto,
            date,
            ..
        } => {
            let date = parse_cli_date("date", date.as_deref())?;
            match (lat, lon) {
                (Some(lat), Some(lon)) => {
                    let geolocator = FixedLocation::new(lat, lon);
                    run_nearby(config, client, http, geolocator, date).await
                }
                _ if auto => {
                    let geolocator =
                        IpGeolocator::new(http.clone(), config.geocoder.ip_geolocation_url.clone());
                    run_nearby(config, client, http, geolocator, date).await
                }
                _ => Err(ScoutError::ValidationError {
                    message: "provide --lat and --lon, or --auto".to_string(),
                }),
            }
        }
        Command::Search {
            query,
            category,
            genre,
            status,
            region,
            date,
        } => {
            let today = parse_cli_date("today", None)?;
            let performances = match category {
                Some(category) => {
                    client
                        .performances_by_genre(&category, today, CATEGORY_ROWS)
                        .await?
                }
                None => {
                    client
                        .search_performances(query.as_deref().unwrap_or_default(), today)
                        .await?
                }
            };

            // 可選的篩選值，對應搜尋頁的 filter chips
            tracing::debug!("Genres: {}", available_genres(&performances).join(", "));
            tracing::debug!("Regions: {}", available_regions(&performances).join(", "));

            let filter = SearchFilter {
                genres: genre,
                status,
                regions: region,
                date: date
                    .as_deref()
                    .map(|raw| parse_cli_date("date", Some(raw)))
                    .transpose()?,
            };
            let matched = filter.apply(&performances);
            tracing::info!("🔎 {} of {} performances match", matched.len(), performances.len());
            print_json(&matched)
        }
        Command::Detail { id } => print_json(&client.performance_detail(&id).await?),
        Command::Boxoffice {
            period,
            date,
            genre,
            area,
        } => {
            let mut query = BoxOfficeQuery::new(period, parse_cli_date("date", date.as_deref())?);
            if let Some(genre) = genre {
                query = query.with_genre(genre);
            }
            if let Some(area) = area {
                query = query.with_area(area);
            }
            query.validate()?;
            print_json(&client.box_office(&query).await?)
        }
        Command::Upcoming { limit } => {
            let today = parse_cli_date("today", None)?;
            let upcoming = upcoming_only(client.upcoming_performances().await?, today, limit);
            print_json(&upcoming)
        }
        Command::Recommend { pick, .. } => run_recommend(&config, &client, pick).await,
        Command::Token => {
            let token = client.issue_token().await?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn run_nearby<G: Geolocator>(
    config: ScoutConfig,
    client: KopisClient,
    http: reqwest::Client,
    geolocator: G,
    date: chrono::NaiveDate,
) -> Result<()> {
    let storage = LocalStorage::new(config.output.path.clone());
    let geocoder = NominatimGeocoder::new(http, config.geocoder.base_url.clone());
    let pipeline =
        NearbyPipeline::new(storage, config, geolocator, client, date).with_geocoder(geocoder);
    let engine = ScoutEngine::new(pipeline);

    let (report, output_path) = engine.run().await?;

    if !report.has_result() {
        tracing::warn!("📍 No position available, nothing was ranked");
        println!("📍 Current position unavailable, no nearby facilities");
        return Ok(());
    }

    if let Some(location) = &report.location {
        println!("📍 {}", location.display_line());
    }
    for (index, ranked) in report.facilities.iter().enumerate() {
        println!(
            "{:>2}. {} ({})",
            index + 1,
            ranked.facility.name,
            ranked.formatted_distance()
        );
        for related in report
            .related
            .iter()
            .filter(|r| r.facility_id == ranked.facility.id)
        {
            println!("    🎭 {}", related.performance.prfnm);
        }
    }
    if !report.failures.is_empty() {
        println!("⚠️ {} facilities could not be enriched", report.failures.len());
    }
    println!("📁 Output saved to: {}", output_path);
    Ok(())
}

async fn run_recommend(config: &ScoutConfig, client: &KopisClient, pick: Vec<String>) -> Result<()> {
    let mut session = AuthSession::new(config.token().map(str::to_string));
    let service = RecommendationService::new(client);

    if pick.is_empty() {
        let recommendation = service.recommend(&mut session).await?;
        report_token(&session);
        return match recommendation {
            Recommendation::Ready(groups) => print_json(&groups),
            Recommendation::NeedsSelection { popular } => {
                eprintln!("💡 No saved picks yet, choose three genres with --pick");
                print_json(&popular)
            }
        };
    }

    let mut selection = GenreSelection::new();
    for genre in &pick {
        selection.toggle(genre);
    }
    session.ensure_token(client).await?;
    report_token(&session);
    print_json(&service.save_selection(&session, &selection).await?)
}

fn report_token(session: &AuthSession) {
    if let Some(token) = session.token() {
        tracing::info!("🔑 Using token {} (reuse with --token)", token);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
