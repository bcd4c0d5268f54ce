pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_args::{CliConfig, Command};

#[cfg(feature = "cli")]
mod cli_args {
    use super::toml_config::ScoutConfig;
    use crate::domain::codes::StatsPeriod;
    use crate::domain::model::parse_show_date;
    use crate::utils::error::{Result, ScoutError};
    use chrono::{Local, NaiveDate};
    use clap::{Parser, Subcommand};
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "stage-scout", version)]
    #[command(about = "Find performances and venues near you")]
    pub struct CliConfig {
        /// Path to a TOML configuration file
        #[arg(short, long, global = true)]
        pub config: Option<PathBuf>,

        /// Override the performance API base URL
        #[arg(long, global = true)]
        pub api_base: Option<String>,

        /// Override the report output directory
        #[arg(long, global = true)]
        pub output_path: Option<String>,

        #[arg(short, long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        /// Emit logs as JSON lines
        #[arg(long, global = true)]
        pub log_json: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Rank the nearest facilities and list what is playing there today
        Nearby {
            /// Latitude (-90 to 90)
            #[arg(long, allow_hyphen_values = true, requires = "lon")]
            lat: Option<f64>,

            /// Longitude (-180 to 180)
            #[arg(long, allow_hyphen_values = true, requires = "lat")]
            lon: Option<f64>,

            /// Locate via IP geolocation instead of --lat/--lon
            #[arg(long, short = 'a', conflicts_with_all = ["lat", "lon"])]
            auto: bool,

            /// How many facilities to keep
            #[arg(long)]
            top: Option<usize>,

            /// Concurrent enrichment requests
            #[arg(long)]
            concurrency: Option<usize>,

            /// Listing date (YYYY-MM-DD). Defaults to today.
            #[arg(long, short = 'd')]
            date: Option<String>,
        },
        /// Search performances by title, or list one genre with --category
        Search {
            query: Option<String>,

            /// KOPIS genre listing (shcate) for the next 30 days
            #[arg(long)]
            category: Option<String>,

            #[arg(long, value_delimiter = ',')]
            genre: Vec<String>,

            #[arg(long)]
            status: Option<String>,

            #[arg(long, value_delimiter = ',')]
            region: Vec<String>,

            /// Only performances running on this date (YYYY-MM-DD)
            #[arg(long)]
            date: Option<String>,
        },
        /// Show one performance by its mt20id
        Detail { id: String },
        /// Box office ranking
        Boxoffice {
            #[arg(long, default_value = "day")]
            period: StatsPeriod,

            #[arg(long, short = 'd')]
            date: Option<String>,

            /// Genre code, e.g. GGGA
            #[arg(long)]
            genre: Option<String>,

            /// Area code, e.g. 11
            #[arg(long)]
            area: Option<String>,
        },
        /// Performances whose ticket sales open soon
        Upcoming {
            #[arg(long, default_value = "4")]
            limit: usize,
        },
        /// Personalized recommendations
        Recommend {
            /// Existing token (otherwise one is issued)
            #[arg(long)]
            token: Option<String>,

            /// Save exactly three genres before recommending
            #[arg(long, value_delimiter = ',')]
            pick: Vec<String>,
        },
        /// Issue a new personalization token
        Token,
    }

    impl CliConfig {
        /// File config (or defaults) with command line overrides applied.
        pub fn load_config(&self) -> Result<ScoutConfig> {
            let mut config = match &self.config {
                Some(path) => ScoutConfig::from_file(path)?,
                None => ScoutConfig::default(),
            };

            if let Some(api_base) = &self.api_base {
                config.api.base_url = api_base.clone();
            }
            if let Some(output_path) = &self.output_path {
                config.output.path = output_path.clone();
            }

            match &self.command {
                Command::Nearby {
                    top, concurrency, ..
                } => {
                    if let Some(top) = top {
                        config.nearby.top_n = *top;
                    }
                    if let Some(concurrency) = concurrency {
                        config.nearby.concurrent_requests = *concurrency;
                    }
                }
                Command::Recommend {
                    token: Some(token), ..
                } => {
                    config.api.token = Some(token.clone());
                }
                _ => {}
            }

            Ok(config)
        }
    }

    /// Parse a user-supplied date, defaulting to today's local date.
    pub fn parse_cli_date(field: &str, raw: Option<&str>) -> Result<NaiveDate> {
        match raw {
            None => Ok(Local::now().date_naive()),
            Some(raw) => parse_show_date(raw).ok_or_else(|| ScoutError::InvalidConfigValueError {
                field: field.to_string(),
                value: raw.to_string(),
                reason: "expected YYYY-MM-DD".to_string(),
            }),
        }
    }

}

#[cfg(feature = "cli")]
pub use cli_args::parse_cli_date;
