pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, toml_config::ScoutConfig};

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::http::KopisClient;
pub use core::{engine::ScoutEngine, pipeline::NearbyPipeline, ranker::NearestFacilityRanker};
pub use domain::model::{Coordinate, Facility, NearbyReport, RankedFacility};
pub use utils::error::{Result, ScoutError};
