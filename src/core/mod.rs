pub mod catalog;
pub mod engine;
pub mod enrich;
pub mod filter;
pub mod geo;
pub mod pipeline;
pub mod ranker;
pub mod recommend;

pub use crate::domain::ports::{ConfigProvider, Geolocator, Pipeline, RelatedListings, Storage};
pub use crate::utils::error::Result;
