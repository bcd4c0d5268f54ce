use crate::domain::model::{Coordinate, NearbyInput, NearbyReport, Performance};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn top_n(&self) -> usize;
    fn facility_rows(&self) -> usize;
    fn related_rows(&self) -> usize;
    fn related_per_facility(&self) -> usize;
    fn concurrent_requests(&self) -> usize;
}

/// Single-shot source of the user's position. `Ok(None)` means the position
/// is unavailable (denied, unsupported, lookup failed).
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<Option<Coordinate>>;
}

/// Per-facility listing lookup used by the enrichment fan-out.
#[async_trait]
pub trait RelatedListings: Send + Sync + 'static {
    async fn related_performances(
        &self,
        facility_name: &str,
        date: NaiveDate,
        rows: usize,
    ) -> Result<Vec<Performance>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<NearbyInput>;
    async fn transform(&self, input: NearbyInput) -> Result<NearbyReport>;
    async fn load(&self, report: &NearbyReport) -> Result<String>;
}
