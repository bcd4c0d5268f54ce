use crate::domain::model::{EnrichmentFailure, Performance, RankedFacility, RelatedPerformance};
use crate::domain::ports::RelatedListings;
use crate::utils::error::{Result, ScoutError};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    pub date: NaiveDate,
    /// `rows` sent with every listing request.
    pub rows: usize,
    /// How many of the returned performances to keep per facility.
    pub keep: usize,
    pub concurrency: usize,
}

/// Result of one per-facility listing task.
#[derive(Debug)]
pub struct EnrichmentOutcome {
    pub facility_id: String,
    pub facility_name: String,
    pub result: Result<Vec<Performance>>,
}

/// Fetch related listings for every ranked facility, one task per facility.
///
/// Outcomes are returned in completion order. A failing or panicking task
/// only produces a failed outcome for its own facility.
pub async fn enrich_related<L: RelatedListings>(
    source: Arc<L>,
    facilities: &[RankedFacility],
    options: EnrichOptions,
) -> Vec<EnrichmentOutcome> {
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut owners = HashMap::new();

    for ranked in facilities {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        let facility_id = ranked.facility.id.clone();
        let facility_name = ranked.facility.name.clone();
        let task_name = facility_name.clone();

        let handle = tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.map_err(|e| ScoutError::ProcessingError {
                message: format!("enrichment semaphore closed: {}", e),
            })?;
            let mut performances = source
                .related_performances(&task_name, options.date, options.rows)
                .await?;
            performances.truncate(options.keep);
            Ok::<_, ScoutError>(performances)
        });
        owners.insert(handle.id(), (facility_id, facility_name));
    }

    let mut outcomes = Vec::with_capacity(owners.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        let (task_id, result) = match joined {
            Ok((id, result)) => (id, result),
            Err(join_error) => {
                let id = join_error.id();
                let message = format!("enrichment task failed: {}", join_error);
                (id, Err(ScoutError::ProcessingError { message }))
            }
        };

        let Some((facility_id, facility_name)) = owners.remove(&task_id) else {
            continue;
        };

        match &result {
            Ok(found) => tracing::debug!("📡 {}: {} related performances", facility_name, found.len()),
            Err(e) => tracing::warn!("⚠️ Related listing for {} failed: {}", facility_name, e),
        }

        outcomes.push(EnrichmentOutcome {
            facility_id,
            facility_name,
            result,
        });
    }

    outcomes
}

/// Split outcomes into appended performances and per-facility failures,
/// keeping completion order.
pub fn partition_outcomes(
    outcomes: Vec<EnrichmentOutcome>,
) -> (Vec<RelatedPerformance>, Vec<EnrichmentFailure>) {
    let mut related = Vec::new();
    let mut failures = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(performances) => related.extend(performances.into_iter().map(|performance| {
                RelatedPerformance {
                    facility_id: outcome.facility_id.clone(),
                    performance,
                }
            })),
            Err(e) => failures.push(EnrichmentFailure {
                facility_id: outcome.facility_id,
                facility_name: outcome.facility_name,
                reason: e.to_string(),
            }),
        }
    }

    (related, failures)
}
