use crate::core::geo::distance_km;
use crate::domain::model::{Coordinate, Facility, RankedFacility};

/// Ranks facilities by great-circle distance from an origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestFacilityRanker;

/// Ranking output plus the number of facilities left out for lacking a
/// usable coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub facilities: Vec<RankedFacility>,
    pub skipped: usize,
}

impl NearestFacilityRanker {
    pub fn new() -> Self {
        Self
    }

    /// The `k` nearest facilities to `origin`, nearest first.
    pub fn rank(&self, origin: Coordinate, facilities: &[Facility], k: usize) -> Vec<RankedFacility> {
        self.rank_with_stats(origin, facilities, k).facilities
    }

    pub fn rank_with_stats(&self, origin: Coordinate, facilities: &[Facility], k: usize) -> Ranking {
        let mut skipped = 0;
        let mut ranked: Vec<RankedFacility> = facilities
            .iter()
            .filter_map(|facility| match facility.coordinate() {
                Some(position) => Some(RankedFacility {
                    facility: facility.clone(),
                    distance_km: distance_km(origin, position),
                }),
                None => {
                    tracing::debug!(
                        "Skipping facility {} ({}): no usable coordinate",
                        facility.id,
                        facility.name
                    );
                    skipped += 1;
                    None
                }
            })
            .collect();

        // sort_by 是穩定排序，距離相同時保留輸入順序
        ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        ranked.truncate(k);

        Ranking {
            facilities: ranked,
            skipped,
        }
    }
}
