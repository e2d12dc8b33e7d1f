//! Tract-level detail for one state: labeled atlas rows joined to their
//! boundary geometry.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::analyzers::types::{AtlasTract, TractBoundary, TractDataset, TractFeature, TractProperties};
use crate::error::{PipelineError, PipelineResult};
use crate::labeler::Labeled;

/// Keeps only boundaries in the given state.
pub fn filter_state(boundaries: Vec<TractBoundary>, statefp: u32) -> Vec<TractBoundary> {
    boundaries.into_iter().filter(|b| b.statefp == statefp).collect()
}

/// Keeps only features whose atlas `County` equals `county`.
pub fn filter_county(dataset: TractDataset, county: &str) -> TractDataset {
    let before = dataset.features.len();
    let features: Vec<TractFeature> = dataset
        .features
        .into_iter()
        .filter(|f| f.properties.county.as_deref() == Some(county))
        .collect();
    debug!(county, kept = features.len(), before, "Tract detail filtered by county");

    TractDataset { features, ..dataset }
}

/// Inner-joins boundaries to labeled atlas rows on `GEOID == CensusTract`,
/// keeping boundary order.
pub fn join_tracts(
    boundaries: Vec<TractBoundary>,
    atlas: &[Labeled<AtlasTract>],
) -> PipelineResult<TractDataset> {
    let mut by_tract: HashMap<u64, &Labeled<AtlasTract>> = HashMap::with_capacity(atlas.len());
    for row in atlas {
        let tract = row.record.census_tract;
        if by_tract.insert(tract, row).is_some() {
            return Err(PipelineError::DuplicateTract { tract });
        }
    }

    let mut unmatched_boundaries = 0;
    let mut features = Vec::new();
    for boundary in boundaries {
        let Some(row) = by_tract.get(&boundary.geoid) else {
            unmatched_boundaries += 1;
            continue;
        };

        features.push(TractFeature {
            kind: "Feature",
            geometry: boundary.geometry,
            properties: TractProperties {
                census_tract: row.record.census_tract,
                tract_snap: row.record.tract_snap,
                food_desert_label: row.food_desert_label,
                county: row.record.county.clone(),
                tract_seniors: row.record.tract_seniors,
                poverty_rate: row.record.poverty_rate,
            },
        });
    }

    if unmatched_boundaries > 0 {
        warn!(unmatched_boundaries, "Boundaries without an atlas row dropped");
    }
    debug!(features = features.len(), "Tract detail dataset built");

    Ok(TractDataset {
        kind: "FeatureCollection",
        features,
        unmatched_boundaries,
    })
}
