//! Data types used by the aggregation pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::labeler::{Classify, Indicators};

/// Race/ethnicity population counts of one tract. Missing values are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceCounts {
    pub hispanic: Option<f64>,
    pub asian: Option<f64>,
    pub white: Option<f64>,
    pub black: Option<f64>,
    pub native: Option<f64>,
    pub pacific: Option<f64>,
}

impl RaceCounts {
    /// Sum of the counts that are present.
    pub fn present_total(&self) -> f64 {
        [
            self.hispanic,
            self.asian,
            self.white,
            self.black,
            self.native,
            self.pacific,
        ]
        .iter()
        .flatten()
        .sum()
    }
}

/// One row of the combined census/economic CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TractRecord {
    pub census_tract: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub region: Option<String>,
    pub indicators: Indicators,
    pub median_income: Option<f64>,
    pub walk: Option<f64>,
    pub total_pop: Option<f64>,
    pub child_poverty: Option<f64>,
    pub service: Option<f64>,
    pub construction: Option<f64>,
    pub race: RaceCounts,
}

impl TractRecord {
    /// True when the present race counts add up to more than `TotalPop`.
    pub fn exceeds_population(&self) -> bool {
        self.total_pop
            .is_some_and(|total_pop| self.race.present_total() > total_pop)
    }
}

impl Classify for TractRecord {
    fn indicators(&self) -> &Indicators {
        &self.indicators
    }
}

/// One row of the Michigan food-access atlas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtlasTract {
    pub census_tract: u64,
    pub county: Option<String>,
    pub indicators: Indicators,
    pub tract_snap: Option<f64>,
    pub tract_seniors: Option<f64>,
    pub poverty_rate: Option<f64>,
}

impl Classify for AtlasTract {
    fn indicators(&self) -> &Indicators {
        &self.indicators
    }
}

/// Maps a state name to the numeric id used by the boundary topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoIdentifier {
    pub state: String,
    pub id: u32,
}

/// One (State, region, food_desert_label) group before the geographic join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateAggregate {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Region")]
    pub region: String,
    pub food_desert_label: u8,
    #[serde(rename = "FoodDesert_Totals")]
    pub food_desert_totals: u64,
    /// Rows that fell into this group.
    #[serde(skip)]
    pub tract_count: usize,
    #[serde(rename = "MedianIncome")]
    pub median_income: Option<f64>,
    #[serde(rename = "Walk")]
    pub walk: Option<f64>,
    #[serde(rename = "TotalPop")]
    pub total_pop: f64,
    #[serde(rename = "ChildPoverty")]
    pub child_poverty: Option<f64>,
    #[serde(rename = "Service")]
    pub service: Option<f64>,
    #[serde(rename = "Construction")]
    pub construction: Option<f64>,
    #[serde(rename = "Hispanic")]
    pub hispanic: f64,
    #[serde(rename = "Asian")]
    pub asian: f64,
    #[serde(rename = "White")]
    pub white: f64,
    #[serde(rename = "Black")]
    pub black: f64,
    #[serde(rename = "Native")]
    pub native: f64,
    #[serde(rename = "Pacific")]
    pub pacific: f64,
}

impl StateAggregate {
    pub fn race_total(&self) -> f64 {
        self.hispanic + self.asian + self.white + self.black + self.native + self.pacific
    }
}

/// A row of the final joined dataset handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRow {
    #[serde(rename = "State")]
    pub state: String,
    pub id: u32,
    #[serde(rename = "Region")]
    pub region: String,
    pub food_desert_label: u8,
    #[serde(rename = "FoodDesert_Totals")]
    pub food_desert_totals: u64,
    #[serde(rename = "MedianIncome")]
    pub median_income: Option<f64>,
    #[serde(rename = "Walk")]
    pub walk: Option<f64>,
    #[serde(rename = "TotalPop")]
    pub total_pop: f64,
    #[serde(rename = "ChildPoverty")]
    pub child_poverty: Option<f64>,
    #[serde(rename = "Service")]
    pub service: Option<f64>,
    #[serde(rename = "Construction")]
    pub construction: Option<f64>,
    #[serde(rename = "Hispanic")]
    pub hispanic: f64,
    #[serde(rename = "Asian")]
    pub asian: f64,
    #[serde(rename = "White")]
    pub white: f64,
    #[serde(rename = "Black")]
    pub black: f64,
    #[serde(rename = "Native")]
    pub native: f64,
    #[serde(rename = "Pacific")]
    pub pacific: f64,
}

impl StateRow {
    pub fn from_aggregate(id: u32, agg: StateAggregate) -> Self {
        Self {
            state: agg.state,
            id,
            region: agg.region,
            food_desert_label: agg.food_desert_label,
            food_desert_totals: agg.food_desert_totals,
            median_income: agg.median_income,
            walk: agg.walk,
            total_pop: agg.total_pop,
            child_poverty: agg.child_poverty,
            service: agg.service,
            construction: agg.construction,
            hispanic: agg.hispanic,
            asian: agg.asian,
            white: agg.white,
            black: agg.black,
            native: agg.native,
            pacific: agg.pacific,
        }
    }

    pub fn race_total(&self) -> f64 {
        self.hispanic + self.asian + self.white + self.black + self.native + self.pacific
    }

    /// Key used to compare datasets as unordered record sets.
    pub fn key(&self) -> (String, String, u8) {
        (self.state.clone(), self.region.clone(), self.food_desert_label)
    }
}

/// Non-fatal data loss observed during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Rows excluded from grouping because State or region was missing.
    pub ungrouped_rows: usize,
    /// Aggregate rows dropped by the inner join.
    pub dropped_rows: usize,
    /// Distinct state names with no geographic identifier.
    pub dropped_states: Vec<String>,
    /// Source rows whose race counts exceed their own TotalPop.
    pub overfull_rows: usize,
    /// Groups whose summed race counts exceed their summed TotalPop.
    pub closure_violations: usize,
}

/// The state-level dataset produced by one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub rows: Vec<StateRow>,
    pub diagnostics: Diagnostics,
}

/// JSON envelope for a published dataset.
#[derive(Serialize)]
pub struct DatasetEnvelope<'a> {
    pub(crate) schema_version: u8,
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) rows: &'a [StateRow],
    pub(crate) diagnostics: &'a Diagnostics,
}

impl<'a> DatasetEnvelope<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            schema_version: 1,
            generated_at: Utc::now(),
            rows: &dataset.rows,
            diagnostics: &dataset.diagnostics,
        }
    }
}

/// A census tract boundary; geometry is carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TractBoundary {
    pub geoid: u64,
    pub statefp: u32,
    pub geometry: serde_json::Value,
}

/// Properties of one feature in the tract detail dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TractProperties {
    #[serde(rename = "CensusTract")]
    pub census_tract: u64,
    #[serde(rename = "TractSNAP")]
    pub tract_snap: Option<f64>,
    pub food_desert_label: u8,
    #[serde(rename = "County")]
    pub county: Option<String>,
    #[serde(rename = "TractSeniors")]
    pub tract_seniors: Option<f64>,
    #[serde(rename = "PovertyRate")]
    pub poverty_rate: Option<f64>,
}

/// A GeoJSON feature of the tract detail dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TractFeature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: serde_json::Value,
    pub properties: TractProperties,
}

/// Tract-level detail for a single state, serialized as a GeoJSON FeatureCollection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TractDataset {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<TractFeature>,
    /// Boundaries with no atlas row.
    #[serde(skip)]
    pub unmatched_boundaries: usize,
}
