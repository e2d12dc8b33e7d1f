use crate::analyzers::types::{
    Dataset, Diagnostics, GeoIdentifier, StateAggregate, StateRow, TractRecord,
};
use crate::analyzers::utility::NullSkipping;
use crate::error::{PipelineError, PipelineResult};
use crate::labeler::Labeled;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// State name to boundary id lookup. Names are unique.
#[derive(Debug, Clone, Default)]
pub struct GeoIdTable {
    ids: HashMap<String, u32>,
}

impl GeoIdTable {
    pub fn new(rows: Vec<GeoIdentifier>) -> PipelineResult<Self> {
        let mut ids = HashMap::with_capacity(rows.len());
        for row in rows {
            if ids.insert(row.state.clone(), row.id).is_some() {
                return Err(PipelineError::DuplicateGeoId { name: row.state });
            }
        }
        Ok(Self { ids })
    }

    pub fn get(&self, state: &str) -> Option<u32> {
        self.ids.get(state).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

type GroupKey = (String, String, u8);

#[derive(Default)]
struct GroupAccumulator {
    rows: usize,
    label_sum: u64,
    median_income: NullSkipping,
    walk: NullSkipping,
    total_pop: NullSkipping,
    child_poverty: NullSkipping,
    service: NullSkipping,
    construction: NullSkipping,
    hispanic: NullSkipping,
    asian: NullSkipping,
    white: NullSkipping,
    black: NullSkipping,
    native: NullSkipping,
    pacific: NullSkipping,
}

impl GroupAccumulator {
    fn push(&mut self, tract: &Labeled<TractRecord>) {
        let r = &tract.record;
        self.rows += 1;
        self.label_sum += u64::from(tract.food_desert_label);
        self.median_income.push(r.median_income);
        self.walk.push(r.walk);
        self.total_pop.push(r.total_pop);
        self.child_poverty.push(r.child_poverty);
        self.service.push(r.service);
        self.construction.push(r.construction);
        self.hispanic.push(r.race.hispanic);
        self.asian.push(r.race.asian);
        self.white.push(r.race.white);
        self.black.push(r.race.black);
        self.native.push(r.race.native);
        self.pacific.push(r.race.pacific);
    }

    fn finish(self, (state, region, food_desert_label): GroupKey) -> StateAggregate {
        StateAggregate {
            state,
            region,
            food_desert_label,
            // Sum of the constant label, not a row count: 0 for label=0 groups.
            food_desert_totals: self.label_sum,
            tract_count: self.rows,
            median_income: self.median_income.median(),
            walk: self.walk.mean(),
            total_pop: self.total_pop.sum(),
            child_poverty: self.child_poverty.mean(),
            service: self.service.mean(),
            construction: self.construction.mean(),
            hispanic: self.hispanic.sum(),
            asian: self.asian.sum(),
            white: self.white.sum(),
            black: self.black.sum(),
            native: self.native.sum(),
            pacific: self.pacific.sum(),
        }
    }
}

/// Groups labeled tracts by (State, region, food_desert_label) and reduces each group.
///
/// Rows with no State or region are left out, and their count is returned
/// alongside the groups.
pub fn group_by_state(tracts: &[Labeled<TractRecord>]) -> (Vec<StateAggregate>, usize) {
    let mut groups: BTreeMap<GroupKey, GroupAccumulator> = BTreeMap::new();
    let mut ungrouped = 0;

    for tract in tracts {
        let (Some(state), Some(region)) = (&tract.record.state, &tract.record.region) else {
            ungrouped += 1;
            continue;
        };

        groups
            .entry((state.clone(), region.clone(), tract.food_desert_label))
            .or_default()
            .push(tract);
    }

    if ungrouped > 0 {
        warn!(ungrouped, "Rows without State or region left out of grouping");
    }

    let aggregates = groups
        .into_iter()
        .map(|(key, acc)| acc.finish(key))
        .collect();
    (aggregates, ungrouped)
}

/// Inner-joins aggregates against the identifier table on state name.
///
/// Unmatched aggregates are dropped and reported, never raised.
pub fn join_geo_ids(aggregates: Vec<StateAggregate>, geo_ids: &GeoIdTable) -> (Vec<StateRow>, Diagnostics) {
    let mut diagnostics = Diagnostics::default();
    let mut dropped_states = BTreeSet::new();
    let mut rows = Vec::with_capacity(aggregates.len());

    for agg in aggregates {
        match geo_ids.get(&agg.state) {
            Some(id) => rows.push(StateRow::from_aggregate(id, agg)),
            None => {
                diagnostics.dropped_rows += 1;
                dropped_states.insert(agg.state);
            }
        }
    }

    diagnostics.dropped_states = dropped_states.into_iter().collect();
    if diagnostics.dropped_rows > 0 {
        warn!(
            dropped_rows = diagnostics.dropped_rows,
            dropped_states = diagnostics.dropped_states.len(),
            states = ?diagnostics.dropped_states,
            "Aggregates without a geographic identifier dropped"
        );
    }

    (rows, diagnostics)
}

/// Builds the state-level dataset from labeled tracts.
pub fn aggregate(tracts: &[Labeled<TractRecord>], geo_ids: &GeoIdTable) -> Dataset {
    let (aggregates, ungrouped_rows) = group_by_state(tracts);

    let overfull_rows = tracts
        .iter()
        .filter(|t| t.record.exceeds_population())
        .count();
    if overfull_rows > 0 {
        warn!(overfull_rows, "Rows whose race counts exceed their TotalPop");
    }

    let closure_violations = aggregates
        .iter()
        .filter(|a| a.race_total() > a.total_pop)
        .count();
    if closure_violations > 0 {
        warn!(closure_violations, "Groups whose race counts exceed TotalPop");
    }

    let (rows, mut diagnostics) = join_geo_ids(aggregates, geo_ids);
    diagnostics.ungrouped_rows = ungrouped_rows;
    diagnostics.overfull_rows = overfull_rows;
    diagnostics.closure_violations = closure_violations;

    debug!(rows = rows.len(), "State-level dataset built");
    Dataset { rows, diagnostics }
}
