//! Loaders for the census CSV, the food-access atlas, the geographic
//! identifier table and the tract boundary GeoJSON.
//!
//! Required columns are checked up front. Indicator cells are strict, numeric
//! attributes are lenient: anything blank or unparseable becomes `None`.
//! Population consistency is not checked here; the aggregator reports it.

use std::collections::HashMap;
use std::io::{Read, Write};

use csv::StringRecord;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::analyzers::types::{AtlasTract, GeoIdentifier, RaceCounts, TractBoundary, TractRecord};
use crate::error::{PipelineError, PipelineResult};
use crate::labeler::{INDICATOR_COLUMNS, Indicators, LABEL_COLUMN, label};

pub const RACE_COLUMNS: [&str; 6] = ["Hispanic", "Asian", "White", "Black", "Native", "Pacific"];

/// Columns the combined census CSV must carry, besides the indicators.
pub const CENSUS_COLUMNS: [&str; 8] = [
    "State",
    "region",
    "MedianIncome",
    "Walk",
    "TotalPop",
    "ChildPoverty",
    "Service",
    "Construction",
];

/// Columns the food-access atlas must carry, besides the indicators.
pub const ATLAS_COLUMNS: [&str; 5] = ["CensusTract", "County", "TractSNAP", "TractSeniors", "PovertyRate"];

/// Header lookup for one CSV source.
struct Columns {
    source_name: String,
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord, source_name: &str) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();
        Self {
            source_name: source_name.to_string(),
            index,
        }
    }

    fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn require<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> PipelineResult<()> {
        for name in names {
            if !self.has(name) {
                return Err(PipelineError::MissingColumn {
                    source_name: self.source_name.clone(),
                    column: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn raw<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.index
            .get(name)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    }

    fn text(&self, record: &StringRecord, name: &str) -> Option<String> {
        let value = self.raw(record, name).trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    fn numeric(&self, record: &StringRecord, name: &str) -> Option<f64> {
        parse_numeric(self.raw(record, name))
    }

    fn indicators(&self, record: &StringRecord, line: u64) -> PipelineResult<Indicators> {
        let raw = INDICATOR_COLUMNS.map(|column| self.raw(record, column));
        Indicators::parse(raw).map_err(|e| e.at(&self.source_name, line))
    }

    fn invalid(&self, line: u64, column: &str, value: &str) -> PipelineError {
        PipelineError::InvalidValue {
            source_name: self.source_name.clone(),
            line,
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

/// Lenient numeric parse: blank, unparseable and non-finite values are missing.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses an integral identifier written either as `26001000100` or `26001000100.0`.
fn parse_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as u64)
    })
}

fn line_of(record: &StringRecord, idx: usize) -> u64 {
    record
        .position()
        .map(|p| p.line())
        .unwrap_or(idx as u64 + 2)
}

fn open_csv<R: Read>(reader: R, source_name: &str) -> PipelineResult<(csv::Reader<R>, Columns)> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let headers = rdr.headers().map_err(|source| PipelineError::Csv {
        source_name: source_name.to_string(),
        source,
    })?;
    let columns = Columns::new(headers, source_name);
    Ok((rdr, columns))
}

fn csv_err(source_name: &str) -> impl Fn(csv::Error) -> PipelineError + '_ {
    move |source| PipelineError::Csv {
        source_name: source_name.to_string(),
        source,
    }
}

/// Reads the combined census/economic CSV into tract records.
pub fn read_tracts<R: Read>(reader: R, source_name: &str) -> PipelineResult<Vec<TractRecord>> {
    let (mut rdr, columns) = open_csv(reader, source_name)?;
    columns.require(CENSUS_COLUMNS)?;
    columns.require(INDICATOR_COLUMNS)?;
    columns.require(RACE_COLUMNS)?;

    let mut tracts = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_err(source_name))?;
        let line = line_of(&record, idx);

        tracts.push(TractRecord {
            census_tract: columns.text(&record, "CensusTract"),
            state: columns.text(&record, "State"),
            county: columns.text(&record, "County"),
            region: columns.text(&record, "region"),
            indicators: columns.indicators(&record, line)?,
            median_income: columns.numeric(&record, "MedianIncome"),
            walk: columns.numeric(&record, "Walk"),
            total_pop: columns.numeric(&record, "TotalPop"),
            child_poverty: columns.numeric(&record, "ChildPoverty"),
            service: columns.numeric(&record, "Service"),
            construction: columns.numeric(&record, "Construction"),
            race: RaceCounts {
                hispanic: columns.numeric(&record, "Hispanic"),
                asian: columns.numeric(&record, "Asian"),
                white: columns.numeric(&record, "White"),
                black: columns.numeric(&record, "Black"),
                native: columns.numeric(&record, "Native"),
                pacific: columns.numeric(&record, "Pacific"),
            },
        });
    }

    debug!(source = source_name, rows = tracts.len(), "Census tracts loaded");
    Ok(tracts)
}

/// Reads the state food-access atlas.
pub fn read_atlas<R: Read>(reader: R, source_name: &str) -> PipelineResult<Vec<AtlasTract>> {
    let (mut rdr, columns) = open_csv(reader, source_name)?;
    columns.require(ATLAS_COLUMNS)?;
    columns.require(INDICATOR_COLUMNS)?;

    let mut tracts = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_err(source_name))?;
        let line = line_of(&record, idx);

        let raw_tract = columns.raw(&record, "CensusTract");
        let census_tract =
            parse_id(raw_tract).ok_or_else(|| columns.invalid(line, "CensusTract", raw_tract))?;

        tracts.push(AtlasTract {
            census_tract,
            county: columns.text(&record, "County"),
            indicators: columns.indicators(&record, line)?,
            tract_snap: columns.numeric(&record, "TractSNAP"),
            tract_seniors: columns.numeric(&record, "TractSeniors"),
            poverty_rate: columns.numeric(&record, "PovertyRate"),
        });
    }

    debug!(source = source_name, rows = tracts.len(), "Atlas tracts loaded");
    Ok(tracts)
}

/// Reads the state name to numeric id reference table.
///
/// Accepts either a `state` or `State` name column; other columns are ignored.
pub fn read_geo_ids<R: Read>(reader: R, source_name: &str) -> PipelineResult<Vec<GeoIdentifier>> {
    let (mut rdr, columns) = open_csv(reader, source_name)?;
    let name_column = if columns.has("State") { "State" } else { "state" };
    columns.require([name_column, "id"])?;

    let mut ids = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_err(source_name))?;
        let line = line_of(&record, idx);

        let state = columns
            .text(&record, name_column)
            .ok_or_else(|| columns.invalid(line, name_column, ""))?;
        let raw_id = columns.raw(&record, "id");
        let id = parse_id(raw_id)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| columns.invalid(line, "id", raw_id))?;

        ids.push(GeoIdentifier { state, id });
    }

    Ok(ids)
}

/// Copies a CSV, appending (or overwriting) the `food_desert_label` column.
///
/// Returns the number of rows written.
pub fn label_csv<R: Read, W: Write>(reader: R, writer: W, source_name: &str) -> PipelineResult<usize> {
    let (mut rdr, columns) = open_csv(reader, source_name)?;
    columns.require(INDICATOR_COLUMNS)?;

    let existing = columns.index.get(LABEL_COLUMN).copied();
    let mut headers = rdr.headers().map_err(csv_err(source_name))?.clone();
    if existing.is_none() {
        headers.push_field(LABEL_COLUMN);
    }

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&headers).map_err(csv_err(source_name))?;

    let mut rows = 0;
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_err(source_name))?;
        let line = line_of(&record, idx);
        let value = label(&columns.indicators(&record, line)?).to_string();

        let out: StringRecord = match existing {
            Some(pos) => record
                .iter()
                .enumerate()
                .map(|(i, field)| if i == pos { value.as_str() } else { field })
                .collect(),
            None => {
                let mut out = record.clone();
                out.push_field(&value);
                out
            }
        };
        wtr.write_record(&out).map_err(csv_err(source_name))?;
        rows += 1;
    }

    wtr.flush().map_err(|source| PipelineError::Io {
        source_name: source_name.to_string(),
        source,
    })?;
    Ok(rows)
}

#[derive(Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Value,
}

/// Reads a numeric property that may be stored as a number or a string.
fn numeric_property(properties: &Map<String, Value>, name: &str) -> Option<u64> {
    match properties.get(name)? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|v| *v >= 0.0 && v.fract() == 0.0)
                .map(|v| v as u64)
        }),
        Value::String(s) => parse_id(s),
        _ => None,
    }
}

/// Reads a tract boundary FeatureCollection keyed by `GEOID` / `STATEFP`.
pub fn read_boundaries<R: Read>(reader: R, source_name: &str) -> PipelineResult<Vec<TractBoundary>> {
    let collection: RawCollection =
        serde_json::from_reader(reader).map_err(|source| PipelineError::Json {
            source_name: source_name.to_string(),
            source,
        })?;

    let empty = Map::new();
    let mut boundaries = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.into_iter().enumerate() {
        let properties = feature.properties.as_ref().unwrap_or(&empty);
        let missing = |property: &str| PipelineError::InvalidFeature {
            index,
            property: property.to_string(),
        };

        let geoid = numeric_property(properties, "GEOID").ok_or_else(|| missing("GEOID"))?;
        let statefp = numeric_property(properties, "STATEFP")
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| missing("STATEFP"))?;

        boundaries.push(TractBoundary {
            geoid,
            statefp,
            geometry: feature.geometry,
        });
    }

    debug!(source = source_name, features = boundaries.len(), "Tract boundaries loaded");
    Ok(boundaries)
}
