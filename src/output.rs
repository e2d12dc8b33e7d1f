//! Output formatting and persistence for the produced datasets.
//!
//! Supports pretty-printing, CSV and JSON serialization, and optional gzip.

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, info};

use crate::analyzers::types::{Dataset, DatasetEnvelope, TractDataset};
use crate::config::{OutputFormat, OutputTarget};
use csv::WriterBuilder;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Column order of the state-level CSV.
pub const STATE_LEVEL_COLUMNS: [&str; 17] = [
    "State",
    "id",
    "Region",
    "food_desert_label",
    "FoodDesert_Totals",
    "MedianIncome",
    "Walk",
    "TotalPop",
    "ChildPoverty",
    "Service",
    "Construction",
    "Hispanic",
    "Asian",
    "White",
    "Black",
    "Native",
    "Pacific",
];

/// Logs a dataset using Rust's debug pretty-print format.
pub fn print_pretty(dataset: &Dataset) {
    debug!("{:#?}", dataset);
}

/// Logs the run diagnostics as JSON.
pub fn print_diagnostics(dataset: &Dataset) -> Result<()> {
    info!("{}", serde_json::to_string(&dataset.diagnostics)?);
    Ok(())
}

/// Serializes the state-level rows as CSV. The header is written even when
/// there are no rows.
pub fn dataset_csv_bytes(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(STATE_LEVEL_COLUMNS)?;
    for row in &dataset.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV buffer: {}", e.error()))
}

/// Serializes the state-level dataset as a pretty JSON envelope.
pub fn dataset_json_bytes(dataset: &Dataset) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&DatasetEnvelope::new(dataset))?)
}

/// Serializes the tract detail dataset as GeoJSON.
pub fn tracts_geojson_bytes(tracts: &TractDataset) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(tracts)?)
}

/// Gzip-compresses `bytes` when asked to, otherwise returns them unchanged.
pub fn encode(bytes: Vec<u8>, gzip: bool) -> Result<Vec<u8>> {
    if !gzip {
        return Ok(bytes);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&bytes)?;
    Ok(encoder.finish()?)
}

fn write_file(target: &OutputTarget, bytes: Vec<u8>) -> Result<PathBuf> {
    let path = target.resolved_path();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let body = encode(bytes, target.gzip)?;
    fs::write(&path, &body).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), bytes = body.len(), "Output written");
    Ok(path)
}

/// Writes the state-level dataset in the target's format. Returns the path written.
pub fn write_dataset(dataset: &Dataset, target: &OutputTarget) -> Result<PathBuf> {
    let bytes = match target.format {
        OutputFormat::Csv => dataset_csv_bytes(dataset)?,
        OutputFormat::Json => dataset_json_bytes(dataset)?,
    };
    write_file(target, bytes)
}

/// Writes the tract detail dataset as GeoJSON regardless of the target format.
pub fn write_tracts(tracts: &TractDataset, target: &OutputTarget) -> Result<PathBuf> {
    write_file(target, tracts_geojson_bytes(tracts)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{Diagnostics, StateRow};
    use flate2::read::GzDecoder;
    use std::env;
    use std::io::Read;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn sample_dataset() -> Dataset {
        Dataset {
            rows: vec![StateRow {
                state: "Michigan".to_string(),
                id: 26,
                region: "MidWest".to_string(),
                food_desert_label: 1,
                food_desert_totals: 2,
                median_income: Some(45000.0),
                walk: None,
                total_pop: 200.0,
                child_poverty: Some(12.5),
                service: Some(10.0),
                construction: Some(5.0),
                hispanic: 10.0,
                asian: 5.0,
                white: 100.0,
                black: 50.0,
                native: 1.0,
                pacific: 0.0,
            }],
            diagnostics: Diagnostics {
                dropped_rows: 1,
                dropped_states: vec!["Atlantis".to_string()],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&Dataset::default());
    }

    #[test]
    fn test_csv_header_and_row() {
        let text = String::from_utf8(dataset_csv_bytes(&sample_dataset()).unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], STATE_LEVEL_COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "Michigan,26,MidWest,1,2,45000.0,,200.0,12.5,10.0,5.0,10.0,5.0,100.0,50.0,1.0,0.0"
        );
    }

    #[test]
    fn test_csv_header_written_for_empty_dataset() {
        let text = String::from_utf8(dataset_csv_bytes(&Dataset::default()).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_json_envelope_carries_diagnostics() {
        let bytes = dataset_json_bytes(&sample_dataset()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["schema_version"], 1);
        assert!(value["generated_at"].is_string());
        assert_eq!(value["rows"][0]["FoodDesert_Totals"], 2);
        assert!(value["rows"][0]["Walk"].is_null());
        assert_eq!(value["diagnostics"]["dropped_rows"], 1);
        assert_eq!(value["diagnostics"]["dropped_states"][0], "Atlantis");
    }

    #[test]
    fn test_write_dataset_gzip() {
        let target = OutputTarget {
            path: temp_path("food_desert_atlas_test_state_level.csv"),
            format: OutputFormat::Csv,
            gzip: true,
        };
        let path = write_dataset(&sample_dataset(), &target).unwrap();
        assert!(path.to_string_lossy().ends_with(".csv.gz"));

        let mut decoded = String::new();
        GzDecoder::new(fs::File::open(&path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert!(decoded.starts_with("State,id,Region"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_dataset_json_plain() {
        let target = OutputTarget {
            path: temp_path("food_desert_atlas_test_state_level.json"),
            format: OutputFormat::Json,
            gzip: false,
        };
        let path = write_dataset(&sample_dataset(), &target).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Michigan\""));

        fs::remove_file(&path).unwrap();
    }
}
