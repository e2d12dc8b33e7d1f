use food_desert_atlas::analyzers::aggregate::{GeoIdTable, aggregate};
use food_desert_atlas::analyzers::analyzer::{build_state_level, build_tract_detail};
use food_desert_atlas::analyzers::types::StateRow;
use food_desert_atlas::config::DEFAULT_STATE_FIPS;
use food_desert_atlas::fetch::BasicClient;
use food_desert_atlas::labeler::label_all;
use food_desert_atlas::output::dataset_csv_bytes;
use food_desert_atlas::parser::{read_geo_ids, read_tracts};
use std::collections::HashMap;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn keyed(rows: &[StateRow]) -> HashMap<(String, String, u8), StateRow> {
    rows.iter().map(|r| (r.key(), r.clone())).collect()
}

fn key(state: &str, region: &str, label: u8) -> (String, String, u8) {
    (state.to_string(), region.to_string(), label)
}

#[tokio::test]
async fn test_state_level_pipeline() {
    let client = BasicClient::new().unwrap();
    let geo_ids = fixture("geo_ids.csv");
    let dataset = build_state_level(&client, &fixture("census.csv"), geo_ids.to_str().unwrap())
        .await
        .expect("pipeline should succeed on fixtures");

    let rows = keyed(&dataset.rows);
    assert_eq!(rows.len(), 4);

    let mi_yes = &rows[&key("Michigan", "MidWest", 1)];
    assert_eq!(mi_yes.id, 26);
    assert_eq!(mi_yes.food_desert_totals, 3);
    assert_eq!(mi_yes.median_income, Some(45000.0));
    assert_eq!(mi_yes.walk, Some(4.0));
    assert_eq!(mi_yes.total_pop, 2700.0);
    assert_eq!(mi_yes.child_poverty, Some(25.0));

    let mi_no = &rows[&key("Michigan", "MidWest", 0)];
    assert_eq!(mi_no.food_desert_totals, 0);
    assert_eq!(mi_no.median_income, Some(70000.0));
    assert_eq!(mi_no.walk, Some(3.0));

    let oh_yes = &rows[&key("Ohio", "MidWest", 1)];
    assert_eq!(oh_yes.id, 39);
    assert_eq!(oh_yes.food_desert_totals, 1);
    assert_eq!(oh_yes.walk, None);

    for row in &dataset.rows {
        assert!(row.race_total() <= row.total_pop, "closure broken for {:?}", row.key());
    }

    assert!(!dataset.rows.iter().any(|r| r.state == "Puerto Rico"));
    assert_eq!(dataset.diagnostics.dropped_rows, 1);
    assert_eq!(dataset.diagnostics.dropped_states, vec!["Puerto Rico".to_string()]);
    assert_eq!(dataset.diagnostics.ungrouped_rows, 1);
}

#[test]
fn test_aggregate_twice_is_identical() {
    let census = std::fs::read(fixture("census.csv")).unwrap();
    let geo = std::fs::read(fixture("geo_ids.csv")).unwrap();

    let tracts = label_all(read_tracts(census.as_slice(), "census.csv").unwrap());
    let ids = GeoIdTable::new(read_geo_ids(geo.as_slice(), "geo_ids.csv").unwrap()).unwrap();

    let first = aggregate(&tracts, &ids);
    let second = aggregate(&tracts, &ids);
    assert_eq!(keyed(&first.rows), keyed(&second.rows));
    assert_eq!(first.diagnostics, second.diagnostics);
}

#[test]
fn test_state_level_csv_schema() {
    let census = std::fs::read(fixture("census.csv")).unwrap();
    let geo = std::fs::read(fixture("geo_ids.csv")).unwrap();
    let tracts = label_all(read_tracts(census.as_slice(), "census.csv").unwrap());
    let ids = GeoIdTable::new(read_geo_ids(geo.as_slice(), "geo_ids.csv").unwrap()).unwrap();

    let bytes = dataset_csv_bytes(&aggregate(&tracts, &ids)).unwrap();
    let mut rdr = csv::Reader::from_reader(bytes.as_slice());
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();

    for column in [
        "State",
        "id",
        "Region",
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
    ] {
        assert!(headers.iter().any(|h| h == column), "missing output column {column}");
    }
    assert_eq!(rdr.records().count(), 4);
}

#[tokio::test]
async fn test_tract_detail_pipeline() {
    let client = BasicClient::new().unwrap();
    let tracts = build_tract_detail(
        &client,
        &fixture("mi_atlas.csv"),
        &fixture("tracts.geojson"),
        DEFAULT_STATE_FIPS,
        None,
    )
    .await
    .expect("tract detail should build on fixtures");

    let ids: Vec<u64> = tracts.features.iter().map(|f| f.properties.census_tract).collect();
    assert_eq!(ids, vec![26001000100, 26161400200, 26001000200]);

    let labels: Vec<u8> = tracts
        .features
        .iter()
        .map(|f| f.properties.food_desert_label)
        .collect();
    assert_eq!(labels, vec![1, 1, 0]);
    assert_eq!(tracts.unmatched_boundaries, 1);
    assert_eq!(tracts.features[0].geometry["type"], "Polygon");
}

#[tokio::test]
async fn test_tract_detail_single_county() {
    let client = BasicClient::new().unwrap();
    let tracts = build_tract_detail(
        &client,
        &fixture("mi_atlas.csv"),
        &fixture("tracts.geojson"),
        DEFAULT_STATE_FIPS,
        Some("Washtenaw County"),
    )
    .await
    .expect("county filter should build on fixtures");

    assert_eq!(tracts.features.len(), 1);
    let feature = &tracts.features[0];
    assert_eq!(feature.properties.census_tract, 26161400200);
    assert_eq!(feature.properties.county.as_deref(), Some("Washtenaw County"));
    assert_eq!(feature.properties.food_desert_label, 1);
    assert_eq!(feature.properties.poverty_rate, Some(31.0));
}

#[tokio::test]
async fn test_overfull_row_does_not_fail_run() {
    let path = std::env::temp_dir().join("food_desert_atlas_it_overfull.csv");
    let original = std::fs::read_to_string(fixture("census.csv")).unwrap();
    // Race counts 1010 against a TotalPop of 1000.
    let overfull = original.replacen(",1000,20.0,15.0,8.0,50,10,800,", ",1000,20.0,15.0,8.0,50,10,830,", 1);
    assert_ne!(overfull, original);
    std::fs::write(&path, overfull).unwrap();

    let client = BasicClient::new().unwrap();
    let geo_ids = fixture("geo_ids.csv");
    let dataset = build_state_level(&client, &path, geo_ids.to_str().unwrap())
        .await
        .expect("race counts above TotalPop are reported, not fatal");

    assert_eq!(dataset.diagnostics.overfull_rows, 1);
    assert!(!dataset.rows.is_empty());

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_invalid_indicator_fails_run() {
    let path = std::env::temp_dir().join("food_desert_atlas_it_bad_indicator.csv");
    let original = std::fs::read_to_string(fixture("census.csv")).unwrap();
    std::fs::write(&path, original.replacen("MidWest,1,0,0,0", "MidWest,yes,0,0,0", 1)).unwrap();

    let client = BasicClient::new().unwrap();
    let geo_ids = fixture("geo_ids.csv");
    let err = build_state_level(&client, &path, geo_ids.to_str().unwrap())
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("LILATracts_1And10"), "{msg}");
    assert!(msg.contains("food_desert_atlas_it_bad_indicator.csv"), "{msg}");

    std::fs::remove_file(&path).unwrap();
}
