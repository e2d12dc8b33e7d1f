use crate::analyzers::aggregate::{GeoIdTable, aggregate};
use crate::analyzers::tracts::{filter_county, filter_state, join_tracts};
use crate::analyzers::types::{Dataset, TractDataset};
use crate::analyzers::writetos3::{dataset_key, write_json_to_s3};
use crate::config::OutputTarget;
use crate::fetch::{HttpClient, read_source};
use crate::labeler::label_all;
use crate::output::{dataset_json_bytes, encode, tracts_geojson_bytes, write_dataset, write_tracts};
use crate::parser::{read_atlas, read_boundaries, read_geo_ids, read_tracts};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{info, warn};

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Loads, labels and aggregates the census CSV into the state-level dataset.
#[tracing::instrument(skip(client, census), fields(census = %census.display()))]
pub async fn build_state_level<C: HttpClient>(
    client: &C,
    census: &Path,
    geo_ids_source: &str,
) -> Result<Dataset> {
    let census_name = display(census);
    let census_bytes = read_source(client, &census_name).await?;
    let tracts = read_tracts(census_bytes.as_slice(), &census_name)?;

    let geo_bytes = read_source(client, geo_ids_source).await?;
    let geo_ids = GeoIdTable::new(read_geo_ids(geo_bytes.as_slice(), geo_ids_source)?)?;

    let labeled = label_all(tracts);
    let food_deserts = labeled.iter().filter(|t| t.food_desert_label == 1).count();
    info!(
        tracts = labeled.len(),
        food_deserts,
        geo_ids = geo_ids.len(),
        "Tracts labeled"
    );

    let dataset = aggregate(&labeled, &geo_ids);
    info!(
        rows = dataset.rows.len(),
        dropped_rows = dataset.diagnostics.dropped_rows,
        "State-level dataset ready"
    );
    Ok(dataset)
}

/// Joins the labeled state atlas to its tract boundaries, optionally narrowed
/// to a single county (matched exactly, e.g. `Wayne County`).
#[tracing::instrument(
    skip(client, atlas, boundaries),
    fields(atlas = %atlas.display(), boundaries = %boundaries.display())
)]
pub async fn build_tract_detail<C: HttpClient>(
    client: &C,
    atlas: &Path,
    boundaries: &Path,
    statefp: u32,
    county: Option<&str>,
) -> Result<TractDataset> {
    let atlas_name = display(atlas);
    let atlas_bytes = read_source(client, &atlas_name).await?;
    let labeled = label_all(read_atlas(atlas_bytes.as_slice(), &atlas_name)?);

    let boundary_name = display(boundaries);
    let boundary_bytes = read_source(client, &boundary_name).await?;
    let state_boundaries = filter_state(read_boundaries(boundary_bytes.as_slice(), &boundary_name)?, statefp);
    info!(
        atlas_rows = labeled.len(),
        boundaries = state_boundaries.len(),
        statefp,
        "Tract inputs loaded"
    );

    let mut dataset = join_tracts(state_boundaries, &labeled)?;
    if let Some(county) = county {
        dataset = filter_county(dataset, county);
        if dataset.features.is_empty() {
            warn!(county, "No tracts matched the county filter");
        }
    }
    info!(
        features = dataset.features.len(),
        unmatched = dataset.unmatched_boundaries,
        "Tract detail dataset ready"
    );
    Ok(dataset)
}

/// Writes a labeled copy of `input` to `output`. Returns the number of rows.
#[tracing::instrument(skip(input, output), fields(input = %input.display(), output = %output.display()))]
pub fn label_file(input: &Path, output: &Path) -> Result<usize> {
    let input_name = display(input);
    let reader = File::open(input).with_context(|| format!("Failed to open {input_name}"))?;
    let writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );

    let rows = crate::parser::label_csv(reader, writer, &input_name)?;
    info!(rows, "Labeled CSV written");
    Ok(rows)
}

/// Writes the state-level dataset locally and, when a bucket is given, publishes it.
pub async fn publish_state_level(
    dataset: &Dataset,
    target: &OutputTarget,
    s3_bucket: Option<&str>,
) -> Result<()> {
    let path = write_dataset(dataset, target)?;
    info!(path = %path.display(), "State-level dataset written");

    if let Some(bucket) = s3_bucket {
        let s3 = s3_client().await;
        let body = encode(dataset_json_bytes(dataset)?, target.gzip)?;
        write_json_to_s3(&s3, bucket, &dataset_key("state_level.json", target.gzip), body, target.gzip).await?;
    }
    Ok(())
}

/// Writes the tract detail dataset locally and, when a bucket is given, publishes it.
pub async fn publish_tract_detail(
    tracts: &TractDataset,
    target: &OutputTarget,
    s3_bucket: Option<&str>,
    statefp: u32,
    county: Option<&str>,
) -> Result<()> {
    let path = write_tracts(tracts, target)?;
    info!(path = %path.display(), "Tract detail dataset written");

    if let Some(bucket) = s3_bucket {
        let s3 = s3_client().await;
        let body = encode(tracts_geojson_bytes(tracts)?, target.gzip)?;
        let key = dataset_key(&tracts_dataset_name(statefp, county), target.gzip);
        write_json_to_s3(&s3, bucket, &key, body, target.gzip).await?;
    }
    Ok(())
}

/// Published name of a tract detail dataset, e.g. `tracts_26_wayne_county.geojson`.
pub fn tracts_dataset_name(statefp: u32, county: Option<&str>) -> String {
    match county {
        Some(county) => {
            let slug: String = county
                .trim()
                .to_lowercase()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            format!("tracts_{statefp:02}_{slug}.geojson")
        }
        None => format!("tracts_{statefp:02}.geojson"),
    }
}

async fn s3_client() -> aws_sdk_s3::Client {
    let config = aws_config::load_from_env().await;
    aws_sdk_s3::Client::new(&config)
}
