//! Input locations and output settings for a pipeline run.
//!
//! Values are built once from the CLI (with `.env` / environment fallbacks)
//! and passed by value into the pipeline; nothing here is global.

use std::path::{Path, PathBuf};

use clap::ValueEnum;

pub const CENSUS_FILE_NAME: &str = "ERSAtlas_CensusData.csv";
pub const FOOD_ATLAS_FILE_NAME: &str = "MI_food_atlas2019.csv";
pub const TRACT_BOUNDARY_FILE_NAME: &str = "cb_2019_us_tract_500k.geojson";

/// State name to topology id table published with vega-datasets.
pub const DEFAULT_GEO_IDS_SOURCE: &str =
    "https://cdn.jsdelivr.net/npm/vega-datasets@v1.29.0/data/population_engineers_hurricanes.csv";

/// FIPS code of Michigan, the state with tract-level detail.
pub const DEFAULT_STATE_FIPS: u32 = 26;

/// Locations of the static input files under a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub census: PathBuf,
    pub food_atlas: PathBuf,
    pub tract_boundaries: PathBuf,
}

impl DataPaths {
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            census: dir.join(CENSUS_FILE_NAME),
            food_atlas: dir.join(FOOD_ATLAS_FILE_NAME),
            tract_boundaries: dir.join(TRACT_BOUNDARY_FILE_NAME),
        }
    }

    /// Replaces any path given explicitly on the command line.
    pub fn with_overrides(
        mut self,
        census: Option<PathBuf>,
        food_atlas: Option<PathBuf>,
        tract_boundaries: Option<PathBuf>,
    ) -> Self {
        if let Some(p) = census {
            self.census = p;
        }
        if let Some(p) = food_atlas {
            self.food_atlas = p;
        }
        if let Some(p) = tract_boundaries {
            self.tract_boundaries = p;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// Where and how a dataset is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub gzip: bool,
}

impl OutputTarget {
    /// Final file path, with `.gz` appended when compressing.
    pub fn resolved_path(&self) -> PathBuf {
        if self.gzip {
            let mut name = self.path.as_os_str().to_owned();
            name.push(".gz");
            PathBuf::from(name)
        } else {
            self.path.clone()
        }
    }
}
