//! State-level aggregation and tract-level detail datasets.
//!
//! This module groups labeled tracts by state, region and label, joins the
//! groups to boundary ids, builds the tract detail join, and publishes the
//! results locally or to S3.

pub mod aggregate;
pub mod analyzer;
pub mod tracts;
pub mod types;
pub mod utility;
pub mod writetos3;
