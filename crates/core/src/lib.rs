//! Shared building blocks for the Beacon analytics layer: the error
//! taxonomy, configuration, normalized hit types and the append-only data
//! layer that tag-manager trackers coordinate through.

pub mod config;
pub mod data_layer;
pub mod error;
pub mod types;

pub use config::BeaconConfig;
pub use data_layer::DataLayer;
pub use error::{BeaconError, BeaconResult};
pub use types::{Hit, HitType, Record};
