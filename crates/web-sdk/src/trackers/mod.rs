//! Tracker contract and the bundled implementations.
//!
//! A tracker is a sink for one analytics vendor. The dispatcher only ever
//! talks to the [`Tracker`] trait, so any number of implementations can be
//! registered side by side.

pub mod gtm;
pub mod poll;
pub mod sdk;

use beacon_core::config::TrackerSettings;
use beacon_core::{BeaconResult, Hit, Record};

pub trait Tracker: Send + Sync {
    /// Vendor identifier (e.g. "gtm", "sdk").
    fn name(&self) -> &str;

    /// Make the tracker usable. Once initialized a tracker stays initialized.
    fn init(&self, settings: &TrackerSettings) -> BeaconResult<()>;

    /// Send a hit. Trackers that are not initialized ignore it.
    fn send(&self, hit: &Hit) -> BeaconResult<()>;

    /// Report page-level custom dimensions.
    fn set_dimensions(&self, dimensions: &Record) -> BeaconResult<()>;

    fn is_initialized(&self) -> bool;
}
