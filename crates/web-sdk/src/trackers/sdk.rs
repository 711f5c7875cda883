//! Generic SDK tracker — forwards hits untouched to a vendor SDK client.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use beacon_core::config::TrackerSettings;
use beacon_core::{BeaconResult, Hit, Record};

use super::Tracker;
use crate::constants::SDK_TRACKER;

/// Client side of a vendor SDK. Implementations own the network transport.
pub trait SdkTransport: Send + Sync {
    fn track(&self, hit: &Hit) -> anyhow::Result<()>;

    fn set_dimensions(&self, dimensions: &Record) -> anyhow::Result<()>;
}

/// Transport that discards everything.
pub struct NoOpTransport;

impl SdkTransport for NoOpTransport {
    fn track(&self, _hit: &Hit) -> anyhow::Result<()> {
        Ok(())
    }

    fn set_dimensions(&self, _dimensions: &Record) -> anyhow::Result<()> {
        Ok(())
    }
}

/// In-memory transport that records every call.
#[derive(Default)]
pub struct CaptureTransport {
    hits: Mutex<Vec<Hit>>,
    dimensions: Mutex<Vec<Record>>,
}

impl CaptureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.hits.lock().len()
    }

    pub fn dimension_calls(&self) -> Vec<Record> {
        self.dimensions.lock().clone()
    }

    pub fn clear(&self) {
        self.hits.lock().clear();
        self.dimensions.lock().clear();
    }
}

impl SdkTransport for CaptureTransport {
    fn track(&self, hit: &Hit) -> anyhow::Result<()> {
        self.hits.lock().push(hit.clone());
        Ok(())
    }

    fn set_dimensions(&self, dimensions: &Record) -> anyhow::Result<()> {
        self.dimensions.lock().push(dimensions.clone());
        Ok(())
    }
}

pub struct SdkTracker {
    transport: Arc<dyn SdkTransport>,
    initialized: AtomicBool,
}

impl SdkTracker {
    pub fn new(transport: Arc<dyn SdkTransport>) -> Self {
        Self {
            transport,
            initialized: AtomicBool::new(false),
        }
    }
}

impl Tracker for SdkTracker {
    fn name(&self) -> &str {
        SDK_TRACKER
    }

    fn init(&self, _settings: &TrackerSettings) -> BeaconResult<()> {
        if !self.initialized.swap(true, Ordering::SeqCst) {
            info!("sdk tracker initialized");
        }
        Ok(())
    }

    fn send(&self, hit: &Hit) -> BeaconResult<()> {
        if !self.is_initialized() {
            debug!(hit_type = %hit.hit_type, "sdk tracker not initialized, hit ignored");
            return Ok(());
        }
        self.transport.track(hit)?;
        Ok(())
    }

    fn set_dimensions(&self, dimensions: &Record) -> BeaconResult<()> {
        if !self.is_initialized() {
            return Ok(());
        }
        self.transport.set_dimensions(dimensions)?;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::BeaconError;
    use serde_json::json;

    struct FailingTransport;

    impl SdkTransport for FailingTransport {
        fn track(&self, _hit: &Hit) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("sdk unavailable"))
        }

        fn set_dimensions(&self, _dimensions: &Record) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_gated_on_initialization() {
        let transport = Arc::new(CaptureTransport::new());
        let tracker = SdkTracker::new(transport.clone());
        let dims = json!({"dimension90": "l-1"}).as_object().cloned().unwrap();

        tracker.send(&Hit::event("nav", "go", "home")).unwrap();
        tracker.set_dimensions(&dims).unwrap();
        assert_eq!(transport.count(), 0);
        assert!(transport.dimension_calls().is_empty());

        tracker.init(&TrackerSettings::default()).unwrap();
        assert!(tracker.is_initialized());

        tracker.send(&Hit::event("nav", "go", "home")).unwrap();
        tracker.set_dimensions(&dims).unwrap();
        assert_eq!(transport.hits(), vec![Hit::event("nav", "go", "home")]);
        assert_eq!(transport.dimension_calls(), vec![dims]);
    }

    #[test]
    fn test_transport_failure_propagates() {
        let tracker = SdkTracker::new(Arc::new(FailingTransport));
        tracker.init(&TrackerSettings::default()).unwrap();
        let err = tracker.send(&Hit::page_view()).unwrap_err();
        assert!(matches!(err, BeaconError::Internal(_)));
    }

    #[test]
    fn test_noop_transport() {
        let tracker = SdkTracker::new(Arc::new(NoOpTransport));
        tracker.init(&TrackerSettings::default()).unwrap();
        tracker.send(&Hit::page_view()).unwrap();
    }
}
