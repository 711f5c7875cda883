//! Google Tag Manager tracker — turns hits into data-layer pushes.
//!
//! The tag manager expects records in a particular order: user data only
//! once the container has loaded (`gtm.load`), page views only once a login
//! session is known, interactions only after a page view. Each handler waits
//! for its prerequisite with bounded polling on a spawned task and silently
//! drops the hit if the prerequisite never shows up.

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::AbortHandle;
use tracing::{debug, info};
use url::Url;

use beacon_core::config::{BeaconConfig, PollingConfig, ProductConfig, TrackerSettings};
use beacon_core::{BeaconError, BeaconResult, DataLayer, Hit, HitType, Record};

use super::poll::{wait_until, PendingWaits};
use super::Tracker;
use crate::constants::{
    BOOLEAN_DIMENSIONS, COURSE_OPTIONS, GTM_JS_EVENT, GTM_LOAD_EVENT, GTM_TRACKER,
    GTM_TRANSPORT_EVENT, INIT_DATA_EVENT, LOGIN_SESSION_ID, NON_INHERITED_FIELDS,
    PAGEVIEW_EVENT, PAGEVIEW_STRIPPED_DIMENSIONS, PERSON_ID, PERSON_ID_TYPE, STRING_DIMENSIONS,
    USER_INTERACTION_EVENT, USER_SESSION_CONTEXT_EVENT, USER_SESSION_CONTEXT_KEY,
};
use crate::dimensions::{coerce_to_string, normalize_dimensions, rename_dimensions, stringify_value};
use crate::helper::{convert_boolean_values_to_string, get_analytics_time, uuidv4};
use crate::storage::SessionStorage;

/// Tag-manager tracker writing to a shared [`DataLayer`].
pub struct TagManagerTracker {
    inner: Arc<Inner>,
    pending: PendingWaits,
}

/// State shared with the spawned waits.
struct Inner {
    data_layer: DataLayer,
    storage: Arc<dyn SessionStorage>,
    polling: PollingConfig,
    product: ProductConfig,
    initialized: AtomicBool,
    /// Collection endpoint when running in proxy mode.
    transport: Mutex<Option<Url>>,
    transport_configured: AtomicBool,
    /// Most recent `initData` record.
    user_data: Mutex<Option<Record>>,
    /// Held across the stored-session compare-and-set.
    session_marker: Mutex<()>,
}

impl TagManagerTracker {
    pub fn new(data_layer: DataLayer, storage: Arc<dyn SessionStorage>) -> Self {
        Self::with_policies(
            data_layer,
            storage,
            PollingConfig::default(),
            ProductConfig::default(),
        )
    }

    pub fn from_config(
        data_layer: DataLayer,
        storage: Arc<dyn SessionStorage>,
        config: &BeaconConfig,
    ) -> Self {
        Self::with_policies(data_layer, storage, config.polling, config.product.clone())
    }

    pub fn with_policies(
        data_layer: DataLayer,
        storage: Arc<dyn SessionStorage>,
        polling: PollingConfig,
        product: ProductConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                data_layer,
                storage,
                polling,
                product,
                initialized: AtomicBool::new(false),
                transport: Mutex::new(None),
                transport_configured: AtomicBool::new(false),
                user_data: Mutex::new(None),
                session_marker: Mutex::new(()),
            }),
            pending: PendingWaits::new(),
        }
    }

    pub fn data_layer(&self) -> &DataLayer {
        &self.inner.data_layer
    }

    pub fn is_proxy(&self) -> bool {
        self.inner.transport.lock().is_some()
    }

    /// Cached user data from the last delivered `initData` hit.
    pub fn user_data(&self) -> Option<Record> {
        self.inner.user_data.lock().clone()
    }

    /// Wait for a page view to be possible, then push the page-view record
    /// and the session context.
    pub fn track_page_view(&self, hit: &Hit) -> BeaconResult<()> {
        let inner = Arc::clone(&self.inner);
        let hit = hit.clone();
        self.pending.spawn(async move {
            if !wait_until(inner.polling, || inner.does_event_exist(LOGIN_SESSION_ID)).await {
                debug!("no login session in data layer, page view dropped");
                return;
            }
            let record = inner.page_view_record(&hit);
            inner.data_layer.push(record);
            inner.send_user_session_context();
        })?;
        Ok(())
    }

    /// Wait for a page view, then push an interaction record that inherits
    /// its page context.
    pub fn track_event(&self, hit: &Hit) -> BeaconResult<()> {
        let inner = Arc::clone(&self.inner);
        let hit = hit.clone();
        self.pending.spawn(async move {
            if !wait_until(inner.polling, || inner.does_event_exist(PAGEVIEW_EVENT)).await {
                debug!(
                    category = hit.category.as_deref().unwrap_or(""),
                    action = hit.action.as_deref().unwrap_or(""),
                    "no page view in data layer, event dropped"
                );
                return;
            }
            let Some(page_view) = inner.data_layer.last_event(PAGEVIEW_EVENT) else {
                return;
            };
            let record = inner.event_record(&hit, &page_view);
            inner.data_layer.push(record);
        })?;
        Ok(())
    }

    /// Normalize user data now, deliver it once the container has loaded.
    pub fn init_data(&self, hit: &Hit) -> BeaconResult<()> {
        let inner = Arc::clone(&self.inner);
        let record = inner.init_data_record(hit);
        self.pending.spawn(async move {
            if !wait_until(inner.polling, || inner.does_event_exist(GTM_LOAD_EVENT)).await {
                debug!("container never loaded, init data dropped");
                return;
            }
            inner.data_layer.push(record.clone());
            *inner.user_data.lock() = Some(record);
        })?;
        Ok(())
    }

    /// Push a session-context record when the cached session differs from
    /// the last one reported. Returns whether a record was pushed.
    pub fn send_user_session_context(&self) -> bool {
        self.inner.send_user_session_context()
    }

    /// Callback flavour of the bounded wait. The callback receives `true` as
    /// soon as `event_name` shows up and `false` once the budget is spent.
    pub fn wait_for_event_in_data_layer<F>(
        &self,
        event_name: &str,
        policy: PollingConfig,
        callback: F,
    ) -> BeaconResult<AbortHandle>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let event_name = event_name.to_string();
        self.pending.spawn(async move {
            let found = wait_until(policy, || inner.does_event_exist(&event_name)).await;
            callback(found);
        })
    }

    pub fn does_event_exist_in_data_layer(&self, event_name: &str) -> bool {
        self.inner.does_event_exist(event_name)
    }

    /// Wait until every outstanding wait has finished.
    pub async fn settle(&self) {
        self.pending.settle().await;
    }

    /// Abort outstanding waits; their hits are dropped.
    pub fn cancel_pending(&self) -> usize {
        self.pending.cancel()
    }

    pub fn pending_waits(&self) -> usize {
        self.pending.len()
    }
}

impl Tracker for TagManagerTracker {
    fn name(&self) -> &str {
        GTM_TRACKER
    }

    fn init(&self, settings: &TrackerSettings) -> BeaconResult<()> {
        if self.is_initialized() {
            debug!("tag manager tracker already initialized");
            return Ok(());
        }

        let tracking_id = settings
            .tracking_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BeaconError::Config("tag manager trackingId is required".into()))?;

        if settings.proxy {
            let raw = settings.proxy_url.as_deref().ok_or_else(|| {
                BeaconError::Config("proxy mode requires a proxy_url".into())
            })?;
            let url = Url::parse(raw)
                .map_err(|e| BeaconError::Config(format!("invalid proxy_url '{raw}': {e}")))?;
            *self.inner.transport.lock() = Some(url);
        }

        let mut bootstrap = Record::new();
        bootstrap.insert("gtm.start".into(), json!(Utc::now().timestamp_millis()));
        bootstrap.insert("event".into(), json!(GTM_JS_EVENT));
        bootstrap.insert("gtm.container_id".into(), json!(tracking_id));
        self.inner.data_layer.push(bootstrap);

        self.inner.initialized.store(true, Ordering::SeqCst);
        info!(tracking_id, proxy = settings.proxy, "tag manager tracker initialized");
        Ok(())
    }

    fn send(&self, hit: &Hit) -> BeaconResult<()> {
        if !self.is_initialized() {
            debug!(hit_type = %hit.hit_type, "tag manager tracker not initialized, hit ignored");
            return Ok(());
        }
        self.inner.configure_transport();

        match hit.hit_type {
            HitType::InitData => self.init_data(hit),
            HitType::PageView => self.track_page_view(hit),
            HitType::Event => self.track_event(hit),
        }
    }

    fn set_dimensions(&self, dimensions: &Record) -> BeaconResult<()> {
        let renamed = rename_dimensions(dimensions);
        debug!(
            received = dimensions.len(),
            kept = renamed.len(),
            "dimensions renamed for page view"
        );
        self.send(&Hit::page_view().with_custom_dimension(renamed))
    }

    fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }
}

impl Inner {
    /// `login_session_id` is looked up by key, everything else by the
    /// `event` field.
    fn does_event_exist(&self, event_name: &str) -> bool {
        if event_name == LOGIN_SESSION_ID {
            self.data_layer.has_key(LOGIN_SESSION_ID)
        } else {
            self.data_layer.has_event(event_name)
        }
    }

    fn configure_transport(&self) {
        let Some(url) = self.transport.lock().clone() else {
            return;
        };
        if self.transport_configured.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut record = Record::new();
        record.insert("event".into(), json!(GTM_TRANSPORT_EVENT));
        record.insert("transport_url".into(), json!(url.as_str()));
        self.data_layer.push(record);
        debug!(transport_url = %url, "tag manager transport routed through proxy");
    }

    fn insert_product(&self, record: &mut Record) {
        record.insert("product_name".into(), json!(self.product.name));
        record.insert("product_platform".into(), json!(self.product.platform));
        record.insert("product_version".into(), json!(self.product.version));
    }

    fn page_view_record(&self, hit: &Hit) -> Record {
        let mut record = Record::new();
        record.insert("event".into(), json!(PAGEVIEW_EVENT));
        self.insert_product(&mut record);
        record.insert("message_id".into(), json!(uuidv4()));
        get_analytics_time().insert_into(&mut record);

        if let Some(content_id) = &hit.content_id {
            record.insert("content_id".into(), coerce_to_string(content_id));
        }
        if let Some(content_id_type) = &hit.content_id_type {
            record.insert("content_id_type".into(), coerce_to_string(content_id_type));
        }

        for (key, value) in normalize_dimensions(&hit.custom_dimension) {
            let key_str = key.as_str();
            if PAGEVIEW_STRIPPED_DIMENSIONS.contains(&key_str) {
                continue;
            }
            let value = if STRING_DIMENSIONS.contains(&key_str) {
                coerce_to_string(&value)
            } else if BOOLEAN_DIMENSIONS.contains(&key_str) {
                json!(convert_boolean_values_to_string(&value))
            } else {
                value
            };
            record.insert(key, value);
        }

        debug!(fields = record.len(), "page view record built");
        record
    }

    fn event_record(&self, hit: &Hit, page_view: &Record) -> Record {
        let mut record = Record::new();
        record.insert("event".into(), json!(USER_INTERACTION_EVENT));
        record.insert("event_category".into(), json!(hit.category));
        record.insert("event_action".into(), json!(hit.action));
        record.insert("event_label".into(), json!(hit.label));
        record.insert("value".into(), json!(hit.value));
        record.insert("message_id".into(), json!(uuidv4()));

        let dimensions = normalize_dimensions(&hit.custom_dimension);

        // Page context first; per-event dimensions take precedence over it.
        for (key, value) in page_view {
            if NON_INHERITED_FIELDS.contains(&key.as_str())
                || dimensions.contains_key(key)
                || record.contains_key(key)
            {
                continue;
            }
            record.insert(key.clone(), stringify_value(value));
        }
        for (key, value) in &dimensions {
            if !record.contains_key(key) {
                record.insert(key.clone(), stringify_value(value));
            }
        }
        if let Some(options) = page_view.get(COURSE_OPTIONS) {
            record.insert(
                COURSE_OPTIONS.into(),
                json!(convert_boolean_values_to_string(options)),
            );
        }

        get_analytics_time().insert_into(&mut record);
        debug!(
            category = hit.category.as_deref().unwrap_or(""),
            fields = record.len(),
            "interaction record built"
        );
        record
    }

    fn init_data_record(&self, hit: &Hit) -> Record {
        let mut record = hit.fields.clone();
        get_analytics_time().insert_into(&mut record);
        record.insert(PERSON_ID_TYPE.into(), json!(self.product.person_id_type));
        for value in record.values_mut() {
            if is_null_like(value) {
                *value = Value::Null;
            }
        }
        record.remove("hitType");
        record.insert("event".into(), json!(INIT_DATA_EVENT));
        record
    }

    fn send_user_session_context(&self) -> bool {
        let (session_id, person_id) = {
            let user_data = self.user_data.lock();
            let Some(data) = user_data.as_ref() else {
                debug!("no user data cached, session context skipped");
                return false;
            };
            (
                data.get(LOGIN_SESSION_ID).cloned().unwrap_or(Value::Null),
                data.get(PERSON_ID).cloned().unwrap_or(Value::Null),
            )
        };
        let Value::String(session) = coerce_to_string(&session_id) else {
            debug!("cached user data has no session id, session context skipped");
            return false;
        };

        let _marker = self.session_marker.lock();
        let previous = self.storage.get(USER_SESSION_CONTEXT_KEY);
        let is_new_session = previous.as_deref() != Some(session.as_str());
        if is_new_session {
            let mut record = Record::new();
            record.insert("event".into(), json!(USER_SESSION_CONTEXT_EVENT));
            record.insert(LOGIN_SESSION_ID.into(), session_id);
            record.insert(PERSON_ID.into(), coerce_to_string(&person_id));
            get_analytics_time().insert_into(&mut record);
            self.data_layer.push(record);
            info!(login_session_id = %session, "user session context reported");
        }
        self.storage.set(USER_SESSION_CONTEXT_KEY, session);
        is_new_session
    }
}

fn is_null_like(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == "undefined",
        _ => false,
    }
}
