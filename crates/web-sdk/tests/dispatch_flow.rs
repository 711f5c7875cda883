//! End-to-end page session: descriptors attached to a document, both
//! bundled trackers registered, and the host page feeding the data layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use beacon_core::config::TrackerSettings;
use beacon_core::{BeaconError, DataLayer, Hit, Record};
use beacon_web_sdk::constants::{GTM_TRACKER, SDK_TRACKER};
use beacon_web_sdk::{
    AnalyticsDispatcher, CaptureTransport, Document, DomEvent, Element, ElementRef,
    EventDescriptor, Field, MemoryStorage, SdkTracker, TagManagerTracker, Target, Tracker,
};
use serde_json::{json, Value};

struct Page {
    document: Document,
    data_layer: DataLayer,
    gtm: Arc<TagManagerTracker>,
    capture: Arc<CaptureTransport>,
    dispatcher: Arc<AnalyticsDispatcher>,
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn page(settings: BTreeMap<String, TrackerSettings>) -> (Page, Result<(), BeaconError>) {
    let data_layer = DataLayer::new();
    let gtm = Arc::new(TagManagerTracker::new(
        data_layer.clone(),
        Arc::new(MemoryStorage::new()),
    ));
    let capture = Arc::new(CaptureTransport::new());
    let sdk = Arc::new(SdkTracker::new(capture.clone()));

    let dispatcher = AnalyticsDispatcher::new()
        .with_tracker(GTM_TRACKER, gtm.clone())
        .with_tracker(SDK_TRACKER, sdk);
    let result = dispatcher.init(&settings);

    let page = Page {
        document: Document::new(),
        data_layer,
        gtm,
        capture,
        dispatcher: Arc::new(dispatcher),
    };
    (page, result)
}

fn both_trackers() -> BTreeMap<String, TrackerSettings> {
    BTreeMap::from([
        (GTM_TRACKER.to_string(), TrackerSettings::with_tracking_id("GTM-TEST123")),
        (SDK_TRACKER.to_string(), TrackerSettings::default()),
    ])
}

#[tokio::test(start_paused = true)]
async fn test_page_session_flow() {
    let (page, result) = page(both_trackers());
    result.unwrap();

    let doc = &page.document;
    let nav = doc.append(doc.body(), Element::new("nav")).unwrap();
    let button = doc
        .append(nav, Element::new("button").with_id("btn"))
        .unwrap();
    let list = doc
        .append(doc.body(), Element::new("ul").with_id("lessons"))
        .unwrap();
    let lessons: Vec<_> = ["intro", "arrays", "loops"]
        .iter()
        .map(|slug| {
            let item = Element::new("li")
                .with_class("lesson")
                .with_attribute("data-slug", *slug);
            doc.append(list, item).unwrap()
        })
        .collect();

    let descriptors = vec![
        EventDescriptor::new(Target::selector("#btn"), "click", "nav", "go", "home"),
        EventDescriptor::new(
            Target::delegated(".lesson", "#lessons"),
            "click",
            "lessons",
            "open",
            Field::computed(|_: &DomEvent, element: &ElementRef, _: usize| {
                element.attribute("data-slug").unwrap_or("").to_string()
            }),
        )
        .with_custom_dimension(|_: &DomEvent, _: &ElementRef, index: usize| {
            record(json!({"dimension4": index}))
        }),
    ];
    assert_eq!(
        page.dispatcher
            .attach_events_to_elements(doc, descriptors)
            .unwrap(),
        2
    );

    // Host page: container loads, user data arrives, page view is sent.
    page.data_layer.push(record(json!({"event": "gtm.load"})));
    page.dispatcher
        .send(
            &Hit::init_data(record(json!({"login_session_id": "s-1", "person_id": 7}))),
            Some(GTM_TRACKER),
        )
        .unwrap();
    page.dispatcher
        .set_dimensions(&record(json!({"dimension2": 101, "dimension6": "true"})), None)
        .unwrap();
    page.gtm.settle().await;

    doc.dispatch_event(button, "click");
    doc.dispatch_event(lessons[1], "click");
    doc.dispatch_event(list, "click");
    page.gtm.settle().await;

    assert_eq!(page.data_layer.count_event("pageview"), 1);
    assert_eq!(page.data_layer.count_event("usersessioncontext"), 1);

    let interactions = page.data_layer.events_named("user_interaction");
    assert_eq!(interactions.len(), 2);
    assert_eq!(interactions[0]["event_label"], "home");
    assert_eq!(interactions[0]["course_id"], "101");
    assert_eq!(interactions[0]["course_options"], "1");
    assert_eq!(interactions[1]["event_label"], "arrays");
    assert_eq!(interactions[1]["section_id"], "1");

    // The SDK tracker sees raw hits, excluding the gtm-only initData.
    let hits = page.capture.hits();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0], Hit::event("nav", "go", "home"));
    assert_eq!(hits[1].label.as_deref(), Some("arrays"));
    assert_eq!(page.capture.dimension_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_interaction_without_page_view_is_dropped() {
    let (page, result) = page(both_trackers());
    result.unwrap();
    let before = page.data_layer.len();

    page.dispatcher
        .send(&Hit::event("nav", "go", "home"), None)
        .unwrap();
    page.gtm.settle().await;

    assert_eq!(page.data_layer.len(), before);
    assert_eq!(page.capture.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_tracking_id_only_fails_tag_manager() {
    let settings = BTreeMap::from([
        (GTM_TRACKER.to_string(), TrackerSettings::with_tracking_id("")),
        (SDK_TRACKER.to_string(), TrackerSettings::default()),
    ]);
    let (page, result) = page(settings);

    match result {
        Err(BeaconError::TrackerInit { tracker, source }) => {
            assert_eq!(tracker, GTM_TRACKER);
            assert!(matches!(*source, BeaconError::Config(_)));
        }
        other => panic!("expected tracker init error, got {other:?}"),
    }
    assert!(!page.gtm.is_initialized());
    assert!(page.data_layer.is_empty());

    page.dispatcher.send(&Hit::page_view(), None).unwrap();
    assert_eq!(page.capture.count(), 1);
    assert_eq!(page.gtm.pending_waits(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_json_descriptors_from_configuration() {
    let (page, result) = page(both_trackers());
    result.unwrap();
    let doc = &page.document;
    let button = doc
        .append(doc.body(), Element::new("a").with_class("cta"))
        .unwrap();

    let config = json!([
        {"target": ".cta", "type": "click", "category": "promo", "action": "click", "label": "banner", "value": 5}
    ]);
    page.dispatcher
        .attach_events_from_json(doc, &config)
        .unwrap();
    doc.dispatch_event(button, "click");

    assert_eq!(
        page.capture.hits(),
        vec![Hit::event("promo", "click", "banner").with_value(5.0)]
    );
    page.gtm.cancel_pending();
}
