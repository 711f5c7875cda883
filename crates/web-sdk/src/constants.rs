//! Fixed lookup tables shared by the trackers.

/// Registered tracker names.
pub const GTM_TRACKER: &str = "gtm";
pub const SDK_TRACKER: &str = "sdk";

/// Data-layer event names.
pub const PAGEVIEW_EVENT: &str = "pageview";
pub const USER_INTERACTION_EVENT: &str = "user_interaction";
pub const USER_SESSION_CONTEXT_EVENT: &str = "usersessioncontext";
pub const INIT_DATA_EVENT: &str = "initData";
pub const GTM_JS_EVENT: &str = "gtm.js";
pub const GTM_LOAD_EVENT: &str = "gtm.load";
pub const GTM_TRANSPORT_EVENT: &str = "gtm.transport";

/// Key whose mere presence in the data layer signals a logged-in session.
pub const LOGIN_SESSION_ID: &str = "login_session_id";
pub const PERSON_ID: &str = "person_id";
pub const PERSON_ID_TYPE: &str = "person_id_type";

/// Session storage key holding the last reported session id.
pub const USER_SESSION_CONTEXT_KEY: &str = "usersessioncontext";

/// Current navigation element and the attribute carrying its label.
pub const CURRENT_NAV_SELECTOR: &str = "[aria-current=page]";
pub const NAV_LABEL_ATTRIBUTE: &str = "aria-label";

/// Vendor dimension keys and the semantic field names they map to.
pub const DIMENSION_MAPPING: &[(&str, &str)] = &[
    ("dimension1", "platform"),
    ("dimension2", "course_id"),
    ("dimension3", "product_id"),
    ("dimension4", "section_id"),
    ("dimension5", "user_role"),
    ("dimension6", "course_options"),
    ("dimension7", "is_demo_course"),
    ("dimension8", "student_view"),
    ("dimension10", "group_id"),
    ("dimension11", "variant_id"),
    ("dimension12", "experiment_group"),
    ("dimension20", "page_category"),
    ("dimension21", "page_name"),
    ("dimension90", "learner_id"),
];

/// Identifiers that are always reported as strings.
pub const STRING_DIMENSIONS: &[&str] = &["course_id", "product_id", "section_id"];

/// Course option flags canonicalized to "0"/"1".
pub const BOOLEAN_DIMENSIONS: &[&str] = &["course_options", "is_demo_course", "student_view"];

/// Group and variant keys that are not valid on page-view hits.
pub const PAGEVIEW_STRIPPED_DIMENSIONS: &[&str] = &["group_id", "variant_id", "experiment_group"];

/// Page-view fields never inherited by interaction hits.
pub const NON_INHERITED_FIELDS: &[&str] = &[
    "event",
    "message_id",
    "transaction_dt",
    "transaction_local_dt",
];

pub const COURSE_OPTIONS: &str = "course_options";
