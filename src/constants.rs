//! Global constants used throughout the common-tpl codebase.
//!
//! This module contains storage key prefixes, DOM marker classes, event names
//! and network defaults that are shared across modules. Several of these values
//! must match the server-side block/helper layer byte-for-byte, so they are
//! defined centrally rather than scattered as string literals.

use std::time::Duration;

/// Durable storage prefix for `TemplateKey -> checksum` links.
pub const STORAGE_MAPPING_PREFIX: &str = "common-tpl-mapping:";

/// Durable storage prefix for `checksum -> raw template content`.
pub const STORAGE_HASH_PREFIX: &str = "common-tpl-hash:";

/// Durable storage prefix for the last data a template was rendered with.
pub const STORAGE_DATA_PREFIX: &str = "common-tpl-data:";

/// Throwaway key written and removed once to probe storage availability.
pub const STORAGE_PROBE_KEY: &str = "common-tpl-probe";

/// Default CSS selector of the hidden nodes carrying CSP data.
pub const DEFAULT_CSP_SELECTOR: &str = ".csp-data";

/// Class name emitted by the server-side CSP markup generator.
pub const CSP_CLASS_NAME: &str = "csp-data";

/// CSP data key holding the `BlockName -> checksum` manifest.
pub const CSP_TPL_CHECKSUMS_KEY: &str = "tplChecksums";

/// CSP data key holding the developer-mode flag.
pub const CSP_DEVELOPER_MODE_KEY: &str = "isDeveloperMode";

/// CSP data key holding the translation map.
pub const CSP_TRANSLATIONS_KEY: &str = "__";

/// Marker class added to every node a template was rendered into.
pub const TPL_MARKER_CLASS: &str = "tpl-target-container";

/// Marker class added to nodes filled from `target.payload`.
pub const PAYLOAD_MARKER_CLASS: &str = "payload-target-container";

/// Marker class added to nodes filled from `target.feedback`.
pub const FEEDBACK_MARKER_CLASS: &str = "feedback-target-container";

/// Class that removes a node from the page flow.
pub const JS_HIDDEN_CLASS: &str = "js-hidden";

/// Class that hides a node but keeps its space.
pub const JS_INVISIBLE_CLASS: &str = "js-invisible";

/// Event fired after a template render completes.
pub const EVENT_AFTER_TPL_RENDER: &str = "Common:afterTplRender";

/// Event fired after a payload target was filled by `post`.
pub const EVENT_AFTER_TARGET_PAYLOAD_INSERT: &str = "Common:afterTargetPayloadInsert";

/// Event fired after a feedback target was filled by `post`.
pub const EVENT_AFTER_TARGET_FEEDBACK_INSERT: &str = "Common:afterTargetFeedbackInsert";

/// Default template-serving endpoint path.
pub const DEFAULT_TEMPLATE_ENDPOINT: &str = "/common/template";

/// Default request field carrying the batched template keys.
pub const DEFAULT_TEMPLATE_PARAM: &str = "tpl";

/// Default base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost";

/// Default HTTP timeout for envelope requests (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of the DOM event broadcast channel.
///
/// Slow subscribers lose the oldest events once this many are queued.
pub const DOM_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Feedback message used when a successful response carries no message.
pub const FEEDBACK_SUCCESS_MESSAGE: &str = "Data retrieved successfully!";

/// Feedback message used when an empty response carries no message.
pub const FEEDBACK_FAILURE_MESSAGE: &str = "Data could not be retrieved.";
