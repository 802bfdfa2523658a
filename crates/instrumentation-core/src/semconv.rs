//! Attribute names for resource timing log records
//!
//! These follow the unstable `browser.resource.*` conventions.

/// Event name for resource timing
pub const RESOURCE_TIMING_EVENT_NAME: &str = "browser.resource.timing";

/// Performance entry type observed by the instrumentation
pub const RESOURCE_ENTRY_TYPE: &str = "resource";

pub const ATTR_RESOURCE_URL: &str = "browser.resource.url";
/// script, link, img, xmlhttprequest, fetch, ...
pub const ATTR_RESOURCE_INITIATOR_TYPE: &str = "browser.resource.initiator_type";
/// Total load duration in milliseconds
pub const ATTR_RESOURCE_DURATION: &str = "browser.resource.duration";
pub const ATTR_RESOURCE_FETCH_START: &str = "browser.resource.fetch_start";
pub const ATTR_RESOURCE_DOMAIN_LOOKUP_START: &str = "browser.resource.domain_lookup_start";
pub const ATTR_RESOURCE_DOMAIN_LOOKUP_END: &str = "browser.resource.domain_lookup_end";
pub const ATTR_RESOURCE_CONNECT_START: &str = "browser.resource.connect_start";
pub const ATTR_RESOURCE_CONNECT_END: &str = "browser.resource.connect_end";
/// Zero unless the connection used TLS
pub const ATTR_RESOURCE_SECURE_CONNECTION_START: &str =
    "browser.resource.secure_connection_start";
pub const ATTR_RESOURCE_REQUEST_START: &str = "browser.resource.request_start";
pub const ATTR_RESOURCE_RESPONSE_START: &str = "browser.resource.response_start";
pub const ATTR_RESOURCE_RESPONSE_END: &str = "browser.resource.response_end";
/// Bytes on the wire including headers
pub const ATTR_RESOURCE_TRANSFER_SIZE: &str = "browser.resource.transfer_size";
/// Compressed body size in bytes
pub const ATTR_RESOURCE_ENCODED_BODY_SIZE: &str = "browser.resource.encoded_body_size";
/// Uncompressed body size in bytes
pub const ATTR_RESOURCE_DECODED_BODY_SIZE: &str = "browser.resource.decoded_body_size";
pub const ATTR_RESOURCE_REDIRECT_START: &str = "browser.resource.redirect_start";
pub const ATTR_RESOURCE_REDIRECT_END: &str = "browser.resource.redirect_end";
/// Service worker start time
pub const ATTR_RESOURCE_WORKER_START: &str = "browser.resource.worker_start";
/// h2, h3, http/1.1, ...
pub const ATTR_RESOURCE_NEXT_HOP_PROTOCOL: &str = "browser.resource.next_hop_protocol";
/// blocking or non-blocking
pub const ATTR_RESOURCE_RENDER_BLOCKING_STATUS: &str = "browser.resource.render_blocking_status";
