//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Entity identifiers
pub const FIELD_PROPERTY: &str = "property";
pub const FIELD_VALIDATOR: &str = "validator";
pub const FIELD_ACCESSOR: &str = "accessor";

// Collection sizes
pub const FIELD_CHANGED_LEN: &str = "changed_len";
pub const FIELD_PERSISTED_LEN: &str = "persisted_len";
pub const FIELD_ORDER_LEN: &str = "order_len";
pub const FIELD_ACCESSOR_COUNT: &str = "accessor_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
