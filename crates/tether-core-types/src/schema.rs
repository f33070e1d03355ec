//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent between the logging macros,
//! the command phase traces and the test capture layer.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_TRANSACTION_ID: &str = "transaction_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Relation identifiers
pub const FIELD_ENTITY_ID: &str = "entity_id";
pub const FIELD_PROPERTY: &str = "property";
pub const FIELD_COMMAND_KIND: &str = "command_kind";
pub const FIELD_PHASE: &str = "phase";

// Collection sizes
pub const FIELD_EXPANSION_LEN: &str = "expansion_len";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Command phase names
pub const PHASE_NOTIFY_BEGIN: &str = "notify_begin";
pub const PHASE_BEGIN: &str = "begin";
pub const PHASE_PERFORM: &str = "perform";
pub const PHASE_END: &str = "end";
pub const PHASE_NOTIFY_END: &str = "notify_end";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_phase_names_are_distinct() {
        let phases = [
            PHASE_NOTIFY_BEGIN,
            PHASE_BEGIN,
            PHASE_PERFORM,
            PHASE_END,
            PHASE_NOTIFY_END,
        ];
        for (i, a) in phases.iter().enumerate() {
            for b in &phases[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
