//! Operation logging macros
//!
//! Every transaction operation logs exactly one `start` event and one `end`
//! or `end_error` event under the same `op` name. Extra `key = value`
//! fields are passed through to `tracing` unchanged, so `%` and `?`
//! sigils work as usual.

#[doc(hidden)]
#[macro_export]
macro_rules! __tether_op_event {
    ($level:ident, $op:expr, $event:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event,
            $($($field)*)?
        )
    };
}

/// Log the start of an operation
///
/// ```
/// # use tether_core::log_op_start;
/// log_op_start!("execute");
/// log_op_start!("execute", entity_id = "o1", property = "Customer");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__tether_op_event!(
            info,
            $op,
            $crate::tether_core_types::schema::EVENT_START
            $(, $($field)*)?
        )
    };
}

/// Log the successful end of an operation
///
/// `duration_ms` is required and comes first.
///
/// ```
/// # use tether_core::log_op_end;
/// log_op_end!("commit", duration_ms = 0u64, changed_end_points = 3usize);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__tether_op_event!(
            info,
            $op,
            $crate::tether_core_types::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Log the failed end of an operation
///
/// Anything convertible into an `ExError` is accepted. The error is tagged
/// with `op`; its kind, stable code and message are attached, along with
/// the transaction and trace ids it carries.
///
/// ```
/// # use tether_core::{log_op_error, errors::RelationError};
/// let err = RelationError::EntityDeleted { entity_id: "o1".to_string() };
/// log_op_error!("delete_entity", err, duration_ms = 1u64);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err = ::std::convert::Into::<$crate::errors::ExError>::into($err).with_op($op);
        $crate::__tether_op_event!(
            error,
            $op,
            $crate::tether_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            err_message = ex_err.message(),
            transaction_id = ex_err.transaction_id().map($crate::tether_core_types::TransactionId::as_str),
            trace_id = ex_err.trace_id().map($crate::tether_core_types::TraceId::as_str)
            $(, $($field)*)?
        )
    }};
}
