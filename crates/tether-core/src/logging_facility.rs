//! Structured logging facility for Tether
//!
//! - Single initialization point via `init(profile)`
//! - Operation macros (`log_op_start!`, `log_op_end!`, `log_op_error!`) used
//!   at the transaction boundary
//! - Test capture mode for asserting on emitted events
//!
//! Command phases log below the operation boundary with `tracing::trace!`
//! and carry `command_kind`, `phase`, `entity_id` and `property` fields.
//!
//! # Usage
//!
//! ```rust
//! use tether_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
