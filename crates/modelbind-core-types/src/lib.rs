//! Core types shared across modelbind facilities
//!
//! This crate provides the foundational constants used by the logging
//! facility and by tests that assert on captured log events:
//!
//! - **Schema constants**: canonical field keys and event names

pub mod schema;
