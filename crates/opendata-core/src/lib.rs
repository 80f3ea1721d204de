//! Open Data API core — shared event distribution contracts.
//!
//! This crate defines the traits and types the event subsystem and the
//! domain crates depend on. It contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod event;
pub mod handler;
pub mod store;
