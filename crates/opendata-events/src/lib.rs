//! In-process event distribution for the Open Data API.
//!
//! Producers hand events to the [`dispatcher::EventDispatcher`]; reactive
//! handlers subscribe by event kind and are invoked during explicit
//! dispatch cycles. Delivery is at-least-once within a single process.

pub mod dispatcher;

pub use dispatcher::EventDispatcher;
