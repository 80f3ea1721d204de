//! Open Data API — authentication domain.
//!
//! Defines the authentication event set, the account directory, the token
//! service, and the reactive handlers that consume authentication events.

pub mod directory;
pub mod error;
pub mod events;
pub mod handlers;
pub mod token;
