//! Reactive handlers for authentication events.

pub mod alert;
pub mod audit;
pub mod monitor;

pub use alert::AlertHandler;
pub use audit::AuditLogHandler;
pub use monitor::SecurityMonitorHandler;
