pub mod types;

pub use types::{AttributeValue, LogRecord, SeverityNumber};
