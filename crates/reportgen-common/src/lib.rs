pub mod error;
pub mod time;
pub mod types;

pub use error::{ReportError, Result};
pub use types::{ReportConfig, ReportRequest, ReportType};
