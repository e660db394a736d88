pub mod error;
pub mod handlers;
pub mod router;

pub use error::{ApiError, ApiResult};
pub use router::{ApiSettings, ApiState, DEFAULT_DOWNLOAD_GRACE, api_router};
