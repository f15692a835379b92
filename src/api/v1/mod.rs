mod error;
mod handler;
mod router;

pub use error::{ApiError, ApiErrorCode, recover_error};
pub use handler::{ApiResponse, LoginRequest, LoginResponse, LogoutResponse, RefreshRequest};
pub use router::routes;
