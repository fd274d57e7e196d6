pub mod auth;
pub mod error_detail;
pub mod rate_limit;
pub mod response;
pub mod role;

pub use auth::{authenticate, AuthUser};
pub use error_detail::expose_internal_errors;
pub use rate_limit::{throttle, RateClass, RateGate, RateLimiter};
pub use response::{ApiResponse, ApiResult};
pub use role::{authorize, RoleGate};
