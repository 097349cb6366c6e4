pub mod auth;
pub mod response;
pub mod shop_access;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use shop_access::{fail_closed, validate_shop_middleware, verify_shop_access, ValidatedShop};
