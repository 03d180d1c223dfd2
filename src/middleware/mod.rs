mod auth;
mod error_handler;
mod rate_limit;

pub use auth::{API_KEY_HEADER, ApiClient, require_api_key};
pub use error_handler::log_errors;
pub use rate_limit::{REMAINING_HEADER, rate_limit};
