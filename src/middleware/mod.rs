pub mod auth;
pub mod response;

pub use auth::bearer_token;
pub use response::{ApiResponse, ApiResult, CsvResponse};
