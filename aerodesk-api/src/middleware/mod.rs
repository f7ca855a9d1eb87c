pub mod auth;

pub use auth::{AdminUser, Claims, CurrentUser};
