pub mod auth;
pub mod category;
pub mod password;
pub mod prompt;
pub mod time;
