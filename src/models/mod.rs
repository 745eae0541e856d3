pub mod auth;
pub mod club;
pub mod interaction;
pub mod knowledge;
pub mod user;

pub use auth::*;
pub use club::*;
pub use interaction::*;
pub use knowledge::*;
pub use user::*;
