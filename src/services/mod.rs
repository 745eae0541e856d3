pub mod auth;
pub mod club;
pub mod generation;
pub mod knowledge;
pub mod llm;
pub mod statistics;
pub mod sync;
pub mod user;
