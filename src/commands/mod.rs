pub mod admin;
pub mod general;

pub use admin::{pool, recent_logs};
pub use general::{help, ping};
