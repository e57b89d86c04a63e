pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod messages;
pub mod session;
pub mod users;
pub mod views;

mod router;

pub use router::router;
