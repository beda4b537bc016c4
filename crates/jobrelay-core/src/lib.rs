pub mod auth;
pub mod clients;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod saga;
pub mod store;

pub use error::{Error, Result};
