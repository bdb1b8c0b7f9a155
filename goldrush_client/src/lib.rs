pub mod client;
pub mod error;
pub mod transaction_converter;
pub mod types;

pub use client::GoldRushClient;
pub use error::GoldRushError;
pub use types::*;
