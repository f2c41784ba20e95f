pub mod error;
pub mod types;

pub use error::ElytraError;
pub use types::Result;
