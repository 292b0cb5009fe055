//! Request and response models

pub mod transaction;
pub mod prediction;

pub use transaction::*;
pub use prediction::*;
