//! Common error taxonomy and report types shared across `fieldcrypt` crates.

pub mod error;
pub mod protocol;

pub use error::FieldError;
