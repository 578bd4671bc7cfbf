//! Structured logging setup.
//!
//! The library only emits `tracing` events; hosts that want them as JSON on
//! stdout call [`init_telemetry`] once at startup, after loading [`Config`].
//!
//! # Telemetry invariants
//!
//! - **No plaintext, envelope, or key material** appears in any log field.
//!   Events carry field ids, job ids, counts, and error codes only.
//! - Log level comes from `LOG_LEVEL` (default: `info`).
//!
//! [`Config`]: crate::config::Config

pub mod init;

pub use init::init_telemetry;
