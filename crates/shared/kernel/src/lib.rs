//! Kernel utilities shared across the workspace.
//! Keep this crate lightweight; it holds environment-driven configuration
//! loading and the host-network query the server uses to advertise itself.
//!
//! ## Config loading
//! ```rust
//! use ota_kernel::config::load_config;
//!
//! #[derive(Default, serde::Deserialize)]
//! struct AppConfig {
//!     #[serde(default)]
//!     port: u16,
//! }
//!
//! let cfg: AppConfig = load_config().unwrap_or_default();
//! ```

pub mod config;
pub mod net;
