//! Kernel utilities shared across slices.
//! Keep this crate lightweight; it re-exports the domain and provides config loading and
//! guarded execution of lifecycle steps.
//!
//! ## Guarded steps
//! ```rust
//! use veneer_kernel::guard::guard;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let value: Option<()> = guard(None, "stop:Widget", async { anyhow::bail!("already detached") }).await;
//! assert!(value.is_none());
//! # }
//! ```
//!
//! ## Config loading
//! ```rust,no_run
//! use veneer_domain::config::VeneerConfig;
//! use veneer_kernel::config::load_config;
//!
//! let cfg: VeneerConfig = load_config(Some("config/veneer.toml")).unwrap();
//! ```
pub mod config;
pub mod guard;
pub mod prelude;

pub use veneer_domain as domain;
