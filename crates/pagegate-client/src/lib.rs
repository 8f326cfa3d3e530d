//! HTTP client for the observer API.
//!
//! Fetches threshold rules for a test and delivers page updates and the
//! final report. [`ObserverClient`] implements the core's `RuleSource` and
//! `ReportSink`, so a runner can be pointed at it directly:
//!
//! ```no_run
//! use pagegate_client::{ObserverClient, ObserverConfig};
//!
//! # fn example() -> pagegate_client::ClientResult<()> {
//! let client = ObserverClient::new(
//!     ObserverConfig::new("https://observer.example", "12").with_token("secret"),
//! )?;
//! # let _ = client;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{FinalReport, ObserverClient, OBSERVER_USER_AGENT};
pub use config::ObserverConfig;
pub use error::{ClientError, ClientResult};
