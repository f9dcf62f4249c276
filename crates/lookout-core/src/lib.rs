//! Lookout Core - Foundation crate for the lookout intent monitor.
//!
//! This crate provides the shared vocabulary every other lookout crate
//! depends on: platform and post types, TOML configuration, the central
//! error types, and the contracts of the external collaborators the scan
//! engine hands its results to.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - `Platform`, `PostKind`, `Post`, `Credentials`
//! - [`pipeline`] - `IntentPipeline` and `LeadSink` collaborator traits
//! - [`text`] - Text sanitising shared by extraction and persistence
//!
//! # Example
//!
//! ```rust
//! use lookout_core::{AppConfig, Platform, Post, PostKind};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let post = Post::new(
//!     "Looking for a reliable CRM, ours crashes daily",
//!     "https://www.reddit.com/r/smallbusiness/comments/abc",
//!     "",
//!     Platform::Reddit,
//!     PostKind::Post,
//!     config.scanning.min_content_len,
//! )?;
//! assert_eq!(post.platform(), Platform::Reddit);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod text;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserSettings, DelayRange, LlmConfig, ScanningConfig, ScheduleConfig,
    StorageConfig, TimingConfig,
};
pub use error::{ConfigError, ConfigResult, LookoutError, Result};
pub use pipeline::{IntentAssessment, IntentLevel, IntentPipeline, LeadRecord, LeadSink};
pub use text::sanitize_text;
pub use types::{Credentials, Platform, Post, PostKind};
