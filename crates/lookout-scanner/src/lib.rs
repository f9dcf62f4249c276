//! Lookout Scanner - platform crawling and scan orchestration.
//!
//! This crate turns logged-in browser sessions into a stream of candidate
//! posts and routes them through the intent gate.
//!
//! # Features
//!
//! - [`SiteAdapter`] contract: `login` then best-effort `discover`
//! - TOML platform definitions with a loader and an in-memory registry
//! - [`DefinitionAdapter`], a data-driven adapter for any definition
//! - [`PaginationCollector`]: bounded scroll loop with link deduplication
//! - [`ScanOrchestrator`]: sequential platforms, cooldowns, failure isolation
//!
//! # Example
//!
//! ```rust,ignore
//! use lookout_scanner::{DefinitionAdapter, PlatformLoader, PlatformRegistry, ScanOrchestrator};
//! use std::sync::Arc;
//!
//! let registry = PlatformRegistry::load_from(&PlatformLoader::with_default_dir()?)?;
//! let adapters = registry
//!     .get_all()
//!     .into_iter()
//!     .map(|def| {
//!         let creds = Credentials::from_env(def.id());
//!         Arc::new(DefinitionAdapter::new(def, creds, &config, timing.clone())) as _
//!     })
//!     .collect();
//!
//! let orchestrator = ScanOrchestrator::new(adapters, pipeline, sink, timing);
//! let result = orchestrator.run(&engine).await?;
//! println!("{} leads", result.total_posts);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod adapter;
#[allow(missing_docs)]
pub mod collector;
#[allow(missing_docs)]
pub mod definition;
#[allow(missing_docs)]
pub mod definition_adapter;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod extraction;
#[allow(missing_docs)]
pub mod loader;
#[allow(missing_docs)]
pub mod registry;
pub mod orchestrator;

// Re-export commonly used types
pub use adapter::{Discovery, SiteAdapter};
pub use collector::{CollectOutcome, PaginationCollector, PostAccumulator, PostFilter, PostPredicate};
pub use definition::PlatformDefinition;
pub use definition_adapter::DefinitionAdapter;
pub use error::{LoginFailure, Result, ScanError};
pub use loader::PlatformLoader;
pub use orchestrator::{AggregateResult, RunStatus, ScanOrchestrator, ScanResult};
pub use registry::PlatformRegistry;
