//! Walk services for wikiwalk.
//!
//! This module provides:
//! - **Link Source**: provider trait for the external link graph (Wikipedia, mock)
//! - **Walker**: the walk state machine with backtracking and branching
//! - **Controller**: single-flight run loop, reset generations and feedback
//! - **Configuration**: service-level settings
//!
//! # Running a walk
//!
//! ```ignore
//! use wikiwalk::services::{LinkSourceConfig, LinkSourceFactory, RunController, WalkConfig};
//!
//! let source = LinkSourceFactory::create(LinkSourceConfig::from_env())?;
//! let controller = RunController::new(source, WalkConfig::from_env());
//!
//! controller.start("Alan Turing").await?;
//! let snapshot = controller.snapshot().await;
//! ```

#![allow(dead_code)]

pub mod config;
pub mod controller;
pub mod error;
pub mod feedback;
pub mod link_source;
pub mod walker;

// Re-exports
pub use config::{LinkSourceConfig, WalkConfig, MAX_BRANCH_FACTOR};
pub use controller::{RunController, StepOutcome};
pub use error::{FetchError, WalkError, WalkResult};
pub use feedback::{Feedback, Severity, VisitEntry, VisitLog};
pub use link_source::{
    LinkSource, LinkSourceFactory, MockLinkSource, PageSummary, WikipediaLinkSource,
};
pub use walker::{
    Generation, GraphSnapshot, Selection, StepReport, WalkEngine, WalkStats, WalkStatus,
};
