//! # Practice Fixtures
//!
//! **NON-PRODUCTION.** Synthetic sample data and a demo report CLI for
//! exercising the practice analytics engine. Nothing in this crate is
//! used by the engine itself.
//!
//! ## Features
//!
//! - Reference January figures for five practice groups
//! - Seeded generation of further months and years
//! - Environment-based configuration
//! - Markdown and JSON report rendering

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod report;
pub mod sample;

pub use config::{Config, ReportFormat};
pub use sample::SampleGenerator;
