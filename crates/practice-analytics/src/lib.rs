//! # Practice Analytics
//!
//! Metrics derivation and aggregation engine for practice-group
//! performance reporting. Works entirely in memory over a record set that
//! has already been materialized.
//!
//! ## Pipeline
//!
//! - [`RecordStore`] validates a [`RawSource`] into a read-only [`RecordSet`]
//! - [`derive()`] computes utilization, realization, and hourly rate
//! - [`queries`] filters, aggregates, pivots, and compares years
//! - [`AnalyticsEngine`] turns a [`ReportRequest`] into display-ready tables
//!
//! Undefined ratios (zero denominators) travel as `None` through every
//! stage and are never averaged or summed as zero.
//!
//! The engine performs no authentication. Callers gate access before
//! issuing requests.

#![forbid(unsafe_code)]
#![warn(clippy::all, missing_docs)]

pub mod derive;
pub mod engine;
pub mod error;
pub mod queries;
pub mod reports;
pub mod store;
pub mod views;

pub use derive::derive;
pub use engine::{AnalyticsEngine, ReportRequest};
pub use error::{AnalyticsError, Result};
pub use queries::{Aggregation, GroupSummary, PivotTable, Selection, Summary, YoyRow};
pub use store::{PeriodBatch, RawSource, RecordSet, RecordStore};
pub use views::DisplayValue;
