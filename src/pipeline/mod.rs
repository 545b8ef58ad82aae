//! Ingestion and Scheduling
//!
//! ```text
//! ReadingSource ─► IngestLoop ─┐
//! ReadingSource ─► IngestLoop ─┼─► TrendEngine ◄── AnalysisScheduler ─► ReportPublisher
//! ReadingSource ─► IngestLoop ─┘
//! ```
//!
//! Producers and the scheduler share only the engine; shutdown stops the
//! producers first, then lets the scheduler drain with one final cycle.

pub mod ingest_loop;
pub mod scheduler;
pub mod source;

pub use ingest_loop::{IngestLoop, IngestStats};
pub use scheduler::AnalysisScheduler;
pub use source::{ReadingSource, ReplaySource, SourceEvent, StdinSource};
