//! # semestra-engine
//!
//! Schedule materialization and conflict detection for weekly course
//! timetables.
//!
//! The engine turns stored weekly meeting definitions (and imported ICS
//! calendar data) into concrete per-week occurrences, clusters time overlaps
//! between them, and serializes selected week ranges for export. Every
//! computation is a pure function of its inputs plus a read-only
//! [`model::ScheduleSnapshot`]; nothing here writes persisted state.
//!
//! ## Modules
//!
//! - [`importer`] — ICS document → candidate meeting patterns per course
//! - [`resolver`] — meeting pattern + target week → occurrence
//! - [`conflict`] — overlap clustering over one week's occurrences
//! - [`export`] — week-range materialization and ICS serialization
//! - [`heuristics`] — best-effort free-text extraction for the importer
//! - [`dsu`] — union-find used by the conflict detector
//! - [`model`] — data model and wire contracts
//! - [`error`] — error types

pub mod conflict;
pub mod dsu;
pub mod error;
pub mod export;
pub mod heuristics;
pub mod importer;
pub mod model;
pub mod resolver;

pub use conflict::detect_conflicts;
pub use error::EngineError;
pub use export::{export_file_name, materialize, resolve_export_weeks, to_ics};
pub use importer::{parse_ics_schedule, parse_ics_schedule_with, ImportedSchedule};
pub use model::{
    ExportFormat, ExportPayload, ExportRange, ExportScope, MeetingPattern, Occurrence,
    RenderState, ScheduleSnapshot, SemesterBounds, SkipRenderMode, WeekPatternKind, WeekSchedule,
    WeekSelector,
};
pub use resolver::{resolve_occurrence, resolve_week, week_date, week_schedule};
