//! Data model and wire contracts for the schedule engine.
//!
//! `MeetingPattern` is the persisted recurring definition (read-only here),
//! `Occurrence` is its per-week materialization, and `ScheduleSnapshot` is the
//! defensively-copied read view a caller fetches once per request. Field names
//! serialize in camelCase to match the surrounding API layer; times-of-day
//! serialize as `"HH:MM"`.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Weekly repetition shape of a meeting pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeekPatternKind {
    /// Matches every week inside the pattern's week range.
    Every,
    /// Matches every second week, anchored at the pattern's start week.
    Alternating,
}

/// A recurring weekly commitment attached to a course.
///
/// Validated before it reaches this engine (day in 1..=7, start < end,
/// startWeek <= endWeek); the resolver still defends against individually
/// malformed records instead of crashing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPattern {
    pub id: String,
    pub course_id: String,
    pub event_type_code: String,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// ISO day of week, 1 = Monday .. 7 = Sunday.
    pub day_of_week: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub week_pattern: WeekPatternKind,
    #[serde(default)]
    pub start_week: Option<u32>,
    /// Absent means "through semester end".
    #[serde(default)]
    pub end_week: Option<u32>,
    pub enabled: bool,
    pub skip: bool,
}

/// Render policy outcome attached to structured-export items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderState {
    Normal,
    SkippedGray,
}

/// One concrete, dated materialization of a meeting pattern for a specific
/// week. Created fresh per resolution call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub event_id: String,
    pub course_id: String,
    pub course_name: String,
    pub event_type_code: String,
    pub section_id: Option<String>,
    pub day_of_week: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub week_pattern: WeekPatternKind,
    pub enabled: bool,
    pub skip: bool,
    pub is_conflict: bool,
    pub conflict_group_id: Option<String>,
    /// The week index this occurrence was resolved for.
    pub week: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_state: Option<RenderState>,
}

/// Semester date range and display timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterBounds {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// IANA timezone identifier, e.g. "America/Toronto".
    pub timezone: String,
}

impl SemesterBounds {
    /// Number of week indices covered by the semester, at least 1.
    pub fn max_week(&self) -> u32 {
        let total_days = (self.end_date - self.start_date).num_days() + 1;
        (total_days + 6).div_euclid(7).max(1) as u32
    }
}

/// Course identity as seen by the engine: just enough to label occurrences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRef {
    pub id: String,
    pub name: String,
}

/// Read-only snapshot of one scope (a course or a whole semester), fetched
/// once at call entry by the storage collaborator. The engine never mutates
/// it, so any number of calls over the same snapshot may run concurrently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSnapshot {
    pub semester: SemesterBounds,
    pub courses: Vec<CourseRef>,
    pub patterns: Vec<MeetingPattern>,
}

impl ScheduleSnapshot {
    /// Display name for a course id, falling back for dangling references.
    pub fn course_name(&self, course_id: &str) -> &str {
        self.courses
            .iter()
            .find(|course| course.id == course_id)
            .map(|course| course.name.as_str())
            .unwrap_or("Unknown Course")
    }
}

/// Schedule query response: one resolved week plus anything the resolver had
/// to drop along the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSchedule {
    pub week: u32,
    pub max_week: u32,
    pub items: Vec<Occurrence>,
    pub warnings: Vec<String>,
}

/// Export scope selector from the export request contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    Course,
    Semester,
}

impl ExportScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportScope::Course => "course",
            ExportScope::Semester => "semester",
        }
    }
}

/// Which weeks an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportRange {
    /// One explicit week, or the current week when none is given.
    Week,
    /// An explicit `[startWeek, endWeek]` span.
    Weeks,
    /// The full term, weeks 1..=maxWeek.
    Term,
}

/// How skipped occurrences render in structured (visual) exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipRenderMode {
    HideSkipped,
    GraySkipped,
}

/// Week selection portion of an export request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSelector {
    pub range: ExportRange,
    #[serde(default)]
    pub week: Option<u32>,
    #[serde(default)]
    pub start_week: Option<u32>,
    #[serde(default)]
    pub end_week: Option<u32>,
}

/// Output serialization target of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Structured items for visual renderers (PNG/PDF layers upstream).
    Structured,
    /// Calendar-interchange output; skipped occurrences are always dropped.
    Ics,
}

/// Merged multi-week export result. Items keep their week index so callers
/// can group them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub weeks: Vec<u32>,
    pub items: Vec<Occurrence>,
}

/// Serde adapter for `"HH:MM"` times-of-day on the wire.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
