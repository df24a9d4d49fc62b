//! Week pattern resolution -- decides whether a meeting pattern materializes
//! into an occurrence for a given week, and which week "now" falls in.
//!
//! Resolution is a pure function of the pattern and the target week. A
//! malformed pattern is dropped with a caller-visible warning instead of
//! aborting the surrounding multi-item resolution.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::conflict::detect_conflicts;
use crate::error::{EngineError, Result};
use crate::model::{
    MeetingPattern, Occurrence, ScheduleSnapshot, SemesterBounds, WeekPatternKind, WeekSchedule,
};

/// Whether `kind` matches `week`, anchored at `anchor_week`.
///
/// EVERY always matches. ALTERNATING matches every second week counted from
/// the anchor, so an anchor of 1 matches weeks {1, 3, 5, ...}.
pub fn matches_week_pattern(kind: WeekPatternKind, week: u32, anchor_week: u32) -> bool {
    match kind {
        WeekPatternKind::Every => true,
        WeekPatternKind::Alternating => (i64::from(week) - i64::from(anchor_week)) % 2 == 0,
    }
}

/// Concrete date of an occurrence: semester start plus whole weeks plus the
/// day offset inside the week.
pub fn week_date(semester_start: NaiveDate, week: u32, day_of_week: u8) -> NaiveDate {
    semester_start
        + Duration::days((i64::from(week) - 1) * 7 + i64::from(day_of_week) - 1)
}

/// Resolve one pattern against one week.
///
/// Returns `None` when the pattern does not materialize for this week; only
/// defensive failures (bad time/day data, inverted week range) also append to
/// `warnings`. Out-of-range weeks and disabled patterns drop silently.
pub fn resolve_occurrence(
    pattern: &MeetingPattern,
    course_name: &str,
    week: u32,
    max_week: u32,
    warnings: &mut Vec<String>,
) -> Option<Occurrence> {
    // Stored fields are validated upstream; a record that slips through
    // malformed is skipped rather than crashing the whole resolution.
    if pattern.start_time >= pattern.end_time || !(1..=7).contains(&pattern.day_of_week) {
        debug!(event_id = %pattern.id, "dropping pattern with invalid time/day data");
        warnings.push(format!(
            "Skipped invalid event '{}' due to invalid time/day data.",
            pattern.id
        ));
        return None;
    }

    let effective_start = pattern.start_week.unwrap_or(1);
    let effective_end = pattern.end_week.unwrap_or(max_week);
    if effective_start > effective_end {
        debug!(event_id = %pattern.id, "dropping pattern with inverted week range");
        warnings.push(format!(
            "Skipped invalid event '{}' due to invalid week range.",
            pattern.id
        ));
        return None;
    }
    if week < effective_start || week > effective_end {
        return None;
    }
    if !matches_week_pattern(pattern.week_pattern, week, effective_start) {
        return None;
    }
    if !pattern.enabled {
        return None;
    }

    Some(Occurrence {
        event_id: pattern.id.clone(),
        course_id: pattern.course_id.clone(),
        course_name: course_name.to_string(),
        event_type_code: pattern.event_type_code.clone(),
        section_id: pattern.section_id.clone(),
        day_of_week: pattern.day_of_week,
        start_time: pattern.start_time,
        end_time: pattern.end_time,
        week_pattern: pattern.week_pattern,
        enabled: pattern.enabled,
        skip: pattern.skip,
        is_conflict: false,
        conflict_group_id: None,
        week,
        title: pattern.title.clone(),
        note: pattern.note.clone(),
        render_state: None,
    })
}

/// Week index containing `today`, or 1 when today is outside the semester.
pub fn current_week_on(bounds: &SemesterBounds, today: NaiveDate) -> u32 {
    if today >= bounds.start_date && today <= bounds.end_date {
        ((today - bounds.start_date).num_days() / 7) as u32 + 1
    } else {
        1
    }
}

/// Resolve the target week for a request.
///
/// An explicit week must lie within `[1, maxWeek]`. With no explicit week,
/// "today" is computed in the semester's timezone and mapped through
/// [`current_week_on`].
///
/// # Errors
/// `InvalidWeekIndex` for an out-of-range explicit week; `InvalidTimezone`
/// when the semester carries an unrecognized IANA zone.
pub fn resolve_week(bounds: &SemesterBounds, requested_week: Option<u32>) -> Result<u32> {
    let max_week = bounds.max_week();
    if let Some(week) = requested_week {
        if week < 1 || week > max_week {
            return Err(EngineError::InvalidWeekIndex { max_week });
        }
        return Ok(week);
    }

    let tz: chrono_tz::Tz = bounds
        .timezone
        .parse()
        .map_err(|_| EngineError::InvalidTimezone(bounds.timezone.clone()))?;
    let today = Utc::now().with_timezone(&tz).date_naive();
    Ok(current_week_on(bounds, today))
}

/// Materialize one week of a snapshot: resolve every pattern, then optionally
/// annotate overlap clusters.
pub fn week_schedule(
    snapshot: &ScheduleSnapshot,
    requested_week: Option<u32>,
    with_conflicts: bool,
) -> Result<WeekSchedule> {
    let max_week = snapshot.semester.max_week();
    let week = resolve_week(&snapshot.semester, requested_week)?;

    let mut warnings = Vec::new();
    let mut items: Vec<Occurrence> = snapshot
        .patterns
        .iter()
        .filter_map(|pattern| {
            resolve_occurrence(
                pattern,
                snapshot.course_name(&pattern.course_id),
                week,
                max_week,
                &mut warnings,
            )
        })
        .collect();

    if with_conflicts {
        detect_conflicts(&mut items);
    }

    Ok(WeekSchedule {
        week,
        max_week,
        items,
        warnings,
    })
}

// Keeps the ISO weekday convention in one place for the importer.
pub(crate) fn iso_weekday(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}
