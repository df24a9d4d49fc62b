//! Export materialization -- merges resolved occurrences across a week range
//! and serializes them, either as structured items for visual renderers or as
//! a calendar-interchange (ICS) document.
//!
//! ICS output is fully denormalized: one discrete VEVENT per occurrence, no
//! recurrence rules.

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::conflict::detect_conflicts;
use crate::error::{EngineError, Result};
use crate::model::{
    ExportFormat, ExportPayload, ExportRange, ExportScope, Occurrence, RenderState,
    ScheduleSnapshot, SemesterBounds, SkipRenderMode, WeekSelector,
};
use crate::resolver::{resolve_occurrence, resolve_week, week_date};

/// Resolve a week selector to an ordered list of week indices.
///
/// # Errors
/// `MissingWeekRange` when range is `weeks` without both bounds;
/// `InvalidWeekRange` when startWeek > endWeek; `InvalidWeekIndex` when any
/// selected week falls outside `[1, maxWeek]`.
pub fn resolve_export_weeks(selector: &WeekSelector, bounds: &SemesterBounds) -> Result<Vec<u32>> {
    let max_week = bounds.max_week();
    match selector.range {
        ExportRange::Term => Ok((1..=max_week).collect()),
        ExportRange::Week => Ok(vec![resolve_week(bounds, selector.week)?]),
        ExportRange::Weeks => {
            let (Some(start_week), Some(end_week)) = (selector.start_week, selector.end_week)
            else {
                return Err(EngineError::MissingWeekRange);
            };
            if start_week > end_week {
                return Err(EngineError::InvalidWeekRange);
            }
            if start_week < 1 || end_week > max_week {
                return Err(EngineError::InvalidWeekIndex { max_week });
            }
            Ok((start_week..=end_week).collect())
        }
    }
}

/// Materialize the selected weeks of a snapshot and apply the render policy.
///
/// Each week is resolved and conflict-annotated independently; per-item
/// resolution warnings are dropped here (exports prefer partial output).
/// Skipped occurrences are always dropped from ICS output; structured output
/// drops or grays them according to `mode`. Items keep their week index so
/// multi-week exports can be grouped by the caller.
pub fn materialize(
    snapshot: &ScheduleSnapshot,
    selector: &WeekSelector,
    mode: SkipRenderMode,
    format: ExportFormat,
) -> Result<ExportPayload> {
    let weeks = resolve_export_weeks(selector, &snapshot.semester)?;
    let max_week = snapshot.semester.max_week();

    let mut merged: Vec<Occurrence> = Vec::new();
    for &week in &weeks {
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
        detect_conflicts(&mut items);

        for mut item in items {
            if item.skip {
                match format {
                    ExportFormat::Ics => continue,
                    ExportFormat::Structured => {
                        if mode == SkipRenderMode::HideSkipped {
                            continue;
                        }
                        item.render_state = Some(RenderState::SkippedGray);
                    }
                }
            } else if format == ExportFormat::Structured {
                item.render_state = Some(RenderState::Normal);
            }
            merged.push(item);
        }
    }

    debug!(weeks = weeks.len(), items = merged.len(), "materialized export");
    Ok(ExportPayload {
        weeks,
        items: merged,
    })
}

/// Serialize occurrences as an RFC 5545 calendar document.
///
/// Each occurrence becomes one discrete VEVENT dated
/// `semesterStart + (week-1)*7 + (dayOfWeek-1)` days, with floating local
/// start/end stamps from the stored times-of-day.
pub fn to_ics(snapshot: &ScheduleSnapshot, items: &[Occurrence]) -> String {
    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".to_string(),
        "PRODID:-//Semestra//Schedule Export//EN".to_string(),
        "VERSION:2.0".to_string(),
    ];

    for item in items {
        let event_date = week_date(snapshot.semester.start_date, item.week, item.day_of_week);
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}-{}@semestra", item.event_id, item.week));
        lines.push(format!(
            "SUMMARY:{}",
            escape_text(&format!("{} {}", item.course_name, item.event_type_code))
        ));
        lines.push(format!("DTSTART:{}", ics_stamp(event_date, item.start_time)));
        lines.push(format!("DTEND:{}", ics_stamp(event_date, item.end_time)));
        if let Some(note) = &item.note {
            lines.push(format!("DESCRIPTION:{}", escape_text(note)));
        }
        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());
    let mut document = String::new();
    for line in &lines {
        document.push_str(&fold_line(line));
        document.push_str("\r\n");
    }
    document
}

/// Download filename for an export, e.g. `schedule-semester-abc123.ics`.
pub fn export_file_name(scope: ExportScope, scope_id: &str) -> String {
    format!("schedule-{}-{}.ics", scope.as_str(), scope_id)
}

fn ics_stamp(date: NaiveDate, time: NaiveTime) -> String {
    date.and_time(time).format("%Y%m%dT%H%M%S").to_string()
}

/// Fold a content line at 75 octets (RFC 5545 section 3.1). Continuation
/// lines start with one space that counts toward their own budget; splits
/// land on char boundaries.
fn fold_line(line: &str) -> String {
    const MAX_OCTETS: usize = 75;
    if line.len() <= MAX_OCTETS {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + 3 * (line.len() / MAX_OCTETS + 1));
    let mut budget = MAX_OCTETS;
    let mut used = 0;
    for c in line.chars() {
        let width = c.len_utf8();
        if used + width > budget {
            folded.push_str("\r\n ");
            budget = MAX_OCTETS - 1;
            used = 0;
        }
        folded.push(c);
        used += width;
    }
    folded
}

/// RFC 5545 TEXT escaping for SUMMARY/DESCRIPTION values.
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str(r"\\"),
            ';' => escaped.push_str(r"\;"),
            ',' => escaped.push_str(r"\,"),
            '\n' => escaped.push_str(r"\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_reserved_characters() {
        assert_eq!(escape_text("a,b;c\nd\\e"), r"a\,b\;c\nd\\e");
    }

    #[test]
    fn short_lines_are_not_folded() {
        assert_eq!(fold_line("SUMMARY:MIE100 LECTURE"), "SUMMARY:MIE100 LECTURE");
    }

    #[test]
    fn long_lines_fold_at_75_octets() {
        let line = format!("DESCRIPTION:{}", "x".repeat(100));
        let folded = fold_line(&line);
        for segment in folded.split("\r\n") {
            assert!(segment.len() <= 75, "segment has {} octets", segment.len());
        }
        assert_eq!(folded.replace("\r\n ", ""), line, "unfolding restores the line");
    }

    #[test]
    fn folding_lands_on_char_boundaries() {
        let line = format!("DESCRIPTION:{}", "é".repeat(60));
        let folded = fold_line(&line);
        for segment in folded.split("\r\n") {
            assert!(segment.len() <= 75);
        }
        assert_eq!(folded.replace("\r\n ", ""), line);
    }

    #[test]
    fn file_name_embeds_scope_and_id() {
        assert_eq!(
            export_file_name(ExportScope::Course, "c-42"),
            "schedule-course-c-42.ics"
        );
        assert_eq!(
            export_file_name(ExportScope::Semester, "s-1"),
            "schedule-semester-s-1.ics"
        );
    }
}
