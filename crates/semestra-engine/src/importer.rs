//! ICS import -- parses an uploaded calendar document, expands weekly
//! recurrence rules into concrete dates, and regroups them into compact
//! candidate meeting patterns per course.
//!
//! The importer is read-only: accepted candidates are persisted by the
//! storage collaborator, not here. A single bad VEVENT is skipped, never
//! fatal; only a document with no parseable calendar at all errors out.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::BufReader;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use ical::parser::ical::component::IcalEvent;
use ical::IcalParser;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::heuristics::{
    extract_category, extract_section, extract_title_and_instructor, normalize_course_name,
    EventTypeCatalog,
};
use crate::model::WeekPatternKind;
use crate::resolver::iso_weekday;

/// Hard cap on iterated weeks during rule expansion, regardless of what the
/// rule claims. Guards against pathological input.
const MAX_EXPANSION_WEEKS: i64 = 128;

/// Default bounded window when a weekly rule carries neither UNTIL nor COUNT.
const DEFAULT_WINDOW_WEEKS: i64 = 16;

/// A meeting pattern derived from the document, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMeeting {
    pub event_type_code: String,
    pub section_id: Option<String>,
    pub title: Option<String>,
    pub instructor: Option<String>,
    pub location: Option<String>,
    pub day_of_week: u8,
    #[serde(with = "crate::model::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::model::hhmm")]
    pub end_time: NaiveTime,
    pub week_pattern: WeekPatternKind,
    pub start_week: u32,
    pub end_week: u32,
    pub note: Option<String>,
}

/// One derived course with its candidate meetings, ordered by day and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedCourse {
    pub name: String,
    pub category: Option<String>,
    pub meetings: Vec<CandidateMeeting>,
}

/// Full import result: derived courses plus the overall date span observed,
/// used to seed the semester's date range when the caller has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedSchedule {
    pub semester_start: Option<NaiveDate>,
    pub semester_end: Option<NaiveDate>,
    pub courses: Vec<ImportedCourse>,
}

/// A timed VEVENT flattened to one concrete occurrence date.
struct RawMeeting {
    course_name: String,
    event_type_code: String,
    section_id: Option<String>,
    title: Option<String>,
    instructor: Option<String>,
    location: Option<String>,
    day_of_week: u8,
    start_time: NaiveTime,
    end_time: NaiveTime,
    date: NaiveDate,
    note: Option<String>,
}

/// Signature that identifies one weekly meeting across its expanded dates.
#[derive(PartialEq, Eq, Hash)]
struct MeetingSignature {
    event_type_code: String,
    section_id: Option<String>,
    title: Option<String>,
    instructor: Option<String>,
    location: Option<String>,
    day_of_week: u8,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

struct MeetingAggregate {
    weeks: BTreeSet<u32>,
    note: Option<String>,
}

/// A DTSTART/DTEND value; date-only values come from all-day entries.
#[derive(Debug, Clone, Copy, PartialEq)]
enum IcsInstant {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl IcsInstant {
    fn date(self) -> NaiveDate {
        match self {
            IcsInstant::Date(date) => date,
            IcsInstant::DateTime(datetime) => datetime.date(),
        }
    }
}

/// Weekly repetition rule reduced to the fields the importer expands.
#[derive(Debug, Clone, PartialEq)]
struct WeeklyRecurrence {
    interval: u32,
    end_date: NaiveDate,
    by_days: Vec<u8>,
    count: Option<u32>,
}

impl WeeklyRecurrence {
    /// A rule-less entry occurs exactly once, on its start date.
    fn single(start_date: NaiveDate) -> Self {
        Self {
            interval: 1,
            end_date: start_date,
            by_days: Vec::new(),
            count: Some(1),
        }
    }
}

/// Parse an ICS document into candidate courses using the builtin event-type
/// catalog.
pub fn parse_ics_schedule(bytes: &[u8]) -> Result<ImportedSchedule> {
    parse_ics_schedule_with(bytes, &EventTypeCatalog::default())
}

/// Parse an ICS document into candidate courses.
///
/// Entries without parseable start/end instants are skipped; all-day entries
/// contribute only to the observed date span. A document with no usable
/// weekly events still returns that span and an empty course list.
///
/// # Errors
/// `InvalidCalendar` when the document itself cannot be parsed.
pub fn parse_ics_schedule_with(
    bytes: &[u8],
    catalog: &EventTypeCatalog,
) -> Result<ImportedSchedule> {
    let mut raw_meetings: Vec<RawMeeting> = Vec::new();
    let mut range_candidates: Vec<(NaiveDate, NaiveDate)> = Vec::new();
    let mut saw_calendar = false;

    for calendar in IcalParser::new(BufReader::new(bytes)) {
        let calendar =
            calendar.map_err(|error| EngineError::InvalidCalendar(error.to_string()))?;
        saw_calendar = true;

        for event in &calendar.events {
            collect_event(event, catalog, &mut raw_meetings, &mut range_candidates);
        }
    }

    if !saw_calendar {
        return Err(EngineError::InvalidCalendar(
            "no VCALENDAR component found".to_string(),
        ));
    }

    if raw_meetings.is_empty() {
        let semester_start = range_candidates.iter().map(|(start, _)| *start).min();
        let semester_end = range_candidates.iter().map(|(_, end)| *end).max();
        return Ok(ImportedSchedule {
            semester_start,
            semester_end,
            courses: Vec::new(),
        });
    }

    // The earliest date seen across the whole document is week 1.
    let mut semester_start = raw_meetings.iter().map(|m| m.date).min().unwrap_or_default();
    let mut semester_end = raw_meetings.iter().map(|m| m.date).max().unwrap_or_default();
    for (start, end) in &range_candidates {
        semester_start = semester_start.min(*start);
        semester_end = semester_end.max(*end);
    }

    let courses = group_meetings(raw_meetings, semester_start);

    Ok(ImportedSchedule {
        semester_start: Some(semester_start),
        semester_end: Some(semester_end),
        courses,
    })
}

/// Extract everything usable from one VEVENT, expanding its recurrence.
fn collect_event(
    event: &IcalEvent,
    catalog: &EventTypeCatalog,
    raw_meetings: &mut Vec<RawMeeting>,
    range_candidates: &mut Vec<(NaiveDate, NaiveDate)>,
) {
    let start = property_value(event, "DTSTART").and_then(parse_ics_instant);
    let end = property_value(event, "DTEND").and_then(parse_ics_instant);
    let (Some(start), Some(end)) = (start, end) else {
        warn!("skipping VEVENT with missing or unparseable DTSTART/DTEND");
        return;
    };

    // Every dated entry widens the observed span, even ones that produce no
    // meeting. Date-only DTEND is exclusive in ICS; make it inclusive.
    let start_date = start.date();
    let end_date = match end {
        IcsInstant::Date(date) => date - Duration::days(1),
        IcsInstant::DateTime(datetime) => datetime.date(),
    };
    range_candidates.push((start_date, end_date.max(start_date)));

    let (IcsInstant::DateTime(start_dt), IcsInstant::DateTime(end_dt)) = (start, end) else {
        return;
    };
    if end_dt <= start_dt {
        warn!("skipping VEVENT with non-positive duration");
        return;
    }

    let summary = property_value(event, "SUMMARY")
        .map(unescape_text)
        .unwrap_or_default();
    let summary = summary.trim();
    if summary.is_empty() {
        return;
    }

    let course_name = normalize_course_name(summary);
    if course_name.is_empty() {
        return;
    }

    let (section_prefix, section_id) = extract_section(summary);
    let event_type_code = catalog
        .event_type_for(summary, section_prefix.as_deref())
        .to_uppercase();
    let location = property_value(event, "LOCATION")
        .map(unescape_text)
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    let description = property_value(event, "DESCRIPTION")
        .map(unescape_text)
        .map(|d| d.trim().to_string())
        .unwrap_or_default();
    let (title, instructor) = extract_title_and_instructor(&description, &course_name);
    let note = if description.is_empty() {
        None
    } else {
        Some(description)
    };

    let recurrence = parse_weekly_recurrence(property_value(event, "RRULE"), start_dt.date());
    let occurrence_dates = expand_occurrence_dates(start_dt.date(), &recurrence);
    debug!(
        course = %course_name,
        occurrences = occurrence_dates.len(),
        "expanded VEVENT"
    );

    for date in occurrence_dates {
        raw_meetings.push(RawMeeting {
            course_name: course_name.clone(),
            event_type_code: event_type_code.clone(),
            section_id: section_id.clone(),
            title: title.clone(),
            instructor: instructor.clone(),
            location: location.clone(),
            day_of_week: iso_weekday(date),
            start_time: start_dt.time(),
            end_time: end_dt.time(),
            date,
            note: note.clone(),
        });
    }
}

/// Regroup flattened occurrences by meeting signature per course.
fn group_meetings(raw_meetings: Vec<RawMeeting>, semester_start: NaiveDate) -> Vec<ImportedCourse> {
    let mut grouped: BTreeMap<String, HashMap<MeetingSignature, MeetingAggregate>> =
        BTreeMap::new();

    for meeting in raw_meetings {
        let week = week_index_of(meeting.date, semester_start);
        let signature = MeetingSignature {
            event_type_code: meeting.event_type_code,
            section_id: meeting.section_id,
            title: meeting.title,
            instructor: meeting.instructor,
            location: meeting.location,
            day_of_week: meeting.day_of_week,
            start_time: meeting.start_time,
            end_time: meeting.end_time,
        };

        let aggregate = grouped
            .entry(meeting.course_name)
            .or_default()
            .entry(signature)
            .or_insert_with(|| MeetingAggregate {
                weeks: BTreeSet::new(),
                note: None,
            });
        aggregate.weeks.insert(week);
        if aggregate.note.is_none() {
            aggregate.note = meeting.note;
        }
    }

    grouped
        .into_iter()
        .map(|(name, meetings_by_signature)| {
            let mut meetings: Vec<CandidateMeeting> = meetings_by_signature
                .into_iter()
                .map(|(signature, aggregate)| {
                    let weeks: Vec<u32> = aggregate.weeks.iter().copied().collect();
                    CandidateMeeting {
                        event_type_code: signature.event_type_code,
                        section_id: signature.section_id,
                        title: signature.title,
                        instructor: signature.instructor,
                        location: signature.location,
                        day_of_week: signature.day_of_week,
                        start_time: signature.start_time,
                        end_time: signature.end_time,
                        week_pattern: classify_week_pattern(&weeks),
                        start_week: weeks[0],
                        end_week: weeks[weeks.len() - 1],
                        note: aggregate.note,
                    }
                })
                .collect();

            meetings.sort_by(|a, b| {
                (a.day_of_week, a.start_time, &a.event_type_code, &a.section_id).cmp(&(
                    b.day_of_week,
                    b.start_time,
                    &b.event_type_code,
                    &b.section_id,
                ))
            });

            ImportedCourse {
                category: extract_category(&name),
                name,
                meetings,
            }
        })
        .collect()
}

/// 1-based week index of a date relative to the semester start, clamped to 1.
fn week_index_of(date: NaiveDate, semester_start: NaiveDate) -> u32 {
    let week = (date - semester_start).num_days().div_euclid(7) + 1;
    week.max(1) as u32
}

/// ALTERNATING iff the sorted week indices step by exactly 2 throughout;
/// anything else (including a single week) is EVERY.
fn classify_week_pattern(weeks: &[u32]) -> WeekPatternKind {
    if weeks.len() <= 1 {
        return WeekPatternKind::Every;
    }
    if weeks.windows(2).all(|pair| pair[1] - pair[0] == 2) {
        WeekPatternKind::Alternating
    } else {
        WeekPatternKind::Every
    }
}

/// Reduce an RRULE property to a bounded weekly recurrence.
///
/// Non-weekly frequencies fall back to a single occurrence. The expansion
/// bound comes from UNTIL when present, else is approximated from COUNT as
/// `count*interval*7 + 7` days (capped at the 128-week expansion limit), else
/// defaults to a 16-week window.
fn parse_weekly_recurrence(rrule: Option<&str>, start_date: NaiveDate) -> WeeklyRecurrence {
    let Some(rrule) = rrule else {
        return WeeklyRecurrence::single(start_date);
    };

    let parts: HashMap<String, String> = rrule
        .split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(key, value)| (key.trim().to_uppercase(), value.trim().to_string()))
        .collect();

    if parts.get("FREQ").map(|f| f.to_uppercase()).as_deref() != Some("WEEKLY") {
        debug!("non-weekly RRULE, treating as single occurrence");
        return WeeklyRecurrence::single(start_date);
    }

    // Clamped to the expansion cap: a larger step can never produce a second
    // occurrence anyway, and unbounded values overflow date arithmetic.
    let interval = parts
        .get("INTERVAL")
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_EXPANSION_WEEKS as u32);

    let until = parts
        .get("UNTIL")
        .and_then(|value| parse_ics_instant(value))
        .map(IcsInstant::date);

    let count = parts
        .get("COUNT")
        .map(|value| value.parse::<u32>().unwrap_or(1).max(1));

    let end_date = match (until, count) {
        (Some(until_date), _) => until_date,
        (None, Some(count)) => {
            let window_weeks = i64::from(count)
                .saturating_mul(i64::from(interval))
                .min(MAX_EXPANSION_WEEKS);
            start_date + Duration::days(window_weeks * 7 + 7)
        }
        (None, None) => start_date + Duration::days(DEFAULT_WINDOW_WEEKS * 7),
    };

    let by_days = parts
        .get("BYDAY")
        .map(|value| parse_byday(value))
        .unwrap_or_default();

    WeeklyRecurrence {
        interval,
        end_date: end_date.max(start_date),
        by_days,
        count,
    }
}

/// BYDAY tokens to ISO weekday numbers, sorted and deduplicated. Ordinal
/// prefixes ("2MO") keep only the weekday part.
fn parse_byday(value: &str) -> Vec<u8> {
    let mut days: BTreeSet<u8> = BTreeSet::new();
    for token in value.split(',') {
        let normalized = token.trim().to_uppercase();
        if normalized.is_empty() {
            continue;
        }
        // Last two chars, not bytes: a stray multibyte token must be ignored,
        // never split mid-character.
        let chars: Vec<char> = normalized.chars().collect();
        let day_token: String = chars[chars.len().saturating_sub(2)..].iter().collect();
        let iso_day = match day_token.as_str() {
            "MO" => 1,
            "TU" => 2,
            "WE" => 3,
            "TH" => 4,
            "FR" => 5,
            "SA" => 6,
            "SU" => 7,
            _ => continue,
        };
        days.insert(iso_day);
    }
    days.into_iter().collect()
}

/// Expand a bounded weekly recurrence into concrete dates.
///
/// Walks Monday-anchored weeks stepping `interval` weeks at a time, applying
/// the by-day set (or the start date's weekday) within each. COUNT clamps the
/// total; iteration is capped at 128 weeks regardless of the rule. An empty
/// expansion degrades to the start date itself.
fn expand_occurrence_dates(start_date: NaiveDate, recurrence: &WeeklyRecurrence) -> Vec<NaiveDate> {
    let days: Vec<u8> = if recurrence.by_days.is_empty() {
        vec![iso_weekday(start_date)]
    } else {
        recurrence.by_days.clone()
    };
    let week_anchor = start_date - Duration::days(i64::from(iso_weekday(start_date)) - 1);
    let step_days = i64::from(recurrence.interval.clamp(1, MAX_EXPANSION_WEEKS as u32)) * 7;

    let mut occurrences: Vec<NaiveDate> = Vec::new();
    for iteration in 0..MAX_EXPANSION_WEEKS {
        let Some(week_start) =
            week_anchor.checked_add_signed(Duration::days(iteration * step_days))
        else {
            break;
        };
        if week_start > recurrence.end_date + Duration::days(7) {
            break;
        }
        for &day in &days {
            let date = week_start + Duration::days(i64::from(day) - 1);
            if date < start_date || date > recurrence.end_date {
                continue;
            }
            occurrences.push(date);
            if let Some(count) = recurrence.count {
                if occurrences.len() >= count as usize {
                    return occurrences;
                }
            }
        }
    }

    if occurrences.is_empty() {
        return vec![start_date];
    }
    occurrences.sort_unstable();
    occurrences.dedup();
    occurrences
}

/// First value of a named property on the event, if any.
fn property_value<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a str> {
    event
        .properties
        .iter()
        .find(|property| property.name.eq_ignore_ascii_case(name))
        .and_then(|property| property.value.as_deref())
}

/// Parse an ICS date or date-time value ("20260105" / "20260105T100000",
/// optional trailing Z).
fn parse_ics_instant(value: &str) -> Option<IcsInstant> {
    let trimmed = value.trim().trim_end_matches(['Z', 'z']);
    if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, "%Y%m%dT%H%M%S") {
        return Some(IcsInstant::DateTime(datetime));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y%m%d") {
        return Some(IcsInstant::Date(date));
    }
    None
}

/// Undo RFC 5545 text escaping on SUMMARY/DESCRIPTION/LOCATION values.
fn unescape_text(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => result.push('\n'),
            Some(escaped) => result.push(escaped),
            None => result.push('\\'),
        }
    }
    result
}
