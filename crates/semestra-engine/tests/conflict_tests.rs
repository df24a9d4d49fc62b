//! Tests for overlap clustering.

use chrono::NaiveTime;
use semestra_engine::detect_conflicts;
use semestra_engine::model::{Occurrence, WeekPatternKind};

fn time(h: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, min, 0).unwrap()
}

fn occurrence(
    event_id: &str,
    course_id: &str,
    day_of_week: u8,
    start: NaiveTime,
    end: NaiveTime,
) -> Occurrence {
    Occurrence {
        event_id: event_id.to_string(),
        course_id: course_id.to_string(),
        course_name: course_id.to_uppercase(),
        event_type_code: "LECTURE".to_string(),
        section_id: None,
        day_of_week,
        start_time: start,
        end_time: end,
        week_pattern: WeekPatternKind::Every,
        enabled: true,
        skip: false,
        is_conflict: false,
        conflict_group_id: None,
        week: 2,
        title: None,
        note: None,
        render_state: None,
    }
}

#[test]
fn overlapping_different_courses_share_a_group() {
    // Wednesday 10:00-11:00 vs 10:30-11:30, different courses.
    let mut items = vec![
        occurrence("a", "course-1", 3, time(10, 0), time(11, 0)),
        occurrence("b", "course-2", 3, time(10, 30), time(11, 30)),
    ];
    detect_conflicts(&mut items);

    assert!(items[0].is_conflict && items[1].is_conflict);
    assert_eq!(items[0].conflict_group_id.as_deref(), Some("conflict-1"));
    assert_eq!(items[0].conflict_group_id, items[1].conflict_group_id);
}

#[test]
fn same_course_never_conflicts() {
    let mut items = vec![
        occurrence("a", "course-1", 3, time(10, 0), time(11, 0)),
        occurrence("b", "course-1", 3, time(10, 30), time(11, 30)),
    ];
    detect_conflicts(&mut items);

    assert!(!items[0].is_conflict && !items[1].is_conflict);
    assert_eq!(items[0].conflict_group_id, None);
}

#[test]
fn different_days_never_conflict() {
    let mut items = vec![
        occurrence("a", "course-1", 3, time(10, 0), time(11, 0)),
        occurrence("b", "course-2", 4, time(10, 0), time(11, 0)),
    ];
    detect_conflicts(&mut items);
    assert!(!items[0].is_conflict && !items[1].is_conflict);
}

#[test]
fn back_to_back_meetings_are_not_conflicts() {
    // One ends exactly when the other starts: half-open intervals don't touch.
    let mut items = vec![
        occurrence("a", "course-1", 3, time(9, 0), time(10, 0)),
        occurrence("b", "course-2", 3, time(10, 0), time(11, 0)),
    ];
    detect_conflicts(&mut items);
    assert!(!items[0].is_conflict && !items[1].is_conflict);
}

#[test]
fn transitive_overlap_collapses_into_one_cluster() {
    // a overlaps b, b overlaps c, a does not overlap c.
    let mut items = vec![
        occurrence("a", "course-1", 3, time(9, 0), time(10, 0)),
        occurrence("b", "course-2", 3, time(9, 30), time(10, 30)),
        occurrence("c", "course-3", 3, time(10, 15), time(11, 0)),
    ];
    detect_conflicts(&mut items);

    let groups: Vec<_> = items
        .iter()
        .map(|item| item.conflict_group_id.as_deref())
        .collect();
    assert_eq!(groups, vec![Some("conflict-1"); 3]);
}

#[test]
fn disjoint_clusters_get_sequential_ids_in_input_order() {
    let mut items = vec![
        occurrence("a", "course-1", 1, time(9, 0), time(10, 0)),
        occurrence("b", "course-2", 1, time(9, 30), time(10, 30)),
        occurrence("c", "course-3", 5, time(14, 0), time(15, 0)),
        occurrence("d", "course-4", 5, time(14, 30), time(15, 30)),
    ];
    detect_conflicts(&mut items);

    assert_eq!(items[0].conflict_group_id.as_deref(), Some("conflict-1"));
    assert_eq!(items[1].conflict_group_id.as_deref(), Some("conflict-1"));
    assert_eq!(items[2].conflict_group_id.as_deref(), Some("conflict-2"));
    assert_eq!(items[3].conflict_group_id.as_deref(), Some("conflict-2"));
}

#[test]
fn skipped_and_disabled_occurrences_pass_through_untouched() {
    let mut skipped = occurrence("a", "course-1", 3, time(10, 0), time(11, 0));
    skipped.skip = true;
    let mut disabled = occurrence("b", "course-2", 3, time(10, 0), time(11, 0));
    disabled.enabled = false;
    let active = occurrence("c", "course-3", 3, time(10, 0), time(11, 0));

    let mut items = vec![skipped, disabled, active];
    detect_conflicts(&mut items);

    // Only one active occurrence remains, so nothing conflicts.
    for item in &items {
        assert!(!item.is_conflict);
        assert_eq!(item.conflict_group_id, None);
    }
}

#[test]
fn detection_is_idempotent() {
    let mut items = vec![
        occurrence("a", "course-1", 3, time(10, 0), time(11, 0)),
        occurrence("b", "course-2", 3, time(10, 30), time(11, 30)),
        occurrence("c", "course-3", 1, time(9, 0), time(10, 0)),
    ];
    detect_conflicts(&mut items);
    let first_pass = items.clone();
    detect_conflicts(&mut items);
    assert_eq!(items, first_pass, "re-running must not relabel clusters");
}

#[test]
fn empty_input_is_a_no_op() {
    let mut items: Vec<Occurrence> = Vec::new();
    detect_conflicts(&mut items);
    assert!(items.is_empty());
}
