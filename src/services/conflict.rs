use std::collections::HashMap;

use chrono::NaiveTime;

use crate::models::{DayOfWeek, Lesson, TimeSpan};

/// Compute, for every lesson id, whether that lesson overlaps another lesson
/// on the same day.
///
/// Lessons are grouped by day, sorted by `(start, end)` and swept once while
/// tracking the lesson whose end reaches furthest. A lesson starting strictly
/// before that furthest end overlaps its owner, so both are flagged. Touching
/// intervals (`end == start`) never conflict. Lessons without a valid span
/// are left out and reported as `false`.
pub fn detect_conflicts(lessons: &[Lesson]) -> HashMap<String, bool> {
    let mut flags: HashMap<String, bool> =
        lessons.iter().map(|l| (l.id.clone(), false)).collect();

    let mut by_day: HashMap<DayOfWeek, Vec<(TimeSpan, usize)>> = HashMap::new();
    for (idx, lesson) in lessons.iter().enumerate() {
        if let Some(span) = lesson.span() {
            by_day.entry(lesson.day_of_week).or_default().push((span, idx));
        }
    }

    for entries in by_day.values_mut() {
        entries.sort_by_key(|(span, _)| (span.start, span.end));

        let mut furthest: Option<(NaiveTime, usize)> = None;
        for &(span, idx) in entries.iter() {
            if let Some((end, owner)) = furthest {
                if span.start < end {
                    flags.insert(lessons[idx].id.clone(), true);
                    flags.insert(lessons[owner].id.clone(), true);
                }
            }
            if furthest.is_none_or(|(end, _)| span.end > end) {
                furthest = Some((span.end, idx));
            }
        }
    }

    flags
}

/// Recompute both derived flags on every lesson in place.
pub fn apply_conflicts(lessons: &mut [Lesson]) {
    let flags = detect_conflicts(lessons);
    for lesson in lessons.iter_mut() {
        lesson.is_invalid = lesson.span().is_none();
        lesson.is_conflict = flags.get(&lesson.id).copied().unwrap_or(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lesson(id: &str, day: DayOfWeek, start: &str, end: &str) -> Lesson {
        Lesson::new(id, format!("Subject {}", id), day, start, end)
    }

    /// Pairwise reference used to cross-check the sweep.
    fn brute_force(lessons: &[Lesson]) -> HashMap<String, bool> {
        let mut flags: HashMap<String, bool> =
            lessons.iter().map(|l| (l.id.clone(), false)).collect();
        for (i, a) in lessons.iter().enumerate() {
            for b in lessons.iter().skip(i + 1) {
                if a.day_of_week != b.day_of_week {
                    continue;
                }
                if let (Some(sa), Some(sb)) = (a.span(), b.span()) {
                    if sa.overlaps(&sb) {
                        flags.insert(a.id.clone(), true);
                        flags.insert(b.id.clone(), true);
                    }
                }
            }
        }
        flags
    }

    #[test]
    fn test_overlapping_lessons_both_flagged() {
        let lessons = vec![
            lesson("a", DayOfWeek::Monday, "09:00", "10:00"),
            lesson("b", DayOfWeek::Monday, "09:30", "10:30"),
        ];

        let flags = detect_conflicts(&lessons);
        assert_eq!(flags["a"], true);
        assert_eq!(flags["b"], true);
    }

    #[test]
    fn test_touching_lessons_do_not_conflict() {
        let lessons = vec![
            lesson("a", DayOfWeek::Monday, "09:00", "10:00"),
            lesson("b", DayOfWeek::Monday, "10:00", "11:00"),
        ];

        let flags = detect_conflicts(&lessons);
        assert_eq!(flags["a"], false);
        assert_eq!(flags["b"], false);
    }

    #[test]
    fn test_same_time_on_different_days_does_not_conflict() {
        let lessons = vec![
            lesson("a", DayOfWeek::Monday, "09:00", "10:00"),
            lesson("b", DayOfWeek::Tuesday, "09:00", "10:00"),
        ];

        let flags = detect_conflicts(&lessons);
        assert!(flags.values().all(|f| !f));
    }

    #[test]
    fn test_long_lesson_flags_every_lesson_it_covers() {
        let lessons = vec![
            lesson("long", DayOfWeek::Wednesday, "08:00", "12:00"),
            lesson("early", DayOfWeek::Wednesday, "08:30", "09:00"),
            lesson("late", DayOfWeek::Wednesday, "11:00", "11:30"),
            lesson("after", DayOfWeek::Wednesday, "12:00", "13:00"),
        ];

        let flags = detect_conflicts(&lessons);
        assert_eq!(flags["long"], true);
        assert_eq!(flags["early"], true);
        assert_eq!(flags["late"], true);
        assert_eq!(flags["after"], false);
    }

    #[test]
    fn test_identical_intervals_conflict() {
        let lessons = vec![
            lesson("a", DayOfWeek::Friday, "14:00", "15:00"),
            lesson("b", DayOfWeek::Friday, "14:00", "15:00"),
        ];

        let flags = detect_conflicts(&lessons);
        assert_eq!(flags["a"], true);
        assert_eq!(flags["b"], true);
    }

    #[test]
    fn test_zero_duration_lesson_is_excluded() {
        let lessons = vec![
            lesson("zero", DayOfWeek::Monday, "09:30", "09:30"),
            lesson("a", DayOfWeek::Monday, "09:00", "10:00"),
        ];

        let flags = detect_conflicts(&lessons);
        assert_eq!(flags["zero"], false);
        assert_eq!(flags["a"], false);
    }

    #[test]
    fn test_apply_conflicts_marks_invalid_and_overwrites_stale_flags() {
        let mut stale = lesson("a", DayOfWeek::Monday, "09:00", "10:00");
        stale.is_conflict = true;
        let mut lessons = vec![
            stale,
            lesson("bad", DayOfWeek::Monday, "9 o'clock", "10:00"),
            lesson("reversed", DayOfWeek::Monday, "11:00", "10:00"),
        ];

        apply_conflicts(&mut lessons);

        assert!(!lessons[0].is_conflict());
        assert!(!lessons[0].is_invalid());
        assert!(lessons[1].is_invalid());
        assert!(!lessons[1].is_conflict());
        assert!(lessons[2].is_invalid());
    }

    #[test]
    fn test_apply_conflicts_is_idempotent() {
        let mut lessons = vec![
            lesson("a", DayOfWeek::Thursday, "09:00", "10:00"),
            lesson("b", DayOfWeek::Thursday, "09:45", "11:00"),
            lesson("c", DayOfWeek::Thursday, "11:00", "12:00"),
        ];

        apply_conflicts(&mut lessons);
        let first = lessons.clone();
        apply_conflicts(&mut lessons);

        assert_eq!(first, lessons);
    }

    #[test]
    fn test_sweep_matches_pairwise_on_mixed_week() {
        let lessons = vec![
            lesson("m1", DayOfWeek::Monday, "08:00", "09:30"),
            lesson("m2", DayOfWeek::Monday, "09:30", "10:00"),
            lesson("m3", DayOfWeek::Monday, "09:45", "11:00"),
            lesson("m4", DayOfWeek::Monday, "13:00", "14:00"),
            lesson("t1", DayOfWeek::Tuesday, "10:00", "12:00"),
            lesson("t2", DayOfWeek::Tuesday, "10:15", "10:45"),
            lesson("t3", DayOfWeek::Tuesday, "11:59", "13:00"),
            lesson("s1", DayOfWeek::Saturday, "10:00", "10:00"),
        ];

        assert_eq!(detect_conflicts(&lessons), brute_force(&lessons));
    }

    fn arb_week() -> impl Strategy<Value = Vec<Lesson>> {
        prop::collection::vec((0usize..3, 0u32..40, 0u32..8), 0..24).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (day, slot, len))| {
                    let start = 8 * 60 + slot * 15;
                    let end = start + len * 15;
                    lesson(
                        &format!("l{}", i),
                        DayOfWeek::ALL[day],
                        &format!("{:02}:{:02}", start / 60, start % 60),
                        &format!("{:02}:{:02}", end / 60, end % 60),
                    )
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_sweep_matches_pairwise(lessons in arb_week()) {
            prop_assert_eq!(detect_conflicts(&lessons), brute_force(&lessons));
        }

        #[test]
        fn prop_output_is_order_independent(
            (original, shuffled) in arb_week().prop_flat_map(|week| (Just(week.clone()), Just(week).prop_shuffle()))
        ) {
            prop_assert_eq!(detect_conflicts(&original), detect_conflicts(&shuffled));
        }
    }
}
