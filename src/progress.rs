// Completion percentage derived from lesson progress rows. Nothing here is persisted.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::models::{CourseProgress, Lesson, LessonProgress, LessonStatus, ModuleProgress};

/// `round(100 * completed / total)` with halves rounded up, `0` for an empty course.
///
/// A course that is not fully complete never reports 100, even when the
/// rounded ratio would (199 of 200 lessons).
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    let rounded = (200 * completed + total) / (2 * total);
    if completed < total {
        rounded.min(99) as u8
    } else {
        100
    }
}

/// Builds the progress view for `lessons` (ordered) from whatever rows exist.
///
/// Rows for lessons outside the list are ignored; lessons without a row
/// count as not started.
pub fn summarize(
    learner_id: &str,
    course_id: Uuid,
    lessons: &[Lesson],
    rows: &[LessonProgress],
) -> CourseProgress {
    let by_lesson: HashMap<Uuid, LessonStatus> =
        rows.iter().map(|r| (r.lesson_id, r.status)).collect();

    let mut per_lesson_status = BTreeMap::new();
    let mut modules: Vec<ModuleProgress> = Vec::new();
    let mut completed = 0;

    for lesson in lessons {
        let status = by_lesson.get(&lesson.id).copied().unwrap_or_default();
        let done = status == LessonStatus::Completed;
        if done {
            completed += 1;
        }
        per_lesson_status.insert(lesson.id, status);

        let idx = match modules.iter().position(|m| m.module_id == lesson.module_id) {
            Some(idx) => idx,
            None => {
                modules.push(ModuleProgress {
                    module_id: lesson.module_id,
                    completed_lessons: 0,
                    total_lessons: 0,
                    percent: 0,
                });
                modules.len() - 1
            }
        };
        let module = &mut modules[idx];
        module.total_lessons += 1;
        if done {
            module.completed_lessons += 1;
        }
    }

    for module in &mut modules {
        module.percent = percent(module.completed_lessons, module.total_lessons);
    }

    let total = lessons.len();
    CourseProgress {
        learner_id: learner_id.to_string(),
        course_id,
        completed_lessons: completed,
        total_lessons: total,
        percent: percent(completed, total),
        is_complete: total > 0 && completed == total,
        per_lesson_status,
        modules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lesson(course_id: Uuid, module_id: Option<Uuid>, position: i32) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            course_id,
            module_id,
            title: format!("Lesson {position}"),
            position,
        }
    }

    fn row(lesson: &Lesson, status: LessonStatus) -> LessonProgress {
        LessonProgress {
            learner_id: "learner-1".into(),
            lesson_id: lesson.id,
            course_id: lesson.course_id,
            status,
            completed_at: (status == LessonStatus::Completed).then(Utc::now),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(0, 4), 0);
        assert_eq!(percent(3, 4), 75);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(4, 4), 100);
    }

    #[test]
    fn percent_reserves_100_for_complete_courses() {
        assert_eq!(percent(199, 200), 99);
        assert_eq!(percent(200, 200), 100);
    }

    #[test]
    fn empty_course_is_never_complete() {
        let p = summarize("learner-1", Uuid::new_v4(), &[], &[]);
        assert_eq!(p.percent, 0);
        assert!(!p.is_complete);
        assert!(p.modules.is_empty());
    }

    #[test]
    fn in_progress_does_not_count_and_foreign_rows_are_ignored() {
        let course = Uuid::new_v4();
        let lessons = vec![lesson(course, None, 1), lesson(course, None, 2)];
        let stray = lesson(Uuid::new_v4(), None, 1);
        let rows = vec![
            row(&lessons[0], LessonStatus::Completed),
            row(&lessons[1], LessonStatus::InProgress),
            row(&stray, LessonStatus::Completed),
        ];

        let p = summarize("learner-1", course, &lessons, &rows);
        assert_eq!(p.completed_lessons, 1);
        assert_eq!(p.percent, 50);
        assert_eq!(p.per_lesson_status.len(), 2);
        assert_eq!(p.per_lesson_status[&lessons[1].id], LessonStatus::InProgress);
    }

    #[test]
    fn groups_by_module_in_lesson_order() {
        let course = Uuid::new_v4();
        let (m1, m2) = (Uuid::new_v4(), Uuid::new_v4());
        let lessons = vec![
            lesson(course, Some(m1), 1),
            lesson(course, Some(m1), 2),
            lesson(course, Some(m2), 3),
        ];
        let rows = vec![
            row(&lessons[0], LessonStatus::Completed),
            row(&lessons[2], LessonStatus::Completed),
        ];

        let p = summarize("learner-1", course, &lessons, &rows);
        assert_eq!(p.modules.len(), 2);
        assert_eq!(p.modules[0].module_id, Some(m1));
        assert_eq!(p.modules[0].percent, 50);
        assert_eq!(p.modules[1].percent, 100);
        assert_eq!(p.percent, 67);
    }
}
