use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{CertificateInsert, Insert, LessonTransition, Store};
use crate::error::Result;
use crate::models::{
    Certificate, Course, Enrollment, Lesson, LessonProgress, LessonStatus, Question, QuizResponse,
};

/// In-process store with the same uniqueness rules as the Postgres schema.
///
/// All state sits behind one mutex, so each trait call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    courses: HashMap<Uuid, Course>,
    lessons: HashMap<Uuid, Lesson>,
    questions: HashMap<Uuid, Question>,
    enrollments: HashMap<(String, Uuid), Enrollment>,
    progress: HashMap<(String, Uuid), LessonProgress>,
    responses: HashMap<(String, Uuid), QuizResponse>,
    certificates: HashMap<(String, Uuid), Certificate>,
    certificate_codes: HashMap<String, (String, Uuid)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // catalogue seeding; the engine never writes these

    pub fn add_course(&self, title: &str) -> Course {
        let course = Course {
            id: Uuid::new_v4(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        self.inner.lock().courses.insert(course.id, course.clone());
        course
    }

    pub fn add_lesson(&self, course_id: Uuid, module_id: Option<Uuid>, title: &str) -> Lesson {
        let mut inner = self.inner.lock();
        let position = inner
            .lessons
            .values()
            .filter(|l| l.course_id == course_id)
            .count() as i32
            + 1;
        let lesson = Lesson {
            id: Uuid::new_v4(),
            course_id,
            module_id,
            title: title.to_string(),
            position,
        };
        inner.lessons.insert(lesson.id, lesson.clone());
        lesson
    }

    pub fn add_question(&self, question: Question) -> Question {
        self.inner
            .lock()
            .questions
            .insert(question.id, question.clone());
        question
    }

    /// Number of certificate rows, across all learners.
    pub fn certificate_count(&self) -> usize {
        self.inner.lock().certificates.len()
    }

    /// Number of response rows, across all learners.
    pub fn response_count(&self) -> usize {
        self.inner.lock().responses.len()
    }
}

impl Inner {
    fn transition(
        &mut self,
        learner_id: &str,
        lesson: &Lesson,
        transition: LessonTransition,
    ) -> LessonProgress {
        let key = (learner_id.to_string(), lesson.id);
        let row = self
            .progress
            .entry(key)
            .or_insert_with(|| LessonProgress::untouched(learner_id, lesson, transition.at));

        let applies = match transition.target {
            LessonStatus::Completed => row.status != LessonStatus::Completed,
            LessonStatus::NotStarted => true,
            LessonStatus::InProgress => row.status == LessonStatus::NotStarted,
        };
        if applies {
            row.status = transition.target;
            row.completed_at =
                (transition.target == LessonStatus::Completed).then_some(transition.at);
            row.updated_at = transition.at;
        }
        row.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn course(&self, course_id: Uuid) -> Result<Option<Course>> {
        Ok(self.inner.lock().courses.get(&course_id).cloned())
    }

    async fn lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>> {
        let mut lessons: Vec<Lesson> = self
            .inner
            .lock()
            .lessons
            .values()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.position);
        Ok(lessons)
    }

    async fn lesson(&self, lesson_id: Uuid) -> Result<Option<Lesson>> {
        Ok(self.inner.lock().lessons.get(&lesson_id).cloned())
    }

    async fn question(&self, question_id: Uuid) -> Result<Option<Question>> {
        Ok(self.inner.lock().questions.get(&question_id).cloned())
    }

    async fn insert_enrollment(&self, enrollment: Enrollment) -> Result<Insert<Enrollment>> {
        let mut inner = self.inner.lock();
        let key = (enrollment.learner_id.clone(), enrollment.course_id);
        if let Some(existing) = inner.enrollments.get(&key) {
            return Ok(Insert::Existing(existing.clone()));
        }
        inner.enrollments.insert(key, enrollment.clone());
        Ok(Insert::Created(enrollment))
    }

    async fn enrollment(&self, learner_id: &str, course_id: Uuid) -> Result<Option<Enrollment>> {
        let key = (learner_id.to_string(), course_id);
        Ok(self.inner.lock().enrollments.get(&key).cloned())
    }

    async fn enrollments(&self, learner_id: &str) -> Result<Vec<Enrollment>> {
        let mut list: Vec<Enrollment> = self
            .inner
            .lock()
            .enrollments
            .values()
            .filter(|e| e.learner_id == learner_id)
            .cloned()
            .collect();
        list.sort_by_key(|e| e.enrolled_at);
        Ok(list)
    }

    async fn lesson_progress(
        &self,
        learner_id: &str,
        lesson_id: Uuid,
    ) -> Result<Option<LessonProgress>> {
        let key = (learner_id.to_string(), lesson_id);
        Ok(self.inner.lock().progress.get(&key).cloned())
    }

    async fn course_progress_rows(
        &self,
        learner_id: &str,
        course_id: Uuid,
    ) -> Result<Vec<LessonProgress>> {
        Ok(self
            .inner
            .lock()
            .progress
            .values()
            .filter(|p| p.learner_id == learner_id && p.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn transition_lesson(
        &self,
        learner_id: &str,
        lesson: &Lesson,
        transition: LessonTransition,
    ) -> Result<LessonProgress> {
        Ok(self.inner.lock().transition(learner_id, lesson, transition))
    }

    async fn response(
        &self,
        learner_id: &str,
        question_id: Uuid,
    ) -> Result<Option<QuizResponse>> {
        let key = (learner_id.to_string(), question_id);
        Ok(self.inner.lock().responses.get(&key).cloned())
    }

    async fn insert_response(
        &self,
        response: QuizResponse,
        completes: Option<&Lesson>,
    ) -> Result<Insert<QuizResponse>> {
        let mut inner = self.inner.lock();
        let key = (response.learner_id.clone(), response.question_id);
        if let Some(existing) = inner.responses.get(&key) {
            return Ok(Insert::Existing(existing.clone()));
        }
        if let Some(lesson) = completes {
            let transition = LessonTransition {
                target: LessonStatus::Completed,
                at: response.created_at,
            };
            inner.transition(&response.learner_id, lesson, transition);
        }
        inner.responses.insert(key, response.clone());
        Ok(Insert::Created(response))
    }

    async fn responses_for_lesson(
        &self,
        learner_id: &str,
        lesson_id: Uuid,
    ) -> Result<Vec<QuizResponse>> {
        let inner = self.inner.lock();
        let mut list: Vec<(i32, QuizResponse)> = inner
            .responses
            .values()
            .filter(|r| r.learner_id == learner_id && r.lesson_id == lesson_id)
            .map(|r| {
                let position = inner
                    .questions
                    .get(&r.question_id)
                    .map(|q| q.position)
                    .unwrap_or(i32::MAX);
                (position, r.clone())
            })
            .collect();
        list.sort_by_key(|(position, r)| (*position, r.created_at));
        Ok(list.into_iter().map(|(_, r)| r).collect())
    }

    async fn insert_certificate(&self, certificate: Certificate) -> Result<CertificateInsert> {
        let mut inner = self.inner.lock();
        let key = (certificate.learner_id.clone(), certificate.course_id);
        if let Some(existing) = inner.certificates.get(&key) {
            return Ok(CertificateInsert::Existing(existing.clone()));
        }
        if inner
            .certificate_codes
            .contains_key(&certificate.verification_code)
        {
            return Ok(CertificateInsert::CodeTaken);
        }
        inner
            .certificate_codes
            .insert(certificate.verification_code.clone(), key.clone());
        inner.certificates.insert(key, certificate.clone());
        Ok(CertificateInsert::Created(certificate))
    }

    async fn certificate(
        &self,
        learner_id: &str,
        course_id: Uuid,
    ) -> Result<Option<Certificate>> {
        let key = (learner_id.to_string(), course_id);
        Ok(self.inner.lock().certificates.get(&key).cloned())
    }

    async fn certificate_by_code(&self, code: &str) -> Result<Option<Certificate>> {
        let inner = self.inner.lock();
        Ok(inner
            .certificate_codes
            .get(code)
            .and_then(|key| inner.certificates.get(key))
            .cloned())
    }
}
