//! Storage seam for the progress engine.
//!
//! Every write that must happen at most once (enrollment, quiz response,
//! certificate) is a conditional insert reporting whether it created the row
//! or found an existing one. Backends enforce this themselves; callers never
//! check-then-insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Certificate, Course, Enrollment, Lesson, LessonProgress, LessonStatus, Question, QuizResponse,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result of a conditional insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insert<T> {
    Created(T),
    Existing(T),
}

impl<T> Insert<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Insert::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Insert::Created(v) | Insert::Existing(v) => v,
        }
    }
}

/// Result of inserting a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateInsert {
    Created(Certificate),
    /// The learner already holds a certificate for the course.
    Existing(Certificate),
    /// Another certificate already uses the verification code.
    CodeTaken,
}

/// Lesson transition requested from the store.
///
/// * `Completed` applies unless the lesson is already completed, so the
///   original `completed_at` is kept.
/// * `NotStarted` always applies and clears `completed_at`.
/// * `InProgress` only applies to a lesson that is not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonTransition {
    pub target: LessonStatus,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<()>;

    // course structure, read-only
    async fn course(&self, course_id: Uuid) -> Result<Option<Course>>;
    /// Lessons of a course ordered by position.
    async fn lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>>;
    async fn lesson(&self, lesson_id: Uuid) -> Result<Option<Lesson>>;
    async fn question(&self, question_id: Uuid) -> Result<Option<Question>>;

    // enrollments
    async fn insert_enrollment(&self, enrollment: Enrollment) -> Result<Insert<Enrollment>>;
    async fn enrollment(&self, learner_id: &str, course_id: Uuid) -> Result<Option<Enrollment>>;
    async fn enrollments(&self, learner_id: &str) -> Result<Vec<Enrollment>>;

    // lesson progress
    async fn lesson_progress(
        &self,
        learner_id: &str,
        lesson_id: Uuid,
    ) -> Result<Option<LessonProgress>>;
    async fn course_progress_rows(
        &self,
        learner_id: &str,
        course_id: Uuid,
    ) -> Result<Vec<LessonProgress>>;
    /// Applies `transition` and returns the resulting row.
    async fn transition_lesson(
        &self,
        learner_id: &str,
        lesson: &Lesson,
        transition: LessonTransition,
    ) -> Result<LessonProgress>;

    // quiz responses
    async fn response(&self, learner_id: &str, question_id: Uuid)
        -> Result<Option<QuizResponse>>;
    /// Inserts a response unless one exists. When `completes` is given and the
    /// response is created, that lesson is completed in the same unit of work.
    async fn insert_response(
        &self,
        response: QuizResponse,
        completes: Option<&Lesson>,
    ) -> Result<Insert<QuizResponse>>;
    async fn responses_for_lesson(
        &self,
        learner_id: &str,
        lesson_id: Uuid,
    ) -> Result<Vec<QuizResponse>>;

    // certificates
    async fn insert_certificate(&self, certificate: Certificate) -> Result<CertificateInsert>;
    async fn certificate(&self, learner_id: &str, course_id: Uuid)
        -> Result<Option<Certificate>>;
    async fn certificate_by_code(&self, code: &str) -> Result<Option<Certificate>>;
}
