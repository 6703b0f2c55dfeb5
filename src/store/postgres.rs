use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{query, query_as, PgConnection};
use uuid::Uuid;

use super::{CertificateInsert, Insert, LessonTransition, Store};
use crate::db::Db;
use crate::error::Result;
use crate::models::{
    Answer, Certificate, Course, Enrollment, Lesson, LessonProgress, LessonStatus, Question,
    QuestionKind, QuizResponse,
};

const PROGRESS_COLUMNS: &str = "learner_id, lesson_id, course_id, status, completed_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: Uuid,
    lesson_id: Uuid,
    position: i32,
    prompt: String,
    explanation: Option<String>,
    kind: Json<QuestionKind>,
}

impl From<QuestionRow> for Question {
    fn from(r: QuestionRow) -> Self {
        Question {
            id: r.id,
            lesson_id: r.lesson_id,
            position: r.position,
            prompt: r.prompt,
            explanation: r.explanation,
            kind: r.kind.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResponseRow {
    learner_id: String,
    question_id: Uuid,
    lesson_id: Uuid,
    response: Json<Answer>,
    is_correct: Option<bool>,
    created_at: DateTime<Utc>,
}

impl From<ResponseRow> for QuizResponse {
    fn from(r: ResponseRow) -> Self {
        QuizResponse {
            learner_id: r.learner_id,
            question_id: r.question_id,
            lesson_id: r.lesson_id,
            response: r.response.0,
            is_correct: r.is_correct,
            created_at: r.created_at,
        }
    }
}

async fn transition_on(
    conn: &mut PgConnection,
    learner_id: &str,
    lesson: &Lesson,
    transition: LessonTransition,
) -> Result<LessonProgress> {
    // The WHERE on the conflict branch makes no-op transitions return no row.
    let sql = match transition.target {
        LessonStatus::Completed => format!(
            r#"
            INSERT INTO lesson_progress ({PROGRESS_COLUMNS})
            VALUES ($1, $2, $3, 'completed', $4, $4)
            ON CONFLICT (learner_id, lesson_id) DO UPDATE
              SET status = 'completed', completed_at = EXCLUDED.completed_at, updated_at = EXCLUDED.updated_at
              WHERE lesson_progress.status <> 'completed'
            RETURNING {PROGRESS_COLUMNS}
            "#
        ),
        LessonStatus::NotStarted => format!(
            r#"
            INSERT INTO lesson_progress ({PROGRESS_COLUMNS})
            VALUES ($1, $2, $3, 'not_started', NULL, $4)
            ON CONFLICT (learner_id, lesson_id) DO UPDATE
              SET status = 'not_started', completed_at = NULL, updated_at = EXCLUDED.updated_at
            RETURNING {PROGRESS_COLUMNS}
            "#
        ),
        LessonStatus::InProgress => format!(
            r#"
            INSERT INTO lesson_progress ({PROGRESS_COLUMNS})
            VALUES ($1, $2, $3, 'in_progress', NULL, $4)
            ON CONFLICT (learner_id, lesson_id) DO UPDATE
              SET status = 'in_progress', updated_at = EXCLUDED.updated_at
              WHERE lesson_progress.status = 'not_started'
            RETURNING {PROGRESS_COLUMNS}
            "#
        ),
    };

    let updated = query_as::<_, LessonProgress>(&sql)
        .bind(learner_id)
        .bind(lesson.id)
        .bind(lesson.course_id)
        .bind(transition.at)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(row) = updated {
        return Ok(row);
    }

    let current = query_as::<_, LessonProgress>(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM lesson_progress WHERE learner_id = $1 AND lesson_id = $2"
    ))
    .bind(learner_id)
    .bind(lesson.id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(current)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn course(&self, course_id: Uuid) -> Result<Option<Course>> {
        let course = query_as::<_, Course>("SELECT id, title, created_at FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(course)
    }

    async fn lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>> {
        let lessons = query_as::<_, Lesson>(
            r#"
            SELECT id, course_id, module_id, title, position
            FROM lessons WHERE course_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;
        Ok(lessons)
    }

    async fn lesson(&self, lesson_id: Uuid) -> Result<Option<Lesson>> {
        let lesson = query_as::<_, Lesson>(
            "SELECT id, course_id, module_id, title, position FROM lessons WHERE id = $1",
        )
        .bind(lesson_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(lesson)
    }

    async fn question(&self, question_id: Uuid) -> Result<Option<Question>> {
        let row = query_as::<_, QuestionRow>(
            r#"
            SELECT id, lesson_id, position, prompt, explanation, kind
            FROM quiz_questions WHERE id = $1
            "#,
        )
        .bind(question_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Question::from))
    }

    async fn insert_enrollment(&self, enrollment: Enrollment) -> Result<Insert<Enrollment>> {
        let created = query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (learner_id, course_id, enrolled_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (learner_id, course_id) DO NOTHING
            RETURNING learner_id, course_id, enrolled_at
            "#,
        )
        .bind(&enrollment.learner_id)
        .bind(enrollment.course_id)
        .bind(enrollment.enrolled_at)
        .fetch_optional(&self.db)
        .await?;

        match created {
            Some(row) => Ok(Insert::Created(row)),
            None => {
                let existing = query_as::<_, Enrollment>(
                    r#"
                    SELECT learner_id, course_id, enrolled_at
                    FROM enrollments WHERE learner_id = $1 AND course_id = $2
                    "#,
                )
                .bind(&enrollment.learner_id)
                .bind(enrollment.course_id)
                .fetch_one(&self.db)
                .await?;
                Ok(Insert::Existing(existing))
            }
        }
    }

    async fn enrollment(&self, learner_id: &str, course_id: Uuid) -> Result<Option<Enrollment>> {
        let row = query_as::<_, Enrollment>(
            r#"
            SELECT learner_id, course_id, enrolled_at
            FROM enrollments WHERE learner_id = $1 AND course_id = $2
            "#,
        )
        .bind(learner_id)
        .bind(course_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn enrollments(&self, learner_id: &str) -> Result<Vec<Enrollment>> {
        let rows = query_as::<_, Enrollment>(
            r#"
            SELECT learner_id, course_id, enrolled_at
            FROM enrollments WHERE learner_id = $1
            ORDER BY enrolled_at
            "#,
        )
        .bind(learner_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn lesson_progress(
        &self,
        learner_id: &str,
        lesson_id: Uuid,
    ) -> Result<Option<LessonProgress>> {
        let row = query_as::<_, LessonProgress>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM lesson_progress WHERE learner_id = $1 AND lesson_id = $2"
        ))
        .bind(learner_id)
        .bind(lesson_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn course_progress_rows(
        &self,
        learner_id: &str,
        course_id: Uuid,
    ) -> Result<Vec<LessonProgress>> {
        let rows = query_as::<_, LessonProgress>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM lesson_progress WHERE learner_id = $1 AND course_id = $2"
        ))
        .bind(learner_id)
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn transition_lesson(
        &self,
        learner_id: &str,
        lesson: &Lesson,
        transition: LessonTransition,
    ) -> Result<LessonProgress> {
        let mut conn = self.db.acquire().await?;
        transition_on(&mut *conn, learner_id, lesson, transition).await
    }

    async fn response(
        &self,
        learner_id: &str,
        question_id: Uuid,
    ) -> Result<Option<QuizResponse>> {
        let row = query_as::<_, ResponseRow>(
            r#"
            SELECT learner_id, question_id, lesson_id, response, is_correct, created_at
            FROM quiz_responses WHERE learner_id = $1 AND question_id = $2
            "#,
        )
        .bind(learner_id)
        .bind(question_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(QuizResponse::from))
    }

    async fn insert_response(
        &self,
        response: QuizResponse,
        completes: Option<&Lesson>,
    ) -> Result<Insert<QuizResponse>> {
        let mut tx = self.db.begin().await?;

        let created = query_as::<_, ResponseRow>(
            r#"
            INSERT INTO quiz_responses (learner_id, question_id, lesson_id, response, is_correct, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (learner_id, question_id) DO NOTHING
            RETURNING learner_id, question_id, lesson_id, response, is_correct, created_at
            "#,
        )
        .bind(&response.learner_id)
        .bind(response.question_id)
        .bind(response.lesson_id)
        .bind(Json(&response.response))
        .bind(response.is_correct)
        .bind(response.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = created else {
            tx.rollback().await?;
            let existing = self
                .response(&response.learner_id, response.question_id)
                .await?
                .ok_or_else(|| {
                    crate::error::Error::Internal("response vanished after conflict".into())
                })?;
            return Ok(Insert::Existing(existing));
        };

        if let Some(lesson) = completes {
            let transition = LessonTransition {
                target: LessonStatus::Completed,
                at: response.created_at,
            };
            transition_on(&mut *tx, &response.learner_id, lesson, transition).await?;
        }

        tx.commit().await?;
        Ok(Insert::Created(row.into()))
    }

    async fn responses_for_lesson(
        &self,
        learner_id: &str,
        lesson_id: Uuid,
    ) -> Result<Vec<QuizResponse>> {
        let rows = query_as::<_, ResponseRow>(
            r#"
            SELECT r.learner_id, r.question_id, r.lesson_id, r.response, r.is_correct, r.created_at
            FROM quiz_responses r
            LEFT JOIN quiz_questions q ON q.id = r.question_id
            WHERE r.learner_id = $1 AND r.lesson_id = $2
            ORDER BY q.position NULLS LAST, r.created_at
            "#,
        )
        .bind(learner_id)
        .bind(lesson_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(QuizResponse::from).collect())
    }

    async fn insert_certificate(&self, certificate: Certificate) -> Result<CertificateInsert> {
        // No conflict target: covers both the (learner, course) key and the code.
        let created = query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (learner_id, course_id, verification_code, issued_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            RETURNING learner_id, course_id, verification_code, issued_at
            "#,
        )
        .bind(&certificate.learner_id)
        .bind(certificate.course_id)
        .bind(&certificate.verification_code)
        .bind(certificate.issued_at)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = created {
            return Ok(CertificateInsert::Created(row));
        }
        match self
            .certificate(&certificate.learner_id, certificate.course_id)
            .await?
        {
            Some(existing) => Ok(CertificateInsert::Existing(existing)),
            None => Ok(CertificateInsert::CodeTaken),
        }
    }

    async fn certificate(
        &self,
        learner_id: &str,
        course_id: Uuid,
    ) -> Result<Option<Certificate>> {
        let row = query_as::<_, Certificate>(
            r#"
            SELECT learner_id, course_id, verification_code, issued_at
            FROM certificates WHERE learner_id = $1 AND course_id = $2
            "#,
        )
        .bind(learner_id)
        .bind(course_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn certificate_by_code(&self, code: &str) -> Result<Option<Certificate>> {
        let row = query_as::<_, Certificate>(
            r#"
            SELECT learner_id, course_id, verification_code, issued_at
            FROM certificates WHERE verification_code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}
