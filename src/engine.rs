//! Course progress and completion engine.
//!
//! Each operation is one request-sized unit of work against the [`Store`].
//! Nothing is cached between calls: progress is recomputed from lesson rows
//! every time, and every mutation is safe to retry.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::certificate::{normalize_code, CodeGenerator, RandomCodes, MAX_CODE_ATTEMPTS};
use crate::error::{Error, Result};
use crate::grading;
use crate::models::{
    Archetype, Certificate, CertificateIssue, CourseProgress, Enrollment, Lesson, LessonProgress,
    LessonStatus, QuizResponse, SubmitOutcome,
};
use crate::progress;
use crate::store::{CertificateInsert, Insert, LessonTransition, Store};

#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    codes: Arc<dyn CodeGenerator>,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_codes(store, Arc::new(RandomCodes::default()))
    }

    pub fn with_codes(store: Arc<dyn Store>, codes: Arc<dyn CodeGenerator>) -> Self {
        Self { store, codes }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    // --- enrollment ---

    /// Enrolls the learner; a repeat call returns the existing record.
    pub async fn enroll(&self, learner_id: &str, course_id: Uuid) -> Result<Enrollment> {
        let learner_id = checked_learner(learner_id)?;
        if self.store.course(course_id).await?.is_none() {
            return Err(Error::not_found(format!("course {course_id} not found")));
        }

        let enrollment = Enrollment {
            learner_id: learner_id.to_string(),
            course_id,
            enrolled_at: Utc::now(),
        };
        match self.store.insert_enrollment(enrollment).await? {
            Insert::Created(e) => {
                tracing::info!(learner_id, %course_id, "learner enrolled");
                Ok(e)
            }
            Insert::Existing(e) => {
                tracing::debug!(learner_id, %course_id, "already enrolled");
                Ok(e)
            }
        }
    }

    pub async fn list_enrollments(&self, learner_id: &str) -> Result<Vec<Enrollment>> {
        let learner_id = checked_learner(learner_id)?;
        self.store.enrollments(learner_id).await
    }

    // --- lesson progress ---

    pub async fn mark_complete(
        &self,
        learner_id: &str,
        course_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<LessonProgress> {
        let (learner_id, lesson) = self.progress_target(learner_id, course_id, lesson_id).await?;
        self.apply(learner_id, &lesson, LessonStatus::Completed).await
    }

    pub async fn mark_incomplete(
        &self,
        learner_id: &str,
        course_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<LessonProgress> {
        let (learner_id, lesson) = self.progress_target(learner_id, course_id, lesson_id).await?;
        self.apply(learner_id, &lesson, LessonStatus::NotStarted).await
    }

    /// Completes anything that is not completed, clears anything that is.
    pub async fn toggle(
        &self,
        learner_id: &str,
        course_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<LessonProgress> {
        let (learner_id, lesson) = self.progress_target(learner_id, course_id, lesson_id).await?;
        let current = self
            .store
            .lesson_progress(learner_id, lesson.id)
            .await?
            .map(|p| p.status)
            .unwrap_or_default();
        let target = match current {
            LessonStatus::Completed => LessonStatus::NotStarted,
            LessonStatus::NotStarted | LessonStatus::InProgress => LessonStatus::Completed,
        };
        self.apply(learner_id, &lesson, target).await
    }

    async fn apply(
        &self,
        learner_id: &str,
        lesson: &Lesson,
        target: LessonStatus,
    ) -> Result<LessonProgress> {
        let transition = LessonTransition {
            target,
            at: Utc::now(),
        };
        let row = self
            .store
            .transition_lesson(learner_id, lesson, transition)
            .await?;
        tracing::debug!(learner_id, lesson_id = %lesson.id, status = ?row.status, "lesson progress updated");
        Ok(row)
    }

    /// Resolves the lesson inside `course_id` and checks enrollment.
    async fn progress_target<'a>(
        &self,
        learner_id: &'a str,
        course_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<(&'a str, Lesson)> {
        let learner_id = checked_learner(learner_id)?;
        let lesson = self
            .store
            .lesson(lesson_id)
            .await?
            .filter(|l| l.course_id == course_id)
            .ok_or_else(|| {
                Error::not_found(format!("lesson {lesson_id} not found in course {course_id}"))
            })?;
        self.require_enrollment(learner_id, course_id).await?;
        Ok((learner_id, lesson))
    }

    async fn require_enrollment(&self, learner_id: &str, course_id: Uuid) -> Result<()> {
        match self.store.enrollment(learner_id, course_id).await? {
            Some(_) => Ok(()),
            None => Err(Error::NotEnrolled {
                learner_id: learner_id.to_string(),
                course_id,
            }),
        }
    }

    // --- quiz responses ---

    /// Records the learner's answer to a question, once.
    ///
    /// A second submission returns the stored response untouched, whatever
    /// it contains. A checkpoint answer also completes its lesson in the
    /// same write.
    pub async fn submit_response(
        &self,
        learner_id: &str,
        question_id: Uuid,
        raw_response: &Value,
    ) -> Result<SubmitOutcome> {
        let learner_id = checked_learner(learner_id)?;
        let question = self
            .store
            .question(question_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("question {question_id} not found")))?;

        if let Some(existing) = self.store.response(learner_id, question_id).await? {
            tracing::debug!(learner_id, %question_id, "response already recorded");
            return Ok(SubmitOutcome {
                response: existing,
                explanation: question.explanation,
                newly_recorded: false,
            });
        }

        let graded = grading::grade(&question.kind, raw_response)?;
        let archetype = question.kind.archetype();

        let lesson = self
            .store
            .lesson(question.lesson_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("lesson {} not found", question.lesson_id)))?;
        let enrolled = self
            .store
            .enrollment(learner_id, lesson.course_id)
            .await?
            .is_some();

        let completes = if archetype == Archetype::Checkpoint {
            if !enrolled {
                return Err(Error::NotEnrolled {
                    learner_id: learner_id.to_string(),
                    course_id: lesson.course_id,
                });
            }
            Some(&lesson)
        } else {
            None
        };

        let response = QuizResponse {
            learner_id: learner_id.to_string(),
            question_id,
            lesson_id: question.lesson_id,
            response: graded.answer,
            is_correct: graded.is_correct,
            created_at: Utc::now(),
        };

        let inserted = self.store.insert_response(response, completes).await?;
        let newly_recorded = inserted.is_created();
        if newly_recorded {
            tracing::info!(
                learner_id,
                %question_id,
                archetype = archetype.as_str(),
                is_correct = ?graded.is_correct,
                "response recorded"
            );
            if completes.is_none() && enrolled {
                self.apply(learner_id, &lesson, LessonStatus::InProgress)
                    .await?;
            }
        }

        Ok(SubmitOutcome {
            response: inserted.into_inner(),
            explanation: question.explanation,
            newly_recorded,
        })
    }

    /// The learner's responses for one lesson, in question order.
    pub async fn lesson_responses(
        &self,
        learner_id: &str,
        course_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Vec<QuizResponse>> {
        let learner_id = checked_learner(learner_id)?;
        let in_course = self
            .store
            .lesson(lesson_id)
            .await?
            .is_some_and(|l| l.course_id == course_id);
        if !in_course {
            return Err(Error::not_found(format!(
                "lesson {lesson_id} not found in course {course_id}"
            )));
        }
        self.store.responses_for_lesson(learner_id, lesson_id).await
    }

    // --- aggregate ---

    /// Recomputes completion from the current lesson rows. Never writes.
    pub async fn get_progress(&self, learner_id: &str, course_id: Uuid) -> Result<CourseProgress> {
        let learner_id = checked_learner(learner_id)?;
        if self.store.course(course_id).await?.is_none() {
            return Err(Error::not_found(format!("course {course_id} not found")));
        }
        let lessons = self.store.lessons(course_id).await?;
        let rows = self.store.course_progress_rows(learner_id, course_id).await?;
        Ok(progress::summarize(learner_id, course_id, &lessons, &rows))
    }

    // --- certificates ---

    /// Returns the learner's certificate for the course, issuing it first if
    /// the course is complete right now.
    ///
    /// An existing certificate is returned even if progress has since dropped.
    pub async fn ensure_certificate(
        &self,
        learner_id: &str,
        course_id: Uuid,
    ) -> Result<CertificateIssue> {
        let learner_id = checked_learner(learner_id)?;
        if let Some(certificate) = self.store.certificate(learner_id, course_id).await? {
            return Ok(CertificateIssue {
                certificate,
                newly_issued: false,
            });
        }

        let progress = self.get_progress(learner_id, course_id).await?;
        if !progress.is_complete {
            return Err(Error::NotReady {
                percent: progress.percent,
            });
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let candidate = Certificate {
                learner_id: learner_id.to_string(),
                course_id,
                verification_code: self.codes.generate(),
                issued_at: Utc::now(),
            };
            match self.store.insert_certificate(candidate).await? {
                CertificateInsert::Created(certificate) => {
                    tracing::info!(
                        learner_id,
                        %course_id,
                        code = %certificate.verification_code,
                        "certificate issued"
                    );
                    return Ok(CertificateIssue {
                        certificate,
                        newly_issued: true,
                    });
                }
                CertificateInsert::Existing(certificate) => {
                    tracing::debug!(learner_id, %course_id, "certificate issued concurrently");
                    return Ok(CertificateIssue {
                        certificate,
                        newly_issued: false,
                    });
                }
                CertificateInsert::CodeTaken => {
                    tracing::warn!(attempt, "verification code collision, regenerating");
                }
            }
        }

        Err(Error::Internal(format!(
            "no unique verification code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    pub async fn get_certificate(&self, learner_id: &str, course_id: Uuid) -> Result<Certificate> {
        let learner_id = checked_learner(learner_id)?;
        self.store
            .certificate(learner_id, course_id)
            .await?
            .ok_or_else(|| Error::not_found("no certificate for this course"))
    }

    /// Public lookup by verification code.
    pub async fn verify_certificate(&self, code: &str) -> Result<Certificate> {
        let code = normalize_code(code);
        self.store
            .certificate_by_code(&code)
            .await?
            .ok_or_else(|| Error::not_found(format!("certificate {code} not found")))
    }
}

fn checked_learner(learner_id: &str) -> Result<&str> {
    let trimmed = learner_id.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("learner_id is required"));
    }
    Ok(trimmed)
}
