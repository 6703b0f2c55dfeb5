use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

/// Minimum trimmed length of a reflection answer unless the question overrides it.
pub const DEFAULT_REFLECTION_MIN_LENGTH: usize = 50;

// --- course structure (authored elsewhere, read-only here) ---

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub module_id: Option<Uuid>,
    pub title: String,
    pub position: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub text: String,
    pub is_correct: bool,
}

/// Archetype-specific payload of a question.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<ChoiceOption>,
    },
    TrueFalse {
        correct_answer: bool,
    },
    Reflection {
        #[serde(default = "default_reflection_min_length")]
        min_length: usize,
    },
    ActionStep,
    Checkpoint {
        #[serde(default)]
        takeaways: Vec<String>,
    },
}

fn default_reflection_min_length() -> usize {
    DEFAULT_REFLECTION_MIN_LENGTH
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    MultipleChoice,
    TrueFalse,
    Reflection,
    ActionStep,
    Checkpoint,
}

impl Archetype {
    pub fn as_str(self) -> &'static str {
        match self {
            Archetype::MultipleChoice => "multiple_choice",
            Archetype::TrueFalse => "true_false",
            Archetype::Reflection => "reflection",
            Archetype::ActionStep => "action_step",
            Archetype::Checkpoint => "checkpoint",
        }
    }
}

impl QuestionKind {
    pub fn archetype(&self) -> Archetype {
        match self {
            QuestionKind::MultipleChoice { .. } => Archetype::MultipleChoice,
            QuestionKind::TrueFalse { .. } => Archetype::TrueFalse,
            QuestionKind::Reflection { .. } => Archetype::Reflection,
            QuestionKind::ActionStep => Archetype::ActionStep,
            QuestionKind::Checkpoint { .. } => Archetype::Checkpoint,
        }
    }
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Question {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub position: i32,
    pub prompt: String,
    pub explanation: Option<String>,
    pub kind: QuestionKind,
}

// --- learner state ---

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub learner_id: String,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "lesson_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LessonProgress {
    pub learner_id: String,
    pub lesson_id: Uuid,
    pub course_id: Uuid,
    pub status: LessonStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl LessonProgress {
    /// Implicit row for a lesson the learner never touched.
    pub fn untouched(learner_id: &str, lesson: &Lesson, now: DateTime<Utc>) -> Self {
        Self {
            learner_id: learner_id.to_string(),
            lesson_id: lesson.id,
            course_id: lesson.course_id,
            status: LessonStatus::NotStarted,
            completed_at: None,
            updated_at: now,
        }
    }
}

/// A learner's answer, validated against the question's archetype.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    MultipleChoice { position: usize },
    TrueFalse { value: bool },
    Reflection { text: String },
    ActionStep {
        completed: bool,
        #[serde(default)]
        notes: String,
    },
    Checkpoint,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuizResponse {
    pub learner_id: String,
    pub question_id: Uuid,
    pub lesson_id: Uuid,
    pub response: Answer,
    /// `None` for archetypes that are never graded.
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub learner_id: String,
    pub course_id: Uuid,
    pub verification_code: String,
    pub issued_at: DateTime<Utc>,
}

// --- derived views ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModuleProgress {
    pub module_id: Option<Uuid>,
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub percent: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CourseProgress {
    pub learner_id: String,
    pub course_id: Uuid,
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub percent: u8,
    pub is_complete: bool,
    pub per_lesson_status: BTreeMap<Uuid, LessonStatus>,
    pub modules: Vec<ModuleProgress>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CertificateIssue {
    pub certificate: Certificate,
    pub newly_issued: bool,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubmitOutcome {
    pub response: QuizResponse,
    pub explanation: Option<String>,
    pub newly_recorded: bool,
}

// --- request bodies ---

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EnrollReq {
    pub learner_id: String,
    pub course_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LearnerReq {
    pub learner_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubmitResponseReq {
    pub learner_id: String,
    pub raw_response: serde_json::Value,
}
