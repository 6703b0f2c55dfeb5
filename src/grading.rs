// Per-archetype acceptance and grading of raw responses.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{Answer, ChoiceOption, QuestionKind};

pub const CHECKPOINT_TOKEN: &str = "acknowledged";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graded {
    pub answer: Answer,
    pub is_correct: Option<bool>,
}

/// Validates `raw` against the question's archetype and grades it.
///
/// Grading only looks at the question definition and the raw value, so the
/// same input always yields the same result.
pub fn grade(kind: &QuestionKind, raw: &Value) -> Result<Graded> {
    match kind {
        QuestionKind::MultipleChoice { options } => {
            let position = parse_position(raw)?;
            let is_correct = choice_is_correct(options, position)?;
            Ok(Graded {
                answer: Answer::MultipleChoice { position },
                is_correct: Some(is_correct),
            })
        }
        QuestionKind::TrueFalse { correct_answer } => {
            let value = parse_bool(raw)?;
            Ok(Graded {
                answer: Answer::TrueFalse { value },
                is_correct: Some(value == *correct_answer),
            })
        }
        QuestionKind::Reflection { min_length } => {
            let text = raw
                .as_str()
                .ok_or_else(|| Error::validation("reflection response must be text"))?;
            let trimmed = text.trim();
            let len = trimmed.chars().count();
            if len < *min_length {
                return Err(Error::validation(format!(
                    "reflection must be at least {min_length} characters (got {len})"
                )));
            }
            Ok(Graded {
                answer: Answer::Reflection {
                    text: trimmed.to_string(),
                },
                is_correct: None,
            })
        }
        QuestionKind::ActionStep => {
            let (completed, notes) = parse_action_step(raw)?;
            Ok(Graded {
                answer: Answer::ActionStep { completed, notes },
                is_correct: None,
            })
        }
        QuestionKind::Checkpoint { .. } => match raw.as_str() {
            Some(token) if token.trim().eq_ignore_ascii_case(CHECKPOINT_TOKEN) => Ok(Graded {
                answer: Answer::Checkpoint,
                is_correct: None,
            }),
            _ => Err(Error::validation(format!(
                "checkpoint response must be \"{CHECKPOINT_TOKEN}\""
            ))),
        },
    }
}

fn parse_position(raw: &Value) -> Result<usize> {
    let parsed = match raw {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse::<u64>().ok()
        }
        _ => None,
    };
    parsed
        .and_then(|p| usize::try_from(p).ok())
        .ok_or_else(|| Error::validation("multiple choice response must be a non-negative option position"))
}

fn choice_is_correct(options: &[ChoiceOption], position: usize) -> Result<bool> {
    options
        .get(position)
        .map(|opt| opt.is_correct)
        .ok_or_else(|| {
            Error::validation(format!(
                "option position {position} out of range (question has {} options)",
                options.len()
            ))
        })
}

fn parse_bool(raw: &Value) -> Result<bool> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(Error::validation("true/false response must be \"true\" or \"false\"")),
    }
}

fn parse_action_step(raw: &Value) -> Result<(bool, String)> {
    let obj = raw
        .as_object()
        .ok_or_else(|| Error::validation("action step response must be an object"))?;
    let completed = obj
        .get("completed")
        .and_then(Value::as_bool)
        .ok_or_else(|| Error::validation("action step response needs a boolean `completed`"))?;
    let notes = match obj.get("notes") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(Error::validation("action step `notes` must be text")),
    };
    Ok((completed, notes))
}
