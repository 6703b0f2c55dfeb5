#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use course_progress::certificate::CodeGenerator;
use course_progress::models::{ChoiceOption, Course, Lesson, Question, QuestionKind};
use course_progress::store::MemoryStore;
use course_progress::Engine;
use parking_lot::Mutex;
use uuid::Uuid;

pub const LEARNER: &str = "learner-1";

pub const LONG_REFLECTION: &str =
    "I will open every class with a two minute recap of the previous lesson's key idea.";

/// A course with four lessons and nothing else.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub engine: Engine,
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

pub fn fixture() -> Fixture {
    fixture_with_lessons(4)
}

pub fn fixture_with_lessons(n: usize) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let course = store.add_course("Classroom Foundations");
    let lessons = (1..=n)
        .map(|i| store.add_lesson(course.id, None, &format!("Lesson {i}")))
        .collect();
    let engine = Engine::new(store.clone());
    Fixture {
        store,
        engine,
        course,
        lessons,
    }
}

impl Fixture {
    pub fn question(&self, lesson: usize, kind: QuestionKind) -> Question {
        self.store.add_question(Question {
            id: Uuid::new_v4(),
            lesson_id: self.lessons[lesson].id,
            position: 1,
            prompt: "prompt".into(),
            explanation: Some("because".into()),
            kind,
        })
    }

    pub async fn enroll(&self) {
        self.engine.enroll(LEARNER, self.course.id).await.unwrap();
    }

    pub async fn complete(&self, lesson: usize) {
        self.engine
            .mark_complete(LEARNER, self.course.id, self.lessons[lesson].id)
            .await
            .unwrap();
    }
}

pub fn a_or_b() -> QuestionKind {
    QuestionKind::MultipleChoice {
        options: vec![
            ChoiceOption { text: "A".into(), is_correct: false },
            ChoiceOption { text: "B".into(), is_correct: true },
        ],
    }
}

/// Hands out a fixed sequence of codes, then repeats the last one.
pub struct ScriptedCodes(Mutex<VecDeque<String>>);

impl ScriptedCodes {
    pub fn new(codes: &[&str]) -> Self {
        Self(Mutex::new(codes.iter().map(|c| c.to_string()).collect()))
    }
}

impl CodeGenerator for ScriptedCodes {
    fn generate(&self) -> String {
        let mut codes = self.0.lock();
        if codes.len() > 1 {
            codes.pop_front().unwrap()
        } else {
            codes.front().cloned().unwrap()
        }
    }
}
