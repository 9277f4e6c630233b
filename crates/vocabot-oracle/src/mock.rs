//! Mock oracle for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use vocabot_core::model::{Answer, Question};
use vocabot_core::traits::AnswerOracle;

/// A scripted oracle for exercising the driver loop without a model.
///
/// Answers with the choice carrying a fixed code when one is configured and
/// offered, and with the first choice otherwise.
pub struct MockOracle {
    /// Preferred answer code.
    fixed_code: Option<String>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last question received.
    last_question: Mutex<Option<Question>>,
}

impl MockOracle {
    /// A mock that always picks the first choice.
    pub fn first_choice() -> Self {
        Self {
            fixed_code: None,
            call_count: AtomicU32::new(0),
            last_question: Mutex::new(None),
        }
    }

    /// A mock that picks the choice with `code` whenever it is offered.
    pub fn with_fixed_code(code: &str) -> Self {
        Self {
            fixed_code: Some(code.to_string()),
            ..Self::first_choice()
        }
    }

    /// Get the number of calls made to this oracle.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last question asked.
    pub fn last_question(&self) -> Option<Question> {
        self.last_question
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl AnswerOracle for MockOracle {
    fn name(&self) -> &str {
        "mock"
    }

    async fn ask(&self, question: &Question) -> anyhow::Result<Answer> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_question.lock() {
            *last = Some(question.clone());
        }

        let choice = self
            .fixed_code
            .as_deref()
            .and_then(|code| question.choice_by_code(code))
            .or_else(|| question.choices.first())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("question has no choices"))?;

        Ok(Answer::pick(question, choice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocabot_core::model::Choice;

    fn question() -> Question {
        Question {
            context: None,
            prompt: "Pick one".into(),
            choices: vec![Choice::new("first", "a"), Choice::new("second", "b")],
            completed: false,
        }
    }

    #[tokio::test]
    async fn picks_first_choice() {
        let oracle = MockOracle::first_choice();
        let answer = oracle.ask(&question()).await.unwrap();
        assert_eq!(answer.chosen.answer_code, "a");
        assert_eq!(oracle.call_count(), 1);
        assert_eq!(oracle.last_question().unwrap().prompt, "Pick one");
    }

    #[tokio::test]
    async fn fixed_code_when_offered() {
        let oracle = MockOracle::with_fixed_code("b");
        assert_eq!(oracle.ask(&question()).await.unwrap().chosen.answer_code, "b");

        let oracle = MockOracle::with_fixed_code("zzz");
        assert_eq!(oracle.ask(&question()).await.unwrap().chosen.answer_code, "a");
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn no_choices_is_an_error() {
        let oracle = MockOracle::first_choice();
        assert!(oracle.ask(&Question::default()).await.is_err());
    }
}
