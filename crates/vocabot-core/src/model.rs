//! Core data model types for vocabot.
//!
//! These are the types that flow between the extractor, the session client,
//! and the answer oracle. Their serde shapes match the on-disk progress file
//! and the JSON exchanged with the oracle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One practice item parsed from the service's question markup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Supporting sentence(s), absent for some question types.
    #[serde(default)]
    pub context: Option<QuestionContext>,
    /// Instruction text. Empty for terminal-reveal questions.
    #[serde(rename = "question", default)]
    pub prompt: String,
    /// Offered choices in page order.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Whether this question has already been submitted.
    #[serde(rename = "done", default)]
    pub completed: bool,
}

impl Question {
    /// True for the `{}` placeholder written before the first fetch.
    pub fn is_blank(&self) -> bool {
        self.context.is_none() && self.prompt.is_empty() && self.choices.is_empty()
    }

    /// Look up an offered choice by its answer code.
    pub fn choice_by_code(&self, code: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.answer_code == code)
    }

    /// Look up an offered choice by display text, ignoring case and
    /// surrounding whitespace.
    pub fn choice_by_text(&self, text: &str) -> Option<&Choice> {
        let wanted = text.trim();
        self.choices
            .iter()
            .find(|c| c.display_text.trim().eq_ignore_ascii_case(wanted))
    }
}

/// The context block of a question: one sentence or several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionContext {
    Sentence(String),
    Sentences(Vec<String>),
}

impl fmt::Display for QuestionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionContext::Sentence(s) => f.write_str(s),
            QuestionContext::Sentences(parts) => f.write_str(&parts.join(" ")),
        }
    }
}

/// A single answer choice.
///
/// For image questions `display_text` holds the element's style attribute
/// (which carries the image reference) rather than visible text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(rename = "answer", default)]
    pub display_text: String,
    #[serde(rename = "code", default)]
    pub answer_code: String,
}

impl Choice {
    pub fn new(display_text: impl Into<String>, answer_code: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            answer_code: answer_code.into(),
        }
    }
}

/// Single-letter question type code sent by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    /// `D`: word means ...
    Definition,
    /// `I`: pick the matching image.
    Image,
    /// `S`: word has the same or similar meaning as ...
    Synonym,
    /// `L`: in this quote, word means ...
    QuoteContext,
    /// `F`: complete the sentence.
    FillInBlank,
    /// `T`: the answer is revealed; only a confirmation is expected.
    TerminalReveal,
    /// Any code we do not recognize. Parsed as multiple choice.
    Other(String),
}

impl QuestionType {
    pub fn from_code(code: &str) -> Self {
        match code {
            "D" => QuestionType::Definition,
            "I" => QuestionType::Image,
            "S" => QuestionType::Synonym,
            "L" => QuestionType::QuoteContext,
            "F" => QuestionType::FillInBlank,
            "T" => QuestionType::TerminalReveal,
            other => QuestionType::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            QuestionType::Definition => "D",
            QuestionType::Image => "I",
            QuestionType::Synonym => "S",
            QuestionType::QuoteContext => "L",
            QuestionType::FillInBlank => "F",
            QuestionType::TerminalReveal => "T",
            QuestionType::Other(code) => code,
        }
    }
}

impl From<String> for QuestionType {
    fn from(code: String) -> Self {
        QuestionType::from_code(&code)
    }
}

impl From<QuestionType> for String {
    fn from(qtype: QuestionType) -> Self {
        qtype.code().to_string()
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The oracle's pick for a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "question", default)]
    pub prompt: String,
    #[serde(rename = "answer")]
    pub chosen: Choice,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// How an oracle answer lined up with the choices actually offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The returned code is one of the offered codes.
    ExactCode,
    /// The code was unknown but the text matched an offered choice,
    /// whose code was substituted.
    MatchedText,
    /// Neither code nor text matched; the answer is submitted unchanged.
    Unmatched,
}

impl Answer {
    /// Build an answer that picks `choice` for `question`.
    pub fn pick(question: &Question, choice: Choice) -> Self {
        Self {
            prompt: question.prompt.clone(),
            chosen: choice,
            choices: question.choices.clone(),
        }
    }

    /// Check the chosen code against the question's choices, repairing it
    /// from the display text when the model garbled the code.
    pub fn reconcile(mut self, question: &Question) -> (Self, Reconciliation) {
        if question.choice_by_code(&self.chosen.answer_code).is_some() {
            return (self, Reconciliation::ExactCode);
        }
        if let Some(choice) = question.choice_by_text(&self.chosen.display_text) {
            self.chosen = choice.clone();
            return (self, Reconciliation::MatchedText);
        }
        (self, Reconciliation::Unmatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_choice_question() -> Question {
        Question {
            context: None,
            prompt: "ebullient means:".into(),
            choices: vec![
                Choice::new("joyously unrestrained", "n1"),
                Choice::new("gloomy", "n2"),
            ],
            completed: false,
        }
    }

    #[test]
    fn question_type_codes() {
        assert_eq!(QuestionType::from_code("D"), QuestionType::Definition);
        assert_eq!(QuestionType::from_code("T"), QuestionType::TerminalReveal);
        assert_eq!(
            QuestionType::from_code("Z"),
            QuestionType::Other("Z".into())
        );
        assert_eq!(QuestionType::Image.code(), "I");
        assert_eq!(QuestionType::Other("Q".into()).to_string(), "Q");
    }

    #[test]
    fn question_serializes_in_progress_file_shape() {
        let mut q = two_choice_question();
        q.context = Some(QuestionContext::Sentences(vec!["a".into(), "b".into()]));
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["question"], "ebullient means:");
        assert_eq!(value["choices"][1]["code"], "n2");
        assert_eq!(value["context"][0], "a");
        assert_eq!(value["done"], false);
    }

    #[test]
    fn empty_object_is_blank_question() {
        let q: Question = serde_json::from_str("{}").unwrap();
        assert!(q.is_blank());
    }

    #[test]
    fn answer_parses_oracle_shape() {
        let json = r#"{"question":"q","answer":{"answer":"gloomy","code":"n2"},"choices":[]}"#;
        let answer: Answer = serde_json::from_str(json).unwrap();
        assert_eq!(answer.chosen.answer_code, "n2");
        assert_eq!(answer.chosen.display_text, "gloomy");
    }

    #[test]
    fn reconcile_keeps_known_code() {
        let q = two_choice_question();
        let answer = Answer::pick(&q, Choice::new("gloomy", "n2"));
        let (answer, how) = answer.reconcile(&q);
        assert_eq!(how, Reconciliation::ExactCode);
        assert_eq!(answer.chosen.answer_code, "n2");
    }

    #[test]
    fn reconcile_repairs_code_from_text() {
        let q = two_choice_question();
        let answer = Answer::pick(&q, Choice::new(" Gloomy ", "bogus"));
        let (answer, how) = answer.reconcile(&q);
        assert_eq!(how, Reconciliation::MatchedText);
        assert_eq!(answer.chosen.answer_code, "n2");
    }

    #[test]
    fn reconcile_leaves_unknown_answer_alone() {
        let q = two_choice_question();
        let answer = Answer::pick(&q, Choice::new("cheerful", "zz"));
        let (answer, how) = answer.reconcile(&q);
        assert_eq!(how, Reconciliation::Unmatched);
        assert_eq!(answer.chosen.answer_code, "zz");
    }
}
