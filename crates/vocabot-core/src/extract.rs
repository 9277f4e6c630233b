//! Question markup extraction.
//!
//! The service ships each question as a base64-encoded HTML fragment. This
//! module decodes it and pulls out the context sentences, the instruction
//! text, and the answer choices. Everything here is a pure function of the
//! markup and the question type.

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;
use crate::model::{Choice, Question, QuestionContext, QuestionType};

static QUESTION_CONTENT: LazyLock<Selector> = LazyLock::new(|| css("div.questionContent"));
static SENTENCE: LazyLock<Selector> = LazyLock::new(|| css("div.sentence"));
static INSTRUCTIONS: LazyLock<Selector> = LazyLock::new(|| css("div.instructions"));
static CHOICES: LazyLock<Selector> = LazyLock::new(|| css("div.choices"));
static CHOICE_LINK: LazyLock<Selector> = LazyLock::new(|| css("a"));
static COMPLETE: LazyLock<Selector> = LazyLock::new(|| css("div.complete"));
static STRONG: LazyLock<Selector> = LazyLock::new(|| css("strong"));

fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector is valid CSS")
}

/// Trim the ends, drop carriage returns and newlines, and turn each tab into
/// a single space.
///
/// The result never contains `\r`, `\n`, or `\t`, and applying this twice
/// gives the same string as applying it once.
pub fn clean_string(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| if c == '\t' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Decode the base64 `code` field of a service response into HTML.
pub fn decode_payload(encoded: &str) -> Result<String, ExtractError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ExtractError::InvalidPayload(e.to_string()))?;
    String::from_utf8(bytes).map_err(|_| ExtractError::InvalidUtf8)
}

/// Parse one question's markup according to its type.
pub fn extract_question(html: &str, question_type: &QuestionType) -> Result<Question, ExtractError> {
    let doc = Html::parse_document(html);
    let context = extract_context(&doc);

    if *question_type == QuestionType::TerminalReveal {
        let revealed = doc
            .select(&COMPLETE)
            .next()
            .and_then(|complete| complete.select(&STRONG).next())
            .ok_or(ExtractError::MissingRevealedAnswer)?;
        let term = clean_string(&element_text(revealed));
        return Ok(Question {
            context,
            prompt: String::new(),
            choices: vec![Choice::new(term.clone(), term)],
            completed: false,
        });
    }

    // A missing instruction block is normal for some question layouts.
    let prompt = doc
        .select(&INSTRUCTIONS)
        .next()
        .map(|el| clean_string(&element_text(el)))
        .unwrap_or_default();

    let choices_block = doc
        .select(&CHOICES)
        .next()
        .ok_or(ExtractError::MissingChoices)?;

    let choices = choices_block
        .select(&CHOICE_LINK)
        .enumerate()
        .map(|(index, link)| extract_choice(index, link, question_type))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Question {
        context,
        prompt,
        choices,
        completed: false,
    })
}

fn extract_context(doc: &Html) -> Option<QuestionContext> {
    let content = doc.select(&QUESTION_CONTENT).next()?;
    let mut sentences: Vec<String> = content
        .select(&SENTENCE)
        .map(|el| clean_string(&element_text(el)))
        .collect();

    match sentences.len() {
        0 => None,
        1 => sentences.pop().map(QuestionContext::Sentence),
        _ => Some(QuestionContext::Sentences(sentences)),
    }
}

fn extract_choice(
    index: usize,
    link: ElementRef<'_>,
    question_type: &QuestionType,
) -> Result<Choice, ExtractError> {
    let code = link
        .value()
        .attr("data-nonce")
        .ok_or(ExtractError::MissingAttribute {
            index,
            attribute: "data-nonce",
        })?;

    let display_text = if *question_type == QuestionType::Image {
        link.value()
            .attr("style")
            .ok_or(ExtractError::MissingAttribute {
                index,
                attribute: "style",
            })?
            .to_string()
    } else {
        clean_string(&element_text(link))
    };

    Ok(Choice::new(display_text, code))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}
