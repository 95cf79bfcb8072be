//! Plain-text material parsing.
//!
//! Study material is a sequence of lines. A line that ends with `?`, or starts
//! with `Q:` / `Q.` / `Q)` / `Question` (any case), opens a new item; the lines
//! that follow are joined into its answer.

use crate::error::ContentError;
use crate::model::{ContentSet, QaItem, Subject, TrackName};

fn is_question(line: &str) -> bool {
    if line.ends_with('?') {
        return true;
    }
    let mut chars = line.chars();
    if let (Some(first), Some(second)) = (chars.next(), chars.next()) {
        if first.eq_ignore_ascii_case(&'q') && matches!(second, ':' | '.' | ')') {
            return true;
        }
    }
    line.get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("question"))
}

/// Split raw material text into question/answer pairs.
///
/// Text before the first recognizable question becomes the first question.
/// A trailing question with no answer is only kept when it is the sole item.
#[must_use]
pub fn parse_qa_text(text: &str) -> Vec<QaItem> {
    let mut pairs = Vec::new();
    let mut question: Option<&str> = None;
    let mut answer: Vec<&str> = Vec::new();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if is_question(line) {
            if let Some(previous) = question.replace(line) {
                pairs.push(QaItem::new(previous, answer.join(" ")));
            }
            answer.clear();
        } else if question.is_some() {
            answer.push(line);
        } else {
            question = Some(line);
        }
    }

    if let Some(last) = question {
        if !answer.is_empty() || pairs.is_empty() {
            pairs.push(QaItem::new(last, answer.join(" ")));
        }
    }

    pairs
}

/// Parse material text straight into a `ContentSet`.
///
/// # Errors
///
/// Returns `ContentError::NoItems` if the text holds no usable lines.
pub fn parse_content(
    subject: Subject,
    text: &str,
    break_tracks: Vec<TrackName>,
) -> Result<ContentSet, ContentError> {
    ContentSet::new(subject, parse_qa_text(text), break_tracks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_question_marks() {
        let text = "What is a cell?\nThe basic unit of life.\nIt has a membrane.\n\nWhat is DNA?\nGenetic material.";
        let items = parse_qa_text(text);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].question(), "What is a cell?");
        assert_eq!(items[0].answer(), "The basic unit of life. It has a membrane.");
        assert_eq!(items[1].answer(), "Genetic material.");
    }

    #[test]
    fn recognizes_q_prefixes_case_insensitively() {
        let text = "q: define osmosis\nWater movement.\nQUESTION 2 define diffusion\nParticle spread.\nQ) last one\nDone.";
        let items = parse_qa_text(text);
        let questions: Vec<_> = items.iter().map(QaItem::question).collect();
        assert_eq!(
            questions,
            vec!["q: define osmosis", "QUESTION 2 define diffusion", "Q) last one"]
        );
    }

    #[test]
    fn leading_text_becomes_first_question() {
        let items = parse_qa_text("Photosynthesis\nLight to sugar.\nWhy green?\nChlorophyll.");
        assert_eq!(items[0].question(), "Photosynthesis");
        assert_eq!(items[0].answer(), "Light to sugar.");
    }

    #[test]
    fn trailing_unanswered_question_is_dropped() {
        let items = parse_qa_text("A?\nyes\nB?");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question(), "A?");

        let items = parse_qa_text("Only?");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].answer(), "");
    }

    #[test]
    fn empty_text_yields_no_content() {
        let err = parse_content(Subject::parse("s").unwrap(), " \n\n", Vec::new()).unwrap_err();
        assert_eq!(err, ContentError::NoItems);
    }
}
