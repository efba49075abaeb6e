//! Question snapshots and answer validation.
//!
//! Question material arrives from the question bank in heterogeneous
//! shapes (raw JSON arrays, or the same arrays serialized as text).
//! Everything is normalized exactly once at ingestion into the tagged
//! [`QuestionBody`] variants so the match logic never inspects payload
//! shapes at runtime.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{EngineError, EngineResult};

/// Question ID type
pub type QuestionId = i64;

/// The four assessable question types.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    TrueFalse,
    SingleChoice,
    MultipleChoice,
    Matching,
}

/// The payload shape a question accepts from submitters.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionPayloadKind {
    Boolean,
    Choice,
    ChoiceSet,
    PairSet,
}

impl fmt::Display for QuestionPayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Boolean => "boolean",
            Self::Choice => "choice index",
            Self::ChoiceSet => "choice index set",
            Self::PairSet => "left/right pair set",
        };
        write!(f, "{repr}")
    }
}

/// A participant's submitted answer.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPayload {
    Boolean(bool),
    Choice(usize),
    Choices(BTreeSet<usize>),
    Pairs(Vec<(String, String)>),
}

impl AnswerPayload {
    pub fn kind(&self) -> QuestionPayloadKind {
        match self {
            Self::Boolean(_) => QuestionPayloadKind::Boolean,
            Self::Choice(_) => QuestionPayloadKind::Choice,
            Self::Choices(_) => QuestionPayloadKind::ChoiceSet,
            Self::Pairs(_) => QuestionPayloadKind::PairSet,
        }
    }
}

/// Trait for evaluating a submission against a question's canonical answer
#[enum_dispatch]
pub trait CheckAnswer {
    /// The payload shape this question accepts.
    fn expected_payload(&self) -> QuestionPayloadKind;

    /// Whether the submission earns credit. Callers must have verified
    /// the payload shape first; a mismatched shape is never correct.
    fn check(&self, submitted: &AnswerPayload) -> bool;
}

/// A true/false statement.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TrueFalse {
    pub answer: bool,
}

impl CheckAnswer for TrueFalse {
    fn expected_payload(&self) -> QuestionPayloadKind {
        QuestionPayloadKind::Boolean
    }

    fn check(&self, submitted: &AnswerPayload) -> bool {
        matches!(submitted, AnswerPayload::Boolean(b) if *b == self.answer)
    }
}

/// One correct option out of several.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SingleChoice {
    pub options: Vec<String>,
    pub correct: usize,
}

impl CheckAnswer for SingleChoice {
    fn expected_payload(&self) -> QuestionPayloadKind {
        QuestionPayloadKind::Choice
    }

    fn check(&self, submitted: &AnswerPayload) -> bool {
        matches!(submitted, AnswerPayload::Choice(i) if *i == self.correct)
    }
}

/// Several correct options; credit requires the exact set, neither a
/// subset nor a superset.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MultipleChoice {
    pub options: Vec<String>,
    pub correct: BTreeSet<usize>,
}

impl CheckAnswer for MultipleChoice {
    fn expected_payload(&self) -> QuestionPayloadKind {
        QuestionPayloadKind::ChoiceSet
    }

    fn check(&self, submitted: &AnswerPayload) -> bool {
        matches!(submitted, AnswerPayload::Choices(set) if *set == self.correct)
    }
}

/// Left/right pairs; credit requires a complete submission in which every
/// pair exactly matches a canonical tuple.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Matching {
    pub pairs: Vec<(String, String)>,
}

impl CheckAnswer for Matching {
    fn expected_payload(&self) -> QuestionPayloadKind {
        QuestionPayloadKind::PairSet
    }

    fn check(&self, submitted: &AnswerPayload) -> bool {
        let AnswerPayload::Pairs(submitted) = submitted else {
            return false;
        };
        if submitted.len() != self.pairs.len() {
            return false;
        }
        let canonical: BTreeSet<(&str, &str)> = self
            .pairs
            .iter()
            .map(|(l, r)| (l.as_str(), r.as_str()))
            .collect();
        let lefts: BTreeSet<&str> = submitted.iter().map(|(l, _)| l.as_str()).collect();
        // A repeated left side can't be a complete assignment.
        if lefts.len() != submitted.len() {
            return false;
        }
        submitted
            .iter()
            .all(|(l, r)| canonical.contains(&(l.as_str(), r.as_str())))
    }
}

/// Normalized question body, dispatching correctness checks per variant.
#[enum_dispatch(CheckAnswer)]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionBody {
    TrueFalse,
    SingleChoice,
    MultipleChoice,
    Matching,
}

/// A per-match question snapshot.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Question {
    pub id: QuestionId,
    pub body: QuestionBody,
    /// Advisory display limit; the engine never enforces it with a clock.
    pub time_limit_secs: Option<u32>,
}

/// Question material as delivered by the question bank, before
/// normalization.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RawQuestion {
    pub id: QuestionId,
    pub kind: QuestionKind,
    /// Options for choice questions, or `[left, right]` pairs for
    /// matching questions. Either a JSON array or that array serialized
    /// as a string.
    #[serde(default)]
    pub options: Value,
    /// Canonical answer: bool, index, index array, or absent for
    /// matching (the pairs themselves are canonical).
    #[serde(default)]
    pub correct: Value,
    #[serde(default)]
    pub time_limit_secs: Option<u32>,
}

impl Question {
    /// Normalize a raw bank question into its tagged form.
    ///
    /// Rejects unparsable payloads and a multiple-choice question with
    /// an empty canonical set; a question with no correct answer is a
    /// data-integrity failure, never silently defaulted.
    pub fn normalize(raw: RawQuestion) -> EngineResult<Self> {
        let body = match raw.kind {
            QuestionKind::TrueFalse => {
                let answer = as_bool(&raw.correct)
                    .ok_or_else(|| malformed(raw.id, "true/false answer must be a boolean"))?;
                QuestionBody::TrueFalse(TrueFalse { answer })
            }
            QuestionKind::SingleChoice => {
                let options = decode_options(raw.id, &raw.options)?;
                let correct = as_index(&raw.correct)
                    .ok_or_else(|| malformed(raw.id, "correct answer must be an index"))?;
                if correct >= options.len() {
                    return Err(malformed(raw.id, "correct index out of range"));
                }
                QuestionBody::SingleChoice(SingleChoice { options, correct })
            }
            QuestionKind::MultipleChoice => {
                let options = decode_options(raw.id, &raw.options)?;
                let correct = decode_index_set(raw.id, &raw.correct)?;
                if correct.is_empty() {
                    return Err(EngineError::NoCorrectOption(raw.id));
                }
                if correct.iter().any(|&i| i >= options.len()) {
                    return Err(malformed(raw.id, "correct index out of range"));
                }
                QuestionBody::MultipleChoice(MultipleChoice { options, correct })
            }
            QuestionKind::Matching => {
                let pairs = decode_pairs(raw.id, &raw.options)?;
                if pairs.is_empty() {
                    return Err(malformed(raw.id, "matching question has no pairs"));
                }
                QuestionBody::Matching(Matching { pairs })
            }
        };
        Ok(Self {
            id: raw.id,
            body,
            time_limit_secs: raw.time_limit_secs,
        })
    }
}

fn malformed(id: QuestionId, detail: &str) -> EngineError {
    EngineError::MalformedQuestion(format!("question {id}: {detail}"))
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accept a JSON array directly, or the same array serialized as text.
fn decode_array(id: QuestionId, value: &Value, field: &str) -> EngineResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::String(text) => match serde_json::from_str(text) {
            Ok(Value::Array(items)) => Ok(items),
            _ => Err(malformed(id, &format!("{field} is not a parsable array"))),
        },
        _ => Err(malformed(id, &format!("{field} is not an array"))),
    }
}

fn decode_options(id: QuestionId, value: &Value) -> EngineResult<Vec<String>> {
    decode_array(id, value, "options")?
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Ok(other.to_string()),
        })
        .collect()
}

fn decode_index_set(id: QuestionId, value: &Value) -> EngineResult<BTreeSet<usize>> {
    decode_array(id, value, "correct set")?
        .iter()
        .map(|item| as_index(item).ok_or_else(|| malformed(id, "correct set entry is not an index")))
        .collect()
}

fn decode_pairs(id: QuestionId, value: &Value) -> EngineResult<Vec<(String, String)>> {
    decode_array(id, value, "pairs")?
        .into_iter()
        .map(|item| match item {
            Value::Array(pair) if pair.len() == 2 => {
                let left = pair[0].as_str().map(str::to_owned);
                let right = pair[1].as_str().map(str::to_owned);
                match (left, right) {
                    (Some(l), Some(r)) => Ok((l, r)),
                    _ => Err(malformed(id, "pair sides must be strings")),
                }
            }
            Value::Object(map) => {
                let left = map.get("left").and_then(Value::as_str);
                let right = map.get("right").and_then(Value::as_str);
                match (left, right) {
                    (Some(l), Some(r)) => Ok((l.to_owned(), r.to_owned())),
                    _ => Err(malformed(id, "pair object needs left and right strings")),
                }
            }
            _ => Err(malformed(id, "pair entry is not a [left, right] tuple")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(kind: QuestionKind, options: Value, correct: Value) -> RawQuestion {
        RawQuestion {
            id: 1,
            kind,
            options,
            correct,
            time_limit_secs: Some(30),
        }
    }

    #[test]
    fn test_true_false_check() {
        let q = Question::normalize(raw(QuestionKind::TrueFalse, Value::Null, json!(true))).unwrap();
        assert!(q.body.check(&AnswerPayload::Boolean(true)));
        assert!(!q.body.check(&AnswerPayload::Boolean(false)));
    }

    #[test]
    fn test_single_choice_check() {
        let q = Question::normalize(raw(
            QuestionKind::SingleChoice,
            json!(["a", "b", "c"]),
            json!(2),
        ))
        .unwrap();
        assert!(q.body.check(&AnswerPayload::Choice(2)));
        assert!(!q.body.check(&AnswerPayload::Choice(0)));
    }

    #[test]
    fn test_multiple_choice_exact_set_only() {
        let q = Question::normalize(raw(
            QuestionKind::MultipleChoice,
            json!(["a", "b", "c"]),
            json!([0, 2]),
        ))
        .unwrap();
        assert!(q.body.check(&AnswerPayload::Choices([0, 2].into())));
        // Neither a subset nor a superset earns credit.
        assert!(!q.body.check(&AnswerPayload::Choices([0].into())));
        assert!(!q.body.check(&AnswerPayload::Choices([0, 1, 2].into())));
    }

    #[test]
    fn test_multiple_choice_empty_correct_set_rejected() {
        let err = Question::normalize(raw(
            QuestionKind::MultipleChoice,
            json!(["a", "b"]),
            json!([]),
        ))
        .unwrap_err();
        assert!(matches!(err, EngineError::NoCorrectOption(1)));
    }

    #[test]
    fn test_matching_all_pairs_must_match() {
        let q = Question::normalize(raw(
            QuestionKind::Matching,
            json!([["A", "1"], ["B", "2"]]),
            Value::Null,
        ))
        .unwrap();
        let right = AnswerPayload::Pairs(vec![
            ("A".into(), "1".into()),
            ("B".into(), "2".into()),
        ]);
        let swapped = AnswerPayload::Pairs(vec![
            ("A".into(), "2".into()),
            ("B".into(), "1".into()),
        ]);
        let partial = AnswerPayload::Pairs(vec![("A".into(), "1".into())]);
        assert!(q.body.check(&right));
        assert!(!q.body.check(&swapped));
        assert!(!q.body.check(&partial));
    }

    #[test]
    fn test_matching_pair_objects() {
        let q = Question::normalize(raw(
            QuestionKind::Matching,
            json!([{"left": "A", "right": "1"}]),
            Value::Null,
        ))
        .unwrap();
        assert!(q.body.check(&AnswerPayload::Pairs(vec![("A".into(), "1".into())])));
    }

    #[test]
    fn test_options_as_serialized_text() {
        let q = Question::normalize(raw(
            QuestionKind::SingleChoice,
            json!("[\"x\", \"y\"]"),
            json!("1"),
        ))
        .unwrap();
        assert!(q.body.check(&AnswerPayload::Choice(1)));
    }

    #[test]
    fn test_unparsable_options_rejected() {
        let err = Question::normalize(raw(
            QuestionKind::SingleChoice,
            json!("not json"),
            json!(0),
        ))
        .unwrap_err();
        assert!(matches!(err, EngineError::MalformedQuestion(_)));
    }

    #[test]
    fn test_correct_index_out_of_range_rejected() {
        let err = Question::normalize(raw(
            QuestionKind::SingleChoice,
            json!(["a", "b"]),
            json!(5),
        ))
        .unwrap_err();
        assert!(matches!(err, EngineError::MalformedQuestion(_)));
    }

    #[test]
    fn test_payload_kind_mismatch_never_correct() {
        let q = Question::normalize(raw(
            QuestionKind::SingleChoice,
            json!(["a", "b"]),
            json!(0),
        ))
        .unwrap();
        assert_eq!(q.body.expected_payload(), QuestionPayloadKind::Choice);
        assert!(!q.body.check(&AnswerPayload::Boolean(true)));
    }
}
