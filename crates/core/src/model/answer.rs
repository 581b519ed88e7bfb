use serde::{Deserialize, Serialize};
use std::fmt;

fn normalize<I, S>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = tokens
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

//
// ─── ANSWER KEY ────────────────────────────────────────────────────────────────
//

/// Canonical set of correct option tokens for a question.
///
/// Stored answers arrive in several shapes (a bare value, a comma-joined
/// list, an explicit token list). All of them normalize here, at the data
/// boundary, so grading never branches on representation. Tokens are kept
/// trimmed, sorted and deduplicated, which makes set comparison a plain
/// slice equality.
///
/// An empty key is representable on purpose: it marks malformed content
/// that grading must treat as "never correct".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKey(Vec<String>);

impl AnswerKey {
    /// Parses a raw stored answer, splitting on commas.
    ///
    /// `"A"` becomes the single-element set `{A}`; `"A,C"` and `" C , A "`
    /// both become `{A, C}`; an empty or all-whitespace string becomes the
    /// empty set.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self(normalize(raw.split(',')))
    }

    /// Builds a key from an explicit token list.
    #[must_use]
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(normalize(tokens))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Normalized tokens, sorted and deduplicated.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// A learner's choice for one question, normalized like [`AnswerKey`].
///
/// Serializes as a plain token array; deserialization re-normalizes so
/// persisted selections can never violate the sorted/deduplicated invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Selection(Vec<String>);

impl Selection {
    /// The empty selection (question skipped or cleared).
    #[must_use]
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// A single-value selection, for `single` and `true/false` questions.
    #[must_use]
    pub fn single(value: impl AsRef<str>) -> Self {
        Self(normalize([value]))
    }

    /// A multi-value selection, for `multiple` questions.
    #[must_use]
    pub fn many<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(normalize(values))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Normalized tokens, sorted and deduplicated.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Selection {
    fn from(values: Vec<String>) -> Self {
        Self(normalize(values))
    }
}

impl From<Selection> for Vec<String> {
    fn from(selection: Selection) -> Self {
        selection.0
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_and_sorts_comma_joined_keys() {
        let key = AnswerKey::parse(" C , A ");
        assert_eq!(key.tokens(), ["A", "C"]);
    }

    #[test]
    fn parse_treats_bare_value_as_single_element_set() {
        let key = AnswerKey::parse("B");
        assert_eq!(key.tokens(), ["B"]);
    }

    #[test]
    fn parse_of_empty_string_yields_empty_key() {
        assert!(AnswerKey::parse("").is_empty());
        assert!(AnswerKey::parse(" , ,").is_empty());
    }

    #[test]
    fn from_tokens_deduplicates() {
        let key = AnswerKey::from_tokens(["A", "A", "C"]);
        assert_eq!(key.tokens(), ["A", "C"]);
    }

    #[test]
    fn selection_normalizes_like_the_key() {
        let selection = Selection::many(["C", " A"]);
        let key = AnswerKey::parse("A,C");
        assert_eq!(selection.tokens(), key.tokens());
    }

    #[test]
    fn selection_serde_roundtrip_renormalizes() {
        let json = r#"[" C ", "A", "C"]"#;
        let selection: Selection = serde_json::from_str(json).unwrap();
        assert_eq!(selection.tokens(), ["A", "C"]);
    }
}
