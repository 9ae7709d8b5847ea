//! Field-name paths into the document tree.
//!
//! A [`FieldPath`] addresses a location by object field names only. Numeric
//! (array-index) segments are unrepresentable: sequences are diffed as whole
//! values, because cell identity lives in ids, not positions. A diff arriving
//! off the wire with a numeric segment fails deserialization — that is the
//! construction-time rejection, not a runtime check.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An ordered sequence of field-name tokens, root first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// The empty path (the document root).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from field-name tokens.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    /// Append a token.
    pub fn push(&mut self, token: impl Into<String>) {
        self.0.push(token.into());
    }

    /// The first token — which top-level document field this path enters.
    pub fn head(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// All tokens, root first.
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "/")
        } else {
            for token in &self.0 {
                write!(f, "/{token}")?;
            }
            Ok(())
        }
    }
}

impl<const N: usize> From<[&str; N]> for FieldPath {
    fn from(tokens: [&str; N]) -> Self {
        Self::new(tokens)
    }
}

// ── Serde ───────────────────────────────────────────────────────────────────
//
// On the wire a path is a JSON array of strings. Deserialization rejects any
// non-string element so a positional diff can never be constructed.

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for token in &self.0 {
            seq.serialize_element(token)?;
        }
        seq.end()
    }
}

struct Token(String);

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TokenVisitor;

        impl<'de> Visitor<'de> for TokenVisitor {
            type Value = Token;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a field-name path segment (string)")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Token, E> {
                Ok(Token(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Token, E> {
                Ok(Token(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Token, E> {
                Err(E::custom(format!("positional path segment {v} is not allowed")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Token, E> {
                Err(E::custom(format!("positional path segment {v} is not allowed")))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Token, E> {
                Err(E::custom(format!("positional path segment {v} is not allowed")))
            }
        }

        deserializer.deserialize_any(TokenVisitor)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PathVisitor;

        impl<'de> Visitor<'de> for PathVisitor {
            type Value = FieldPath;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a sequence of field-name segments")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<FieldPath, A::Error> {
                let mut tokens = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(Token(t)) = seq.next_element()? {
                    tokens.push(t);
                }
                Ok(FieldPath(tokens))
            }
        }

        deserializer.deserialize_seq(PathVisitor)
    }
}

// ============================================================================
// Tests
// ============================================================================
