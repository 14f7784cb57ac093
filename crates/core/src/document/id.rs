/// Document identifiers.
///
/// New documents get a UUID v4 in simple (32 hex char) form. Ids arriving
/// from request paths are accepted when they are 1..=128 characters of
/// `[A-Za-z0-9_-]`, which also admits ids minted by the hosted database.
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidId {
    #[error("document id cannot be empty")]
    Empty,
    #[error("document id exceeds {MAX_ID_LEN} characters")]
    TooLong,
    #[error("document id contains invalid character {0:?}")]
    BadChar(char),
}

impl DocumentId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        DocumentId(Uuid::new_v4().simple().to_string())
    }

    /// Parse an id received from a client.
    pub fn parse(id: &str) -> Result<Self, InvalidId> {
        if id.is_empty() {
            return Err(InvalidId::Empty);
        }
        if id.len() > MAX_ID_LEN {
            return Err(InvalidId::TooLong);
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(InvalidId::BadChar(c));
        }
        Ok(DocumentId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_simple_uuids() {
        let id = DocumentId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(DocumentId::parse(id.as_str()).is_ok());
        assert_ne!(id, DocumentId::generate());
    }

    #[test]
    fn parse_accepts_hosted_style_ids() {
        let id = DocumentId::parse("Xa9_k2-LmQ0").unwrap();
        assert_eq!(id.to_string(), "Xa9_k2-LmQ0");
    }

    #[test]
    fn parse_rejects_bad_ids() {
        assert_eq!(DocumentId::parse(""), Err(InvalidId::Empty));
        assert_eq!(DocumentId::parse("a/b"), Err(InvalidId::BadChar('/')));
        assert_eq!(DocumentId::parse("../etc"), Err(InvalidId::BadChar('.')));
        assert_eq!(DocumentId::parse(&"a".repeat(129)), Err(InvalidId::TooLong));
    }
}
