use anyhow::{anyhow, Result};
use serde::Serialize;

const SEPARATOR: &str = "@@";

/// Citation payload stored in a `cite` event's note as `kind@@reason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationNote {
    pub kind: String,
    pub reason: String,
}

impl CitationNote {
    pub fn new(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}{}{}", self.kind, SEPARATOR, self.reason)
    }

    /// Split on the first separator; the reason may itself contain `@@`.
    pub fn parse(note: &str) -> Result<Self> {
        note.split_once(SEPARATOR)
            .map(|(kind, reason)| CitationNote::new(kind, reason))
            .ok_or_else(|| anyhow!("Malformed citation note: {}", note))
    }
}

impl std::fmt::Display for CitationNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.kind, self.reason)
    }
}
