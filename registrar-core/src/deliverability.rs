//! Mailbox deliverability statuses
//!
//! Oracle responses are free-form strings; they are case-folded and mapped
//! onto this enum before any allow-list comparison.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DeliverabilityStatus {
    /// Mailbox confirmed to exist
    Valid,
    /// Mailbox confirmed not to exist
    Invalid,
    /// Domain accepts all mail, mailbox existence unknown
    CatchAll,
    /// Oracle could not determine the status
    Unknown,
    Spamtrap,
    Abuse,
    DoNotMail,
    /// Anything the oracle reports that is not listed above (case-folded)
    Other(String),
}

impl DeliverabilityStatus {
    /// Normalize a raw oracle status
    pub fn parse(raw: &str) -> Self {
        let folded = raw.trim().to_lowercase().replace('_', "-");
        match folded.as_str() {
            "valid" => Self::Valid,
            "invalid" => Self::Invalid,
            "catch-all" | "catchall" => Self::CatchAll,
            "unknown" | "" => Self::Unknown,
            "spamtrap" => Self::Spamtrap,
            "abuse" => Self::Abuse,
            "do-not-mail" => Self::DoNotMail,
            _ => Self::Other(folded),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::CatchAll => "catch-all",
            Self::Unknown => "unknown",
            Self::Spamtrap => "spamtrap",
            Self::Abuse => "abuse",
            Self::DoNotMail => "do-not-mail",
            Self::Other(s) => s,
        }
    }

    /// Parse a comma-separated allow-list, skipping empty entries
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }
}

impl fmt::Display for DeliverabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DeliverabilityStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<DeliverabilityStatus> for String {
    fn from(status: DeliverabilityStatus) -> Self {
        status.as_str().to_string()
    }
}
