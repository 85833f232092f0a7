//! Turn and role types.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Line prefix used in the log file.
    pub fn prefix(self) -> &'static str {
        match self {
            Role::User => "User:",
            Role::Assistant => "Bot:",
        }
    }

    /// Classify a log line by prefix, returning the role and the rest of the line.
    pub(crate) fn split_line(line: &str) -> Option<(Role, &str)> {
        [Role::User, Role::Assistant]
            .into_iter()
            .find_map(|role| line.strip_prefix(role.prefix()).map(|rest| (role, rest)))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    /// Render as a single log line (without trailing newline). Embedded line
    /// breaks collapse into single spaces.
    pub(crate) fn to_line(&self) -> String {
        let flat = self
            .text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} {}", self.role.prefix(), flat)
    }
}
