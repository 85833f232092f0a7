//! A single conversation log file.

use super::turn::{Role, Turn};
use crate::error::{RelayError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Marker written before user turns that came from a voice note.
pub const VOICE_MARKER: &str = "[voice]";

/// Boilerplate stripped from turns when the log is read back.
pub const DEFAULT_FILLER_PHRASES: &[&str] = &[
    VOICE_MARKER,
    "🎤 Voice message:",
    "Voice message transcription:",
    "Расшифровка голосового сообщения:",
];

/// Header line written when a log is created. Skipped on reconstruction.
pub(crate) const LOG_HEADER: &str = "Chat started";

/// Strips known filler phrases from turn text.
#[derive(Debug, Clone)]
pub struct FillerFilter {
    phrases: Arc<Vec<String>>,
}

impl Default for FillerFilter {
    fn default() -> Self {
        Self::new(DEFAULT_FILLER_PHRASES.iter().map(|p| p.to_string()))
    }
}

impl FillerFilter {
    pub fn new(phrases: impl IntoIterator<Item = String>) -> Self {
        let phrases = phrases.into_iter().filter(|p| !p.trim().is_empty()).collect();
        Self {
            phrases: Arc::new(phrases),
        }
    }

    /// Strip filler phrases leading the text, then trim. Phrases further in
    /// are user content and stay. May return an empty string.
    pub fn clean(&self, text: &str) -> String {
        let mut rest = text.trim();
        while let Some(stripped) = self
            .phrases
            .iter()
            .find_map(move |phrase| rest.strip_prefix(phrase.as_str()))
        {
            rest = stripped.trim_start();
        }
        rest.trim_end().to_string()
    }
}

/// Handle on one conversation's log file.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    path: PathBuf,
    filter: FillerFilter,
}

impl ConversationLog {
    /// Create the file (failing if it already exists) and write the header.
    pub(crate) fn create(path: PathBuf, filter: FillerFilter) -> Result<Self> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| RelayError::storage(&path, e))?;
        writeln!(file, "{}", LOG_HEADER)
            .and_then(|_| file.flush())
            .map_err(|e| RelayError::storage(&path, e))?;
        Ok(Self { path, filter })
    }

    /// Open an existing log without touching it.
    pub fn open(path: PathBuf, filter: FillerFilter) -> Self {
        Self { path, filter }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, turn: &Turn) -> Result<()> {
        self.write_lines(std::slice::from_ref(turn))
    }

    /// Append a user turn and its reply with a single write.
    pub fn append_exchange(&self, user: &Turn, assistant: &Turn) -> Result<()> {
        self.write_lines(&[user.clone(), assistant.clone()])
    }

    fn write_lines(&self, turns: &[Turn]) -> Result<()> {
        let mut buf = String::new();
        for turn in turns {
            buf.push_str(&turn.to_line());
            buf.push('\n');
        }

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| RelayError::storage(&self.path, e))?;
        file.write_all(buf.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| RelayError::storage(&self.path, e))
    }

    /// Re-read the whole file and rebuild the turn sequence in line order.
    ///
    /// Lines without a known prefix are skipped, as are turns that are empty
    /// once filler phrases are removed.
    pub fn reconstruct(&self) -> Result<Vec<Turn>> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| RelayError::storage(&self.path, e))?;
        Ok(parse_log(&content, &self.filter))
    }
}

pub(crate) fn parse_log(content: &str, filter: &FillerFilter) -> Vec<Turn> {
    content
        .lines()
        .filter_map(|line| {
            let (role, rest) = Role::split_line(line.trim_end_matches('\r'))?;
            let text = filter.clean(rest);
            if text.is_empty() {
                None
            } else {
                Some(Turn { role, text })
            }
        })
        .collect()
}
