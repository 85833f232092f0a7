//! Conversation Logs
//!
//! Append-only flat-text transcripts, one file per conversation, rebuilt into
//! an ordered turn sequence before every completion call.

mod log;
mod store;
mod turn;

pub use log::{ConversationLog, FillerFilter, DEFAULT_FILLER_PHRASES, VOICE_MARKER};
pub use store::ConversationStore;
pub use turn::{Role, Turn};
