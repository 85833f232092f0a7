//! Outcome of relaying one message.

use crate::error::ErrorCode;
use crate::models::ModelId;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The model answered and the exchange was recorded.
    Answer {
        text: String,
        requested_model: ModelId,
        served_model: String,
    },
    /// Nothing was recorded; `message` is safe to show to the user.
    Error { code: ErrorCode, message: String },
}

impl Reply {
    pub fn is_answer(&self) -> bool {
        matches!(self, Reply::Answer { .. })
    }

    /// Text to send back to the user. Notes the serving model when it differs
    /// from the one requested.
    pub fn render(&self) -> String {
        match self {
            Reply::Answer {
                text,
                requested_model,
                served_model,
            } => {
                if served_model == requested_model.as_str() {
                    text.clone()
                } else {
                    format!("{}\n\n🛠 Answered by {}", text, served_model)
                }
            }
            Reply::Error { message, .. } => message.clone(),
        }
    }
}
