//! Voice Processing Module
//!
//! Speech-to-text for voice notes.

mod service;

pub use service::Transcriber;
