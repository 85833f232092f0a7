//! Relay Service
//!
//! The pipeline from an inbound user message to a reply: rebuild the
//! conversation, pick the model, call the provider, record the exchange.

mod reply;
mod service;

pub use reply::Reply;
pub use service::RelayService;
