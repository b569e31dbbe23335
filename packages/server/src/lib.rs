// Feedback Analytics - API Core
//
// HTTP surface for the feedback pipeline: upload raw feedback, run the
// analysis, browse the prioritized backlog and search stored documents.

pub mod config;
pub mod error;
pub mod kernel;
pub mod server;

pub use config::*;
