//! Data models for the DigiGov backend.
//!
//! Serialized in camelCase for the web frontend; request bodies also accept
//! the snake_case spellings the older frontend sent.

mod complaint;
mod document;
mod notification;
mod user;

pub use complaint::*;
pub use document::*;
pub use notification::*;
pub use user::*;
