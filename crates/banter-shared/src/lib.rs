//! # banter-shared
//!
//! Core vocabulary of the banter chat client: identifier newtypes, the
//! message/attachment/reaction domain model, the JSON wire protocol spoken
//! over the event socket, and shared constants.

pub mod constants;
pub mod model;
pub mod protocol;
pub mod types;

mod error;

pub use error::WireError;
