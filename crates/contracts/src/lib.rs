//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Message Model
//! - A message is an opaque JSON event notification
//! - `data.event.replayId` is the subscription cursor, `channel` names the subscription

mod config;
mod error;
mod message;
mod replay;
mod sink;
mod source;

pub use config::*;
pub use error::*;
pub use message::*;
pub use replay::{LocalReplayMarkerStorage, ReplayMarkerStorage};
pub use sink::*;
pub use source::{LocalMessageSource, MessageSource};
