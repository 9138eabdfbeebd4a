//! Typed upstream endpoints

mod entities;
mod killmail;
mod status;

pub use entities::{Alliance, Character, Conditional, Corporation};
pub use status::ServerStatus;
