//! Shared data model for the `ChoreChat` messaging subsystem.

pub mod conversation;
pub mod ids;
pub mod message;
pub mod profile;
