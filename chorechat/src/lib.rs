//! `ChoreChat` — realtime messaging core for the `ChoreChamp` marketplace.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
