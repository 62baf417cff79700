//! ConnectHub registration bot.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod recognizers;
pub mod registration;
pub mod store;
