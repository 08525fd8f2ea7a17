//! Core domain + application logic for the currency conversion bot.
//!
//! This crate is intentionally framework-agnostic. Telegram, the exchange rate API
//! and Redis live behind ports (traits) implemented in adapter crates.

pub mod bot;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod convert;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod parser;
pub mod rates;

pub use errors::{Error, Result};
