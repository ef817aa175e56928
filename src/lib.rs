//! # Promo Code Bot
//!
//! A Telegram bot that hands out promotional discount codes, plus a follow-up
//! drink code, from pre-seeded pools.
//!
//! ## Features
//! - One discount code per user per day, with a configurable number of extras
//! - A drink code attached to the day's claim
//! - Rotating canned replies, fixed order first and random afterwards
//! - Optional opening-hours gate in a fixed reference timezone
//! - Persistent storage with SQLite

/// Bot command handlers and message processing
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Code allocation, claim ledger, message rotation and claim policy
pub mod engine;
/// HTTP health endpoints
pub mod services;
/// Row store port and its in-memory implementation
pub mod store;
/// Utility functions for datetime handling and logging
pub mod utils;
