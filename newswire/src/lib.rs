//! Document export poller and authenticated news search, shared by the
//! `newswire` binary and the integration tests.

pub mod auth;
pub mod cache;
pub mod cli;
pub mod error;
pub mod export;
pub mod news;
pub mod rate_limit;
