//! leadrouter - lead routing and assignment orchestration
//!
//! Ranks candidate insurance agents for incoming leads, commits assignments
//! through a data service reached over a message bus, and re-routes leads
//! whose assignments go unacknowledged.

pub mod api;
pub mod breaker;
pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod ranking;
pub mod routing;
pub mod sweeper;
pub mod transport;
