//! Domain types exchanged with the data service.
//!
//! Every type here is a read-only snapshot from the router's point of view;
//! the data service owns the authoritative records.

mod agent;
mod assignment;
mod decision;
mod lead;

pub use agent::*;
pub use assignment::*;
pub use decision::*;
pub use lead::*;
