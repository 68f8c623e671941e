//! Domain types for the lecture-video generation client.
//!
//! Holds everything the orchestrator needs that does not touch the
//! network: job identifiers, the job configuration value object, the
//! wire schemas of the lecture REST API, and the pure status state
//! machine that drives polling.

pub mod config;
pub mod error;
pub mod routes;
pub mod status;
pub mod types;
pub mod voices;
pub mod wire;
