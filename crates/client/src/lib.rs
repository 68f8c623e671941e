//! `lecturegen-client` library crate.
//!
//! Drives a remote lecture-video generation job through its lifecycle:
//! create, upload, configure, extract, edit, generate, and poll until
//! the job finishes. The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod flows;
pub mod identity;
pub mod poller;
pub mod sink;
pub mod stages;
pub mod transport;
