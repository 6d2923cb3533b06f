//! Employee offboarding ("exit clearance") tracking.
//!
//! HR registers a departing employee and assigns clearance departments; each
//! department answers its checklist and signs off with a comment. The
//! [`workflows::clearance`] module keeps the checklist rows consistent with the
//! catalog and derives per-department and overall clearance status.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
