//! Netwarden - Per-Network Admission Control
//!
//! This crate implements an admission filter for HTTP services. Each request
//! is attributed to its client's network (the address masked to a configured
//! prefix length) and checked against a per-network token bucket. Networks
//! that exceed their budget are rejected for a cooldown period, and a
//! background sweeper forgets networks that have gone quiet.

pub mod admission;
pub mod config;
pub mod error;
pub mod http;
