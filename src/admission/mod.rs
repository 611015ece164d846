//! Admission control: per-network rate state and its maintenance.

mod bucket;
mod engine;
mod network;
mod store;
mod sweeper;

pub use bucket::TokenBucket;
pub use engine::{AdmissionEngine, AdmissionPolicy, Decision};
pub use network::NetworkKey;
pub use store::{ClientRecord, ClientStore};
pub use sweeper::spawn_sweeper;
