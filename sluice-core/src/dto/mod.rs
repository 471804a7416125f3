//! Data Transfer Objects for the orchestration graph API
//!
//! Payloads sent by the bridge when it registers assets and submits
//! materializations. The shapes are independent of the domain types so the
//! wire format can evolve separately.

pub mod asset;
pub mod run;
