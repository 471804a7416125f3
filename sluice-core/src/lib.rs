//! Sluice Core
//!
//! Core types shared by the Sluice bridge, its HTTP client and the CLI.
//!
//! This crate contains:
//! - Domain types: pipeline and resource descriptors, asset specs, run events,
//!   run outcomes and materialization records
//! - DTOs: payloads exchanged with the orchestration graph API

pub mod domain;
pub mod dto;
