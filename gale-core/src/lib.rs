//! Gale Core
//!
//! Core types for the Gale client of a Windmill-style orchestration service.
//!
//! This crate contains:
//! - Domain types: Records owned by the remote service (JobDetails, etc.)
//!   and the workspace connection used to reach it
//! - DTOs: Request and response bodies for the smaller endpoints

pub mod domain;
pub mod dto;
