//! Data Transfer Objects
//!
//! Lightweight request and response bodies for endpoints whose payloads are
//! not full domain records.

pub mod item;
pub mod job;
