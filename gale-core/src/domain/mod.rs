//! Core domain types
//!
//! This module contains the records the remote service owns and the
//! connection descriptor used to reach a workspace. Records are immutable
//! snapshots: every fetch yields a fresh value and nothing here mutates them.

pub mod job;
pub mod workspace;
