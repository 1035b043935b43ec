//! Core domain types
//!
//! This module contains the structures shared by the job catalog (which
//! builds them), the runner (which executes them) and the CLI (which
//! displays them). None of these types perform I/O.

pub mod execution;
pub mod job;
pub mod log;
