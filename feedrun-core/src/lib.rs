//! Feedrun Core
//!
//! Core types for the feedrun job engine.
//!
//! This crate contains:
//! - Domain types: validated job descriptors, attempts and outcomes
//! - DTOs: the on-disk shape of `job_config.json`
//! - Errors: the validation taxonomy shared by discovery and listing

pub mod domain;
pub mod dto;
pub mod error;
