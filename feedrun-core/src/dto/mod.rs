//! Data Transfer Objects
//!
//! On-disk shapes read by the job catalog. DTOs mirror the file format
//! one-to-one; validation and path resolution turn them into domain types.

pub mod job_config;
