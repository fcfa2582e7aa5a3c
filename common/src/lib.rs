//! Shared models for `sweepr`.
//!
//! Everything in here is plain data plus the parsing and formatting rules that
//! belong to it. Anything that touches processes or the filesystem lives in
//! `sweepr-core`.

pub mod config;
pub mod error;
pub mod macros;
pub mod network;
pub mod scan;
pub mod utils;
