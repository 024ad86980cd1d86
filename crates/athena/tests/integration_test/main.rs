//! Integration tests for tabdump-athena.
//!
//! Everything runs against an in-memory engine without AWS credentials.
//! Tests marked with `#[ignore]` talk to real Athena and must be run explicitly.

mod config;
mod gate;
mod scenarios;
