#![doc = "s3-backup: mirror a local directory tree to an S3 bucket prefix."]

//! This crate contains the full sync pipeline: local enumeration, remote
//! enumeration, the diff between them, action execution and reporting.
//! The binary in `main.rs` is a thin wrapper around [`cli::run`].
//!
//! # Usage
//! Library consumers (and integration tests) drive a run through
//! [`cli::run_sync`] with any [`store::ObjectStore`] implementation.

pub mod cli;
pub mod report;
pub mod store;
pub mod synchronise;
pub mod walker;
