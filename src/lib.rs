#![allow(unused_assignments)] // thiserror/miette proc macros trigger false positives

pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod init;
pub mod logging;
pub mod metadata;
pub mod paths;
pub mod reconcile;
pub mod report;
pub mod resource;
