//! PharmaGuard portal library.
//!
//! This crate provides the portal HTTP API as a library, allowing it to be
//! tested against an in-memory store and reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
