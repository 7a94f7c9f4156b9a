//! DishDash server library.
//!
//! The HTTP API is built here so the binary, the CLI and tests can share
//! configuration, repositories and the router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
