//! DishDash Core - Shared types library.
//!
//! This crate provides common types used across all DishDash components:
//! - `server` - JSON API for customers and vendors
//! - `cli` - Command-line tools for migrations, seeding and account setup
//!
//! # Architecture
//!
//! The core crate contains only types and pure computations - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`cart`] - Cart line totals, discounts, tax and delivery fees
//! - [`slots`] - Delivery time-slot generation from opening hours
//! - [`stats`] - Vendor dashboard aggregation over order snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod slots;
pub mod stats;
pub mod types;

pub use types::*;
