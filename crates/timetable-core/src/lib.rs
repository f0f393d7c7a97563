//! Core types and logic for the timetable cache.
//!
//! Normalizes the upstream timetable payload into weekly grids, keeps both
//! forms in a key-value cache with a staleness policy, and applies single-cell
//! edits. This crate is free of HTTP and database dependencies; backends and
//! fetchers plug in through [`store::KeyValueStore`] and [`fetch::Fetcher`].

pub mod cache;
pub mod edit;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod raw;
pub mod schedule;
pub mod session;
pub mod store;

pub use error::{Error, Result};
