//! HTTP surface for the requirement to SQL translator: a single page backed by
//! a small JSON API over per-session requirement tables.

pub mod server;
