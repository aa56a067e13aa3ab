// src/ingest/providers/mod.rs
pub mod fixture;
pub mod json_feed;
