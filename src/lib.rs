//! ReelScout - short-video discovery and transcript enrichment
//!
//! Scrapes competitor accounts and hashtags for short videos via an Apify
//! actor, stores the qualifying ones in Postgres, and enriches them with
//! Whisper transcripts cleaned up by a chat-completion model.

pub mod cli;
pub mod config;
pub mod enhance;
pub mod error;
pub mod ingest;
pub mod media;
pub mod model;
pub mod normalize;
pub mod quality;
pub mod scrape;
pub mod store;
pub mod transcribe;
pub mod workflow;
