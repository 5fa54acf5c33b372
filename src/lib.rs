//! # medfind
//!
//! A hybrid medicine-information retrieval engine for Bengali/English
//! datasets.
//!
//! medfind loads a tabular medicine dataset into a TF-IDF vector index,
//! pools every other source (uploaded tables, extracted documents, remote
//! API payloads) into a flat keyword-searchable list, and answers queries
//! from both at once. Answers render in one of three modes: a structured
//! summary, a strict dataset-only lookup, or a fixed expert template.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐      ┌──────────────┐
//! │ Primary table │─────▶│ TF-IDF index │──┐
//! └───────────────┘      └──────────────┘  │   ┌───────────┐
//! ┌───────────────┐      ┌──────────────┐  ├──▶│ Formatter │
//! │ Tables / docs │─────▶│ Source pool  │──┘   └───────────┘
//! │ / API fetches │      │ (overlap)    │
//! └───────────────┘      └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`normalize`] | Shared text normalization |
//! | [`index`] | TF-IDF vector index over the primary dataset |
//! | [`pool`] | Unstructured source pool assembly |
//! | [`search`] | Query execution and ranking |
//! | [`context`] | Snippet extraction |
//! | [`format`] | Answer rendering (structured / strict / expert) |
//! | [`loader`] | Tabular file loading strategies |
//! | [`extract`] | Document text extraction |
//! | [`ingest`] | Table, document, and API ingestion |

pub mod config;
pub mod context;
pub mod extract;
pub mod format;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod pool;
pub mod search;
