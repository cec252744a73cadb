//! paperlens - Question Answering over Research Papers
//!
//! Chunks a corpus of paper records, builds a dense embedding index and a
//! BM25 keyword index over the same chunk collection, fuses both rankings
//! at query time and grounds a language model's answer in the result.

pub mod batch;
pub mod chat;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod generation;
pub mod retrieval;
pub mod storage;

pub use error::{PaperLensError, Result};
