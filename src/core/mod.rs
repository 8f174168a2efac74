// src/core/mod.rs
pub mod classifier;
pub mod encoder;
pub mod engine;
pub mod knowledge;
pub mod normalizer;
pub mod trie;
pub mod types;
pub mod vocabulary;
