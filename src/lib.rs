// src/lib.rs

pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod fuzzy;
pub mod model;
pub mod persistence;
pub mod shared;
pub mod training;

pub use crate::config::EngineConfig;
pub use crate::core::engine::{EmptySymptomPolicy, PredictionEngine};
pub use crate::core::types::{ConfidenceBand, Prediction, PredictionResult, ProfileMatch, Recognition};
pub use crate::error::{LoadError, TrainError, ValidationError};
pub use crate::shared::EngineCell;
