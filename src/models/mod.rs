// src/models/mod.rs
pub mod core;
pub mod matching;
pub mod stats_models;

pub use self::core::Candidate;
pub use self::matching::{EnhancedMatchResult, MatchResult, MatchType, OptimizedMatchResult};
