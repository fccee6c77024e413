// src/lib.rs
pub mod cache;
pub mod matching;
pub mod models;
pub mod query;
pub mod utils;

pub use cache::CachedMatcher;
pub use matching::{FuzzyMatcher, OptimizedMatcher};
pub use models::{Candidate, EnhancedMatchResult, MatchResult, MatchType, OptimizedMatchResult};
pub use query::{GraphQueryBuilder, QueryEnhancer, QueryIntent};
