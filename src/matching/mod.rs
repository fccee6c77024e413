// src/matching/mod.rs
pub mod dictionaries;
pub mod matcher;
pub mod normalize;
pub mod optimized;
pub mod similarity;
pub mod strategies;

pub use dictionaries::{Dictionaries, DictionaryStore};
pub use matcher::FuzzyMatcher;
pub use optimized::OptimizedMatcher;
pub use similarity::SimilarityBackend;
