pub mod interaction_matrix;
pub mod record_source;
pub mod recommendations;
pub mod similarity;

pub use interaction_matrix::InteractionMatrix;
pub use record_source::{load_snapshot, EngineSnapshot, InMemoryRecordSource, StayRecordSource};
pub use recommendations::RecommendationEngine;
pub use similarity::SimilarityIndex;
