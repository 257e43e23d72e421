//! Text-to-image similarity: embedding client, circuit breaker and ranker.

pub mod circuit_breaker;
pub mod hdir;
pub mod ranker;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use hdir::{EmbeddingError, EmbeddingService, HdirClient};
pub use ranker::{rank_scores, RankedMedia, SimilarityRanker};
