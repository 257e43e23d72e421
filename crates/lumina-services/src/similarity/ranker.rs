//! Ranks media against a free-text query by semantic similarity.

use std::cmp::Ordering;
use std::sync::Arc;

use lumina_core::{Media, MediaError, MediaResult};

use super::circuit_breaker::CircuitBreaker;
use super::hdir::{EmbeddingError, EmbeddingService};
use crate::derivatives::DerivativeCacheManager;

/// One media in a ranking result.
#[derive(Debug, Clone)]
pub struct RankedMedia {
    pub media: Arc<Media>,
    pub score: f32,
}

pub struct SimilarityRanker {
    embeddings: Arc<dyn EmbeddingService>,
    derivatives: Arc<DerivativeCacheManager>,
    breaker: Arc<CircuitBreaker>,
}

impl SimilarityRanker {
    pub fn new(
        embeddings: Arc<dyn EmbeddingService>,
        derivatives: Arc<DerivativeCacheManager>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            embeddings,
            derivatives,
            breaker,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    fn unavailable(&self) -> MediaError {
        MediaError::ServiceUnavailable(format!("{} is unavailable", self.breaker.name()))
    }

    /// Feed the call outcome to the breaker and convert the error.
    fn settle<T>(&self, result: Result<T, EmbeddingError>) -> MediaResult<T> {
        match result {
            Ok(value) => {
                self.breaker.record_success();
                Ok(value)
            }
            Err(err) if err.is_unreachable() => {
                self.breaker.record_failure();
                tracing::error!(error = %err, "Embedding service unreachable");
                Err(self.unavailable())
            }
            Err(err) => {
                // The host answered, so it is reachable.
                self.breaker.record_success();
                Err(MediaError::Embedding(err.to_string()))
            }
        }
    }

    /// Embedding of the media's thumbnail, computed once and stored on the
    /// record.
    #[tracing::instrument(skip(self, media), fields(content_id = %media.content_id()))]
    pub async fn get_embedding(&self, media: &Media) -> MediaResult<Vec<f32>> {
        if let Some(hdir) = media.hdir() {
            return Ok(hdir);
        }

        if !self.breaker.allow_request() {
            return Err(self.unavailable());
        }

        let path = match self.derivatives.lowres_path(media).await {
            Ok(path) => path,
            Err(e) => {
                self.breaker.abandon_request();
                return Err(e);
            }
        };

        let embedding = self.settle(self.embeddings.encode_image(&path).await)?;
        media.set_hdir(embedding.clone());

        tracing::debug!(dimensions = embedding.len(), "Embedding stored");
        Ok(embedding)
    }

    /// Media ordered by similarity to `text`.
    ///
    /// Scores below `min_score` are dropped, the rest sorted descending with
    /// ties kept in input order, and the list is cut at the first score below
    /// the midpoint of the remaining score range.
    #[tracing::instrument(skip(self, media), fields(media_count = media.len()))]
    pub async fn rank_by_text(
        &self,
        text: &str,
        media: &[Arc<Media>],
        min_score: f32,
    ) -> MediaResult<Vec<RankedMedia>> {
        if text.is_empty() || media.is_empty() {
            return Ok(Vec::new());
        }

        let mut features = Vec::with_capacity(media.len());
        for m in media {
            features.push(self.get_embedding(m).await?);
        }

        if !self.breaker.allow_request() {
            return Err(self.unavailable());
        }
        let scores = self.settle(self.embeddings.match_text(text, &features).await)?;

        if scores.len() != media.len() {
            return Err(MediaError::ScoreCountMismatch {
                expected: media.len(),
                actual: scores.len(),
            });
        }

        let ranked = rank_scores(&scores, min_score)?
            .into_iter()
            .map(|(index, score)| RankedMedia {
                media: Arc::clone(&media[index]),
                score,
            })
            .collect::<Vec<_>>();

        tracing::info!(
            matched = ranked.len(),
            top_score = ranked.first().map(|r| r.score),
            "Ranked media by text"
        );
        Ok(ranked)
    }
}

/// Indices and scores that survive the `min_score` filter and the skim-top
/// cutoff, best first. Equal scores keep their input order.
pub fn rank_scores(scores: &[f32], min_score: f32) -> MediaResult<Vec<(usize, f32)>> {
    let mut kept: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| *score >= min_score)
        .collect();

    if kept.is_empty() {
        return Err(MediaError::NoSimilarityMatch);
    }

    kept.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let max = kept[0].1;
    let min = kept[kept.len() - 1].1;
    let cutoff = min + 0.5 * (max - min);

    let keep = kept
        .iter()
        .position(|(_, score)| *score < cutoff)
        .unwrap_or(kept.len());
    kept.truncate(keep);

    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(ranked: &[(usize, f32)]) -> Vec<usize> {
        ranked.iter().map(|(i, _)| *i).collect()
    }

    #[test]
    fn test_gap_cutoff_drops_tail() {
        let ranked = rank_scores(&[0.9, 0.85, 0.3], 0.2).unwrap();
        assert_eq!(indices(&ranked), vec![0, 1]);
    }

    #[test]
    fn test_sorted_descending_above_minimum() {
        let scores = [0.41, 0.77, 0.15, 0.93, 0.66, 0.70];
        let ranked = rank_scores(&scores, 0.4).unwrap();

        assert!(ranked.iter().all(|(_, s)| *s >= 0.4));
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));

        let cutoff = 0.41 + 0.5 * (0.93 - 0.41);
        assert!(ranked.iter().all(|(_, s)| *s >= cutoff));
        assert_eq!(indices(&ranked), vec![3, 1, 5]);
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let ranked = rank_scores(&[0.5, 0.8, 0.5, 0.8, 0.8], 0.0).unwrap();
        assert_eq!(indices(&ranked), vec![1, 3, 4]);

        let flat = rank_scores(&[0.6, 0.6, 0.6], 0.1).unwrap();
        assert_eq!(indices(&flat), vec![0, 1, 2]);
    }

    #[test]
    fn test_nothing_above_minimum() {
        assert!(matches!(
            rank_scores(&[0.1, 0.05], 0.2),
            Err(MediaError::NoSimilarityMatch)
        ));
        assert!(matches!(
            rank_scores(&[f32::NAN], 0.0),
            Err(MediaError::NoSimilarityMatch)
        ));
    }
}
