use std::collections::HashMap;

use super::interaction_matrix::InteractionMatrix;
use crate::models::UserId;

/// Symmetric user × user cosine similarity table
///
/// Built once from an [`InteractionMatrix`]; there is no incremental update,
/// new records mean a new index.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    users: Vec<UserId>,
    user_index: HashMap<UserId, usize>,
    table: Vec<Vec<f64>>,
}

impl SimilarityIndex {
    /// Computes every pairwise similarity, O(U² · H)
    pub fn build(matrix: &InteractionMatrix) -> Self {
        let users = matrix.users().to_vec();
        let n = users.len();
        let norms: Vec<f64> = (0..n).map(|i| norm(matrix.row_at(i))).collect();

        let mut table = vec![vec![0.0; n]; n];
        for a in 0..n {
            table[a][a] = if norms[a] > 0.0 { 1.0 } else { 0.0 };
            for b in (a + 1)..n {
                let value = cosine(matrix.row_at(a), norms[a], matrix.row_at(b), norms[b]);
                table[a][b] = value;
                table[b][a] = value;
            }
        }

        let user_index = users.iter().enumerate().map(|(i, u)| (*u, i)).collect();

        tracing::debug!(users = n, "Similarity index built");

        Self {
            users,
            user_index,
            table,
        }
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.user_index.contains_key(&user)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Similarity of two users, `None` if either is unknown
    pub fn similarity(&self, a: UserId, b: UserId) -> Option<f64> {
        let a = *self.user_index.get(&a)?;
        let b = *self.user_index.get(&b)?;
        Some(self.table[a][b])
    }

    /// The `k` users closest to `user`, excluding `user` itself
    ///
    /// Ordered by descending similarity; equal scores fall back to ascending user id.
    pub fn most_similar(&self, user: UserId, k: usize) -> Vec<(UserId, f64)> {
        let Some(&row) = self.user_index.get(&user) else {
            return Vec::new();
        };

        let mut neighbors: Vec<(UserId, f64)> = self
            .users
            .iter()
            .zip(self.table[row].iter())
            .filter(|(other, _)| **other != user)
            .map(|(other, score)| (*other, *score))
            .collect();

        neighbors.sort_by(|(a_id, a_score), (b_id, b_score)| {
            b_score.total_cmp(a_score).then_with(|| a_id.cmp(b_id))
        });
        neighbors.truncate(k);
        neighbors
    }
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Cosine of two vectors given their precomputed norms; zero vectors score 0
fn cosine(a: &[f64], norm_a: f64, b: &[f64], norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
