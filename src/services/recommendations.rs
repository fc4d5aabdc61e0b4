use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::{interaction_matrix::InteractionMatrix, similarity::SimilarityIndex};
use crate::{
    error::AppResult,
    models::{HotelName, Reason, Recommendation, StayRecord, UserId},
};

/// How many neighbors contribute to similar-user candidates
pub const SIMILAR_USER_COUNT: usize = 10;
/// How many of the user's own hotels seed the list
pub const OWN_HISTORY_COUNT: usize = 3;
pub const OWN_HISTORY_CONFIDENCE_CAP: f64 = 0.95;
pub const SIMILAR_USERS_CONFIDENCE_CAP: f64 = 0.9;
pub const DEFAULT_RECOMMENDATION_COUNT: usize = 5;
pub const DEFAULT_TOP_HOTEL_COUNT: usize = 3;

/// Size of the data an engine was built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineStats {
    pub users: usize,
    pub hotels: usize,
    pub records: usize,
    pub max_record_spend: f64,
}

/// Generates hotel recommendations from historical stays
///
/// Blends a user's own most-spent hotels with hotels favored by the users
/// whose spending pattern is closest to theirs (cosine similarity over the
/// user × hotel spend matrix). Everything is computed at construction;
/// queries only read, so one instance can serve many callers at once.
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    matrix: InteractionMatrix,
    similarity: SimilarityIndex,
    max_spend: f64,
}

impl RecommendationEngine {
    /// Builds the interaction matrix and similarity index from raw records
    ///
    /// Fails with `EmptyInput` for no records and `InvalidData` for malformed
    /// ones; no partially built engine is ever returned.
    pub fn build(records: &[StayRecord]) -> AppResult<Self> {
        let matrix = InteractionMatrix::build(records)?;
        let similarity = SimilarityIndex::build(&matrix);
        let max_spend = matrix.max_record_spend();

        tracing::info!(
            users = matrix.users().len(),
            hotels = matrix.hotels().len(),
            records = matrix.record_count(),
            max_spend,
            "Recommendation engine built"
        );

        Ok(Self {
            matrix,
            similarity,
            max_spend,
        })
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            users: self.matrix.users().len(),
            hotels: self.matrix.hotels().len(),
            records: self.matrix.record_count(),
            max_record_spend: self.max_spend,
        }
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    pub fn similarity(&self) -> &SimilarityIndex {
        &self.similarity
    }

    /// The user's `n` highest-spend hotels
    ///
    /// Equal totals keep the order in which the hotels first appeared in the
    /// input records. Unknown users get an empty list.
    pub fn get_user_top_hotels(&self, user: UserId, n: usize) -> Vec<(HotelName, f64)> {
        let mut hotels = self.matrix.history(user).to_vec();
        // sort_by is stable, which is what keeps encounter order on ties
        hotels.sort_by(|(_, a), (_, b)| b.total_cmp(a));
        hotels.truncate(n);
        hotels
    }

    /// Up to `n` ranked recommendations for `user`
    ///
    /// Own-history hotels come first, followed by hotels the user has never
    /// stayed at, scored by similarity-weighted neighbor spend. Unknown users
    /// get an empty list rather than an error.
    pub fn get_recommendations(&self, user: UserId, n: usize) -> Vec<Recommendation> {
        if n == 0 || !self.similarity.contains(user) {
            return Vec::new();
        }

        let similar_users = self.similarity.most_similar(user, SIMILAR_USER_COUNT);
        let user_hotels: HashSet<&HotelName> =
            self.matrix.history(user).iter().map(|(hotel, _)| hotel).collect();

        // `n` is caller-controlled; size for the own-history seed only
        let mut recommendations = Vec::with_capacity(n.min(OWN_HISTORY_COUNT));

        for (hotel, spend) in self.get_user_top_hotels(user, OWN_HISTORY_COUNT) {
            if recommendations.len() >= n {
                break;
            }
            recommendations.push(Recommendation {
                hotel_name: hotel,
                confidence: self.normalize(spend).min(OWN_HISTORY_CONFIDENCE_CAP),
                reason: Reason::OwnHistory,
            });
        }

        let mut scores: BTreeMap<&HotelName, f64> = BTreeMap::new();
        for (neighbor, similarity) in &similar_users {
            for (hotel, spend) in self.matrix.history(*neighbor) {
                if user_hotels.contains(hotel)
                    || recommendations.iter().any(|r| &r.hotel_name == hotel)
                {
                    continue;
                }
                *scores.entry(hotel).or_insert(0.0) += similarity * self.normalize(*spend);
            }
        }

        // BTreeMap iteration is name-ascending, so the stable sort breaks score ties by name
        let mut candidates: Vec<(&HotelName, f64)> = scores.into_iter().collect();
        candidates.sort_by(|(_, a), (_, b)| b.total_cmp(a));

        let own_count = recommendations.len();
        recommendations.extend(
            candidates
                .into_iter()
                .take(n.saturating_sub(own_count))
                .map(|(hotel, score)| Recommendation {
                    hotel_name: hotel.clone(),
                    confidence: score.clamp(0.0, SIMILAR_USERS_CONFIDENCE_CAP),
                    reason: Reason::SimilarUsers,
                }),
        );

        tracing::debug!(
            user = %user,
            neighbors = similar_users.len(),
            own_history = own_count,
            total = recommendations.len(),
            "Recommendations generated"
        );

        recommendations
    }

    /// Spend relative to the largest single stay; zero when nothing was ever spent
    fn normalize(&self, spend: f64) -> f64 {
        if self.max_spend > 0.0 {
            (spend / self.max_spend).max(0.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn scenario_records() -> Vec<StayRecord> {
        vec![
            StayRecord::new(1, "A", 100.0),
            StayRecord::new(1, "B", 50.0),
            StayRecord::new(2, "A", 90.0),
            StayRecord::new(2, "C", 30.0),
        ]
    }

    /// Twelve users over eight hotels with overlapping tastes
    fn neighborhood_records() -> Vec<StayRecord> {
        let hotels = [
            "Adlon",
            "Bristol",
            "Carlton",
            "Dorchester",
            "Excelsior",
            "Four Seasons",
            "Gritti",
            "Hassler",
        ];
        let mut records = Vec::new();
        for user in 1..=12_i64 {
            for (offset, hotel) in hotels.iter().enumerate() {
                let offset = offset as i64;
                if (user + offset) % 3 == 0 || (user * offset) % 5 == 1 {
                    let spend = ((user * 37 + offset * 11) % 400 + 20) as f64;
                    records.push(StayRecord::new(user, *hotel, spend));
                }
            }
        }
        records
    }

    #[test]
    fn test_build_empty_fails() {
        let result = RecommendationEngine::build(&[]);
        assert!(matches!(result, Err(AppError::EmptyInput)));
    }

    #[test]
    fn test_scenario_own_history_then_similar_users() {
        let engine = RecommendationEngine::build(&scenario_records()).unwrap();
        let recs = engine.get_recommendations(UserId(1), 3);

        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].hotel_name, HotelName::from("A"));
        assert_eq!(recs[0].reason, Reason::OwnHistory);
        assert_eq!(recs[0].confidence, 0.95);
        assert_eq!(recs[1].hotel_name, HotelName::from("B"));
        assert_eq!(recs[1].reason, Reason::OwnHistory);
        assert_eq!(recs[1].confidence, 0.5);
        assert_eq!(recs[2].hotel_name, HotelName::from("C"));
        assert_eq!(recs[2].reason, Reason::SimilarUsers);

        let similarity = engine.similarity().similarity(UserId(1), UserId(2)).unwrap();
        assert!(similarity > 0.0);
        assert!((recs[2].confidence - similarity * 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_user_gets_nothing() {
        let engine = RecommendationEngine::build(&scenario_records()).unwrap();

        assert!(engine.get_recommendations(UserId(404), 5).is_empty());
        assert!(engine.get_user_top_hotels(UserId(404), 3).is_empty());
    }

    #[test]
    fn test_single_record_user() {
        let mut records = scenario_records();
        records.push(StayRecord::new(3, "D", 40.0));
        let engine = RecommendationEngine::build(&records).unwrap();

        let recs = engine.get_recommendations(UserId(3), 5);
        assert_eq!(recs[0].hotel_name, HotelName::from("D"));
        assert_eq!(recs[0].reason, Reason::OwnHistory);
        assert_eq!(recs[0].confidence, (40.0_f64 / 100.0).min(0.95));
        assert_eq!(
            recs.iter().filter(|r| r.reason == Reason::OwnHistory).count(),
            1
        );
    }

    #[test]
    fn test_sole_user_single_record() {
        let engine = RecommendationEngine::build(&[StayRecord::new(9, "Solo", 70.0)]).unwrap();
        let recs = engine.get_recommendations(UserId(9), 5);

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].hotel_name, HotelName::from("Solo"));
        assert_eq!(recs[0].confidence, 0.95);
    }

    #[test]
    fn test_n_limits_own_history_seeding() {
        let engine = RecommendationEngine::build(&scenario_records()).unwrap();
        let recs = engine.get_recommendations(UserId(1), 1);

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].hotel_name, HotelName::from("A"));
        assert!(engine.get_recommendations(UserId(1), 0).is_empty());
    }

    #[test]
    fn test_zero_max_spend_yields_zero_confidence() {
        let engine = RecommendationEngine::build(&[
            StayRecord::new(1, "A", 0.0),
            StayRecord::new(2, "B", 0.0),
        ])
        .unwrap();

        let recs = engine.get_recommendations(UserId(1), 5);
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| r.confidence == 0.0));
        assert_eq!(recs[1].hotel_name, HotelName::from("B"));
    }

    #[test]
    fn test_scores_accumulate_across_neighbors() {
        let engine = RecommendationEngine::build(&[
            StayRecord::new(1, "Shared", 100.0),
            StayRecord::new(2, "Shared", 100.0),
            StayRecord::new(2, "Popular", 20.0),
            StayRecord::new(3, "Shared", 100.0),
            StayRecord::new(3, "Popular", 20.0),
            StayRecord::new(4, "Shared", 100.0),
            StayRecord::new(4, "Niche", 30.0),
        ])
        .unwrap();

        let recs = engine.get_recommendations(UserId(1), 5);
        let names: Vec<&str> = recs.iter().map(|r| r.hotel_name.as_str()).collect();
        assert_eq!(names, vec!["Shared", "Popular", "Niche"]);

        let sim_2 = engine.similarity().similarity(UserId(1), UserId(2)).unwrap();
        let sim_3 = engine.similarity().similarity(UserId(1), UserId(3)).unwrap();
        let expected = (sim_2 + sim_3) * 0.2;
        assert!((recs[1].confidence - expected).abs() < 1e-12);
    }

    #[test]
    fn test_similar_user_ties_break_by_name() {
        let engine = RecommendationEngine::build(&[
            StayRecord::new(1, "Base", 10.0),
            StayRecord::new(2, "Base", 10.0),
            StayRecord::new(2, "Zermatt", 5.0),
            StayRecord::new(2, "Alpina", 5.0),
        ])
        .unwrap();

        let recs = engine.get_recommendations(UserId(1), 5);
        let names: Vec<&str> = recs.iter().map(|r| r.hotel_name.as_str()).collect();
        assert_eq!(names, vec!["Base", "Alpina", "Zermatt"]);
    }

    #[test]
    fn test_top_hotels_sorted_and_stable() {
        let engine = RecommendationEngine::build(&[
            StayRecord::new(1, "Mid", 50.0),
            StayRecord::new(1, "TieFirst", 80.0),
            StayRecord::new(1, "TieSecond", 80.0),
            StayRecord::new(1, "Low", 10.0),
            StayRecord::new(1, "Mid", 40.0),
        ])
        .unwrap();

        let top = engine.get_user_top_hotels(UserId(1), 3);
        let names: Vec<&str> = top.iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(names, vec!["Mid", "TieFirst", "TieSecond"]);
        assert_eq!(top[0].1, 90.0);

        let all = engine.get_user_top_hotels(UserId(1), 10);
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_properties_hold_for_every_user() {
        let records = neighborhood_records();
        let engine = RecommendationEngine::build(&records).unwrap();

        for &user in engine.matrix().users() {
            let own: HashSet<&HotelName> =
                engine.matrix().history(user).iter().map(|(h, _)| h).collect();

            let candidates: HashSet<&HotelName> = engine
                .similarity()
                .most_similar(user, SIMILAR_USER_COUNT)
                .into_iter()
                .flat_map(|(neighbor, _)| engine.matrix().history(neighbor).iter())
                .map(|(h, _)| h)
                .filter(|h| !own.contains(h))
                .collect();
            let eligible = own.len().min(OWN_HISTORY_COUNT) + candidates.len();

            for n in [1, 3, 5, 8] {
                let recs = engine.get_recommendations(user, n);
                assert_eq!(recs.len(), n.min(eligible));

                let mut seen = HashSet::new();
                for rec in &recs {
                    assert!(seen.insert(rec.hotel_name.clone()), "duplicate hotel");
                    match rec.reason {
                        Reason::OwnHistory => {
                            assert!(own.contains(&rec.hotel_name));
                            assert!((0.0..=0.95).contains(&rec.confidence));
                        }
                        Reason::SimilarUsers => {
                            assert!(!own.contains(&rec.hotel_name));
                            assert!((0.0..=0.9).contains(&rec.confidence));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let records = neighborhood_records();
        let first = RecommendationEngine::build(&records).unwrap();
        let second = RecommendationEngine::build(&records).unwrap();

        for &user in first.matrix().users() {
            assert_eq!(
                first.get_recommendations(user, 5),
                second.get_recommendations(user, 5)
            );
            assert_eq!(
                first.get_user_top_hotels(user, 3),
                second.get_user_top_hotels(user, 3)
            );
        }
    }

    #[test]
    fn test_huge_n_returns_every_eligible_hotel() {
        let engine = RecommendationEngine::build(&scenario_records()).unwrap();
        let recs = engine.get_recommendations(UserId(1), usize::MAX);

        let names: Vec<&str> = recs.iter().map(|r| r.hotel_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_only_ten_nearest_neighbors_contribute() {
        // Users 2..=11 mirror user 1 closely; user 12 is the 11th nearest and
        // is the only one who ever stayed at "Outlier"
        let mut records = vec![
            StayRecord::new(1, "Home", 100.0),
            StayRecord::new(1, "Second", 10.0),
        ];
        for user in 2..=11_i64 {
            records.push(StayRecord::new(user, "Home", 100.0));
            records.push(StayRecord::new(user, "Second", 10.0 + user as f64));
            records.push(StayRecord::new(user, format!("Nearby {}", user), 5.0));
        }
        records.push(StayRecord::new(12, "Home", 10.0));
        records.push(StayRecord::new(12, "Second", 100.0));
        records.push(StayRecord::new(12, "Outlier", 500.0));
        let engine = RecommendationEngine::build(&records).unwrap();

        let neighbors = engine.similarity().most_similar(UserId(1), 11);
        assert_eq!(neighbors.len(), 11);
        assert_eq!(neighbors[10].0, UserId(12));
        assert!(neighbors[10].1 > 0.0);

        let recs = engine.get_recommendations(UserId(1), usize::MAX);
        assert!(recs.iter().all(|r| r.hotel_name != HotelName::from("Outlier")));
        // Own history plus one "Nearby" hotel per contributing neighbor
        assert_eq!(recs.len(), 2 + SIMILAR_USER_COUNT);
    }

    #[test]
    fn test_stats() {
        let engine = RecommendationEngine::build(&scenario_records()).unwrap();
        let stats = engine.stats();

        assert_eq!(stats.users, 2);
        assert_eq!(stats.hotels, 3);
        assert_eq!(stats.records, 4);
        assert_eq!(stats.max_record_spend, 100.0);
    }
}
