use serde::{Deserialize, Serialize};

use super::HotelName;

/// Why a hotel ended up in a user's recommendation list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    /// One of the user's own most-spent hotels
    OwnHistory,
    /// Favored by the users whose spending looks most like this user's
    SimilarUsers,
}

impl Reason {
    /// Short machine tag, identical to the serialized form
    pub fn tag(&self) -> &'static str {
        match self {
            Reason::OwnHistory => "own-history",
            Reason::SimilarUsers => "similar-users",
        }
    }

    /// Human readable explanation shown next to a recommendation
    pub fn description(&self) -> &'static str {
        match self {
            Reason::OwnHistory => "Based on your previous visits",
            Reason::SimilarUsers => "Based on similar users' preferences",
        }
    }
}

/// A single ranked hotel suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub hotel_name: HotelName,
    /// Relative strength of evidence in [0, 0.95]; not a calibrated probability
    pub confidence: f64,
    pub reason: Reason,
}

/// Formats a confidence score as a percentage with one decimal place
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}
