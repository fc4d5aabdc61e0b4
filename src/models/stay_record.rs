use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identifier of a guest, as issued by the booking system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Name of a hotel; unique within the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotelName(pub String);

impl HotelName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for HotelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HotelName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for HotelName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// One historical stay: a user, the hotel they stayed at, and what they spent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StayRecord {
    pub user_id: UserId,
    pub hotel_name: HotelName,
    pub total_spend: f64,
}

impl StayRecord {
    pub fn new(
        user_id: impl Into<UserId>,
        hotel_name: impl Into<HotelName>,
        total_spend: f64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            hotel_name: hotel_name.into(),
            total_spend,
        }
    }
}
