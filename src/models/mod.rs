pub mod recommendation;
pub mod stay_record;

pub use recommendation::{format_confidence, Reason, Recommendation};
pub use stay_record::{HotelName, StayRecord, UserId};
