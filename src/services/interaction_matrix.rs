use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
    error::{AppError, AppResult},
    models::{HotelName, StayRecord, UserId},
};

/// Per-hotel totals for one user, in the order the hotels first appeared in the input
pub type UserHistory = Vec<(HotelName, f64)>;

/// User × hotel table of aggregated spend
///
/// Rows follow ascending user id, columns ascending hotel name. Every row spans
/// every hotel seen in the input; pairs without any stay hold zero.
#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    users: Vec<UserId>,
    hotels: Vec<HotelName>,
    user_index: HashMap<UserId, usize>,
    hotel_index: HashMap<HotelName, usize>,
    rows: Vec<Vec<f64>>,
    histories: Vec<UserHistory>,
    max_record_spend: f64,
    record_count: usize,
}

impl InteractionMatrix {
    /// Aggregates raw stay records into the matrix
    ///
    /// Fails with `EmptyInput` when there is nothing to aggregate and with
    /// `InvalidData` for negative or non-finite spend and blank hotel names.
    pub fn build(records: &[StayRecord]) -> AppResult<Self> {
        if records.is_empty() {
            return Err(AppError::EmptyInput);
        }

        let mut users: BTreeSet<UserId> = BTreeSet::new();
        let mut hotels: BTreeSet<HotelName> = BTreeSet::new();
        let mut totals: BTreeMap<(UserId, HotelName), f64> = BTreeMap::new();
        let mut histories: HashMap<UserId, UserHistory> = HashMap::new();
        let mut max_record_spend = 0.0_f64;

        for (position, record) in records.iter().enumerate() {
            validate(position, record)?;

            users.insert(record.user_id);
            hotels.insert(record.hotel_name.clone());
            *totals
                .entry((record.user_id, record.hotel_name.clone()))
                .or_insert(0.0) += record.total_spend;
            max_record_spend = max_record_spend.max(record.total_spend);

            let history = histories.entry(record.user_id).or_default();
            match history
                .iter_mut()
                .find(|(hotel, _)| *hotel == record.hotel_name)
            {
                Some((_, spend)) => *spend += record.total_spend,
                None => history.push((record.hotel_name.clone(), record.total_spend)),
            }
        }

        let users: Vec<UserId> = users.into_iter().collect();
        let hotels: Vec<HotelName> = hotels.into_iter().collect();
        let user_index: HashMap<UserId, usize> =
            users.iter().enumerate().map(|(i, u)| (*u, i)).collect();
        let hotel_index: HashMap<HotelName, usize> = hotels
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();

        let mut rows = vec![vec![0.0; hotels.len()]; users.len()];
        for ((user, hotel), spend) in totals {
            rows[user_index[&user]][hotel_index[&hotel]] = spend;
        }

        let histories = users
            .iter()
            .map(|user| histories.remove(user).unwrap_or_default())
            .collect();

        tracing::debug!(
            users = users.len(),
            hotels = hotels.len(),
            records = records.len(),
            "Interaction matrix built"
        );

        Ok(Self {
            users,
            hotels,
            user_index,
            hotel_index,
            rows,
            histories,
            max_record_spend,
            record_count: records.len(),
        })
    }

    /// Distinct users, ascending
    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    /// Distinct hotels, ascending
    pub fn hotels(&self) -> &[HotelName] {
        &self.hotels
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Largest spend on any single input record
    pub fn max_record_spend(&self) -> f64 {
        self.max_record_spend
    }

    pub fn contains_user(&self, user: UserId) -> bool {
        self.user_index.contains_key(&user)
    }

    /// Spend vector for a user over the full hotel column space
    pub fn row(&self, user: UserId) -> Option<&[f64]> {
        self.user_index.get(&user).map(|&i| self.rows[i].as_slice())
    }

    /// Row by position in `users()`
    pub(crate) fn row_at(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    /// Aggregated spend for a pair; zero when the user never stayed there
    pub fn spend(&self, user: UserId, hotel: &HotelName) -> f64 {
        match (self.user_index.get(&user), self.hotel_index.get(hotel)) {
            (Some(&u), Some(&h)) => self.rows[u][h],
            _ => 0.0,
        }
    }

    /// Hotels the user has any record for, including zero-spend stays
    pub fn history(&self, user: UserId) -> &[(HotelName, f64)] {
        self.user_index
            .get(&user)
            .map(|&i| self.histories[i].as_slice())
            .unwrap_or(&[])
    }
}

fn validate(position: usize, record: &StayRecord) -> AppResult<()> {
    if record.hotel_name.as_str().trim().is_empty() {
        return Err(AppError::InvalidData(format!(
            "record {} for user {} has no hotel name",
            position, record.user_id
        )));
    }

    if !record.total_spend.is_finite() || record.total_spend < 0.0 {
        return Err(AppError::InvalidData(format!(
            "record {} for user {} at {} has invalid spend {}",
            position, record.user_id, record.hotel_name, record.total_spend
        )));
    }

    Ok(())
}
