//! Aggregation of sentiment observations into a user-item preference matrix

use chrono::{DateTime, Utc};
use revsense_core::{ProductId, SentimentObservation, UserId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Aggregated signal for one `(user, product)` pair.
///
/// A cell exists only when the pair was observed, so a neutral mean of 0.0
/// is still distinguishable from "no signal".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreferenceCell {
    /// Mean mapped sentiment, in `[-1, 1]`
    pub preference: f64,

    /// Number of observations averaged
    pub count: u32,

    /// Timestamp of the most recent observation
    pub last_seen: DateTime<Utc>,
}

/// Sparse user x product preference matrix.
///
/// Users and products are held in ascending identifier order; rows map
/// product indices to cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserItemMatrix {
    users: Vec<UserId>,
    products: Vec<ProductId>,
    user_index: HashMap<UserId, usize>,
    product_index: HashMap<ProductId, usize>,
    rows: Vec<BTreeMap<usize, PreferenceCell>>,
}

impl UserItemMatrix {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    /// Number of products, including catalog products without signal
    pub fn n_products(&self) -> usize {
        self.products.len()
    }

    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    pub fn products(&self) -> &[ProductId] {
        &self.products
    }

    pub fn product_index(&self, product: &ProductId) -> Option<usize> {
        self.product_index.get(product).copied()
    }

    /// Preference of `user` for `product`; 0.0 when unobserved
    pub fn preference(&self, user: &UserId, product: &ProductId) -> f64 {
        self.cell(user, product).map_or(0.0, |cell| cell.preference)
    }

    pub fn cell(&self, user: &UserId, product: &ProductId) -> Option<&PreferenceCell> {
        let row = self.user_index.get(user)?;
        let column = self.product_index.get(product)?;
        self.rows[*row].get(column)
    }

    /// Whether the pair was observed at all, whatever its mean
    pub fn is_seen(&self, user: &UserId, product: &ProductId) -> bool {
        self.cell(user, product).is_some()
    }

    /// Observed products of a user with their cells, by product index
    pub fn row(&self, user: &UserId) -> Option<&BTreeMap<usize, PreferenceCell>> {
        self.user_index.get(user).map(|idx| &self.rows[*idx])
    }

    /// Seen set of a user, in ascending product order
    pub fn seen_products(&self, user: &UserId) -> Vec<&ProductId> {
        self.row(user)
            .map(|row| row.keys().map(|idx| &self.products[*idx]).collect())
            .unwrap_or_default()
    }

    pub(crate) fn rows(&self) -> &[BTreeMap<usize, PreferenceCell>] {
        &self.rows
    }
}

/// Rebuilds [`UserItemMatrix`] values from observation snapshots
pub struct SignalAggregator;

impl SignalAggregator {
    /// Average mapped sentiment per `(user, product)` pair
    pub fn build(observations: &[SentimentObservation]) -> UserItemMatrix {
        Self::build_with_catalog(observations, &[])
    }

    /// Like [`SignalAggregator::build`], additionally registering every
    /// catalog product as a column even when nobody reviewed it
    pub fn build_with_catalog(
        observations: &[SentimentObservation],
        catalog: &[ProductId],
    ) -> UserItemMatrix {
        if observations.is_empty() && catalog.is_empty() {
            return UserItemMatrix::default();
        }

        // (sum, count, last seen) per pair
        let mut pairs: BTreeMap<(&UserId, &ProductId), (f64, u32, DateTime<Utc>)> =
            BTreeMap::new();
        let mut product_set: BTreeSet<&ProductId> = catalog.iter().collect();

        for obs in observations {
            product_set.insert(&obs.product_id);
            let entry = pairs
                .entry((&obs.user_id, &obs.product_id))
                .or_insert((0.0, 0, obs.timestamp));
            entry.0 += obs.sentiment.value();
            entry.1 += 1;
            entry.2 = entry.2.max(obs.timestamp);
        }

        let users: Vec<UserId> = pairs
            .keys()
            .map(|(user, _)| *user)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();
        let products: Vec<ProductId> = product_set.into_iter().cloned().collect();

        let user_index: HashMap<UserId, usize> = users
            .iter()
            .enumerate()
            .map(|(idx, user)| (user.clone(), idx))
            .collect();
        let product_index: HashMap<ProductId, usize> = products
            .iter()
            .enumerate()
            .map(|(idx, product)| (product.clone(), idx))
            .collect();

        let mut rows = vec![BTreeMap::new(); users.len()];
        for ((user, product), (sum, count, last_seen)) in pairs {
            rows[user_index[user]].insert(
                product_index[product],
                PreferenceCell {
                    preference: sum / f64::from(count),
                    count,
                    last_seen,
                },
            );
        }

        UserItemMatrix {
            users,
            products,
            user_index,
            product_index,
            rows,
        }
    }
}
