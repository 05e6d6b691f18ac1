//! Item-item cosine similarity over preference columns

use crate::aggregator::UserItemMatrix;
use revsense_core::ProductId;
use std::collections::HashMap;

/// Sparse item vector: `(user index, preference)` sorted by user index
type ItemVector = Vec<(usize, f64)>;

/// Dense symmetric product x product similarity matrix.
///
/// Only products with a nonzero preference from some user are indexed;
/// every other product has similarity 0.0 with everything. Empty when
/// fewer than two products carry signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemSimilarityMatrix {
    products: Vec<ProductId>,
    index: HashMap<ProductId, usize>,
    values: Vec<f64>,
}

impl ItemSimilarityMatrix {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn products(&self) -> &[ProductId] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Similarity of two products; 0.0 when either is unknown or has no signal
    pub fn similarity(&self, a: &ProductId, b: &ProductId) -> f64 {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.at(i, j),
            _ => 0.0,
        }
    }

    /// Similarity by position in [`ItemSimilarityMatrix::products`]
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.products.len() + j]
    }

    /// Position of `product` in [`ItemSimilarityMatrix::products`]
    pub fn index_of(&self, product: &ProductId) -> Option<usize> {
        self.index.get(product).copied()
    }
}

/// Builds [`ItemSimilarityMatrix`] values
pub struct ItemSimilarityIndex;

impl ItemSimilarityIndex {
    /// Pairwise cosine similarity of the matrix columns that carry signal.
    ///
    /// Only the upper triangle is computed; the lower one is its mirror,
    /// so `sim(a, b)` and `sim(b, a)` are the same value.
    pub fn compute(matrix: &UserItemMatrix) -> ItemSimilarityMatrix {
        let mut columns: Vec<ItemVector> = vec![Vec::new(); matrix.n_products()];
        for (user_idx, row) in matrix.rows().iter().enumerate() {
            for (product_idx, cell) in row {
                if cell.preference != 0.0 {
                    columns[*product_idx].push((user_idx, cell.preference));
                }
            }
        }

        // catalog-only and all-neutral products stay out of the dense matrix
        let (products, columns): (Vec<ProductId>, Vec<ItemVector>) = matrix
            .products()
            .iter()
            .cloned()
            .zip(columns)
            .filter(|(_, column)| !column.is_empty())
            .unzip();

        let n = products.len();
        if n < 2 {
            return ItemSimilarityMatrix::default();
        }

        let norms: Vec<f64> = columns.iter().map(|c| norm(c)).collect();
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            for j in i..n {
                let sim = cosine_with_norms(&columns[i], norms[i], &columns[j], norms[j]);
                values[i * n + j] = sim;
                values[j * n + i] = sim;
            }
        }

        let index = products
            .iter()
            .enumerate()
            .map(|(idx, product)| (product.clone(), idx))
            .collect();

        ItemSimilarityMatrix {
            products,
            index,
            values,
        }
    }
}

fn norm(v: &[(usize, f64)]) -> f64 {
    v.iter().map(|(_, x)| x * x).sum::<f64>().sqrt()
}

/// Dot product of two sparse vectors sorted by index
fn sparse_dot(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j, mut dot) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}

fn cosine_with_norms(a: &[(usize, f64)], norm_a: f64, b: &[(usize, f64)], norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    sparse_dot(a, b) / (norm_a * norm_b)
}

/// Cosine similarity of two sparse vectors; 0.0 when either is all-zero
pub fn cosine(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    cosine_with_norms(a, norm(a), b, norm(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::SignalAggregator;
    use revsense_core::{SentimentLabel, SentimentObservation, UserId};

    fn obs(user: &str, product: &str, sentiment: SentimentLabel) -> SentimentObservation {
        SentimentObservation::new(
            UserId::parse(user).unwrap(),
            ProductId::parse(product).unwrap(),
            sentiment,
        )
    }

    fn pid(raw: &str) -> ProductId {
        ProductId::parse(raw).unwrap()
    }

    #[test]
    fn test_cosine_self_and_zero() {
        let v = vec![(0, 1.0), (3, -2.0), (7, 0.5)];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-12);
        assert_eq!(cosine(&v, &[]), 0.0);
        assert_eq!(cosine(&[], &[]), 0.0);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![(0, 1.0), (1, 1.0)];
        let b = vec![(0, -1.0), (1, -1.0)];
        assert!((cosine(&a, &b) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fewer_than_two_products_is_empty() {
        let matrix = SignalAggregator::build(&[
            obs("u1", "p1", SentimentLabel::Positive),
            obs("u2", "p1", SentimentLabel::Negative),
        ]);
        assert!(ItemSimilarityIndex::compute(&matrix).is_empty());

        // a second product with only neutral signal carries no signal
        let matrix = SignalAggregator::build(&[
            obs("u1", "p1", SentimentLabel::Positive),
            obs("u1", "p2", SentimentLabel::Neutral),
        ]);
        assert!(ItemSimilarityIndex::compute(&matrix).is_empty());
        assert!(ItemSimilarityIndex::compute(&SignalAggregator::build(&[])).is_empty());
    }

    #[test]
    fn test_similarity_values() {
        let matrix = SignalAggregator::build_with_catalog(
            &[
                obs("u1", "p1", SentimentLabel::Positive),
                obs("u1", "p2", SentimentLabel::Positive),
                obs("u2", "p1", SentimentLabel::Positive),
                obs("u2", "p3", SentimentLabel::Negative),
            ],
            &[pid("p4")],
        );
        let sim = ItemSimilarityIndex::compute(&matrix);

        assert_eq!(sim.len(), 3);
        assert_eq!(sim.products(), &[pid("p1"), pid("p2"), pid("p3")]);
        assert_eq!(sim.index_of(&pid("p3")), Some(2));
        assert_eq!(sim.index_of(&pid("p4")), None);
        // p1 = [1, 1], p2 = [1, 0], p3 = [0, -1]
        let half_sqrt2 = 1.0 / 2f64.sqrt();
        assert!((sim.similarity(&pid("p1"), &pid("p2")) - half_sqrt2).abs() < 1e-12);
        assert!((sim.similarity(&pid("p1"), &pid("p3")) + half_sqrt2).abs() < 1e-12);
        assert_eq!(sim.similarity(&pid("p2"), &pid("p3")), 0.0);
        assert!((sim.similarity(&pid("p1"), &pid("p1")) - 1.0).abs() < 1e-12);

        // catalog product without signal: not indexed, zero everywhere
        assert_eq!(sim.similarity(&pid("p4"), &pid("p4")), 0.0);
        assert_eq!(sim.similarity(&pid("p4"), &pid("p1")), 0.0);
        assert_eq!(sim.similarity(&pid("p1"), &pid("unknown")), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let matrix = SignalAggregator::build(&[
            obs("u1", "a", SentimentLabel::Positive),
            obs("u1", "b", SentimentLabel::Negative),
            obs("u2", "b", SentimentLabel::Positive),
            obs("u2", "c", SentimentLabel::Positive),
            obs("u3", "a", SentimentLabel::Negative),
            obs("u3", "c", SentimentLabel::Positive),
        ]);
        let sim = ItemSimilarityIndex::compute(&matrix);
        for i in 0..sim.len() {
            for j in 0..sim.len() {
                assert_eq!(sim.at(i, j), sim.at(j, i));
            }
        }
    }
}
