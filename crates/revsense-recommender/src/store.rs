//! Persistence of the last computed recommendations per user

use parking_lot::RwLock;
use revsense_core::{Error, Recommendation, Result, UserId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read/replace storage for recommendation rows.
///
/// Rows for a user are always replaced wholesale; no history is kept.
pub trait RecommendationStore: Send + Sync {
    /// Replace every row of `user` with `rows`
    fn replace(&self, user: &UserId, rows: Vec<Recommendation>) -> Result<()>;

    /// Current rows of `user`, by rank
    fn get(&self, user: &UserId) -> Result<Vec<Recommendation>>;

    /// Users with stored rows
    fn users(&self) -> Result<Vec<UserId>>;
}

/// Rows must belong to `user` and carry ranks `1..=n` in order
fn validate_rows(user: &UserId, rows: &[Recommendation]) -> Result<()> {
    for (idx, row) in rows.iter().enumerate() {
        if &row.user_id != user {
            return Err(Error::invalid_argument(format!(
                "recommendation for '{}' stored under '{user}'",
                row.user_id
            )));
        }
        if row.rank as usize != idx + 1 {
            return Err(Error::invalid_argument(format!(
                "recommendation ranks for '{user}' must be consecutive from 1, found {} at position {}",
                row.rank,
                idx + 1
            )));
        }
    }
    Ok(())
}

#[derive(Default)]
pub struct InMemoryStore {
    rows: RwLock<BTreeMap<UserId, Vec<Recommendation>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecommendationStore for InMemoryStore {
    fn replace(&self, user: &UserId, rows: Vec<Recommendation>) -> Result<()> {
        validate_rows(user, &rows)?;
        self.rows.write().insert(user.clone(), rows);
        Ok(())
    }

    fn get(&self, user: &UserId) -> Result<Vec<Recommendation>> {
        Ok(self.rows.read().get(user).cloned().unwrap_or_default())
    }

    fn users(&self) -> Result<Vec<UserId>> {
        Ok(self.rows.read().keys().cloned().collect())
    }
}

/// Store backed by a single JSON file of rows, rewritten on every replace
pub struct JsonFileStore {
    path: PathBuf,
    rows: RwLock<BTreeMap<UserId, Vec<Recommendation>>>,
}

impl JsonFileStore {
    /// Open the store, loading existing rows when the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut rows: BTreeMap<UserId, Vec<Recommendation>> = BTreeMap::new();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let stored: Vec<Recommendation> = serde_json::from_str(&content).map_err(|e| {
                Error::store(format!("failed to parse {}: {e}", path.display()))
            })?;
            for row in stored {
                rows.entry(row.user_id.clone()).or_default().push(row);
            }
            for user_rows in rows.values_mut() {
                user_rows.sort_by_key(|row| row.rank);
            }
            debug!(path = %path.display(), users = rows.len(), "loaded recommendation store");
        }

        Ok(Self {
            path,
            rows: RwLock::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, rows: &BTreeMap<UserId, Vec<Recommendation>>) -> Result<()> {
        let flat: Vec<&Recommendation> = rows.values().flatten().collect();
        let content = serde_json::to_string_pretty(&flat)?;

        // write-then-rename so readers never see a half-written file
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl RecommendationStore for JsonFileStore {
    fn replace(&self, user: &UserId, rows: Vec<Recommendation>) -> Result<()> {
        validate_rows(user, &rows)?;
        let mut all = self.rows.write();
        let previous = all.insert(user.clone(), rows);

        // memory only changes when the file does
        if let Err(e) = self.persist(&all) {
            match previous {
                Some(previous) => all.insert(user.clone(), previous),
                None => all.remove(user),
            };
            return Err(e);
        }
        Ok(())
    }

    fn get(&self, user: &UserId) -> Result<Vec<Recommendation>> {
        Ok(self.rows.read().get(user).cloned().unwrap_or_default())
    }

    fn users(&self) -> Result<Vec<UserId>> {
        Ok(self.rows.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revsense_core::ProductId;

    fn rows(user: &UserId, products: &[&str]) -> Vec<Recommendation> {
        products
            .iter()
            .enumerate()
            .map(|(idx, p)| Recommendation {
                user_id: user.clone(),
                product_id: ProductId::parse(p).unwrap(),
                rank: idx as u32 + 1,
            })
            .collect()
    }

    #[test]
    fn test_replace_is_wholesale() {
        let store = InMemoryStore::new();
        let u1 = UserId::parse("u1").unwrap();

        store.replace(&u1, rows(&u1, &["p1", "p2", "p3"])).unwrap();
        store.replace(&u1, rows(&u1, &["p9"])).unwrap();

        let stored = store.get(&u1).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].product_id.as_str(), "p9");
        assert!(store.get(&UserId::parse("u2").unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_foreign_or_gapped_rows() {
        let store = InMemoryStore::new();
        let u1 = UserId::parse("u1").unwrap();
        let u2 = UserId::parse("u2").unwrap();

        assert!(matches!(
            store.replace(&u1, rows(&u2, &["p1"])),
            Err(Error::InvalidArgument(_))
        ));

        let mut gapped = rows(&u1, &["p1", "p2"]);
        gapped[1].rank = 3;
        assert!(store.replace(&u1, gapped).is_err());
    }

    #[test]
    fn test_json_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendations.json");
        let u1 = UserId::parse("u1").unwrap();
        let u2 = UserId::parse("u2").unwrap();

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.replace(&u1, rows(&u1, &["p1", "p2"])).unwrap();
            store.replace(&u2, rows(&u2, &["p3"])).unwrap();
            store.replace(&u1, rows(&u1, &["p4"])).unwrap();
        }

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.users().unwrap(), vec![u1.clone(), u2.clone()]);
        assert_eq!(reopened.get(&u1).unwrap(), rows(&u1, &["p4"]));
        assert_eq!(reopened.get(&u2).unwrap(), rows(&u2, &["p3"]));
    }

    #[test]
    fn test_failed_write_leaves_rows_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendations.json");
        let u1 = UserId::parse("u1").unwrap();
        let u2 = UserId::parse("u2").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        store.replace(&u1, rows(&u1, &["p1"])).unwrap();

        // a directory in place of the temp file makes every write fail
        std::fs::create_dir(path.with_extension("tmp")).unwrap();

        assert!(store.replace(&u1, rows(&u1, &["p2", "p3"])).is_err());
        assert!(store.replace(&u2, rows(&u2, &["p4"])).is_err());

        assert_eq!(store.get(&u1).unwrap(), rows(&u1, &["p1"]));
        assert!(store.get(&u2).unwrap().is_empty());
        assert_eq!(store.users().unwrap(), vec![u1.clone()]);
    }

    #[test]
    fn test_missing_parent_directory_keeps_memory_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("recommendations.json");
        let u1 = UserId::parse("u1").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(matches!(
            store.replace(&u1, rows(&u1, &["p1"])),
            Err(Error::Io(_))
        ));
        assert!(store.get(&u1).unwrap().is_empty());
        assert!(store.users().unwrap().is_empty());
    }

    #[test]
    fn test_json_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendations.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(Error::Store(_))));
    }
}
