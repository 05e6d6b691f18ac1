//! Observation sources feeding snapshot builds

use parking_lot::RwLock;
use revsense_core::{Error, ProductId, Result, SentimentObservation};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read-only view of the review store: every observation plus the catalog
pub trait ObservationSource: Send + Sync {
    /// All observations, in storage order
    fn observations(&self) -> Result<Vec<SentimentObservation>>;

    /// Every known product id
    fn catalog(&self) -> Result<Vec<ProductId>>;
}

/// Append-only in-memory source
#[derive(Default)]
pub struct InMemorySource {
    observations: RwLock<Vec<SentimentObservation>>,
    catalog: RwLock<Vec<ProductId>>,
}

impl InMemorySource {
    pub fn new(observations: Vec<SentimentObservation>, catalog: Vec<ProductId>) -> Self {
        Self {
            observations: RwLock::new(observations),
            catalog: RwLock::new(catalog),
        }
    }

    pub fn append(&self, observation: SentimentObservation) {
        self.observations.write().push(observation);
    }

    pub fn extend(&self, observations: impl IntoIterator<Item = SentimentObservation>) {
        self.observations.write().extend(observations);
    }

    pub fn add_product(&self, product: ProductId) {
        let mut catalog = self.catalog.write();
        if !catalog.contains(&product) {
            catalog.push(product);
        }
    }

    pub fn len(&self) -> usize {
        self.observations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.read().is_empty()
    }
}

impl ObservationSource for InMemorySource {
    fn observations(&self) -> Result<Vec<SentimentObservation>> {
        Ok(self.observations.read().clone())
    }

    fn catalog(&self) -> Result<Vec<ProductId>> {
        Ok(self.catalog.read().clone())
    }
}

/// Observations stored one JSON object per line, with an optional catalog
/// file holding one product id per line
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    observations_path: PathBuf,
    catalog_path: Option<PathBuf>,
}

impl JsonLinesSource {
    pub fn new(observations_path: impl Into<PathBuf>) -> Self {
        Self {
            observations_path: observations_path.into(),
            catalog_path: None,
        }
    }

    pub fn with_catalog(mut self, catalog_path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(catalog_path.into());
        self
    }

    pub fn observations_path(&self) -> &Path {
        &self.observations_path
    }

    /// Append observations to the file, creating it if needed
    pub fn append(&self, observations: &[SentimentObservation]) -> Result<()> {
        write_json_lines(&self.observations_path, observations, true)
    }
}

impl ObservationSource for JsonLinesSource {
    fn observations(&self) -> Result<Vec<SentimentObservation>> {
        let observations = read_json_lines(&self.observations_path)?;
        debug!(
            path = %self.observations_path.display(),
            count = observations.len(),
            "read observations"
        );
        Ok(observations)
    }

    fn catalog(&self) -> Result<Vec<ProductId>> {
        let Some(path) = &self.catalog_path else {
            return Ok(Vec::new());
        };

        let reader = BufReader::new(File::open(path)?);
        let mut catalog = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let product = ProductId::parse(&line).map_err(|e| {
                Error::store(format!("{}:{}: {e}", path.display(), line_no + 1))
            })?;
            catalog.push(product);
        }
        Ok(catalog)
    }
}

/// Parse a JSON-lines file, skipping blank lines
pub fn read_json_lines<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            Error::store(format!("{}:{}: {e}", path.display(), line_no + 1))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Write records as JSON lines, appending or truncating
pub fn write_json_lines<T: serde::Serialize>(path: &Path, records: &[T], append: bool) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
