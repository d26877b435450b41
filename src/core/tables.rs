//! Reference tables: feedstock and soil composition, regulatory thresholds
//!
//! Loaded once from CSV and shared read-only behind an `Arc`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::core::config::Config;
use crate::core::feedstock::FeedstockType;
use crate::entities::threshold::ThresholdRecord;

/// Composition columns are named `"<Symbol> (mg/kg)"`
const CONCENTRATION_SUFFIX: &str = " (mg/kg)";

/// Threshold table headers
const METAL_HEADER: &str = "Metal";
const AGENCY_HEADER: &str = "Agency";
const LEVEL_HEADER: &str = "Threshold Level (mg/kg)";

/// Method column headers, in order of preference
const METHOD_HEADERS: [&str; 2] = [
    "Total, Aqua regia, extractable, or other (specify)",
    "Extraction Method",
];

/// Errors loading a reference table
#[derive(Debug, Error)]
pub enum TableError {
    #[error("cannot open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed CSV in {table}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("{table} has no '{column}' column")]
    MissingColumn { table: String, column: &'static str },
}

/// Concentration columns of one composition table, keyed by element symbol
///
/// Empty and non-numeric cells are dropped, so each column holds only the
/// observed values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositionTable {
    columns: HashMap<String, Vec<f64>>,
    rows: usize,
}

impl CompositionTable {
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path).map_err(|source| TableError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn from_reader<R: io::Read>(reader: R, table: &str) -> Result<Self, TableError> {
        let csv_err = |source| TableError::Csv {
            table: table.to_string(),
            source,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let symbols: Vec<Option<String>> = rdr
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.strip_suffix(CONCENTRATION_SUFFIX).map(str::to_string))
            .collect();

        let mut columns: HashMap<String, Vec<f64>> = symbols
            .iter()
            .flatten()
            .map(|s| (s.clone(), Vec::new()))
            .collect();

        let mut rows = 0;
        for record in rdr.records() {
            let record = record.map_err(csv_err)?;
            rows += 1;
            for (symbol, cell) in symbols.iter().zip(record.iter()) {
                let Some(symbol) = symbol else { continue };
                if let Ok(value) = cell.parse::<f64>() {
                    if value.is_finite() {
                        if let Some(column) = columns.get_mut(symbol) {
                            column.push(value);
                        }
                    }
                }
            }
        }

        Ok(Self { columns, rows })
    }

    /// Observed values for an element, if the table has a column for it
    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.columns.get(symbol).map(Vec::as_slice)
    }

    /// Number of data rows read
    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// Parse threshold rows; the method column may use either known header
///
/// Columns are located by header position. When both method headers are
/// present the long one wins.
pub fn read_thresholds<R: io::Read>(
    reader: R,
    table: &str,
) -> Result<Vec<ThresholdRecord>, TableError> {
    let csv_err = |source| TableError::Csv {
        table: table.to_string(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let metal = position(METAL_HEADER).ok_or_else(|| TableError::MissingColumn {
        table: table.to_string(),
        column: METAL_HEADER,
    })?;
    let agency = position(AGENCY_HEADER);
    let method = METHOD_HEADERS.iter().find_map(|h| position(h));
    let level = position(LEVEL_HEADER);

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row.map_err(csv_err)?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        records.push(ThresholdRecord {
            metal: cell(Some(metal)).unwrap_or_default(),
            agency: cell(agency).unwrap_or_default(),
            extraction_method: cell(method),
            threshold_level: cell(level),
        });
    }
    Ok(records)
}

/// All reference tables needed by the service
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub soil: CompositionTable,
    pub basalt: CompositionTable,
    pub peridotite: CompositionTable,
    pub thresholds: Vec<ThresholdRecord>,
}

impl ReferenceTables {
    /// Load every table named in the config
    pub fn load(config: &Config) -> Result<Arc<Self>, TableError> {
        let thresholds_path = config.thresholds_path();
        let thresholds_file =
            std::fs::File::open(&thresholds_path).map_err(|source| TableError::Open {
                path: thresholds_path.clone(),
                source,
            })?;

        let tables = Self {
            soil: CompositionTable::from_path(&config.soil_path())?,
            basalt: CompositionTable::from_path(&config.basalt_path())?,
            peridotite: CompositionTable::from_path(&config.peridotite_path())?,
            thresholds: read_thresholds(thresholds_file, &thresholds_path.display().to_string())?,
        };

        log::info!(
            "loaded reference tables from {}: {} soil, {} basalt, {} peridotite rows, {} thresholds",
            config.data.dir.display(),
            tables.soil.rows(),
            tables.basalt.rows(),
            tables.peridotite.rows(),
            tables.thresholds.len()
        );

        Ok(Arc::new(tables))
    }

    pub fn feedstock(&self, feedstock: FeedstockType) -> &CompositionTable {
        match feedstock {
            FeedstockType::Basalt => &self.basalt,
            FeedstockType::Peridotite => &self.peridotite,
        }
    }
}
