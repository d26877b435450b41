//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use erw::core::tables::{read_thresholds, CompositionTable};
use erw::core::ReferenceTables;

/// Helper to get an erw command
pub fn erw() -> Command {
    Command::new(cargo::cargo_bin!("erw"))
}

/// Deterministic, right-skewed values spread around `center`
fn skewed(center: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let u = (i as f64 + 0.5) / count as f64;
            // Quantiles of an exponential, shifted and scaled
            center * (0.4 + 0.6 * -(1.0 - u).ln())
        })
        .collect()
}

fn composition_csv(columns: &[(&str, Vec<f64>)]) -> String {
    let rows = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    let mut csv = String::from("Sample ID");
    for (symbol, _) in columns {
        csv.push_str(&format!(",{} (mg/kg)", symbol));
    }
    csv.push('\n');
    for row in 0..rows {
        csv.push_str(&format!("S{}", row));
        for (_, values) in columns {
            match values.get(row) {
                Some(v) => csv.push_str(&format!(",{}", v)),
                None => csv.push(','),
            }
        }
        csv.push('\n');
    }
    csv
}

pub fn soil_csv() -> String {
    composition_csv(&[
        ("Ni", skewed(25.0, 80)),
        ("Cu", skewed(20.0, 60)),
        ("Ba", skewed(400.0, 40)),
    ])
}

pub fn basalt_csv() -> String {
    composition_csv(&[("Ni", skewed(120.0, 70)), ("Cu", skewed(90.0, 50))])
}

pub fn peridotite_csv() -> String {
    composition_csv(&[("Ni", skewed(2000.0, 60)), ("Ba", skewed(15.0, 30))])
}

pub const THRESHOLDS_CSV: &str = "\
Metal,Agency,\"Total, Aqua regia, extractable, or other (specify)\",Threshold Level (mg/kg)
Ni,US EPA,Total,\"1,600\"
Ni,EU Directive,Aqua regia extractable,75
Ni,Canada CCME,Total recoverable,45
Ni,Sweden,0.1N HCl,35
Ni,Unknown,,20
Cu,US EPA,Total,270
Cu,EU Directive,Aqua regia,140
";

/// Write the four reference tables into `dir` under their default names
pub fn write_reference_tables(dir: &Path) {
    std::fs::write(dir.join("cleaned_soil_data.csv"), soil_csv()).unwrap();
    std::fs::write(dir.join("cleaned_feedstock_data_basalt.csv"), basalt_csv()).unwrap();
    std::fs::write(
        dir.join("cleaned_feedstock_data_peridotite.csv"),
        peridotite_csv(),
    )
    .unwrap();
    std::fs::write(dir.join("model_thresholds.csv"), THRESHOLDS_CSV).unwrap();
}

/// Temp directory with a `data/` folder holding the reference tables
pub fn setup_data_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    std::fs::create_dir(&data).unwrap();
    write_reference_tables(&data);
    tmp
}

/// The same fixture tables, in memory
pub fn reference_tables() -> Arc<ReferenceTables> {
    Arc::new(ReferenceTables {
        soil: CompositionTable::from_reader(soil_csv().as_bytes(), "soil").unwrap(),
        basalt: CompositionTable::from_reader(basalt_csv().as_bytes(), "basalt").unwrap(),
        peridotite: CompositionTable::from_reader(peridotite_csv().as_bytes(), "peridotite")
            .unwrap(),
        thresholds: read_thresholds(THRESHOLDS_CSV.as_bytes(), "thresholds").unwrap(),
    })
}
