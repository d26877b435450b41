//! Feedstock categories and the per-category element and rate presets

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Elements modelled for basalt feedstock
const BASALT_ELEMENTS: &[&str] = &[
    "Ni", "Cu", "Zn", "V", "Pb", "Co", "Cd", "Se", "Cr", "Mn", "Sb", "Be", "As", "Ag", "Hg",
];

/// Elements modelled for peridotite feedstock (no Hg data, adds Ba)
const PERIDOTITE_ELEMENTS: &[&str] = &[
    "Ni", "Cu", "Zn", "V", "Pb", "Co", "Cd", "Se", "Cr", "Mn", "Sb", "Be", "As", "Ag", "Ba",
];

/// Preset application rates (t/ha)
const BASALT_RATES: &[f64] = &[0.0, 25.0, 50.0, 75.0, 100.0, 125.0];
const PERIDOTITE_RATES: &[f64] = &[0.0, 5.0, 10.0, 15.0, 20.0, 25.0];

/// Crushed rock feedstock category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeedstockType {
    Basalt,
    Peridotite,
}

impl FeedstockType {
    /// All categories
    pub fn all() -> &'static [FeedstockType] {
        &[FeedstockType::Basalt, FeedstockType::Peridotite]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedstockType::Basalt => "basalt",
            FeedstockType::Peridotite => "peridotite",
        }
    }

    /// Element symbols valid for this feedstock, in display order
    pub fn elements(&self) -> &'static [&'static str] {
        match self {
            FeedstockType::Basalt => BASALT_ELEMENTS,
            FeedstockType::Peridotite => PERIDOTITE_ELEMENTS,
        }
    }

    /// Check whether an element symbol is modelled for this feedstock
    pub fn supports(&self, element: &str) -> bool {
        self.elements().contains(&element)
    }

    /// Application rates simulated in preset mode
    pub fn preset_rates(&self) -> &'static [f64] {
        match self {
            FeedstockType::Basalt => BASALT_RATES,
            FeedstockType::Peridotite => PERIDOTITE_RATES,
        }
    }
}

impl std::fmt::Display for FeedstockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a feedstock name is not recognised
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid feedstock type '{0}': must be either 'basalt' or 'peridotite'")]
pub struct UnknownFeedstock(pub String);

impl FromStr for FeedstockType {
    type Err = UnknownFeedstock;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basalt" => Ok(FeedstockType::Basalt),
            "peridotite" => Ok(FeedstockType::Peridotite),
            _ => Err(UnknownFeedstock(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_element_lists_nonempty_and_unique() {
        for feedstock in FeedstockType::all() {
            let elements = feedstock.elements();
            assert!(!elements.is_empty());
            let unique: HashSet<_> = elements.iter().collect();
            assert_eq!(unique.len(), elements.len(), "{} has duplicates", feedstock);
        }
    }

    #[test]
    fn test_element_lists_differ_in_trace_elements() {
        assert!(FeedstockType::Basalt.supports("Hg"));
        assert!(!FeedstockType::Basalt.supports("Ba"));
        assert!(FeedstockType::Peridotite.supports("Ba"));
        assert!(!FeedstockType::Peridotite.supports("Hg"));
        assert_eq!(FeedstockType::Basalt.elements()[0], "Ni");
    }

    #[test]
    fn test_supports_is_case_sensitive() {
        assert!(FeedstockType::Basalt.supports("Ni"));
        assert!(!FeedstockType::Basalt.supports("ni"));
    }

    #[test]
    fn test_preset_rates() {
        assert_eq!(
            FeedstockType::Basalt.preset_rates(),
            &[0.0, 25.0, 50.0, 75.0, 100.0, 125.0]
        );
        assert_eq!(
            FeedstockType::Peridotite.preset_rates(),
            &[0.0, 5.0, 10.0, 15.0, 20.0, 25.0]
        );
    }

    #[test]
    fn test_parse_feedstock() {
        assert_eq!("basalt".parse(), Ok(FeedstockType::Basalt));
        assert_eq!(" Peridotite ".parse(), Ok(FeedstockType::Peridotite));
        let err = "granite".parse::<FeedstockType>().unwrap_err();
        assert!(err.to_string().contains("granite"));
    }

    #[test]
    fn test_feedstock_serialization() {
        let json = serde_json::to_string(&FeedstockType::Peridotite).unwrap();
        assert_eq!(json, "\"peridotite\"");
    }
}
