//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Round a value for display, keeping about four significant digits
///
/// Large values lose their decimals, small values keep enough to be
/// distinguishable. Trailing zeros are trimmed.
pub fn smart_round(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let magnitude = value.abs();
    let decimals = if magnitude >= 1000.0 {
        0
    } else if magnitude >= 100.0 {
        1
    } else if magnitude >= 1.0 {
        2
    } else if magnitude >= 0.01 {
        4
    } else if magnitude == 0.0 {
        0
    } else {
        6
    };

    let formatted = format!("{:.*}", decimals, value);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

/// Format an application rate without a spurious ".0"
pub fn format_rate(rate: f64) -> String {
    if rate.fract() == 0.0 && rate.abs() < 1e15 {
        format!("{}", rate as i64)
    } else {
        rate.to_string()
    }
}

/// Random source for one command: seeded when asked, from the OS otherwise
pub fn command_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            log::debug!("using seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    }
}
