//! ERW metals: heavy-metal uplift forecasting for enhanced rock weathering
//!
//! Estimates how the soil concentration of a heavy metal may rise after
//! crushed basalt or peridotite is spread on a field, under uncertainty in
//! the background soil, the feedstock, bulk density and mixing depth, and
//! compares the outcome with regulatory limits.

pub mod cli;
pub mod core;
pub mod entities;
