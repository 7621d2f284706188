//! Correlation of balloon ground speed with modeled wind.
//!
//! One analysis pass estimates the speed of every active balloon, looks up
//! the modeled wind at its level, and turns the two into a 0-100 match score.

pub mod analyzer;
pub mod score;
pub mod types;
pub mod utility;
