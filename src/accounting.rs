//! Price, carbon and eco-point totals over cart lines
//!
//! Pure and linear in the number of lines. When totals are shown and then
//! persisted for the same checkout, compute them from the same slice.

use serde::{Deserialize, Serialize};

use crate::models::{CartItem, Product};

/// Points per unit of an eco-friendly product
pub const POINTS_PER_ECO_UNIT: f64 = 10.0;

/// A quantity of a product that may no longer be resolvable
pub trait Line {
    fn quantity(&self) -> i32;
    fn product(&self) -> Option<&Product>;
}

impl Line for CartItem {
    fn quantity(&self) -> i32 {
        self.quantity
    }

    fn product(&self) -> Option<&Product> {
        self.product.as_ref()
    }
}

impl Line for (Product, i32) {
    fn quantity(&self) -> i32 {
        self.1
    }

    fn product(&self) -> Option<&Product> {
        Some(&self.0)
    }
}

impl Line for (Option<Product>, i32) {
    fn quantity(&self) -> i32 {
        self.1
    }

    fn product(&self) -> Option<&Product> {
        self.0.as_ref()
    }
}

/// Sum of `quantity × price`; unresolved products count as zero
pub fn total_price<L: Line>(lines: &[L]) -> f64 {
    lines
        .iter()
        .map(|line| line.product().map_or(0.0, |p| p.price * f64::from(line.quantity())))
        .sum()
}

/// Sum of `quantity × carbon_footprint`; unresolved products count as zero
pub fn total_carbon<L: Line>(lines: &[L]) -> f64 {
    lines
        .iter()
        .map(|line| {
            line.product()
                .map_or(0.0, |p| p.carbon_footprint * f64::from(line.quantity()))
        })
        .sum()
}

/// Points for eco-friendly lines at the standard rate
pub fn eco_points<L: Line>(lines: &[L]) -> i64 {
    eco_points_at(lines, POINTS_PER_ECO_UNIT)
}

/// Points for eco-friendly lines at `points_per_unit`, floored and never negative
pub fn eco_points_at<L: Line>(lines: &[L], points_per_unit: f64) -> i64 {
    let raw: f64 = lines
        .iter()
        .filter(|line| line.product().map_or(false, |p| p.is_eco_friendly))
        .map(|line| f64::from(line.quantity()) * points_per_unit)
        .sum();
    raw.floor().max(0.0) as i64
}

/// The three totals of one cart, computed together
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CarbonTotals {
    pub total_price: f64,
    pub total_carbon: f64,
    pub eco_points: i64,
}

impl CarbonTotals {
    pub fn compute<L: Line>(lines: &[L], points_per_unit: f64) -> Self {
        Self {
            total_price: total_price(lines),
            total_carbon: total_carbon(lines),
            eco_points: eco_points_at(lines, points_per_unit),
        }
    }
}
