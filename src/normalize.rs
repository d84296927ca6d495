// src/normalize.rs

use crate::order::{LineItem, Package, RawOrder};
use serde_json::Value;

/// Package count and weight summed over one order's shipping entries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PackageSummary {
    pub packages: u64,
    /// Unrounded; callers round once after summing a whole group.
    pub pounds: f64,
}

impl std::ops::Add for PackageSummary {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            packages: self.packages.saturating_add(other.packages),
            pounds: self.pounds + other.pounds,
        }
    }
}

/// First line item, or an empty one.
pub fn first_line_item(order: &RawOrder) -> LineItem {
    order.order_items.first().cloned().unwrap_or_default()
}

fn first_sku(order: &RawOrder) -> String {
    order
        .order_items
        .first()
        .and_then(|item| item.item_sku.clone())
        .unwrap_or_default()
}

/// SKU glued directly onto the product suffix, e.g. `ABC123Electric Fireplace`.
pub fn description(order: &RawOrder, suffix: &str) -> String {
    format!("{}{}", first_sku(order), suffix).trim().to_string()
}

/// First 8 characters of the first SKU.
pub fn sku_prefix(order: &RawOrder) -> String {
    first_sku(order).chars().take(8).collect()
}

/// Quantity of the first line item; anything non-integral reads as 0.
pub fn quantity(order: &RawOrder) -> i64 {
    first_line_item(order)
        .quantity
        .as_integer()
        .unwrap_or(0)
}

/// Ounces to pounds, rounded to 2 decimals. `None` when not a number.
pub fn oz_to_lb(oz: &Value) -> Option<f64> {
    let oz = oz.as_float()?;
    Some(round_to(oz / 16.0, 2))
}

pub fn package_summary(order: &RawOrder) -> PackageSummary {
    order
        .shipping_details
        .iter()
        .map(|detail| package_contribution(&detail.package))
        .fold(PackageSummary::default(), |acc, s| acc + s)
}

fn package_contribution(pkg: &Package) -> PackageSummary {
    let count = pkg.identical_package_count.as_integer().unwrap_or(1).max(1) as u64;
    let lb = oz_to_lb(&pkg.weight.value).unwrap_or(0.0).max(0.0);
    PackageSummary {
        packages: count,
        pounds: lb * count as f64,
    }
}

/// Round half to even, matching how the legacy sheets rounded weights.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Numeric reads over loosely-typed JSON scalars.
trait Numeric {
    fn as_integer(&self) -> Option<i64>;
    fn as_float(&self) -> Option<f64>;
}

impl Numeric for Value {
    fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(v: Value) -> RawOrder {
        RawOrder::from_value(v).unwrap()
    }

    #[test]
    fn test_description_and_prefix() {
        let o = order(json!({"OrderItems": [{"ItemSKU": "FP-1234567-BLK"}, {"ItemSKU": "OTHER"}]}));
        assert_eq!(description(&o, "Electric Fireplace"), "FP-1234567-BLKElectric Fireplace");
        assert_eq!(sku_prefix(&o), "FP-12345");
    }

    #[test]
    fn test_missing_sku() {
        let o = order(json!({}));
        assert_eq!(description(&o, " Electric Fireplace "), "Electric Fireplace");
        assert_eq!(sku_prefix(&o), "");
    }

    #[test]
    fn test_quantity_parsing() {
        assert_eq!(quantity(&order(json!({"OrderItems": {"Quantity": "4"}}))), 4);
        assert_eq!(quantity(&order(json!({"OrderItems": [{"Quantity": 2.0}]}))), 2);
        assert_eq!(quantity(&order(json!({"OrderItems": [{"Quantity": "two"}]}))), 0);
        assert_eq!(quantity(&order(json!({"OrderItems": []}))), 0);
    }

    #[test]
    fn test_package_summary_counts_and_weight() {
        let o = order(json!({"ShippingDetails": [
            {"Package": {"IdenticalPackageCount": 2, "Weight": {"Value": 40}}},
            {"Package": {"IdenticalPackageCount": "0", "Weight": {"Value": "16"}}},
            {"Package": {"Weight": {"Value": "heavy"}}},
            null
        ]}));
        let s = package_summary(&o);
        // 2 + floor(1) + default(1) + empty entry(1)
        assert_eq!(s.packages, 5);
        assert!((s.pounds - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_package_count_never_below_entries() {
        let o = order(json!({"ShippingDetails": [
            {"Package": {"IdenticalPackageCount": -3}},
            {"Package": {"IdenticalPackageCount": "x"}}
        ]}));
        let s = package_summary(&o);
        assert!(s.packages >= o.shipping_details.len() as u64);
        assert!(s.pounds >= 0.0);
    }

    #[test]
    fn test_package_counts_saturate() {
        let o = order(json!({"ShippingDetails": [
            {"Package": {"IdenticalPackageCount": i64::MAX}},
            {"Package": {"IdenticalPackageCount": i64::MAX}},
            {"Package": {"IdenticalPackageCount": i64::MAX}}
        ]}));
        assert_eq!(package_summary(&o).packages, u64::MAX);
    }

    #[test]
    fn test_oz_to_lb_rounds() {
        assert_eq!(oz_to_lb(&json!(50)), Some(3.12));
        assert_eq!(oz_to_lb(&json!(null)), None);
    }
}
