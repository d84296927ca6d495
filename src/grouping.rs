// src/grouping.rs

use crate::dates;
use crate::normalize::{self, PackageSummary};
use crate::order::RawOrder;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use time::UtcOffset;

/// Orders sharing one original transaction id.
#[derive(Debug, Clone)]
pub struct ShipmentGroup {
    pub key: String,
    pub orders: Vec<RawOrder>,
}

/// Group-level totals shown on the BOL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupTotals {
    pub packages: u64,
    /// Rounded once, after summing every member order.
    pub pounds: i64,
}

impl ShipmentGroup {
    pub fn first(&self) -> Option<&RawOrder> {
        self.orders.first()
    }

    pub fn totals(&self) -> GroupTotals {
        let sum = self
            .orders
            .iter()
            .map(normalize::package_summary)
            .fold(PackageSummary::default(), |acc, s| acc + s);
        GroupTotals {
            packages: sum.packages,
            pounds: sum.pounds.round_ties_even() as i64,
        }
    }
}

/// Groups in first-seen key order.
#[derive(Debug, Clone, Default)]
pub struct ShipmentGroups {
    groups: Vec<ShipmentGroup>,
    index: HashMap<String, usize>,
}

impl ShipmentGroups {
    pub fn get(&self, key: &str) -> Option<&ShipmentGroup> {
        self.index.get(key).map(|&i| &self.groups[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShipmentGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn push(&mut self, order: RawOrder) {
        let key = order.txn_key().to_string();
        match self.index.get(&key) {
            Some(&i) => self.groups[i].orders.push(order),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(ShipmentGroup {
                    key,
                    orders: vec![order],
                });
            }
        }
    }
}

/// Concatenate every source batch in order and group by transaction id.
///
/// A key seen in several batches yields one group holding all of its orders.
/// Blank ids collect under the empty key.
pub fn aggregate<'a, I>(sources: I) -> ShipmentGroups
where
    I: IntoIterator<Item = &'a [RawOrder]>,
{
    let mut groups = ShipmentGroups::default();
    for order in sources.into_iter().flatten() {
        groups.push(order.clone());
    }
    groups
}

/// One line of the selection table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DisplayRow {
    pub select: bool,
    pub warehouse: String,
    pub original_txn_id: String,
    #[serde(rename = "SKU8")]
    pub sku8: String,
    #[serde(rename = "SCAC")]
    pub scac: String,
    pub to_state: String,
    /// `MM/DD/YY`
    pub order_date: String,
}

/// Rows for every non-empty key, first occurrence wins.
pub fn display_rows(groups: &ShipmentGroups, default_warehouse: &str, zone: UtcOffset) -> Vec<DisplayRow> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for group in groups.iter() {
        if group.key.is_empty() || !seen.insert(group.key.as_str()) {
            continue;
        }
        let Some(first) = group.first() else {
            continue;
        };
        rows.push(DisplayRow {
            select: true,
            warehouse: default_warehouse.to_string(),
            original_txn_id: group.key.clone(),
            sku8: normalize::sku_prefix(first),
            scac: first.ship_class().to_string(),
            to_state: first.to.state.clone().unwrap_or_default(),
            order_date: dates::order_date(first, zone),
        });
    }
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyTo {
    #[default]
    Selected,
    All,
}

/// Copy of `rows` with `warehouse` assigned to the targeted rows.
pub fn apply_bulk_warehouse(rows: &[DisplayRow], warehouse: &str, apply_to: ApplyTo) -> Vec<DisplayRow> {
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            if apply_to == ApplyTo::All || row.select {
                row.warehouse = warehouse.to_string();
            }
            row
        })
        .collect()
}
