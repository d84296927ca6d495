// src/session.rs

use crate::archive;
use crate::config::Config;
use crate::document;
use crate::error::{BolError, FieldWarning};
use crate::form_fill::FormFiller;
use crate::grouping::{self, ApplyTo, DisplayRow, ShipmentGroups};
use crate::order::RawOrder;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing::{info, info_span, warn};

/// The working set of one user session. Each action takes the session by
/// value and hands back the next one.
#[derive(Debug, Clone, Default)]
pub struct Session {
    days_orders: Option<Vec<RawOrder>>,
    search_orders: Option<Vec<RawOrder>>,
    /// Snapshot left by a bulk edit; wins over freshly computed rows.
    rows_override: Option<Vec<DisplayRow>>,
}

impl Session {
    /// New date-window fetch. Drops any bulk-edit snapshot.
    pub fn with_fetched(self, orders: Vec<RawOrder>) -> Self {
        Self {
            days_orders: Some(orders),
            rows_override: None,
            ..self
        }
    }

    /// New identifier search result.
    pub fn with_searched(self, orders: Vec<RawOrder>) -> Self {
        Self {
            search_orders: Some(orders),
            ..self
        }
    }

    /// Replace the table with user-edited rows (selection, warehouse).
    pub fn with_rows(self, rows: Vec<DisplayRow>) -> Self {
        Self {
            rows_override: Some(rows),
            ..self
        }
    }

    pub fn has_orders(&self) -> bool {
        self.days_orders.as_ref().is_some_and(|o| !o.is_empty())
            || self.search_orders.as_ref().is_some_and(|o| !o.is_empty())
    }

    /// Date-window orders first, then search results.
    pub fn groups(&self) -> ShipmentGroups {
        let days = self.days_orders.as_deref().unwrap_or_default();
        let search = self.search_orders.as_deref().unwrap_or_default();
        grouping::aggregate([days, search])
    }

    pub fn rows(&self, cfg: &Config) -> Result<Vec<DisplayRow>, BolError> {
        if let Some(rows) = &self.rows_override {
            return Ok(rows.clone());
        }
        Ok(grouping::display_rows(
            &self.groups(),
            cfg.default_warehouse_key(),
            cfg.zone.offset()?,
        ))
    }

    /// Assign `warehouse` to the selected (or all) rows and keep the result
    /// as the session's table until the next fetch.
    pub fn apply_bulk_warehouse(
        self,
        cfg: &Config,
        warehouse: &str,
        apply_to: ApplyTo,
    ) -> Result<Self, BolError> {
        if cfg.warehouse(warehouse).is_none() {
            return Err(BolError::UnknownWarehouse(warehouse.to_string()));
        }
        let rows = grouping::apply_bulk_warehouse(&self.rows(cfg)?, warehouse, apply_to);
        info!(warehouse, ?apply_to, rows = rows.len(), "Bulk warehouse applied");
        Ok(self.with_rows(rows))
    }

    /// Fill one BOL per selected row and zip them. See [`generate`].
    pub fn generate(
        &self,
        cfg: &Config,
        filler: &dyn FormFiller,
        now: OffsetDateTime,
    ) -> Result<GenerationReport, BolError> {
        generate(&self.groups(), &self.rows(cfg)?, cfg, filler, now)
    }
}

#[derive(Debug, Default)]
pub struct GenerationReport {
    pub files: Vec<PathBuf>,
    pub archive: Option<PathBuf>,
    pub warnings: Vec<FieldWarning>,
    /// Selected POs that no longer have a group.
    pub skipped: Vec<String>,
    /// Selected POs whose warehouse key was rejected.
    pub rejected: Vec<String>,
}

/// Fill one PDF per selected row, sequentially, then package them.
///
/// A missing template aborts the run. A rejected warehouse key drops only
/// that PO; field-level problems are collected in the report. Nothing
/// selected means no files and no archive.
pub fn generate(
    groups: &ShipmentGroups,
    rows: &[DisplayRow],
    cfg: &Config,
    filler: &dyn FormFiller,
    now: OffsetDateTime,
) -> Result<GenerationReport, BolError> {
    let now = now.to_offset(cfg.zone.offset()?);
    let mut report = GenerationReport::default();

    let selected: Vec<&DisplayRow> = rows.iter().filter(|r| r.select).collect();
    if selected.is_empty() {
        warn!("No rows selected");
        return Ok(report);
    }

    for row in selected {
        let oid = &row.original_txn_id;
        let span = info_span!("bol", po = %oid, warehouse = %row.warehouse);
        let _guard = span.enter();

        let Some(group) = groups.get(oid).filter(|g| !g.orders.is_empty()) else {
            warn!("No orders for selected PO, skipping");
            report.skipped.push(oid.clone());
            continue;
        };

        let (fields, wh) = match document::build(group, &row.warehouse, cfg, now.date()) {
            Ok(built) => built,
            Err(BolError::UnknownWarehouse(key)) => {
                warn!(requested = %key, "Unknown warehouse, PO rejected");
                report.rejected.push(oid.clone());
                continue;
            }
            Err(e) => return Err(e),
        };
        let filename = document::output_filename(oid, &row.sku8, &wh.name, &row.scac);
        let out = cfg.document.output_dir.join(&filename);

        let warnings = filler.fill(&fields, &out)?;
        info!(file = %filename, fields = fields.len(), warnings = warnings.len(), "BOL generated");
        report.warnings.extend(warnings);
        report.files.push(out);
    }

    if !report.files.is_empty() {
        report.archive = Some(archive::package(&cfg.document.output_dir, &report.files, now)?);
    }
    Ok(report)
}
