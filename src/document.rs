// src/document.rs

use crate::carrier;
use crate::config::{Config, UnknownWarehouse, Warehouse};
use crate::error::BolError;
use crate::grouping::ShipmentGroup;
use crate::normalize;
use std::collections::BTreeMap;
use time::Date;
use time::macros::format_description;
use tracing::warn;

/// Template field name to value.
pub type FieldSet = BTreeMap<String, String>;

/// Fixed freight classification printed on every BOL.
const NMFC: &str = "69420";
const FREIGHT_CLASS: &str = "125";
const PAGE_TOTAL: &str = "1";
const UNIT_TYPE: &str = "piece";

/// Base weight of one unit, plus the increment for each additional unit.
const TIER_BASE_LBS: i64 = 130;
const TIER_STEP_LBS: i64 = 30;

/// Look up `key`; unknown keys fall back to the first warehouse unless the
/// config asks for strict resolution.
pub fn resolve_warehouse<'a>(cfg: &'a Config, key: &str) -> Result<&'a Warehouse, BolError> {
    if let Some(wh) = cfg.warehouse(key) {
        return Ok(wh);
    }
    match cfg.document.unknown_warehouse {
        UnknownWarehouse::Reject => Err(BolError::UnknownWarehouse(key.to_string())),
        UnknownWarehouse::Fallback => {
            let wh = cfg
                .warehouses
                .first()
                .ok_or_else(|| BolError::Config("no warehouses configured".into()))?;
            warn!(requested = %key, using = %wh.key, "Unknown warehouse, falling back");
            Ok(wh)
        }
    }
}

/// Display weight for the summed line quantity. Independent of measured weight.
pub fn weight_tier(total_qty: i64) -> String {
    if total_qty <= 1 {
        format!("{TIER_BASE_LBS} lbs")
    } else {
        let extra = (total_qty - 1).saturating_mul(TIER_STEP_LBS);
        format!("{} lbs", TIER_BASE_LBS.saturating_add(extra))
    }
}

/// `BOL_{po}_{sku8}_{WH}_{SCAC}.pdf` with all whitespace removed.
pub fn output_filename(txn_id: &str, sku8: &str, warehouse_name: &str, scac: &str) -> String {
    let sku8: String = if sku8.is_empty() {
        "NOSKU".to_string()
    } else {
        sku8.chars().take(8).collect()
    };
    let wh2 = if warehouse_name.is_empty() {
        "WH".to_string()
    } else {
        warehouse_name.chars().take(2).collect::<String>().to_uppercase()
    };
    let scac = match scac.trim().to_uppercase() {
        s if s.is_empty() => "NOSCAC".to_string(),
        s => s,
    };
    format!("BOL_{txn_id}_{sku8}_{wh2}_{scac}.pdf")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn field(fields: &mut FieldSet, name: &str, value: impl Into<String>) {
    fields.insert(name.to_string(), value.into());
}

/// Every template field for one shipment group shipped from `warehouse_key`.
///
/// Single-valued fields come from the first order; totals cover the whole
/// group; each member order gets its own indexed line block.
pub fn build<'a>(
    group: &ShipmentGroup,
    warehouse_key: &str,
    cfg: &'a Config,
    today: Date,
) -> Result<(FieldSet, &'a Warehouse), BolError> {
    let wh = resolve_warehouse(cfg, warehouse_key)?;
    let first = group.first().cloned().unwrap_or_default();
    let to = &first.to;
    let details = &first.order_details;
    let tracking = first.first_shipping_detail().package.tracking_info;

    let scac = first.ship_class().to_string();
    let carrier_raw = tracking.carrier_name.as_deref().unwrap_or_default().trim();
    let street = to.street.as_deref().unwrap_or_default();
    let to_address = match to.street2.as_deref().unwrap_or_default() {
        "" => street.trim().to_string(),
        street2 => format!("{street} {street2}").trim().to_string(),
    };
    let to_city_state_zip = format!(
        "{}, {} {}",
        to.city.as_deref().unwrap_or_default(),
        to.state.as_deref().unwrap_or_default(),
        to.zip_code.as_deref().unwrap_or_default(),
    );
    let to_city_state_zip = to_city_state_zip.trim().trim_matches([',', ' ']);
    let custom_code = details.custom.as_deref().unwrap_or_default().trim().to_string();
    let bol_num = match details.invoice.as_deref().unwrap_or_default().trim() {
        "" => group.key.trim().to_string(),
        invoice => invoice.to_string(),
    };
    let po_ref = if group.key.is_empty() { &bol_num } else { &group.key };
    let totals = group.totals();

    let mut f = FieldSet::new();
    field(&mut f, "BillName", &cfg.bill_to.name);
    field(&mut f, "BillAddress", &cfg.bill_to.address);
    field(&mut f, "BillCityStateZip", &cfg.bill_to.city_state_zip);
    field(&mut f, "ToName", to.name.clone().unwrap_or_default());
    field(&mut f, "ToAddress", to_address);
    field(&mut f, "ToCityStateZip", to_city_state_zip);
    field(&mut f, "ToCID", to.phone_number.clone().unwrap_or_default());
    field(&mut f, "FromName", &wh.name);
    field(&mut f, "FromAddr", &wh.addr);
    field(&mut f, "FromCityStateZip", &wh.citystatezip);
    field(&mut f, "FromSIDNum", &wh.sid);
    field(&mut f, "3rdParty", "X");
    field(&mut f, "PrePaid", "");
    field(&mut f, "Collect", "");
    field(&mut f, "BOLnum", bol_num.clone());
    field(&mut f, "CarrierName", carrier::resolve(&scac, carrier_raw));
    field(&mut f, "SCAC", scac.clone());
    field(&mut f, "PRO", tracking.tracking_number.clone().unwrap_or_default());
    field(&mut f, "CustomerOrderNumber", custom_code.clone());
    field(&mut f, "BillInstructions", format!("PO#{po_ref}"));
    field(&mut f, "OrderNum1", custom_code);
    field(&mut f, "SpecialInstructions", "");
    field(&mut f, "TotalPkgs", nonzero(i64::try_from(totals.packages).unwrap_or(i64::MAX)));
    field(&mut f, "Total_Weight", nonzero(totals.pounds));
    field(
        &mut f,
        "Date",
        today
            .format(format_description!("[year]/[month]/[day]"))
            .unwrap_or_default(),
    );
    field(&mut f, "Page_ttl", PAGE_TOTAL);
    field(&mut f, "NMFC1", NMFC);
    field(&mut f, "Class1", FREIGHT_CLASS);

    let mut total_qty: i64 = 0;
    for (idx, order) in group.orders.iter().enumerate() {
        let idx = idx + 1;
        let desc = normalize::description(order, &cfg.document.description_suffix);
        if desc.is_empty() {
            continue;
        }
        let qty = normalize::quantity(order);
        field(&mut f, &format!("Desc_{idx}"), desc);
        field(&mut f, &format!("HU_Type_{idx}"), UNIT_TYPE);
        field(&mut f, &format!("Pkg_Type_{idx}"), UNIT_TYPE);
        field(&mut f, &format!("HU_QTY_{idx}"), nonzero(qty));
        field(&mut f, &format!("Pkg_QTY_{idx}"), nonzero(qty));
        total_qty = total_qty.saturating_add(qty);
    }
    field(&mut f, "NumPkgs1", total_qty.to_string());
    field(&mut f, "Weight1", weight_tier(total_qty));

    Ok((f, wh))
}

/// Zero prints as blank on the form.
fn nonzero(n: i64) -> String {
    if n == 0 { String::new() } else { n.to_string() }
}
