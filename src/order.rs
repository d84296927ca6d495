// src/order.rs

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// One order record as returned by the order API.
///
/// Every sub-structure is optional and deserialized leniently: a `To` that is
/// `null`, a string, or missing all become an empty address instead of a
/// decode error. Line items are normalized once here into a plain sequence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawOrder {
    #[serde(default, deserialize_with = "text")]
    pub original_txn_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub to: Address,
    #[serde(default, deserialize_with = "lenient")]
    pub order_details: OrderDetails,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub shipping_details: Vec<ShippingDetail>,
    #[serde(default, deserialize_with = "line_items")]
    pub order_items: Vec<LineItem>,
    #[serde(default, deserialize_with = "text")]
    pub payment_date: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub created: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub create_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
    #[serde(default, deserialize_with = "text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub street2: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderDetails {
    /// Doubles as the carrier SCAC.
    #[serde(default, deserialize_with = "text")]
    pub ship_class: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub invoice: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub custom: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub payment_date: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub order_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShippingDetail {
    #[serde(default, deserialize_with = "lenient")]
    pub package: Package,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Package {
    /// Kept raw; may arrive as a number, a numeric string, or garbage.
    #[serde(default)]
    pub identical_package_count: Value,
    #[serde(default, deserialize_with = "lenient")]
    pub weight: Weight,
    #[serde(default, deserialize_with = "lenient")]
    pub tracking_info: TrackingInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Weight {
    /// Ounces.
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrackingInfo {
    #[serde(default, deserialize_with = "text")]
    pub tracking_number: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub carrier_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineItem {
    #[serde(rename = "ItemSKU", default, deserialize_with = "text")]
    pub item_sku: Option<String>,
    #[serde(rename = "Quantity", default)]
    pub quantity: Value,
}

impl RawOrder {
    /// Decode a single order. Anything that is not a JSON object is rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Grouping key, trimmed. Missing ids group under "".
    pub fn txn_key(&self) -> &str {
        self.original_txn_id.as_deref().unwrap_or_default().trim()
    }

    /// Ship class trimmed; empty when absent.
    pub fn ship_class(&self) -> &str {
        self.order_details.ship_class.as_deref().unwrap_or_default().trim()
    }

    /// First shipping entry, or an empty one.
    pub fn first_shipping_detail(&self) -> ShippingDetail {
        self.shipping_details.first().cloned().unwrap_or_default()
    }
}

/// Strings and numbers become text; null, objects and arrays become `None`.
fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Objects decode as `T`; anything else, or a failed decode, is `T::default()`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(object_or_default(Value::deserialize(deserializer)?))
}

fn object_or_default<T: DeserializeOwned + Default>(value: Value) -> T {
    if value.is_object() {
        serde_json::from_value(value).unwrap_or_default()
    } else {
        T::default()
    }
}

fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(object_or_default).collect(),
        _ => Vec::new(),
    })
}

/// The API sends either a list of items or one bare item object.
fn line_items<'de, D>(deserializer: D) -> Result<Vec<LineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(object_or_default).collect(),
        single @ Value::Object(_) => vec![object_or_default(single)],
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_record() {
        let order = RawOrder::from_value(json!({
            "OriginalTxnId": " PO-77 ",
            "To": {"Name": "Jane", "Street": "1 Main", "ZipCode": 30339},
            "OrderDetails": {"ShipClass": "EXLA", "Invoice": 12345},
            "ShippingDetails": [{"Package": {
                "IdenticalPackageCount": "2",
                "Weight": {"Value": 32},
                "TrackingInfo": {"TrackingNumber": "PRO1", "CarrierName": "Estes"}
            }}],
            "OrderItems": [{"ItemSKU": "SKU123456789", "Quantity": "3"}]
        }))
        .unwrap();

        assert_eq!(order.txn_key(), "PO-77");
        assert_eq!(order.to.zip_code.as_deref(), Some("30339"));
        assert_eq!(order.order_details.invoice.as_deref(), Some("12345"));
        assert_eq!(order.ship_class(), "EXLA");
        assert_eq!(order.order_items.len(), 1);
        let tracking = order.first_shipping_detail().package.tracking_info;
        assert_eq!(tracking.tracking_number.as_deref(), Some("PRO1"));
    }

    #[test]
    fn test_single_item_object_becomes_sequence() {
        let order = RawOrder::from_value(json!({
            "OrderItems": {"ItemSKU": "ABC", "Quantity": 1}
        }))
        .unwrap();
        assert_eq!(order.order_items.len(), 1);
        assert_eq!(order.order_items[0].item_sku.as_deref(), Some("ABC"));
    }

    #[test]
    fn test_malformed_substructures_default() {
        let order = RawOrder::from_value(json!({
            "OriginalTxnId": null,
            "To": "nowhere",
            "OrderDetails": [1, 2],
            "ShippingDetails": {"Package": {}},
            "OrderItems": "none"
        }))
        .unwrap();
        assert_eq!(order.txn_key(), "");
        assert!(order.to.name.is_none());
        assert_eq!(order.ship_class(), "");
        assert!(order.shipping_details.is_empty());
        assert!(order.order_items.is_empty());
        assert!(order.first_shipping_detail().package.tracking_info.carrier_name.is_none());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(RawOrder::from_value(json!("order")).is_none());
        assert!(RawOrder::from_value(json!(null)).is_none());
    }
}
