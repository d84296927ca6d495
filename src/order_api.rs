// src/order_api.rs

use crate::config::ApiConfig;
use crate::dates;
use crate::error::BolError;
use crate::order::RawOrder;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use time::{OffsetDateTime, UtcOffset};
use tracing::{error, info, warn};

pub type Params = Vec<(&'static str, String)>;

/// One decoded response page.
#[derive(Debug, Default)]
pub struct OrderPage {
    pub orders: Vec<RawOrder>,
    /// Entries the API sent, including ones dropped as malformed. Paging
    /// compares this against the page size.
    pub entries: usize,
}

/// One GET against the order endpoint.
#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn fetch_page(&self, params: &[(&'static str, String)]) -> Result<OrderPage, BolError>;
}

/// HTTP client for the Teapplix OrderNotification endpoint.
pub struct TeapplixClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TeapplixClient {
    pub fn new(api: &ApiConfig, token: String) -> Result<Self, BolError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: api.base_url.clone(),
            token,
        })
    }
}

#[async_trait]
impl OrderSource for TeapplixClient {
    async fn fetch_page(&self, params: &[(&'static str, String)]) -> Result<OrderPage, BolError> {
        let response = self
            .client
            .get(&self.base_url)
            .header("APIToken", &self.token)
            .header(CONTENT_TYPE, "application/json;charset=UTF-8")
            .header(ACCEPT, "application/json")
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(BolError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        decode_orders(&body)
    }
}

/// Pull the order list out of a response body. The API has used both
/// `orders` and `Orders`; non-object entries are skipped.
pub fn decode_orders(body: &str) -> Result<OrderPage, BolError> {
    let data: Value = serde_json::from_str(body).map_err(|e| {
        let head: String = body.chars().take(1000).collect();
        BolError::Decode(format!("{e}: {head}"))
    })?;

    let list = ["orders", "Orders"]
        .iter()
        .filter_map(|k| data.get(k).and_then(Value::as_array))
        .find(|arr| !arr.is_empty());

    let Some(list) = list else {
        return Ok(OrderPage::default());
    };

    let mut orders = Vec::with_capacity(list.len());
    for entry in list {
        match RawOrder::from_value(entry.clone()) {
            Some(order) => orders.push(order),
            None => warn!(entry = %entry, "Skipping non-object order entry"),
        }
    }
    Ok(OrderPage {
        orders,
        entries: list.len(),
    })
}

/// Trim, drop blanks, and dedupe identifiers keeping first-seen order.
pub fn normalize_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.as_ref().trim())
        .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

/// Pagination, exclusion and search fallback over an [`OrderSource`].
pub struct OrderFetcher<'a, S: OrderSource> {
    source: &'a S,
    api: &'a ApiConfig,
    zone: UtcOffset,
}

impl<'a, S: OrderSource> OrderFetcher<'a, S> {
    pub fn new(source: &'a S, api: &'a ApiConfig, zone: UtcOffset) -> Self {
        Self { source, api, zone }
    }

    fn common_params(&self, shipped: &str, page: usize) -> Params {
        vec![
            ("Shipped", shipped.to_string()),
            ("StoreKey", self.api.store_key.clone()),
            ("PageSize", self.api.page_size.to_string()),
            ("PageNumber", page.to_string()),
            ("Combine", self.api.combine.clone()),
            ("DetailLevel", self.api.detail_level.clone()),
        ]
    }

    /// Unshipped orders paid in the last `days` days, minus the excluded ship class.
    ///
    /// A failure on the first page is returned; a failure further in keeps
    /// what was already fetched.
    pub async fn fetch_by_days(&self, days: i64, now: OffsetDateTime) -> Result<Vec<RawOrder>, BolError> {
        let (start, end) = dates::window(now, days, self.zone);
        info!(%start, %end, days, "Fetching orders by payment date");

        let excluded = self.api.excluded_ship_class.trim().to_uppercase();
        let orders = self
            .scan_window(&start, &end, "0", true, |o| {
                excluded.is_empty() || o.ship_class().to_uppercase() != excluded
            })
            .await?;
        info!(orders = orders.len(), "Date-window fetch complete");
        Ok(orders)
    }

    /// Orders whose original transaction id matches one of `ids` exactly,
    /// shipped or not, any ship class.
    ///
    /// Tries the direct id filter first; if any call for an id is refused,
    /// that id falls back to a full scan of the search window.
    pub async fn fetch_by_ids<I: AsRef<str>>(&self, ids: &[I], now: OffsetDateTime) -> Vec<RawOrder> {
        let mut results = Vec::new();
        for id in normalize_ids(ids) {
            let found = match self.direct_lookup(&id).await {
                Some(found) => found,
                None => {
                    warn!(id = %id, "Direct lookup refused, scanning search window");
                    self.window_lookup(&id, now).await
                }
            };
            info!(id = %id, orders = found.len(), "PO search");
            results.extend(found);
        }
        results
    }

    async fn direct_lookup(&self, id: &str) -> Option<Vec<RawOrder>> {
        let mut found = Vec::new();
        for shipped in ["0", "1"] {
            let mut params = self.common_params(shipped, 1);
            params.push(("OriginalTxnId", id.to_string()));
            match self.source.fetch_page(&params).await {
                Ok(page) => found.extend(page.orders.into_iter().filter(|o| o.txn_key() == id)),
                Err(e) => {
                    warn!(id = %id, shipped, error = %e, "Direct PO lookup failed");
                    return None;
                }
            }
        }
        Some(found)
    }

    async fn window_lookup(&self, id: &str, now: OffsetDateTime) -> Vec<RawOrder> {
        let (start, end) = dates::window(now, self.api.search_window_days, self.zone);
        let mut found = Vec::new();
        for shipped in ["0", "1"] {
            // non-strict scans never error
            if let Ok(orders) = self
                .scan_window(&start, &end, shipped, false, |o| o.txn_key() == id)
                .await
            {
                found.extend(orders);
            }
        }
        found
    }

    /// Page through one payment-date window until a short or empty page.
    async fn scan_window<F>(
        &self,
        start: &str,
        end: &str,
        shipped: &str,
        strict: bool,
        keep: F,
    ) -> Result<Vec<RawOrder>, BolError>
    where
        F: Fn(&RawOrder) -> bool + Send + Sync,
    {
        let mut page = 1;
        let mut kept = Vec::new();
        loop {
            let mut params = vec![
                ("PaymentDateStart", start.to_string()),
                ("PaymentDateEnd", end.to_string()),
            ];
            params.extend(self.common_params(shipped, page));

            let batch = match self.source.fetch_page(&params).await {
                Ok(result) => result,
                Err(e) if strict && page == 1 => {
                    error!(error = %e, shipped, "Order fetch failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, page, shipped, "Order fetch stopped early");
                    break;
                }
            };
            if batch.entries == 0 {
                break;
            }
            let fetched = batch.entries;
            kept.extend(batch.orders.into_iter().filter(|o| keep(o)));
            info!(page, fetched, kept = kept.len(), shipped, "Fetched page");

            if fetched < self.api.page_size {
                break;
            }
            page += 1;
        }
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use time::macros::{datetime, offset};

    fn order(id: &str, ship_class: &str) -> RawOrder {
        RawOrder::from_value(json!({
            "OriginalTxnId": id,
            "OrderDetails": {"ShipClass": ship_class}
        }))
        .unwrap()
    }

    /// Serves `unshipped`/`shipped` in pages; can refuse the id filter or a page.
    #[derive(Default)]
    struct FakeSource {
        unshipped: Vec<RawOrder>,
        shipped: Vec<RawOrder>,
        refuse_id_filter: bool,
        fail_page: Option<usize>,
        malformed_on_first_page: usize,
        calls: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl FakeSource {
        fn calls(&self) -> Vec<Vec<(String, String)>> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn param<'p>(params: &'p [(&'static str, String)], key: &str) -> Option<&'p str> {
        params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[async_trait]
    impl OrderSource for FakeSource {
        async fn fetch_page(&self, params: &[(&'static str, String)]) -> Result<OrderPage, BolError> {
            self.calls
                .lock()
                .unwrap()
                .push(params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect());

            let page: usize = param(params, "PageNumber").unwrap().parse().unwrap();
            if self.fail_page == Some(page) {
                return Err(BolError::Status { status: 500, body: "boom".into() });
            }
            let pool = match param(params, "Shipped") {
                Some("1") => &self.shipped,
                _ => &self.unshipped,
            };
            if let Some(id) = param(params, "OriginalTxnId") {
                if self.refuse_id_filter {
                    return Err(BolError::Status { status: 400, body: "unknown parameter".into() });
                }
                let orders: Vec<RawOrder> = pool.iter().filter(|o| o.txn_key() == id).cloned().collect();
                return Ok(OrderPage {
                    entries: orders.len(),
                    orders,
                });
            }
            let size: usize = param(params, "PageSize").unwrap().parse().unwrap();
            let orders: Vec<RawOrder> = pool.iter().skip((page - 1) * size).take(size).cloned().collect();
            let entries = orders.len();
            // the first entries of page 1 arrive undecodable
            let skip = if page == 1 { self.malformed_on_first_page } else { 0 };
            Ok(OrderPage {
                orders: orders.into_iter().skip(skip).collect(),
                entries,
            })
        }
    }

    fn api(page_size: usize) -> ApiConfig {
        ApiConfig {
            page_size,
            ..ApiConfig::default()
        }
    }

    const NOW: OffsetDateTime = datetime!(2024-06-10 18:00 UTC);

    #[tokio::test]
    async fn test_days_paginates_and_excludes_ship_class() {
        let source = FakeSource {
            unshipped: vec![
                order("A", "EXLA"),
                order("B", "unsp_cg"),
                order("C", "ABF"),
                order("D", "UNSP_CG"),
                order("E", ""),
            ],
            ..Default::default()
        };
        let api = api(2);
        let fetcher = OrderFetcher::new(&source, &api, offset!(-7));
        let orders = fetcher.fetch_by_days(3, NOW).await.unwrap();

        let ids: Vec<_> = orders.iter().map(|o| o.txn_key()).collect();
        assert_eq!(ids, ["A", "C", "E"]);

        let calls = source.calls();
        assert_eq!(calls.len(), 3);
        let first = &calls[0];
        assert!(first.contains(&("PaymentDateStart".into(), "2024/06/07".into())));
        assert!(first.contains(&("PaymentDateEnd".into(), "2024/06/10".into())));
        assert!(first.contains(&("Shipped".into(), "0".into())));
        assert!(first.contains(&("StoreKey".into(), "HD".into())));
    }

    #[tokio::test]
    async fn test_days_first_page_failure_is_an_error() {
        let source = FakeSource {
            unshipped: vec![order("A", "")],
            fail_page: Some(1),
            ..Default::default()
        };
        let api = api(1);
        let fetcher = OrderFetcher::new(&source, &api, offset!(-7));
        assert!(fetcher.fetch_by_days(3, NOW).await.is_err());
    }

    #[tokio::test]
    async fn test_days_later_page_failure_keeps_earlier_pages() {
        let source = FakeSource {
            unshipped: vec![order("A", ""), order("B", ""), order("C", "")],
            fail_page: Some(2),
            ..Default::default()
        };
        let api = api(1);
        let fetcher = OrderFetcher::new(&source, &api, offset!(-7));
        let orders = fetcher.fetch_by_days(3, NOW).await.unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_entries_do_not_shorten_a_full_page() {
        // page 1 decodes to one order plus one dropped entry: still a full page of 2
        let source = FakeSource {
            unshipped: vec![order("A", ""), order("B", ""), order("C", "")],
            malformed_on_first_page: 1,
            ..Default::default()
        };
        let api = api(2);
        let fetcher = OrderFetcher::new(&source, &api, offset!(-7));
        let orders = fetcher.fetch_by_days(3, NOW).await.unwrap();

        let ids: Vec<_> = orders.iter().map(|o| o.txn_key()).collect();
        assert_eq!(ids, ["B", "C"]);
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_ids_direct_lookup_keeps_excluded_class() {
        let source = FakeSource {
            unshipped: vec![order("PO1", "UNSP_CG"), order("PO2", "")],
            shipped: vec![order("PO1", "EXLA")],
            ..Default::default()
        };
        let api = api(500);
        let fetcher = OrderFetcher::new(&source, &api, offset!(-7));
        let orders = fetcher.fetch_by_ids(&[" PO1 ", "", "PO1"], NOW).await;

        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.txn_key() == "PO1"));
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_ids_fallback_scans_window_exact_match() {
        let source = FakeSource {
            unshipped: vec![order("PO1", ""), order("PO10", ""), order("XPO1", "")],
            shipped: vec![order(" PO1", "")],
            refuse_id_filter: true,
            ..Default::default()
        };
        let api = api(2);
        let fetcher = OrderFetcher::new(&source, &api, offset!(-7));
        let orders = fetcher.fetch_by_ids(&["PO1"], NOW).await;

        assert_eq!(orders.len(), 2);
        let calls = source.calls();
        // refused direct call, then two unshipped pages and one shipped page
        assert_eq!(calls.len(), 4);
        assert!(calls[1].contains(&("PaymentDateStart".into(), "2024/03/12".into())));
    }

    #[test]
    fn test_decode_orders_variants() {
        assert_eq!(decode_orders(r#"{"orders": [{"OriginalTxnId": "A"}]}"#).unwrap().orders.len(), 1);

        let mixed = decode_orders(r#"{"orders": [], "Orders": [{"OriginalTxnId": "A"}, 5]}"#).unwrap();
        assert_eq!(mixed.orders.len(), 1);
        assert_eq!(mixed.entries, 2);

        let empty = decode_orders(r#"{"Success": true}"#).unwrap();
        assert!(empty.orders.is_empty());
        assert_eq!(empty.entries, 0);
        assert!(matches!(decode_orders("<html>"), Err(BolError::Decode(_))));
    }

    #[test]
    fn test_normalize_ids() {
        assert_eq!(normalize_ids(&[" b ", "a", "", "b", "  "]), ["b", "a"]);
    }
}
