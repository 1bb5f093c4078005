//! REST adapter for the platform's table API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipf_core::config::IpfabricConfig;
use ipf_core::{
    Row, SnapshotCatalog, SnapshotId, SnapshotState, SnapshotSummary, TableQuery, TableResult,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::backend::IpfBackend;
use crate::error::BackendError;

const TOKEN_HEADER: &str = "x-api-token";
const MAX_ERROR_BODY_CHARS: usize = 512;
const UNREADABLE_BODY: &str = "<unreadable body>";

pub struct HttpBackend {
    client: Client,
    api_base: String,
    display_url: String,
    page_size: u32,
}

impl HttpBackend {
    pub fn from_config(config: &IpfabricConfig) -> Result<Self, BackendError> {
        let mut token =
            HeaderValue::from_str(config.token.expose_secret().trim()).map_err(|_| {
                BackendError::Unavailable("API token is not a valid header value".to_string())
            })?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        if !config.verify_tls {
            warn!(
                event_name = "backend.tls.verification_disabled",
                url = %config.url,
                "TLS certificate verification is disabled"
            );
        }

        Ok(Self {
            client,
            api_base: config.api_base(),
            display_url: config.url.trim().trim_end_matches('/').to_string(),
            page_size: config.page_size,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let started = Instant::now();
        debug!(event_name = "backend.request.started", path, "sending platform request");

        let response = request.send().await.map_err(|error| {
            warn!(
                event_name = "backend.request.failed",
                path,
                error = %error,
                "platform request failed"
            );
            BackendError::Transport(error)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|error| {
                debug!(
                    event_name = "backend.request.body_unreadable",
                    path,
                    error = %error,
                    "could not read error body"
                );
                UNREADABLE_BODY.to_string()
            });
            let message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            warn!(
                event_name = "backend.request.rejected",
                path,
                status = status.as_u16(),
                "platform rejected request"
            );
            return Err(BackendError::Status { status: status.as_u16(), message });
        }

        let decoded = response
            .json::<T>()
            .await
            .map_err(|error| BackendError::Decode(format!("{path}: {error}")))?;

        debug!(
            event_name = "backend.request.completed",
            path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "platform request completed"
        );
        Ok(decoded)
    }
}

#[async_trait]
impl IpfBackend for HttpBackend {
    fn base_url(&self) -> &str {
        &self.display_url
    }

    async fn list_snapshots(&self) -> Result<SnapshotCatalog, BackendError> {
        let raw: Vec<RawSnapshot> =
            self.send("snapshots", self.client.get(self.endpoint("snapshots"))).await?;
        Ok(SnapshotCatalog::new(raw.into_iter().map(RawSnapshot::into_summary).collect()))
    }

    async fn fetch_table(&self, query: &TableQuery) -> Result<TableResult, BackendError> {
        query.validate()?;

        let path = query.table.api_path();
        let url = self.endpoint(path);
        let mut rows: Vec<Row> = Vec::new();
        let mut start: u64 = 0;

        loop {
            let body = table_request_body(query, start, self.page_size);
            let page: Value = self.send(path, self.client.post(&url).json(&body)).await?;
            let page = decode_table_page(page)?;
            let received = page.rows.len() as u64;
            rows.extend(page.rows);
            start += received;

            // The platform may cap pages below `page_size`; trust its count when present.
            let complete = match page.total {
                Some(total) => start >= total,
                None => received < u64::from(self.page_size),
            };
            if received == 0 || complete {
                break;
            }
        }

        info!(
            event_name = "backend.table.fetched",
            table = %query.table,
            snapshot_id = %query.snapshot_id,
            row_count = rows.len(),
            "table fetched"
        );
        Ok(TableResult::new(query.table, query.snapshot_id.clone(), rows))
    }

    async fn platform_version(&self) -> Result<String, BackendError> {
        let raw: Value =
            self.send("os/version", self.client.get(self.endpoint("os/version"))).await?;
        decode_version(&raw)
    }
}

/// Builds the JSON body the table endpoints accept.
pub fn table_request_body(query: &TableQuery, start: u64, limit: u32) -> Value {
    let mut body = json!({
        "columns": query.effective_columns(),
        "snapshot": query.snapshot_id.as_str(),
        "pagination": { "start": start, "limit": limit },
    });
    if !query.filter.is_empty() {
        body["filters"] = query.filter.to_backend_json();
    }
    body
}

#[derive(Debug, PartialEq)]
pub struct TablePage {
    pub rows: Vec<Row>,
    pub total: Option<u64>,
}

/// Splits a table response into rows and the platform's total row count.
pub fn decode_table_page(raw: Value) -> Result<TablePage, BackendError> {
    let Value::Object(mut envelope) = raw else {
        return Err(BackendError::Decode("table response is not a JSON object".to_string()));
    };
    let total = envelope.get("_meta").and_then(|meta| meta.get("count")).and_then(Value::as_u64);

    let data = envelope
        .remove("data")
        .ok_or_else(|| BackendError::Decode("table response has no `data` field".to_string()))?;
    let Value::Array(items) = data else {
        return Err(BackendError::Decode("table `data` is not an array".to_string()));
    };

    let rows = items
        .into_iter()
        .map(|item| match item {
            Value::Object(row) => Ok(row),
            other => Err(BackendError::Decode(format!("table row is not an object: {other}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TablePage { rows, total })
}

fn decode_version(raw: &Value) -> Result<String, BackendError> {
    ["releaseVersion", "version", "apiVersion"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| BackendError::Decode("version response has no version field".to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    id: String,
    name: Option<String>,
    note: Option<String>,
    state: Option<String>,
    status: Option<String>,
    #[serde(default)]
    locked: bool,
    total_dev_count: Option<u64>,
    ts_start: Option<i64>,
    ts_end: Option<i64>,
}

impl RawSnapshot {
    fn into_summary(self) -> SnapshotSummary {
        SnapshotSummary {
            id: SnapshotId(self.id),
            name: self.name,
            note: self.note,
            state: parse_state(self.state.as_deref()),
            status: self.status,
            locked: self.locked,
            device_count: self.total_dev_count,
            started_at: self.ts_start.and_then(from_epoch_millis),
            finished_at: self.ts_end.and_then(from_epoch_millis),
        }
    }
}

fn parse_state(raw: Option<&str>) -> SnapshotState {
    match raw.map(|state| state.trim().to_ascii_lowercase()).as_deref() {
        Some("loaded") => SnapshotState::Loaded,
        Some("unloaded") => SnapshotState::Unloaded,
        Some("loading") => SnapshotState::Loading,
        Some("unloading") => SnapshotState::Unloading,
        _ => SnapshotState::Unknown,
    }
}

fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use ipf_core::config::{AppConfig, IpfabricConfig};
    use ipf_core::{
        FilterOperator, Predicate, SnapshotId, SnapshotState, TableFilter, TableName, TableQuery,
    };
    use serde_json::{json, Value};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    use super::{
        decode_table_page, decode_version, table_request_body, HttpBackend, RawSnapshot,
        UNREADABLE_BODY,
    };
    use crate::backend::IpfBackend;
    use crate::error::BackendError;

    fn devices_query() -> TableQuery {
        TableQuery::new(TableName::Devices, SnapshotId::from("snap-1"))
            .with_columns(Some(vec!["hostname".to_string(), "vendor".to_string()]))
    }

    #[test]
    fn request_body_carries_columns_snapshot_and_pagination() {
        let body = table_request_body(&devices_query(), 0, 1000);
        assert_eq!(
            body,
            json!({
                "columns": ["hostname", "vendor"],
                "snapshot": "snap-1",
                "pagination": { "start": 0, "limit": 1000 },
            })
        );
    }

    #[test]
    fn request_body_includes_shaped_filters() {
        let query = devices_query().with_filter(
            TableFilter::new().with("vendor", Predicate::new(FilterOperator::In, json!(["cisco", "arista"]))),
        );
        let body = table_request_body(&query, 2000, 500);

        assert_eq!(body["pagination"], json!({ "start": 2000, "limit": 500 }));
        assert_eq!(
            body["filters"],
            json!({ "and": [ { "or": [ { "vendor": ["eq", "cisco"] }, { "vendor": ["eq", "arista"] } ] } ] })
        );
    }

    #[test]
    fn omitted_columns_request_the_whole_catalog() {
        let query = TableQuery::new(TableName::Vendors, SnapshotId::from("snap-1"));
        let body = table_request_body(&query, 0, 10);
        assert_eq!(body["columns"], json!(TableName::Vendors.columns()));
    }

    #[test]
    fn table_page_exposes_rows_and_total() {
        let page = decode_table_page(json!({
            "data": [ { "hostname": "sw1" }, { "hostname": "sw2" } ],
            "_meta": { "limit": 2, "start": 0, "count": 5 },
        }))
        .expect("decode");

        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[1]["hostname"], json!("sw2"));
        assert_eq!(page.total, Some(5));
    }

    #[test]
    fn malformed_table_pages_are_decode_errors() {
        assert!(matches!(decode_table_page(json!([])), Err(BackendError::Decode(_))));
        assert!(matches!(decode_table_page(json!({ "rows": [] })), Err(BackendError::Decode(_))));
        assert!(matches!(
            decode_table_page(json!({ "data": [1, 2] })),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn raw_snapshots_convert_epoch_millis() {
        let raw: RawSnapshot = serde_json::from_value(json!({
            "id": "d3bd033e-1ba6-4b27-86f5-18824a1a495e",
            "name": "nightly",
            "state": "loaded",
            "locked": true,
            "totalDevCount": 42,
            "tsStart": 1_704_067_200_000_i64,
            "tsEnd": 1_704_070_800_000_i64,
        }))
        .expect("raw snapshot");
        let summary = raw.into_summary();

        assert_eq!(summary.state, SnapshotState::Loaded);
        assert!(summary.locked);
        assert_eq!(summary.device_count, Some(42));
        assert_eq!(
            summary.started_at.map(|ts| ts.to_rfc3339()),
            Some("2024-01-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn unknown_snapshot_states_are_tolerated() {
        let raw: RawSnapshot =
            serde_json::from_value(json!({ "id": "x", "state": "discovering" })).expect("raw");
        assert_eq!(raw.into_summary().state, SnapshotState::Unknown);
    }

    #[test]
    fn version_prefers_release_version() {
        let raw = json!({ "apiVersion": "v7.0", "releaseVersion": "7.0.12" });
        assert_eq!(decode_version(&raw).expect("version"), "7.0.12");
        assert!(decode_version(&json!({})).is_err());
    }

    #[tokio::test]
    async fn unknown_columns_fail_before_any_request() {
        let mut config = AppConfig::default().ipfabric;
        config.url = "https://127.0.0.1:9".to_string();
        config.token = "token".to_string().into();
        let backend = HttpBackend::from_config(&config).expect("client");

        assert_eq!(backend.base_url(), "https://127.0.0.1:9");

        let query = TableQuery::new(TableName::Interfaces, SnapshotId::from("snap-1"))
            .with_columns(Some(vec!["notAColumn".to_string()]));
        let error = backend.fetch_table(&query).await.expect_err("should reject column");
        assert!(matches!(error, BackendError::UnknownColumn { ref column, .. } if column == "notAColumn"));
    }

    /// Local stand-in for the platform: every connection gets one canned
    /// response built from the request's JSON body.
    async fn spawn_platform<F>(respond: F) -> String
    where
        F: Fn(Value) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let respond = Arc::new(respond);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let respond = Arc::clone(&respond);
                tokio::spawn(async move { answer(stream, &*respond).await });
            }
        });
        format!("http://{addr}")
    }

    async fn answer<F: Fn(Value) -> String>(stream: TcpStream, respond: &F) {
        let mut reader = BufReader::new(stream);
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.expect("read header") == 0 {
                return;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().expect("content length");
                }
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).await.expect("read body");
        let request = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json body")
        };

        let mut stream = reader.into_inner();
        stream.write_all(respond(request).as_bytes()).await.expect("write response");
        let _ = stream.shutdown().await;
    }

    fn json_response(status: &str, payload: &Value) -> String {
        let text = payload.to_string();
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{text}",
            text.len()
        )
    }

    /// Platform holding `available` device rows that never returns more than
    /// `cap` rows per page. `reported` is the `_meta.count` it advertises.
    async fn paged_platform(
        available: u64,
        cap: u64,
        reported: Option<u64>,
    ) -> (String, Arc<Mutex<Vec<u64>>>) {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&starts);
        let url = spawn_platform(move |request| {
            let start = request["pagination"]["start"].as_u64().expect("start");
            let limit = request["pagination"]["limit"].as_u64().expect("limit");
            seen.lock().expect("starts lock").push(start);

            let end = (start + limit.min(cap)).min(available).max(start);
            let data: Vec<Value> =
                (start..end).map(|index| json!({ "hostname": format!("sw{index}") })).collect();
            let mut payload = json!({ "data": data });
            if let Some(count) = reported {
                payload["_meta"] = json!({ "start": start, "limit": limit, "count": count });
            }
            json_response("200 OK", &payload)
        })
        .await;
        (url, starts)
    }

    fn local_backend(url: String, page_size: u32) -> HttpBackend {
        let config = IpfabricConfig {
            url,
            token: "token".to_string().into(),
            page_size,
            ..AppConfig::default().ipfabric
        };
        HttpBackend::from_config(&config).expect("client")
    }

    fn hostnames_query() -> TableQuery {
        TableQuery::new(TableName::Devices, SnapshotId::from("snap-1"))
            .with_columns(Some(vec!["hostname".to_string()]))
    }

    fn recorded(starts: &Arc<Mutex<Vec<u64>>>) -> Vec<u64> {
        starts.lock().expect("starts lock").clone()
    }

    #[tokio::test]
    async fn fetch_table_follows_full_pages_to_the_reported_count() {
        let (url, starts) = paged_platform(5, u64::MAX, Some(5)).await;
        let result = local_backend(url, 2).fetch_table(&hostnames_query()).await.expect("fetch");

        assert_eq!(result.count, 5);
        assert_eq!(result.rows[4]["hostname"], json!("sw4"));
        assert_eq!(recorded(&starts), vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn short_pages_do_not_end_paging_before_the_reported_count() {
        let (url, starts) = paged_platform(5, 2, Some(5)).await;
        let result = local_backend(url, 3).fetch_table(&hostnames_query()).await.expect("fetch");

        assert_eq!(result.count, 5);
        assert_eq!(recorded(&starts), vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn empty_page_ends_paging_when_count_overstates_rows() {
        let (url, starts) = paged_platform(3, 2, Some(10)).await;
        let result = local_backend(url, 2).fetch_table(&hostnames_query()).await.expect("fetch");

        assert_eq!(result.count, 3);
        assert_eq!(recorded(&starts), vec![0, 2, 3]);
    }

    #[tokio::test]
    async fn without_meta_a_short_page_is_the_last() {
        let (url, starts) = paged_platform(5, u64::MAX, None).await;
        let result = local_backend(url, 3).fetch_table(&hostnames_query()).await.expect("fetch");

        assert_eq!(result.count, 5);
        assert_eq!(recorded(&starts), vec![0, 3]);
    }

    #[tokio::test]
    async fn rejected_requests_carry_status_and_body() {
        let url = spawn_platform(|_| {
            json_response("401 Unauthorized", &json!({ "code": "API_INVALID_TOKEN" }))
        })
        .await;
        let error = local_backend(url, 10).platform_version().await.expect_err("rejected");

        assert!(matches!(
            error,
            BackendError::Status { status: 401, ref message } if message.contains("API_INVALID_TOKEN")
        ));
    }

    #[tokio::test]
    async fn unreadable_error_body_gets_a_placeholder() {
        let url = spawn_platform(|_| {
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\nconnection: close\r\n\r\npartial"
                .to_string()
        })
        .await;
        let error = local_backend(url, 10).platform_version().await.expect_err("rejected");

        assert!(matches!(
            error,
            BackendError::Status { status: 500, ref message } if message == UNREADABLE_BODY
        ));
    }
}
