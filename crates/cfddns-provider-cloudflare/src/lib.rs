//! Cloudflare DNS provider
//!
//! * Addresses exactly one pre-existing `A` record in a known zone; records
//!   are never created or deleted.
//! * Auth via **API Token**, which needs `DNS:Edit` on the zone.
//! * All business errors are mapped to [`cfddns_provider::ProviderError`].
//!   Nothing is retried here.

use async_trait::async_trait;
use cfddns_provider::{DnsProvider, DnsRecord, ProviderError};
use reqwest::{
    Client, Response, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const API_ROOT: &str = "https://api.cloudflare.com/client/v4";

const USER_AGENT: &str = concat!("cfddns/", env!("CARGO_PKG_VERSION"));

/// Error codes Cloudflare answers with when the token itself is refused.
const AUTH_ERROR_CODES: [i64; 4] = [6003, 6111, 9109, 10000];

/*──────── provider struct ────────*/

pub struct CfProvider {
    api_root: String,
    zone_id: String,
    record_name: String,
    client: Client,
}

impl CfProvider {
    pub fn new(
        zone_id: &str,
        record: &str,
        token: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))?;
        auth.set_sensitive(true);

        let mut hdr = HeaderMap::new();
        hdr.insert(AUTHORIZATION, auth);
        hdr.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            api_root: API_ROOT.to_owned(),
            zone_id: zone_id.to_owned(),
            record_name: record.to_owned(),
            client: Client::builder()
                .default_headers(hdr)
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .build()?,
        })
    }

    /// Point the provider at another API root (proxies, tests).
    pub fn with_api_root(mut self, root: &str) -> Self {
        self.api_root = root.trim_end_matches('/').to_owned();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.api_root, self.zone_id)
    }

    /*──────── response envelope ────────*/

    async fn check(resp: Response) -> Result<Value, ProviderError> {
        let status = resp.status();
        let body = resp.text().await?;
        let v: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        if status.is_success() && v["success"].as_bool().unwrap_or(false) {
            return Ok(v);
        }

        let first = v["errors"].get(0);
        let code = first.and_then(|e| e["code"].as_i64());
        let message = first
            .and_then(|e| e["message"].as_str())
            .map(str::to_owned)
            .unwrap_or_else(|| snippet(&body, status));

        let refused = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            || code.is_some_and(|c| AUTH_ERROR_CODES.contains(&c));
        if refused {
            Err(ProviderError::Auth {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Short, single-line excerpt of a non-JSON error body.
fn snippet(body: &str, status: StatusCode) -> String {
    let text: String = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned()
    } else {
        text.chars().take(200).collect()
    }
}

fn parse_record(v: &Value) -> Option<DnsRecord> {
    if v["type"].as_str()? != "A" {
        return None;
    }
    Some(DnsRecord {
        id: v["id"].as_str()?.to_owned(),
        name: v["name"].as_str()?.to_owned(),
        content: v["content"].as_str()?.to_owned(),
    })
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/*──────── DnsProvider impl ────────*/

#[async_trait]
impl DnsProvider for CfProvider {
    fn name(&self) -> &'static str {
        "Cloudflare"
    }
    fn record(&self) -> &str {
        &self.record_name
    }

    async fn get_record(&self) -> Result<DnsRecord, ProviderError> {
        let resp = self
            .client
            .get(self.records_url())
            .query(&[("type", "A"), ("name", self.record_name.as_str())])
            .send()
            .await?;
        let v = Self::check(resp).await?;

        let mut found: Vec<DnsRecord> = v["result"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(parse_record)
            .filter(|r| same_name(&r.name, &self.record_name))
            .collect();
        if found.len() > 1 {
            warn!(
                "Cloudflare returned {} A records named {}; using the first",
                found.len(),
                self.record_name
            );
        }
        if found.is_empty() {
            return Err(ProviderError::NotFound(self.record_name.clone()));
        }
        let record = found.swap_remove(0);
        debug!(
            "Cloudflare record {} id={} content={}",
            record.name, record.id, record.content
        );
        Ok(record)
    }

    async fn update_record(&self, record: &DnsRecord, content: &str) -> Result<(), ProviderError> {
        // PATCH leaves ttl / proxied as configured on the record
        let body = json!({
            "type":    "A",
            "name":    record.name,
            "content": content,
        });
        let resp = self
            .client
            .patch(format!("{}/{}", self.records_url(), record.id))
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        info!("Cloudflare updated record id={} -> {content}", record.id);
        Ok(())
    }
}
