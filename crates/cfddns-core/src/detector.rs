//! Public-IP detection over HTTP
//!
//! Lookup services are tried in order; the first plausible public IPv4
//! answer wins. Bodies may be plain text (`203.0.113.9`) or JSON
//! (`{"ip": "203.0.113.9"}`).

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Client;
use serde_json::Value;
use std::{net::Ipv4Addr, time::Duration};
use tracing::{info, warn};

const USER_AGENT: &str = concat!("cfddns/", env!("CARGO_PKG_VERSION"));

/// Largest body accepted from a lookup service
const MAX_BODY: usize = 4 * 1024;

/// JSON fields lookup services are known to put the address in
const JSON_KEYS: [&str; 3] = ["ip", "address", "query"];

/*──────── body parsing ────────*/
pub fn parse_ip_body(body: &str) -> Result<Ipv4Addr> {
    let body = body.trim();
    let raw = if body.starts_with('{') {
        let v: Value = serde_json::from_str(body).context("malformed JSON body")?;
        JSON_KEYS
            .iter()
            .find_map(|k| v[*k].as_str())
            .ok_or_else(|| anyhow!("no address field in JSON body"))?
            .trim()
            .to_owned()
    } else {
        body.to_owned()
    };
    raw.parse::<Ipv4Addr>()
        .with_context(|| format!("not an IPv4 address: {:?}", truncate(&raw)))
}

fn truncate(s: &str) -> String {
    s.chars().take(64).collect()
}

/*──────── plausibility ────────*/
/// Whether `ip` can be the address the internet sees us as.
///
/// Documentation ranges are accepted; loopback, RFC 1918, link-local,
/// CGNAT shared space, `0.0.0.0/8`, `192.0.0.0/24`, the benchmarking block
/// `198.18.0.0/15`, multicast and everything from `240.0.0.0` up
/// (reserved and broadcast) are not.
pub fn is_plausible_public(ip: Ipv4Addr) -> bool {
    let o = ip.octets();
    let shared = o[0] == 100 && (64..=127).contains(&o[1]);
    let protocol = o[0] == 192 && o[1] == 0 && o[2] == 0;
    let benchmark = o[0] == 198 && (o[1] == 18 || o[1] == 19);
    !(o[0] == 0
        || o[0] >= 240
        || shared
        || protocol
        || benchmark
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_multicast())
}

/*──────── HTTP detector ────────*/
async fn detect_http(client: &Client, url: &str) -> Result<Ipv4Addr> {
    let mut resp = client.get(url).send().await?.error_for_status()?;
    if let Some(len) = resp.content_length()
        && len > MAX_BODY as u64
    {
        bail!("response body of {len} bytes is too large");
    }
    let mut buf = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        if buf.len() + chunk.len() > MAX_BODY {
            bail!("response body is too large (over {MAX_BODY} bytes)");
        }
        buf.extend_from_slice(&chunk);
    }
    let body = String::from_utf8_lossy(&buf);
    let ip = parse_ip_body(&body)?;
    if !is_plausible_public(ip) {
        bail!("{ip} is not a public address");
    }
    Ok(ip)
}

/*──────── orchestrator ────────*/
pub async fn detect_ip(urls: &[String], timeout: Duration) -> Result<Ipv4Addr> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;

    let mut last = None;
    for url in urls {
        match detect_http(&client, url).await {
            Ok(ip) => {
                info!("detect/http {url} -> {ip}");
                return Ok(ip);
            }
            Err(e) => {
                warn!("detect/http {url} failed: {e:#}");
                last = Some(e);
            }
        }
    }
    Err(last
        .unwrap_or_else(|| anyhow!("no lookup URL configured"))
        .context("public IP lookup failed"))
}
