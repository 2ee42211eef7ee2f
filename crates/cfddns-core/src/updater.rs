//! One update run: detect the public IP, compare it with the record and
//! overwrite the record on change.
//!
//! There is no loop and no retry. An external timer re-invokes the binary,
//! and at most one run is expected to be in flight at a time.

use crate::{
    cfg::AppConfig,
    detector::detect_ip,
    error::{ConfigError, CoreError},
    guard::RunGuard,
    outcome::Outcome,
};
use cfddns_provider::DnsProvider;
use cfddns_provider_cloudflare::CfProvider;
use chrono::Utc;
use std::net::Ipv4Addr;
use tracing::{debug, error, info};

/// Target of the single per-run outcome event; the binary routes it to the
/// append-only log file.
pub const OUTCOME_TARGET: &str = "cfddns::outcome";

/*──────── entry point ────────*/
pub async fn run_once(cfg: &AppConfig) -> Result<Outcome, CoreError> {
    let res = run(cfg).await;
    match &res {
        Ok(outcome) => info!(target: OUTCOME_TARGET, "{outcome}"),
        Err(e) => error!(
            target: OUTCOME_TARGET,
            "{} failed: {e}", cfg.cloudflare.record_name
        ),
    }
    res
}

async fn run(cfg: &AppConfig) -> Result<Outcome, CoreError> {
    let cf = &cfg.cloudflare;
    let provider = CfProvider::new(
        &cf.zone_id,
        &cf.record_name,
        &cf.api_token,
        cfg.settings.timeout(),
    )
    .map_err(|e| ConfigError::Invalid(format!("cloudflare client: {e}")))?
    .with_api_root(&cfg.settings.api_root);

    if let Some(guard) = RunGuard::from_settings(&cfg.settings)
        && let Some(last_run) = guard.check(Utc::now())
    {
        debug!("run guard stamp {} holds this run back", guard.path().display());
        return Ok(Outcome::Skipped {
            last_run,
            min_interval: guard.min_interval(),
        });
    }

    let ip = detect_ip(&cfg.settings.ip_urls, cfg.settings.timeout())
        .await
        .map_err(CoreError::Network)?;
    info!("detected public IP = {ip}");

    reconcile(&provider, ip).await
}

/*──────── compare & update ────────*/
/// Bring the provider's record in line with `ip`; writes only on change.
/// The outcome names the record as configured, not as the API spells it.
pub async fn reconcile(provider: &dyn DnsProvider, ip: Ipv4Addr) -> Result<Outcome, CoreError> {
    let name = provider.record().to_owned();
    let record = provider.get_record().await.map_err(CoreError::lookup)?;
    let current = ip.to_string();

    if record.content == current {
        debug!("{} {name} ({}) already at {current}", provider.name(), record.id);
        return Ok(Outcome::Unchanged { record: name, ip });
    }

    info!(
        "{} {name}: {} -> {current}",
        provider.name(),
        record.content
    );
    provider
        .update_record(&record, &current)
        .await
        .map_err(CoreError::update)?;

    Ok(Outcome::Updated {
        record: name,
        from: record.content,
        to: ip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cfddns_provider::{DnsRecord, ProviderError};
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    /// In-memory provider holding one record and counting calls
    struct MockProvider {
        record: Mutex<Option<DnsRecord>>,
        lookups: AtomicUsize,
        updates: Mutex<Vec<String>>,
        reject_update: bool,
    }

    impl MockProvider {
        fn with_content(content: &str) -> Self {
            Self {
                record: Mutex::new(Some(DnsRecord {
                    id: "rec1".into(),
                    name: "home.example.com".into(),
                    content: content.into(),
                })),
                lookups: AtomicUsize::new(0),
                updates: Mutex::new(Vec::new()),
                reject_update: false,
            }
        }

        fn empty() -> Self {
            let p = Self::with_content("");
            *p.record.lock().unwrap() = None;
            p
        }

        fn updates(&self) -> Vec<String> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DnsProvider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }
        fn record(&self) -> &str {
            "home.example.com"
        }

        async fn get_record(&self) -> Result<DnsRecord, ProviderError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.record
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ProviderError::NotFound("home.example.com".into()))
        }

        async fn update_record(
            &self,
            record: &DnsRecord,
            content: &str,
        ) -> Result<(), ProviderError> {
            if self.reject_update {
                return Err(ProviderError::Api {
                    status: 400,
                    message: "Invalid zone identifier".into(),
                });
            }
            self.updates.lock().unwrap().push(content.to_owned());
            if let Some(r) = self.record.lock().unwrap().as_mut()
                && r.id == record.id
            {
                r.content = content.to_owned();
            }
            Ok(())
        }
    }

    const NEW_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 9);

    #[tokio::test]
    async fn equal_address_issues_no_update() {
        let p = MockProvider::with_content("203.0.113.9");
        let out = reconcile(&p, NEW_IP).await.unwrap();
        assert_eq!(
            out,
            Outcome::Unchanged {
                record: "home.example.com".into(),
                ip: NEW_IP
            }
        );
        assert!(p.updates().is_empty());
    }

    #[tokio::test]
    async fn different_address_issues_exactly_one_update() {
        let p = MockProvider::with_content("203.0.113.5");
        let out = reconcile(&p, NEW_IP).await.unwrap();
        assert_eq!(
            out,
            Outcome::Updated {
                record: "home.example.com".into(),
                from: "203.0.113.5".into(),
                to: NEW_IP
            }
        );
        assert_eq!(p.updates(), vec!["203.0.113.9"]);
    }

    #[tokio::test]
    async fn second_run_without_change_does_not_write() {
        let p = MockProvider::with_content("203.0.113.5");
        assert!(matches!(
            reconcile(&p, NEW_IP).await.unwrap(),
            Outcome::Updated { .. }
        ));
        assert!(matches!(
            reconcile(&p, NEW_IP).await.unwrap(),
            Outcome::Unchanged { .. }
        ));
        assert_eq!(p.updates().len(), 1);
        assert_eq!(p.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn outcome_uses_configured_record_name() {
        let p = MockProvider::with_content("203.0.113.5");
        p.record.lock().unwrap().as_mut().unwrap().name = "Home.Example.com.".into();
        match reconcile(&p, NEW_IP).await.unwrap() {
            Outcome::Updated { record, .. } => assert_eq!(record, "home.example.com"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_record_is_lookup_error() {
        let p = MockProvider::empty();
        let err = reconcile(&p, NEW_IP).await.unwrap_err();
        assert!(matches!(err, CoreError::Lookup(ProviderError::NotFound(_))));
        assert_eq!(err.exit_code(), 1);
        assert!(p.updates().is_empty());
    }

    #[tokio::test]
    async fn rejected_update_is_update_error() {
        let p = MockProvider {
            reject_update: true,
            ..MockProvider::with_content("203.0.113.5")
        };
        let err = reconcile(&p, NEW_IP).await.unwrap_err();
        assert!(matches!(err, CoreError::Update(_)));
        assert!(err.to_string().contains("Invalid zone identifier"));
    }
}
