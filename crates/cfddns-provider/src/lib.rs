use async_trait::async_trait;
use thiserror::Error;

/// A type-A record as stored by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsRecord {
    /// provider-assigned identifier
    pub id: String,
    pub name: String,
    /// dotted-quad IPv4 address
    pub content: String,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("credential rejected (HTTP {status}): {message}")]
    Auth { status: u16, message: String },
    #[error("no A record named `{0}`")]
    NotFound(String),
    #[error("api error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

/// One DNS record hosted by a provider.
///
/// An implementation is bound to a single zone and record name at
/// construction time; it never creates or deletes records.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn record(&self) -> &str;

    /// Look up the A record matching [`DnsProvider::record`].
    async fn get_record(&self) -> Result<DnsRecord, ProviderError>;

    /// Overwrite `content` of a previously looked-up record.
    async fn update_record(&self, record: &DnsRecord, content: &str) -> Result<(), ProviderError>;
}
