use cfddns_provider::ProviderError;
use thiserror::Error;

/// Problems with the environment configuration; always fatal before any
/// network call.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {prefix}_* environment: {source}")]
    Load {
        prefix: &'static str,
        #[source]
        source: config::ConfigError,
    },

    #[error("validation failed: {0}")]
    Validate(#[from] validator::ValidationErrors),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn exit_code(&self) -> u8 {
        2
    }
}

/// Errors ending an update run
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("network error: {0:#}")]
    Network(anyhow::Error),

    #[error("authentication failed: {0}")]
    Auth(#[source] ProviderError),

    #[error("record lookup failed: {0}")]
    Lookup(#[source] ProviderError),

    #[error("record update failed: {0}")]
    Update(#[source] ProviderError),
}

impl CoreError {
    /// Classify a failure of the record lookup.
    pub fn lookup(e: ProviderError) -> Self {
        match e {
            ProviderError::Http(_) => Self::Network(e.into()),
            ProviderError::Auth { .. } => Self::Auth(e),
            _ => Self::Lookup(e),
        }
    }

    /// Classify a failure of the record update.
    pub fn update(e: ProviderError) -> Self {
        match e {
            ProviderError::Http(_) => Self::Network(e.into()),
            _ => Self::Update(e),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(e) => e.exit_code(),
            _ => 1,
        }
    }
}
