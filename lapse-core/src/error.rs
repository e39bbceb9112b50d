use thiserror::Error;

#[derive(Error, Debug)]
pub enum LapseError {
    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Protocol not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    #[error("RDAP lookup failed: {0}")]
    RdapError(String),

    #[error("RDAP bootstrap failed: {0}")]
    RdapBootstrapError(String),

    #[error("Domain not found in registry: {0}")]
    DomainNotFound(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unable to parse `{raw}`, last parsing error: {source}")]
    DateParse {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Scraper used before start-up completed")]
    ScraperNotStarted,

    #[error("Metrics export failed: {0}")]
    ExportError(String),
}

pub type Result<T> = std::result::Result<T, LapseError>;
