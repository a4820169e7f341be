use thiserror::Error;

/// Failures reported by a bar provider. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("provider returned HTTP {status} for {symbol}")]
    Status { status: u16, symbol: String },

    #[error("could not decode provider response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid date '{input}', expected YYYY-MM-DD")]
    Parse {
        input: String,
        #[source]
        source: Option<chrono::ParseError>,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("spreadsheet export failed: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("unknown timezone: {0}")]
    Timezone(String),
}

pub type Result<T> = std::result::Result<T, GridError>;
