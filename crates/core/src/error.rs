use thiserror::Error;

pub type BeaconResult<T> = Result<T, BeaconError>;

#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Selector error: {0}")]
    Selector(String),

    #[error("Tracker '{tracker}' failed to initialize: {source}")]
    TrackerInit {
        tracker: String,
        #[source]
        source: Box<BeaconError>,
    },

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BeaconError {
    /// True for errors raised because the caller supplied bad configuration
    /// or input, as opposed to environmental failures.
    pub fn is_caller_error(&self) -> bool {
        match self {
            BeaconError::Config(_)
            | BeaconError::Usage(_)
            | BeaconError::Type(_)
            | BeaconError::Selector(_) => true,
            BeaconError::TrackerInit { source, .. } => source.is_caller_error(),
            _ => false,
        }
    }
}

impl From<config::ConfigError> for BeaconError {
    fn from(err: config::ConfigError) -> Self {
        BeaconError::Config(err.to_string())
    }
}
