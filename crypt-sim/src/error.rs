use crypt_runtime::CryptError;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("read scenario {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("parse scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown account {0:?}")]
    UnknownAccount(String),

    #[error(transparent)]
    Runtime(#[from] CryptError),

    #[error("render report: {0}")]
    Render(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
