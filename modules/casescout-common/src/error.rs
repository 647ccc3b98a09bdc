use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaseScoutError {
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Cache file is corrupt: {0}")]
    CacheCorrupt(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
