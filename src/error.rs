use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("malformed dataset: {0}")]
    MalformedDataset(String),
    #[error("failed to fetch dataset: {0}")]
    FetchFailure(String),
    #[error("no matching nodes")]
    EmptyResult,
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
