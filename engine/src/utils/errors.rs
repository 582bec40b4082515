use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Computation(String),
}

impl EngineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<EngineError> for String {
    fn from(e: EngineError) -> Self {
        e.to_string()
    }
}
