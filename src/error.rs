use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Finalizer error: {0}")]
    Finalizer(String),
}

pub type Result<T> = std::result::Result<T, OperatorError>;

impl OperatorError {
    /// Whether this error is transient and the reconciliation should be
    /// retried soon. Build failures come from the spec and will not fix
    /// themselves, so they get a long requeue.
    pub fn is_transient(&self) -> bool {
        matches!(self, OperatorError::Kube(_))
    }
}
