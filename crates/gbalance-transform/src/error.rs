#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    /// The inbound body is missing something the upstream needs.
    #[error("{0}")]
    MissingContent(String),
}
