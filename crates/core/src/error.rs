#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Required local input is missing; raised before any request is sent.
    #[error("{0}")]
    Preflight(String),

    #[error("No job id: pass --job or start a new job first")]
    MissingJobId,

    #[error("Unknown artifact kind: '{0}'")]
    UnknownArtifactKind(String),
}
