/// Result alias used throughout the crate.
pub type BatchResult<T> = Result<T, BatchError>;

/// Error taxonomy for the retarget-and-render pipeline.
///
/// The variant decides how far a failure propagates: see [`BatchError::is_fatal`].
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    /// Inputs or opened scenes do not satisfy the batch preconditions.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The host refused to enable characterization.
    #[error("characterization error: {0}")]
    Characterization(String),

    /// The imported skeleton's expected root joint is missing.
    #[error("root not found: {0}")]
    RootNotFound(String),

    /// Plotting a source character onto a target failed.
    #[error("retarget error: {0}")]
    Retarget(String),

    /// One camera capture failed.
    #[error("render error: {0}")]
    Render(String),

    /// A host scene service failed outside the named stages.
    #[error("host error: {0}")]
    Host(String),

    /// Parsing a scene document, clip, or configuration file failed.
    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BatchError {
    /// Build a [`BatchError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`BatchError::Characterization`] value.
    pub fn characterization(msg: impl Into<String>) -> Self {
        Self::Characterization(msg.into())
    }

    /// Build a [`BatchError::RootNotFound`] value.
    pub fn root_not_found(msg: impl Into<String>) -> Self {
        Self::RootNotFound(msg.into())
    }

    /// Build a [`BatchError::Retarget`] value.
    pub fn retarget(msg: impl Into<String>) -> Self {
        Self::Retarget(msg.into())
    }

    /// Build a [`BatchError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`BatchError::Host`] value.
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }

    /// Build a [`BatchError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether this error aborts the whole batch regardless of configuration.
    ///
    /// `Retarget` and `Render` are scoped by the orchestrator instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Retarget(_) | Self::Render(_))
    }
}

impl From<std::io::Error> for BatchError {
    fn from(e: std::io::Error) -> Self {
        Self::Other(anyhow::Error::new(e))
    }
}

impl From<serde_json::Error> for BatchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            BatchError::configuration("x")
                .to_string()
                .contains("configuration error:")
        );
        assert!(
            BatchError::characterization("x")
                .to_string()
                .contains("characterization error:")
        );
        assert!(
            BatchError::root_not_found("x")
                .to_string()
                .contains("root not found:")
        );
        assert!(BatchError::retarget("x").to_string().contains("retarget error:"));
        assert!(BatchError::render("x").to_string().contains("render error:"));
    }

    #[test]
    fn only_retarget_and_render_are_scoped() {
        assert!(BatchError::configuration("x").is_fatal());
        assert!(BatchError::root_not_found("x").is_fatal());
        assert!(BatchError::characterization("x").is_fatal());
        assert!(!BatchError::retarget("x").is_fatal());
        assert!(!BatchError::render("x").is_fatal());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = BatchError::from(base);
        assert!(err.to_string().contains("boom"));
    }
}
