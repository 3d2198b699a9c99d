use std::io;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unable to determine working directory: {0}")]
    WorkingDirectory(#[source] io::Error),

    #[error("jail is not an absolute path: {0}")]
    JailNotAbsolute(String),

    #[error("{target_name} {path} is outside of jail: {jail} (disallowed in safe mode)")]
    PathOutsideJail {
        target_name: String,
        path: String,
        jail: String,
    },

    #[error("start path {start} is outside of jail: {jail} (disallowed in safe mode)")]
    StartOutsideJail { start: String, jail: String },
}

impl Error {
    /// Whether this error is a containment violation raised while resolving a path
    /// against a jail.
    #[must_use]
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::PathOutsideJail { .. } | Self::StartOutsideJail { .. }
        )
    }

    /// Get advice for this error if available.
    /// Returns helpful information for resolving the error.
    #[must_use]
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::WorkingDirectory(_) => {
                Some("Run from an existing directory or pass an absolute working directory")
            }
            Self::JailNotAbsolute(_) => Some("The jail must be an absolute directory path"),
            Self::PathOutsideJail { .. } => Some(
                "Paths must stay within the base directory in safe mode. Remove the '..' segments or run with a lower safe mode",
            ),
            Self::StartOutsideJail { .. } => {
                Some("The start directory must itself be located inside the jail")
            }
        }
    }
}
