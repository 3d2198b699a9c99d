use std::error::Error;

use miette::Diagnostic;
use quire_core::Error as CoreError;

/// A core error rendered with its advice.
#[derive(Debug, Diagnostic, thiserror::Error)]
#[error("{message}")]
#[diagnostic()]
pub(crate) struct CoreDiagnostic {
    message: String,

    #[help]
    advice: Option<String>,
}

impl From<&CoreError> for CoreDiagnostic {
    fn from(error: &CoreError) -> Self {
        Self {
            message: error.to_string(),
            advice: error.advice().map(ToString::to_string),
        }
    }
}

/// Build a report for `e`, with advice if a core error is found in its source chain.
pub(crate) fn display(e: &(dyn Error + 'static)) -> miette::Report {
    let mut current: Option<&(dyn Error + 'static)> = Some(e);
    while let Some(error) = current {
        if let Some(core_error) = error.downcast_ref::<CoreError>() {
            if core_error.is_security_violation() {
                tracing::debug!(%core_error, "path containment violation");
            }
            return miette::Report::new(CoreDiagnostic::from(core_error));
        }
        current = error.source();
    }
    miette::miette!("{e}")
}
