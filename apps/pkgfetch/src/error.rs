//! CLI error handling

use std::fmt;

use pkgfetch_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(pkgfetch_errors::ConfigError),
    /// Fetch error
    Ops(pkgfetch_errors::Error),
    /// Output could not be produced
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => {
                write!(f, "Configuration error: {e}")?;
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            CliError::Ops(e) => {
                if let Some(failures) = e.part_failures() {
                    write!(f, "{} part(s) failed:", failures.len())?;
                    for (part, err) in failures.iter() {
                        write!(f, "\n  {part}: {}", err.user_message())?;
                        if let Some(code) = err.user_code() {
                            write!(f, " [{code}]")?;
                        }
                    }
                } else {
                    write!(f, "{}", e.user_message())?;
                    if let Some(code) = e.user_code() {
                        write!(f, "\n  Code: {code}")?;
                    }
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Output(msg) => write!(f, "Output error: {msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Ops(e) => Some(e),
            CliError::Output(_) => None,
        }
    }
}

impl From<pkgfetch_errors::ConfigError> for CliError {
    fn from(e: pkgfetch_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<pkgfetch_errors::Error> for CliError {
    fn from(e: pkgfetch_errors::Error) -> Self {
        match e {
            pkgfetch_errors::Error::Config(e) => CliError::Config(e),
            other => CliError::Ops(other),
        }
    }
}
