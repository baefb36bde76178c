//! Domain error types.

/// Top-level error type for papertrader.
#[derive(Debug, thiserror::Error)]
pub enum PapertraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("initial equity must be a positive number, got {value}")]
    InvalidInitialEquity { value: f64 },

    #[error("feed error at line {line}: {reason}")]
    Feed { line: u64, reason: String },

    #[error("audit log error: {reason}")]
    Audit { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PapertraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        PapertraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        PapertraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&PapertraderError> for std::process::ExitCode {
    fn from(err: &PapertraderError) -> Self {
        let code: u8 = match err {
            PapertraderError::Io(_) => 1,
            PapertraderError::ConfigParse { .. }
            | PapertraderError::ConfigMissing { .. }
            | PapertraderError::ConfigInvalid { .. }
            | PapertraderError::InvalidInitialEquity { .. } => 2,
            PapertraderError::Feed { .. } | PapertraderError::Csv(_) => 3,
            PapertraderError::Audit { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_message() {
        let err = PapertraderError::invalid("account", "initial_equity", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid config value [account] initial_equity: must be positive"
        );
    }

    #[test]
    fn config_missing_message() {
        let err = PapertraderError::missing("market", "symbols");
        assert_eq!(err.to_string(), "missing config key [market] symbols");
    }

    #[test]
    fn feed_error_mentions_line() {
        let err = PapertraderError::Feed {
            line: 7,
            reason: "invalid close value".into(),
        };
        assert_eq!(err.to_string(), "feed error at line 7: invalid close value");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::other("disk full");
        let err: PapertraderError = io.into();
        assert!(matches!(err, PapertraderError::Io(_)));
    }
}
