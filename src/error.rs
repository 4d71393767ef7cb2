// Error handling for urimatch

use thiserror::Error;

/// Library error type
///
/// A fragment that simply was not produced by a template is not an error;
/// matching reports that as `None`.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl TemplateError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        TemplateError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        TemplateError::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = TemplateError::syntax(4, "Unterminated expression");
        assert_eq!(
            err.to_string(),
            "Syntax error at position 4: Unterminated expression"
        );
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = TemplateError::invalid_argument("empty variable list");
        assert_eq!(err.to_string(), "Invalid argument: empty variable list");
    }
}
