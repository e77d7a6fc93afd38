use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for setting '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Unsupported format for configuration fragment '{name}': '.{extension}'")]
    UnsupportedFormat { name: String, extension: String },

    #[error("Failed to parse configuration fragment '{name}': {message}")]
    ParsingError { name: String, message: String },

    #[error("Configuration value at '{path}' has an unexpected shape: {message}")]
    Deserialize { path: String, message: String },
}

impl ConfigError {
    /// Create a missing required setting error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a fragment parsing error
    pub fn parsing(name: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::ParsingError {
            name: name.into(),
            message: error.to_string(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T: ?Sized> {
    /// Validate a configuration value
    fn validate(&self, field: &str, value: &T) -> Result<(), ConfigError>;
}

/// Rejects empty or whitespace-only settings
pub struct NonEmptyValidator;

impl ConfigValidator<str> for NonEmptyValidator {
    fn validate(&self, field: &str, value: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::missing_required(
                field,
                "This setting must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_validator() {
        assert!(NonEmptyValidator.validate("app_config_path", "config").is_ok());

        let error = NonEmptyValidator
            .validate("app_config_path", "  ")
            .unwrap_err();
        assert!(matches!(error, ConfigError::MissingRequired { ref field, .. } if field == "app_config_path"));
    }

    #[test]
    fn test_parsing_error_message() {
        let error = ConfigError::parsing("app.yaml", "bad indentation");
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration fragment 'app.yaml': bad indentation"
        );
    }
}
