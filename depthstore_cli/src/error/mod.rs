use crate::config::ENV_PREFIX;
use colored::*;
use depthstore_core::ErrorKind;
use std::error::Error as StdError;
use std::fmt;

/// CLI-specific error type with semantic exit codes
#[derive(Debug)]
pub struct CliError {
    /// The main error message
    message: String,

    /// Error category for exit code determination
    category: ErrorCategory,

    /// Additional context information
    context: Vec<(String, String)>,

    /// Suggestions for recovery
    pub suggestions: Vec<String>,

    /// Source error if any
    source: Option<Box<dyn StdError + Send + Sync>>,
}

/// Error categories that map to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    Network,
    Configuration,
    Credential,
    Conflict,
    NotFound,
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    NetworkError = 3,
    ConfigurationError = 4,
    CredentialError = 5,
    ConflictError = 6,
    NotFound = 7,
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for adding context to errors
pub trait ErrorContext {
    fn with_context(self, key: &str, value: &str) -> Self;
    fn with_suggestion(self, suggestion: &str) -> Self;
}

impl CliError {
    fn new(message: &str, category: ErrorCategory) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    /// Create a general error
    pub fn general(message: &str) -> Self {
        Self::new(message, ErrorCategory::General)
    }

    /// Create a command misuse error
    pub fn misuse(message: &str) -> Self {
        Self::new(message, ErrorCategory::Misuse)
            .with_suggestion("Run 'depthstore --help' for usage information")
    }

    /// Create a configuration error
    pub fn configuration(message: &str) -> Self {
        Self::new(message, ErrorCategory::Configuration)
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
            ErrorCategory::Network => ExitCode::NetworkError,
            ErrorCategory::Configuration => ExitCode::ConfigurationError,
            ErrorCategory::Credential => ExitCode::CredentialError,
            ErrorCategory::Conflict => ExitCode::ConflictError,
            ErrorCategory::NotFound => ExitCode::NotFound,
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::Network => "Network Error",
            ErrorCategory::Configuration => "Configuration Error",
            ErrorCategory::Credential => "Credential Error",
            ErrorCategory::Conflict => "Conflict",
            ErrorCategory::NotFound => "Not Found",
        }
    }

    /// Format the error for user display
    pub fn format_for_user(&self, debug: bool) -> String {
        let mut output = String::new();

        let prefix = match self.category {
            ErrorCategory::Misuse | ErrorCategory::NotFound => self.label().yellow(),
            _ => self.label().red(),
        };
        output.push_str(&format!("{}: {}\n", prefix, self.message));

        if !self.context.is_empty() {
            output.push_str("\nContext:\n");
            for (key, value) in &self.context {
                output.push_str(&format!("  {}: {}\n", key.bold(), value));
            }
        }

        // Error chain in debug mode
        if debug && let Some(source) = &self.source {
            output.push_str("\nCaused by:\n");
            let mut current: Option<&dyn StdError> = Some(source.as_ref());
            let mut level = 1;

            while let Some(err) = current {
                output.push_str(&format!("  {level}: {err}\n"));
                current = err.source();
                level += 1;
            }
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                output.push_str(&format!("  - {suggestion}\n"));
            }
        }

        output
    }
}

/// Environment variable that overrides a dotted configuration key
pub fn env_var_for(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.to_uppercase().replace('.', "__"))
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;

        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }

        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorContext for CliError {
    fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }
}

impl From<depthstore_core::Error> for CliError {
    fn from(error: depthstore_core::Error) -> Self {
        use depthstore_core::Error;

        let kind = error.kind();
        let category = match kind {
            ErrorKind::ConfigurationMissing | ErrorKind::InvalidConfiguration => {
                ErrorCategory::Configuration
            }
            ErrorKind::SecretUnavailable | ErrorKind::AuthenticationRejected => {
                ErrorCategory::Credential
            }
            ErrorKind::TransportUnreachable => ErrorCategory::Network,
            ErrorKind::ProvisioningConflict | ErrorKind::DuplicateId | ErrorKind::IdMismatch => {
                ErrorCategory::Conflict
            }
            ErrorKind::NotFound => ErrorCategory::NotFound,
            ErrorKind::Store => ErrorCategory::General,
        };

        let mut cli_error = Self::new(&error.to_string(), category);
        match &error {
            Error::ConfigurationMissing { key } => {
                cli_error = cli_error
                    .with_context("key", key)
                    .with_suggestion(&format!(
                        "Set '{key}' in the config file or export {}",
                        env_var_for(key)
                    ));
            }
            Error::SecretUnavailable {
                vault_address,
                secret_name,
                ..
            } => {
                cli_error = cli_error
                    .with_context("vault", vault_address)
                    .with_context("secret", secret_name);
            }
            Error::ProvisioningConflict { resource, .. } => {
                cli_error = cli_error.with_context("resource", resource);
            }
            _ => {}
        }

        let remediation = kind.remediation();
        let mut chars = remediation.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        };
        cli_error.suggestions.push(capitalized);
        cli_error.source = Some(Box::new(error));
        cli_error
    }
}

/// Convert anyhow errors to CLI errors
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        Self::general(&format!("{error:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthstore_core::Error;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let cases = [
            (Error::configuration_missing("cosmosdb.simple_key"), ExitCode::ConfigurationError),
            (Error::secret_unavailable("file:///v", "s", "down"), ExitCode::CredentialError),
            (Error::authentication_rejected("bad key"), ExitCode::CredentialError),
            (Error::transport_unreachable("dns"), ExitCode::NetworkError),
            (Error::duplicate_id("1"), ExitCode::ConflictError),
            (Error::id_mismatch("1", "2"), ExitCode::ConflictError),
            (Error::not_found("1"), ExitCode::NotFound),
            (Error::store("odd"), ExitCode::GeneralError),
        ];
        for (error, code) in cases {
            assert_eq!(CliError::from(error).exit_code(), code);
        }
    }

    #[test]
    fn test_missing_key_suggests_env_var() {
        let err = CliError::from(Error::configuration_missing("cosmosdb.simple_key"));
        assert!(
            err.suggestions
                .iter()
                .any(|s| s.contains("DEPTHSTORE_COSMOSDB__SIMPLE_KEY"))
        );
        assert!(err.to_string().contains("key: cosmosdb.simple_key"));
    }

    #[test]
    fn test_format_includes_cause_only_in_debug() {
        let err = CliError::from(Error::transport_unreachable("connection refused"));
        assert!(err.format_for_user(true).contains("Caused by"));
        assert!(!err.format_for_user(false).contains("Caused by"));
    }

    #[test]
    fn test_env_var_for() {
        assert_eq!(env_var_for("keyvault.address"), "DEPTHSTORE_KEYVAULT__ADDRESS");
    }
}
