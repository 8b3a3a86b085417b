use charmrepo_utils::error::PathError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(charmrepo_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(charmrepo_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Invalid store URL: {0}")]
    #[diagnostic(
        code(charmrepo_config::invalid_store_url),
        help("The store URL must be an absolute http or https URL")
    )]
    InvalidStoreUrl(String),

    #[error("Invalid duration: {0}")]
    #[diagnostic(
        code(charmrepo_config::invalid_duration),
        help("Use a duration such as `30s`, `5m` or `1h30m`")
    )]
    InvalidDuration(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(charmrepo_config::io))]
    IoError(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    #[diagnostic(
        code(charmrepo_config::path),
        help("Check that referenced environment variables are set")
    )]
    Path(#[from] PathError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::InvalidStoreUrl("ftp://nope".to_string());
        assert_eq!(err.to_string(), "Invalid store URL: ftp://nope");

        let err = ConfigError::Path(PathError::Empty);
        assert_eq!(err.to_string(), "Invalid path: Path is empty");
    }
}
