use tracing::debug;

use crate::errors::HookscanError;

/// Resolve a credential value. A leading '$' marks an environment variable
/// reference; the variable must be set, since a literal `$TYPO` string must
/// never end up used as the secret itself.
pub fn resolve_credential(value: &str) -> Result<String, HookscanError> {
    let Some(var_name) = value.strip_prefix('$') else {
        return Ok(value.to_string());
    };
    match std::env::var(var_name) {
        Ok(resolved) => {
            debug!(var = %var_name, "Resolved credential from environment");
            Ok(resolved)
        }
        Err(_) => Err(HookscanError::Config(format!(
            "credential references unset environment variable {}",
            var_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_credential_literal() {
        assert_eq!(resolve_credential("plain-secret").unwrap(), "plain-secret");
    }

    #[test]
    fn test_resolve_credential_from_env() {
        std::env::set_var("HOOKSCAN_TEST_SECRET", "from-env");
        assert_eq!(resolve_credential("$HOOKSCAN_TEST_SECRET").unwrap(), "from-env");
        std::env::remove_var("HOOKSCAN_TEST_SECRET");
    }

    #[test]
    fn test_resolve_credential_unset_env_is_config_error() {
        let err = resolve_credential("$HOOKSCAN_DEFINITELY_UNSET_VAR").unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_empty_value_passes_through() {
        assert_eq!(resolve_credential("").unwrap(), "");
    }
}
