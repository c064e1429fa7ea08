use tracing::debug;

/// Resolve a credential value. If the value starts with '$', treat it as an
/// environment variable reference and resolve from the environment.
pub fn resolve_credential(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        match std::env::var(var_name) {
            Ok(resolved) => {
                debug!(var = %var_name, "Resolved credential from environment");
                resolved
            }
            Err(_) => {
                debug!(var = %var_name, "Environment variable not set");
                String::new()
            }
        }
    } else {
        value.to_string()
    }
}

/// Redact secrets from text that may end up in logs or error messages.
pub fn redact_credentials(text: &str, secrets: &[&str]) -> String {
    let mut result = text.to_string();
    for secret in secrets {
        if !secret.is_empty() && secret.len() >= 4 {
            result = result.replace(secret, "[REDACTED]");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_credential_literal() {
        assert_eq!(resolve_credential("vt-key-123"), "vt-key-123");
    }

    #[test]
    fn test_resolve_credential_env_var() {
        std::env::set_var("TEST_TRUSTLENS_CRED", "secret123");
        assert_eq!(resolve_credential("$TEST_TRUSTLENS_CRED"), "secret123");
        std::env::remove_var("TEST_TRUSTLENS_CRED");
    }

    #[test]
    fn test_resolve_credential_missing_env_var_is_empty() {
        assert_eq!(resolve_credential("$NONEXISTENT_TRUSTLENS_VAR"), "");
    }

    #[test]
    fn test_redact_credentials() {
        let text = "POST failed for key=S3cretKey and id=abc";
        let redacted = redact_credentials(text, &["S3cretKey", "abc"]);
        assert!(redacted.contains("[REDACTED]"));
        assert!(!redacted.contains("S3cretKey"));
        // too short to redact
        assert!(redacted.contains("abc"));
    }
}
