//! Provider API keys in the OS keychain.

use keyring::Entry;

const SERVICE_NAME: &str = "agent-chat";

fn entry(provider: &str) -> keyring::Result<Entry> {
    Entry::new(SERVICE_NAME, &format!("{provider}-api-key"))
}

/// Store a key for `provider`, replacing any previous one.
pub fn store_api_key(provider: &str, api_key: &str) -> anyhow::Result<()> {
    let api_key = api_key.trim();
    anyhow::ensure!(!api_key.is_empty(), "API key cannot be empty");

    entry(provider)?.set_password(api_key)?;
    tracing::debug!(provider, "stored API key in keychain");
    Ok(())
}

/// Look up a stored key. Any keychain failure reads as "no key".
pub fn get_api_key(provider: &str) -> Option<String> {
    entry(provider)
        .ok()?
        .get_password()
        .ok()
        .filter(|key| !key.is_empty())
}

/// Remove the stored key. `false` when there was none.
pub fn delete_api_key(provider: &str) -> anyhow::Result<bool> {
    match entry(provider)?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_rejected_before_the_keychain() {
        let err = store_api_key("agent-chat-test-blank", "  \n").unwrap_err();
        assert_eq!(err.to_string(), "API key cannot be empty");
    }

    #[test]
    fn keychain_roundtrip() {
        let provider = "agent-chat-test-provider";

        let _ = delete_api_key(provider);

        if store_api_key(provider, " test-api-key-12345\n").is_err() {
            eprintln!("Keychain not available in test environment, skipping");
            return;
        }

        let Some(stored) = get_api_key(provider) else {
            eprintln!("Keychain read failed (mock backend?), skipping");
            return;
        };
        assert_eq!(stored, "test-api-key-12345");

        assert!(delete_api_key(provider).expect("should delete key"));
        assert_eq!(get_api_key(provider), None);
    }
}
