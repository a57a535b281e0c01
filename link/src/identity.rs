//! Client identity: the id sent to the server and the display name used in
//! outbound messages.

use rand::distr::Alphanumeric;
use rand::Rng;

const ID_SUFFIX_LEN: usize = 9;

/// Who this client is, as far as the party service is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub client_id: String,
    pub username: String,
}

impl Identity {
    /// Fresh identity with a random id under `prefix` and the derived
    /// default username.
    pub fn generate(prefix: &str) -> Self {
        Self::from_client_id(generate_client_id(prefix))
    }

    pub fn from_client_id(client_id: impl Into<String>) -> Self {
        let client_id = client_id.into();
        let username = default_username(&client_id);
        Self {
            client_id,
            username,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }
}

/// `<prefix>_` followed by 9 lowercase base-36 characters.
pub fn generate_client_id(prefix: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .map(|b| (b as char).to_ascii_lowercase())
        .take(ID_SUFFIX_LEN)
        .collect();
    format!("{}_{}", prefix, suffix)
}

/// `User_` plus the last four characters of the id.
pub fn default_username(client_id: &str) -> String {
    let chars: Vec<char> = client_id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("User_{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_shape() {
        let id = generate_client_id("client");
        let suffix = id.strip_prefix("client_").unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(generate_client_id("client"), id);
    }

    #[test]
    fn test_default_username_uses_last_four() {
        assert_eq!(default_username("user_k3j9x2a7q"), "User_2a7q");
        assert_eq!(default_username("ab"), "User_ab");
        let identity = Identity::from_client_id("user_000001234");
        assert_eq!(identity.username, "User_1234");
        assert_eq!(identity.with_username("Mage").username, "Mage");
    }
}
