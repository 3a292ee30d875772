use serde::{Deserialize, Serialize};

const DEFAULT_USERNAME: &str = "Player";
const OFFLINE_UUID: &str = "00000000-0000-0000-0000-000000000000";
const OFFLINE_SESSION: &str = "offline_session";
const LEGACY_USERNAME_MAX: usize = 16;

/// Identity handed to the client on its command line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LaunchAccountProfile {
    pub username: String,
    pub session: String,
    pub uuid: String,
}

impl Default for LaunchAccountProfile {
    fn default() -> Self {
        Self::offline(DEFAULT_USERNAME)
    }
}

impl LaunchAccountProfile {
    pub fn offline(username: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            session: OFFLINE_SESSION.into(),
            uuid: OFFLINE_UUID.into(),
        }
    }

    pub fn sanitized(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = DEFAULT_USERNAME.into();
        }
        if self.session.trim().is_empty() {
            self.session = OFFLINE_SESSION.into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = OFFLINE_UUID.into();
        }
        self
    }
}

/// Username as pre-modern clients accept it.
///
/// Anything outside `[A-Za-z0-9_]` becomes `_` (one for one), the result is
/// cut to 16 characters, and an empty result falls back to `Player`.
pub fn sanitize_legacy_username(raw: &str) -> String {
    let sanitized: String = raw
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .take(LEGACY_USERNAME_MAX)
        .collect();

    if sanitized.is_empty() {
        DEFAULT_USERNAME.to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_username_replaces_invalid_characters() {
        assert_eq!(sanitize_legacy_username("Ivan Petrov!"), "Ivan_Petrov_");
    }

    #[test]
    fn legacy_username_is_truncated_to_sixteen() {
        assert_eq!(
            sanitize_legacy_username("abcdefghijklmnopqrstuvwxyz"),
            "abcdefghijklmnop"
        );
    }

    #[test]
    fn legacy_username_falls_back_when_empty() {
        assert_eq!(sanitize_legacy_username("   "), "Player");
        assert_eq!(sanitize_legacy_username("Ёж"), "__");
    }

    #[test]
    fn sanitized_profile_fills_blank_fields() {
        let profile = LaunchAccountProfile {
            username: " ".into(),
            session: String::new(),
            uuid: String::new(),
        }
        .sanitized();
        assert_eq!(profile.username, "Player");
        assert_eq!(profile.session, OFFLINE_SESSION);
        assert_eq!(profile.uuid, OFFLINE_UUID);
    }
}
