use serde::{Deserialize, Serialize};

/// Avatar URIs by size; providers fill in whatever they offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarInfo {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
}

/// Provider-independent user profile.
///
/// # Example
/// ```
/// use oauth_relay::provider::UserInfo;
///
/// let info = UserInfo {
///     id: "1234".to_string(),
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(info.full_name(), "Ada Lovelace");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub avatar: AvatarInfo,
    /// Stamped by the client after parsing.
    pub provider_name: String,
}

impl UserInfo {
    pub fn full_name(&self) -> String {
        [self.first_name.as_str(), self.last_name.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Split a display name into first and last name on the first space.
pub(crate) fn split_name(full: &str) -> (String, String) {
    match full.trim().split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (full.trim().to_string(), String::new()),
    }
}
