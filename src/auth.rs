use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_PROFILE_NAME_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("profile name must be 1-{MAX_PROFILE_NAME_LEN} characters")]
    InvalidLength,
    #[error("profile name may not contain '{0}'")]
    InvalidCharacter(char),
    #[error("profile name may not start with '.'")]
    LeadingDot,
    #[error("not signed in")]
    NotSignedIn,
}

/// Stable key for a user's stored progress.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    pub display_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn(UserIdentity),
}

impl AuthState {
    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            AuthState::SignedOut => None,
            AuthState::SignedIn(user) => Some(user),
        }
    }
}

pub type AuthListener = Box<dyn FnMut(&AuthState) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Source of the signed-in identity.
///
/// Listeners are called once with the current state when registered, then on
/// every change until unsubscribed.
pub trait AuthProvider {
    fn current_user(&self) -> Option<UserIdentity>;

    fn on_auth_change(&mut self, listener: AuthListener) -> Subscription;

    fn unsubscribe(&mut self, subscription: Subscription) -> bool;
}

/// Validate a profile name and derive its user id (lowercased).
pub fn identity_for(name: &str) -> Result<UserIdentity, AuthError> {
    let name = name.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_PROFILE_NAME_LEN {
        return Err(AuthError::InvalidLength);
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(AuthError::InvalidCharacter(bad));
    }
    if name.starts_with('.') {
        return Err(AuthError::LeadingDot);
    }
    Ok(UserIdentity {
        id: UserId(name.to_ascii_lowercase()),
        display_name: name.to_string(),
    })
}

/// Local profiles: signing in is choosing a profile name on this machine.
#[derive(Default)]
pub struct LocalAuth {
    state: AuthState,
    listeners: Vec<(Subscription, AuthListener)>,
    next_id: u64,
}

impl LocalAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn sign_in(&mut self, name: &str) -> Result<UserIdentity, AuthError> {
        let identity = identity_for(name)?;
        if self.state.user() == Some(&identity) {
            return Ok(identity);
        }
        info!("signed in as {}", identity.id);
        self.state = AuthState::SignedIn(identity.clone());
        self.notify();
        Ok(identity)
    }

    pub fn sign_out(&mut self) -> Result<(), AuthError> {
        let AuthState::SignedIn(ref user) = self.state else {
            return Err(AuthError::NotSignedIn);
        };
        info!("signed out {}", user.id);
        self.state = AuthState::SignedOut;
        self.notify();
        Ok(())
    }

    fn notify(&mut self) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
    }
}

impl AuthProvider for LocalAuth {
    fn current_user(&self) -> Option<UserIdentity> {
        self.state.user().cloned()
    }

    fn on_auth_change(&mut self, mut listener: AuthListener) -> Subscription {
        let subscription = Subscription(self.next_id);
        self.next_id += 1;
        listener(&self.state);
        self.listeners.push((subscription, listener));
        subscription
    }

    fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != subscription);
        self.listeners.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<AuthState>>>, AuthListener) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: AuthListener =
            Box::new(move |state: &AuthState| sink.lock().unwrap().push(state.clone()));
        (seen, listener)
    }

    #[test]
    fn test_profile_name_rules() {
        let identity = identity_for("  Alice.Smith ").unwrap();
        assert_eq!(identity.id.as_str(), "alice.smith");
        assert_eq!(identity.display_name, "Alice.Smith");
        assert_eq!(identity_for(""), Err(AuthError::InvalidLength));
        assert_eq!(identity_for(&"x".repeat(33)), Err(AuthError::InvalidLength));
        assert_eq!(identity_for("a/b"), Err(AuthError::InvalidCharacter('/')));
        assert_eq!(identity_for(".."), Err(AuthError::LeadingDot));
    }

    #[test]
    fn test_listener_called_on_subscribe_and_changes() {
        let mut auth = LocalAuth::new();
        let (seen, listener) = recorder();
        auth.on_auth_change(listener);
        auth.sign_in("bob").unwrap();
        auth.sign_out().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], AuthState::SignedOut);
        assert_eq!(seen[1].user().map(|u| u.id.as_str()), Some("bob"));
        assert_eq!(seen[2], AuthState::SignedOut);
    }

    #[test]
    fn test_unsubscribed_listener_not_called() {
        let mut auth = LocalAuth::new();
        let (seen, listener) = recorder();
        let sub = auth.on_auth_change(listener);
        assert!(auth.unsubscribe(sub));
        assert!(!auth.unsubscribe(sub));
        auth.sign_in("carol").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_repeat_sign_in_does_not_notify() {
        let mut auth = LocalAuth::new();
        auth.sign_in("dave").unwrap();
        let (seen, listener) = recorder();
        auth.on_auth_change(listener);
        auth.sign_in("dave").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(auth.current_user().is_some());
        assert!(auth.sign_out().is_ok());
        assert_eq!(auth.sign_out(), Err(AuthError::NotSignedIn));
        assert!(auth.current_user().is_none());
    }
}
