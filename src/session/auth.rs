//! Authorization gate.
//!
//! Tracks the last known authorization verdict for the developer credential.
//! The cached state answers synchronous checks; the transport's asynchronous
//! verdicts are the only thing that moves it.

/// Cached authorization state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationState {
    Unauthorized,
    Authorized,
    /// The transport rejected the credential with a reason.
    Error(String),
}

/// Gate over the accessory API.
#[derive(Debug, Default)]
pub struct AuthGate {
    state: AuthorizationState,
}

impl Default for AuthorizationState {
    fn default() -> Self {
        AuthorizationState::Unauthorized
    }
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self.state, AuthorizationState::Authorized)
    }

    pub fn state(&self) -> &AuthorizationState {
        &self.state
    }

    /// Explanation attached to a negative synchronous answer.
    pub fn denial_reason(&self) -> String {
        match &self.state {
            AuthorizationState::Error(reason) => reason.clone(),
            _ => "accessory API is not authorized".to_string(),
        }
    }

    /// Apply a transport authorization verdict.
    pub fn apply_result(&mut self, authorized: bool, reason: Option<String>) {
        self.state = if authorized {
            AuthorizationState::Authorized
        } else {
            match reason {
                Some(reason) => AuthorizationState::Error(reason),
                None => AuthorizationState::Unauthorized,
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unauthorized() {
        let gate = AuthGate::new();
        assert!(!gate.is_authorized());
        assert_eq!(gate.state(), &AuthorizationState::Unauthorized);
    }

    #[test]
    fn test_positive_verdict_authorizes() {
        let mut gate = AuthGate::new();
        gate.apply_result(true, None);
        assert!(gate.is_authorized());
    }

    #[test]
    fn test_negative_verdict_keeps_reason() {
        let mut gate = AuthGate::new();
        gate.apply_result(false, Some("bad key".into()));
        assert!(!gate.is_authorized());
        assert_eq!(gate.denial_reason(), "bad key");

        // A later success clears the error.
        gate.apply_result(true, None);
        assert!(gate.is_authorized());
    }
}
