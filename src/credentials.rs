//! Session credentials consumed at dial and reconnect time.
//!
//! Obtaining and refreshing credentials is the responsibility of an
//! external REST client; the session only consumes the two accessor
//! values: the opaque authentication body and the ordered list of
//! candidate endpoints.

// ============================================================================
// Credentials
// ============================================================================

/// Connection credentials for one session lifecycle.
///
/// Implementors are typically the response objects of an external
/// session-start call. The session keeps the last-known credentials so a
/// close callback can decide whether to reconnect with them or with a
/// freshly negotiated set.
pub trait Credentials: Send + Sync {
    /// Opaque authentication body sent verbatim as the auth frame payload.
    fn auth_body(&self) -> &[u8];

    /// Candidate server endpoints, in the order they should be tried.
    fn endpoints(&self) -> &[String];
}

// ============================================================================
// StaticCredentials
// ============================================================================

/// Credentials from values the caller already holds.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    /// Authentication body bytes.
    auth_body: Vec<u8>,
    /// Candidate endpoints in preference order.
    endpoints: Vec<String>,
}

impl StaticCredentials {
    /// Creates credentials from an auth body and candidate endpoints.
    #[inline]
    #[must_use]
    pub fn new(auth_body: impl Into<Vec<u8>>, endpoints: Vec<String>) -> Self {
        Self {
            auth_body: auth_body.into(),
            endpoints,
        }
    }
}

impl Credentials for StaticCredentials {
    #[inline]
    fn auth_body(&self) -> &[u8] {
        &self.auth_body
    }

    #[inline]
    fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials_accessors() {
        let creds = StaticCredentials::new(
            br#"{"token":"abc"}"#.to_vec(),
            vec![
                "ws://primary.example:2243/sub".to_string(),
                "ws://backup.example:2243/sub".to_string(),
            ],
        );

        assert_eq!(creds.auth_body(), br#"{"token":"abc"}"#);
        assert_eq!(creds.endpoints().len(), 2);
        assert!(creds.endpoints()[0].contains("primary"));
    }
}
