//! Submission of a confirmed profile to the registration API.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::RegistrationError;
use crate::registration::model::UserProfile;

/// Path of the registration endpoint under the API base URL.
pub const REGISTER_PATH: &str = "/api/auth/register";

/// Creates an account from a completed profile.
#[async_trait]
pub trait RegistrationSubmitter: Send + Sync {
    /// Submit `profile` once. Returns the profile the service stored.
    async fn register(&self, profile: &UserProfile) -> Result<UserProfile, RegistrationError>;
}

/// JSON-over-HTTP registration client.
pub struct HttpRegistrationClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRegistrationClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            endpoint: format!("{}{REGISTER_PATH}", base_url.trim_end_matches('/')),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RegistrationSubmitter for HttpRegistrationClient {
    async fn register(&self, profile: &UserProfile) -> Result<UserProfile, RegistrationError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(profile)
            .send()
            .await
            .map_err(|e| RegistrationError::Transport {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| RegistrationError::Transport {
            reason: format!("reading response body: {e}"),
        })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Registration rejected");
            return Err(RegistrationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let registered: UserProfile = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(_) => return Err(RegistrationError::InvalidResponse { body }),
        };
        if registered.user_name.is_none() {
            return Err(RegistrationError::InvalidResponse { body });
        }

        info!(
            user_name = registered.user_name.as_deref().unwrap_or_default(),
            "Registration accepted"
        );
        Ok(registered)
    }
}

/// Reply after a successful registration. The password comes from the
/// submitted profile; the service never echoes it back.
pub fn success_message(registered: &UserProfile, submitted: &UserProfile) -> String {
    format!(
        "Registration complete. Your username is {} and your password is {}.",
        registered.user_name.as_deref().unwrap_or_default(),
        submitted.password.as_deref().unwrap_or_default(),
    )
}

/// Reply after a failed registration.
pub fn failure_message(err: &RegistrationError) -> String {
    format!("Registration failed: {}", err.diagnostic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url() {
        assert_eq!(
            HttpRegistrationClient::new("http://localhost:5000").endpoint(),
            "http://localhost:5000/api/auth/register"
        );
        assert_eq!(
            HttpRegistrationClient::new("https://api.example.com/").endpoint(),
            "https://api.example.com/api/auth/register"
        );
    }

    #[test]
    fn success_message_uses_submitted_password() {
        let registered = UserProfile {
            user_name: Some("bob1".to_string()),
            ..Default::default()
        };
        let submitted = UserProfile {
            user_name: Some("bob".to_string()),
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            success_message(&registered, &submitted),
            "Registration complete. Your username is bob1 and your password is hunter2."
        );
    }

    #[test]
    fn failure_message_shows_body_or_unknown() {
        let rejected = RegistrationError::Rejected {
            status: 400,
            body: "Username already exists".to_string(),
        };
        assert_eq!(
            failure_message(&rejected),
            "Registration failed: Username already exists"
        );

        let empty = RegistrationError::InvalidResponse {
            body: String::new(),
        };
        assert_eq!(failure_message(&empty), "Registration failed: unknown");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = HttpRegistrationClient::new(&format!("http://127.0.0.1:{port}"));
        let err = client.register(&UserProfile::default()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Transport { .. }));
        assert_eq!(failure_message(&err), "Registration failed: unknown");
    }
}
