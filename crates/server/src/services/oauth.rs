//! OAuth 2.0 clients for Google and Facebook sign-in.
//!
//! # OAuth Flow
//!
//! 1. Generate authorization URL with `authorization_url()`
//! 2. Redirect the user to the provider's consent page
//! 3. The provider redirects back with an authorization code
//! 4. Exchange the code for an access token with `exchange_code()`
//! 5. Read the user's identity with `fetch_profile()`

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use dishdash_core::AuthProvider;

use crate::config::OAuthClientConfig;

/// Errors talking to an identity provider.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the code exchange.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The profile request failed or returned unusable data.
    #[error("profile request failed: {0}")]
    Profile(String),

    /// Email/password is not an OAuth provider.
    #[error("{0} is not an OAuth provider")]
    UnsupportedProvider(AuthProvider),
}

/// Endpoints and scope of an identity provider.
#[derive(Debug, Clone, Copy)]
struct Endpoints {
    authorize: &'static str,
    token: &'static str,
    profile: &'static str,
    scope: &'static str,
}

const GOOGLE: Endpoints = Endpoints {
    authorize: "https://accounts.google.com/o/oauth2/v2/auth",
    token: "https://oauth2.googleapis.com/token",
    profile: "https://openidconnect.googleapis.com/v1/userinfo",
    scope: "openid email profile",
};

const FACEBOOK: Endpoints = Endpoints {
    authorize: "https://www.facebook.com/v19.0/dialog/oauth",
    token: "https://graph.facebook.com/v19.0/oauth/access_token",
    profile: "https://graph.facebook.com/v19.0/me?fields=id,name,email",
    scope: "email public_profile",
};

/// Identity returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    /// Stable provider-side user ID.
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: String,
    email: Option<String>,
    name: Option<String>,
}

/// Client for one identity provider.
#[derive(Clone)]
pub struct OAuthClient {
    inner: Arc<OAuthClientInner>,
}

struct OAuthClientInner {
    client: reqwest::Client,
    provider: AuthProvider,
    endpoints: Endpoints,
    client_id: String,
    client_secret: SecretString,
}

impl OAuthClient {
    /// Create a client for `provider`.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::UnsupportedProvider` for `AuthProvider::Email`.
    pub fn new(provider: AuthProvider, config: &OAuthClientConfig) -> Result<Self, OAuthError> {
        let endpoints = match provider {
            AuthProvider::Google => GOOGLE,
            AuthProvider::Facebook => FACEBOOK,
            AuthProvider::Email => return Err(OAuthError::UnsupportedProvider(provider)),
        };

        Ok(Self {
            inner: Arc::new(OAuthClientInner {
                client: reqwest::Client::new(),
                provider,
                endpoints,
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            }),
        })
    }

    #[must_use]
    pub fn provider(&self) -> AuthProvider {
        self.inner.provider
    }

    /// Generate the authorization URL to redirect the user to.
    ///
    /// # Arguments
    ///
    /// * `redirect_uri` - The callback URL registered with the provider
    /// * `state` - A random string stored in the session to prevent CSRF attacks
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.inner.endpoints.authorize,
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(self.inner.endpoints.scope),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange fails.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .inner
            .client
            .post(self.inner.endpoints.token)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(provider = %self.inner.provider, %status, body = %text, "OAuth token exchange rejected");
            return Err(OAuthError::TokenExchange(format!("provider returned {status}")));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Fetch the signed-in user's identity.
    ///
    /// Google emails that are not verified are dropped so they cannot be
    /// used to take over an existing account.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile request fails.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<OAuthProfile, OAuthError> {
        let response = self
            .inner
            .client
            .get(self.inner.endpoints.profile)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OAuthError::Profile(format!(
                "provider returned {}",
                response.status()
            )));
        }

        match self.inner.provider {
            AuthProvider::Google => {
                let info: GoogleUserInfo = response.json().await?;
                Ok(OAuthProfile {
                    subject: info.sub,
                    email: info.email.filter(|_| info.email_verified.unwrap_or(false)),
                    name: info.name,
                })
            }
            AuthProvider::Facebook => {
                let user: FacebookUser = response.json().await?;
                Ok(OAuthProfile {
                    subject: user.id,
                    email: user.email,
                    name: user.name,
                })
            }
            AuthProvider::Email => Err(OAuthError::UnsupportedProvider(self.inner.provider)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> OAuthClientConfig {
        OAuthClientConfig {
            client_id: "client id/1".to_string(),
            client_secret: SecretString::from("s3cr3t-value"),
        }
    }

    #[test]
    fn test_google_authorization_url() {
        let client = OAuthClient::new(AuthProvider::Google, &config()).unwrap();
        let url = client.authorization_url("https://api.dishdash.test/api/auth/google/callback", "xyz");

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client%20id%2F1"));
        assert!(url.contains(
            "redirect_uri=https%3A%2F%2Fapi.dishdash.test%2Fapi%2Fauth%2Fgoogle%2Fcallback"
        ));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("response_type=code"));
        assert!(!url.contains("s3cr3t"));
    }

    #[test]
    fn test_facebook_authorization_url() {
        let client = OAuthClient::new(AuthProvider::Facebook, &config()).unwrap();
        let url = client.authorization_url("https://x.test/cb", "abc");
        assert!(url.starts_with("https://www.facebook.com/"));
        assert!(url.contains("scope=email%20public_profile"));
        assert_eq!(client.provider(), AuthProvider::Facebook);
    }

    #[test]
    fn test_email_is_not_an_oauth_provider() {
        assert!(matches!(
            OAuthClient::new(AuthProvider::Email, &config()),
            Err(OAuthError::UnsupportedProvider(AuthProvider::Email))
        ));
    }
}
