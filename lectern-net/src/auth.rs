// lectern-net/src/auth.rs
use lectern_common::config::Config;
use reqwest::RequestBuilder;

/// Session-scoped API credentials. Constructed once at session start from
/// the config and passed into every remote call; immutable for the session.
#[derive(Debug, Clone, Default)]
pub struct ApiCredentials {
    token: Option<String>,
}

impl ApiCredentials {
    pub fn from_config(config: &Config) -> Self {
        Self {
            token: config.github_token.clone(),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Attaches the credential to an outgoing request, if one is configured.
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}
