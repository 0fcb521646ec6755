use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;

use crate::{AuthorizeError, Authorizer};

/// Default bound on a single policy request.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct DecisionRequest<'a> {
    token: &'a str,
    resource: &'a str,
    action: &'a str,
}

/// Delegates decisions to an HTTP policy decision endpoint.
///
/// Each call POSTs `{"token", "resource", "action"}` as JSON to the endpoint.
/// A 2xx response allows the request, 401 and 403 deny it, and any other
/// status or transport failure is reported as
/// [`AuthorizeError::Unavailable`].
#[derive(Debug, Clone)]
pub struct RemoteAuthorizer {
    client: Client,
    endpoint: Url,
}

impl RemoteAuthorizer {
    /// Create an authorizer with its own client bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be initialized.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Create an authorizer that shares an existing client.
    #[must_use]
    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// The policy decision endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Authorizer for RemoteAuthorizer {
    async fn authorize(
        &self,
        token: &str,
        resource: &str,
        action: &str,
    ) -> Result<(), AuthorizeError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&DecisionRequest {
                token,
                resource,
                action,
            })
            .send()
            .await
            .map_err(|error| {
                tracing::warn!(endpoint = %self.endpoint, %error, "policy request failed");
                AuthorizeError::unavailable(error.to_string())
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => Err(
                AuthorizeError::denied(format!("policy service responded {status}")),
            ),
            status => {
                tracing::warn!(endpoint = %self.endpoint, %status, "unexpected policy response");
                Err(AuthorizeError::unavailable(format!(
                    "policy service responded {status}"
                )))
            }
        }
    }
}
