use log::debug;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{BuilderError, Result};

const TOKEN_PARAM: &str = "circle-token";

pub struct CircleClient {
    client: Client,
    base_url: Url,
    token: Token,
}

impl CircleClient {
    pub fn new(base_url: &str, token: Token) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("circle-builder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BuilderError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Relative joins drop the last segment unless the base ends in '/'
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&base_url)
            .map_err(|e| BuilderError::Config(format!("Invalid base URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the absolute request URL with the query and the auth token.
    pub(super) fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| BuilderError::Config(format!("Invalid request path {path}: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair(TOKEN_PARAM, self.token.as_str());
        }

        Ok(url)
    }

    /// Sends one authenticated request and decodes the JSON response.
    ///
    /// Any status outside 2xx becomes [`BuilderError::Api`] carrying the
    /// response body.
    pub(super) async fn request<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path, query)?;
        debug!("{method} /{path}");

        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(BuilderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
