use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, TOKEN_CACHE_HITS,
    TOKEN_FETCH_ERRORS, TOKEN_FETCHES,
};
use crate::sse::{CompletionStream, process_lines};
use crate::store::CompletionBackend;
use crate::token::TokenCache;
use crate::types::{CompletionRequest, CompletionResponse, TokenResponse};

/// Client for the ERNIE completion API.
///
/// Cloning is cheap and clones share the HTTP connection pool and the [`TokenCache`].
#[derive(Debug, Clone)]
pub struct Ernie {
    config: ClientConfig,
    client: ReqwestClient,
    tokens: Arc<TokenCache>,
}

impl Ernie {
    /// Create a new client with its own token cache.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_token_cache(config, Arc::new(TokenCache::new()))
    }

    /// Create a new client configured from the environment.
    ///
    /// Missing variables are not an error here; requests that need them fail instead.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Create a new client that shares `tokens` with its caller.
    pub fn with_token_cache(config: ClientConfig, tokens: Arc<TokenCache>) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            config,
            client,
            tokens,
        })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The token cache backing this client.
    pub fn token_cache(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    fn timeout_secs(&self) -> Option<f64> {
        Some(self.config.timeout.as_secs_f64())
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Return a bearer credential, exchanging client credentials if the cache has none.
    ///
    /// One exchange is attempted per call.  Failures are never cached.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.tokens.get() {
            TOKEN_CACHE_HITS.click();
            return Ok(token);
        }
        self.fetch_access_token()
            .await
            .inspect_err(|e| {
                TOKEN_FETCH_ERRORS.click();
                tracing::warn!(error = %e, "access token exchange failed");
            })
    }

    async fn fetch_access_token(&self) -> Result<String> {
        let url = self.config.token_url()?;
        let api_key = self.config.require_api_key()?;
        let secret_key = self.config.require_secret_key()?;

        TOKEN_FETCHES.click();
        tracing::info!("requesting access token");
        let response = self
            .client
            .post(url)
            .headers(self.default_headers())
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", api_key),
                ("client_secret", secret_key),
            ])
            .send()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout_secs()))?;

        let status = response.status();
        let status_code = status.as_u16();
        let body = response.text().await.map_err(|e| {
            Error::authentication(
                format!("failed to read token response: {e}"),
                Some(status_code),
            )
        })?;
        let parsed = serde_json::from_str::<TokenResponse>(&body);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|grant| grant.error_message().map(String::from))
                .unwrap_or_else(|| format!("token request failed: {status}"));
            return Err(Error::authentication(message, Some(status_code)));
        }

        let grant = parsed.map_err(|e| {
            Error::authentication(format!("malformed token response: {e}"), Some(status_code))
        })?;
        match (grant.access_token.as_deref(), grant.expires_in) {
            (Some(token), Some(expires_in)) if !token.is_empty() => {
                tracing::debug!(expires_in, "access token granted");
                self.tokens.store(token, expires_in).ok_or_else(|| {
                    Error::authentication(
                        format!("invalid expires_in in token response: {expires_in}"),
                        Some(status_code),
                    )
                })
            }
            _ => {
                let message = grant
                    .error_message()
                    .map(String::from)
                    .unwrap_or_else(|| "token response missing access_token or expires_in".to_string());
                Err(Error::authentication(message, Some(status_code)))
            }
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();
        let fallback = format!("API request failed: {status}");

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(_) => return Error::api(Some(status_code), None, fallback),
        };
        tracing::debug!(status = status_code, body = %error_body, "completion request failed");

        let parsed = serde_json::from_str::<CompletionResponse>(&error_body).ok();
        let error_code = parsed.as_ref().and_then(|p| p.error_code);
        let message = parsed
            .and_then(|p| p.error_msg)
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback);
        Error::api(Some(status_code), error_code, message)
    }

    /// Acquire a token and post a single-turn completion request.
    async fn post_completion(&self, text: &str, stream: bool) -> Result<Response> {
        let token = self.access_token().await?;
        let url = self.config.completion_url()?;
        let request = CompletionRequest::single_turn(
            text,
            stream,
            self.config.user_id.clone(),
            self.config.temperature,
        );

        let mut headers = self.default_headers();
        if stream {
            headers.insert(
                header::ACCEPT,
                HeaderValue::from_static("text/event-stream"),
            );
        }

        CLIENT_REQUESTS.click();
        tracing::debug!(stream, chars = text.chars().count(), "sending completion request");
        let response = self
            .client
            .post(url)
            .headers(headers)
            .query(&[("access_token", token.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout_secs()))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    /// Send `text` and return the assistant's complete reply.
    pub async fn complete(&self, text: &str) -> Result<String> {
        let start = Instant::now();
        let result = self.complete_inner(text).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            CLIENT_REQUEST_ERRORS.click();
            tracing::warn!(error = %e, "completion failed");
        }
        result
    }

    async fn complete_inner(&self, text: &str) -> Result<String> {
        let response = self.post_completion(text, false).await?;
        let status_code = response.status().as_u16();
        let body = response.json::<CompletionResponse>().await.map_err(|e| {
            Error::api(
                Some(status_code),
                None,
                format!("malformed completion response: {e}"),
            )
        })?;

        if let Some(code) = body.error_code {
            let message = body
                .error_msg
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "request failed".to_string());
            return Err(Error::api(Some(status_code), Some(code), message));
        }
        body.result.ok_or_else(|| {
            Error::api(
                Some(status_code),
                None,
                "completion response missing result",
            )
        })
    }

    /// Send `text` and return the reply as a lazy stream of text fragments.
    ///
    /// The stream ends at end-of-data or as soon as `cancel` fires; cancellation is not an
    /// error.  Malformed lines are skipped.
    pub async fn stream(&self, text: &str, cancel: CancellationToken) -> Result<CompletionStream> {
        if cancel.is_cancelled() {
            let empty: CompletionStream = Box::pin(stream::empty());
            return Ok(empty);
        }
        let response = self.post_completion(text, true).await.inspect_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            tracing::warn!(error = %e, "streaming completion failed");
        })?;
        Ok(process_lines(response.bytes_stream(), cancel))
    }

    /// Send `text` and hand every fragment of the reply to `on_chunk` as it arrives.
    ///
    /// Returns `Ok(())` when the stream ends, including when it ends because `cancel` fired.
    pub async fn stream_to<F>(&self, text: &str, cancel: CancellationToken, mut on_chunk: F) -> Result<()>
    where
        F: FnMut(&str),
    {
        let mut fragments = self.stream(text, cancel).await?;
        while let Some(fragment) = fragments.next().await {
            on_chunk(&fragment?);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CompletionBackend for Ernie {
    async fn complete(&self, text: &str) -> Result<String> {
        Ernie::complete(self, text).await
    }

    async fn stream(&self, text: &str, cancel: CancellationToken) -> Result<CompletionStream> {
        Ernie::stream(self, text, cancel).await
    }
}
