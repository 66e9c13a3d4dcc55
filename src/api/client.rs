//! Pinterest HTTP client.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use tokio::time::sleep;
use url::Url;

use crate::api::source::FeedSource;
use crate::api::trace::{generate_trace_id, request_timestamp};
use crate::api::types::{FeedQuery, ResourceEnvelope, ResourceResponse, SessionConfig};
use crate::config::{RetryConfig, SiteConfig};
use crate::error::{AcquisitionError, Error, FeedError, Result};
use crate::media::locator::{find_app_version, find_user_id};

/// Path of the paged user pins resource.
const USER_PINS_RESOURCE: &str = "/resource/UserActivityPinsResource/get/";

/// Client hint sent with resource requests.
const CH_UA_FULL_VERSION_LIST: &str =
    "\"Google Chrome\";v=\"135.0.7049.115\", \"Not-A.Brand\";v=\"8.0.0.0\", \"Chromium\";v=\"135.0.7049.115\"";

/// Anonymous Pinterest client with bounded retry.
pub struct PinterestApi {
    client: Client,
    host: Url,
    accept_language: String,
    retry: RetryConfig,
}

impl PinterestApi {
    /// Create a new API client.
    pub fn new(site: &SiteConfig, retry: RetryConfig) -> Result<Self> {
        let host = Url::parse(&site.host)?;

        let client = Client::builder()
            .user_agent(&site.user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            host,
            accept_language: site.accept_language.clone(),
            retry,
        })
    }

    /// Site root all relative paths are resolved against.
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Send a GET built by `build`, retrying transient failures.
    ///
    /// `build` runs once per attempt so per-request headers are regenerated.
    async fn send<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> Result<RequestBuilder>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            tracing::debug!("GET {} (attempt {}/{})", url, attempt, max_attempts);

            let error = match build()?.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => Error::Status {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                },
                Err(e) => Error::Http(e),
            };

            if !error.is_retryable() || attempt >= max_attempts {
                return Err(error);
            }

            let delay = self.retry.delay_for(attempt);
            tracing::warn!(
                "GET {} failed ({}), retrying in {:?} ({}/{})",
                url,
                error,
                delay,
                attempt,
                max_attempts
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Fetch a page, manifest, or any other text resource.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send(url, || Ok(self.client.get(url))).await?;
        Ok(response.text().await?)
    }

    /// Start a streaming download of a media file.
    pub async fn download_file(&self, url: &str) -> Result<Response> {
        self.send(url, || Ok(self.client.get(url)))
            .await
            .map_err(|e| match e {
                Error::Status { url, status } => AcquisitionError::NoResponse { url, status }.into(),
                Error::Http(e) => AcquisitionError::TransferFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
                .into(),
                other => other,
            })
    }

    /// Headers the resource endpoints expect from the web app.
    fn resource_headers(&self, session: &SessionConfig, source_url: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        for name in ["x-b3-traceid", "x-b3-spanid", "x-b3-parentspanid"] {
            headers.insert(name, header_value(&generate_trace_id())?);
        }
        headers.insert("x-b3-flags", HeaderValue::from_static("0"));
        headers.insert("x-app-version", header_value(&session.app_version)?);
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert("x-pinterest-source-url", header_value(source_url)?);
        headers.insert("x-pinterest-appstate", HeaderValue::from_static("active"));
        headers.insert(
            "x-pinterest-pws-handler",
            HeaderValue::from_static("www/[username].js"),
        );
        headers.insert(
            "sec-ch-ua-full-version-list",
            HeaderValue::from_static(CH_UA_FULL_VERSION_LIST),
        );
        headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Windows\""));
        headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*, q=0.01"),
        );
        headers.insert(header::ACCEPT_LANGUAGE, header_value(&self.accept_language)?);
        headers.insert(header::REFERER, header_value(self.host.as_str())?);

        Ok(headers)
    }
}

#[async_trait]
impl FeedSource for PinterestApi {
    async fn session_config(&self, username: &str) -> Result<SessionConfig> {
        let url = self.host.join(&format!("{}/", username))?;
        let page = self.get_text(url.as_str()).await?;

        let app_version = find_app_version(&page);
        let user_id = find_user_id(&page);
        tracing::debug!(
            "Profile {}: appVersion={:?} userId={:?}",
            username,
            app_version,
            user_id
        );

        match (app_version, user_id) {
            (Some(app_version), Some(user_id)) => Ok(SessionConfig {
                app_version,
                user_id,
            }),
            _ => Err(FeedError::ConfigUnresolved {
                username: username.to_string(),
                reason: "no user id or app version found".to_string(),
            }
            .into()),
        }
    }

    async fn user_pins_page(
        &self,
        session: &SessionConfig,
        username: &str,
        bookmark: Option<&str>,
    ) -> Result<ResourceResponse> {
        let source_url = format!("/{}/", username);
        let data = serde_json::to_string(&FeedQuery::new(&session.user_id, username, bookmark))?;

        let mut url = self.host.join(USER_PINS_RESOURCE)?;
        url.query_pairs_mut()
            .append_pair("source_url", &source_url)
            .append_pair("data", &data)
            .append_pair("_", &request_timestamp().to_string());

        if let Some(bookmark) = bookmark {
            tracing::debug!("Fetching next page: {}", bookmark);
        }

        let response = self
            .send(url.as_str(), || {
                let headers = self.resource_headers(session, &source_url)?;
                Ok(self.client.get(url.clone()).headers(headers))
            })
            .await?;
        let text = response.text().await?;

        let envelope: ResourceEnvelope =
            serde_json::from_str(&text).map_err(|e| FeedError::SchemaMismatch {
                username: username.to_string(),
                reason: format!(
                    "{} - Response: {}",
                    e,
                    text.chars().take(500).collect::<String>()
                ),
            })?;

        Ok(envelope.resource_response)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::Config(format!("Invalid header value: {:?}", value)))
}
