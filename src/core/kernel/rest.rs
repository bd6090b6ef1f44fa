use crate::core::classifier::classify;
use crate::core::errors::UpbitError;
use crate::core::kernel::signer::Signer;
use crate::core::types::{QueryParams, RemainingReq, RestResponse};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{instrument, trace, warn};

pub const REMAINING_REQ_HEADER: &str = "Remaining-Req";

/// A fully prepared request: the transport only has to put it on the wire.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub url: String,
    pub params: QueryParams,
    pub authorization: Option<String>,
}

impl SignedRequest {
    /// Request without an `Authorization` header (quotation endpoints).
    pub fn public(method: Method, url: String, params: QueryParams) -> Self {
        Self {
            method,
            url,
            params,
            authorization: None,
        }
    }

    /// Request whose token is bound to `params` through the query hash.
    pub fn signed(
        method: Method,
        url: String,
        params: QueryParams,
        signer: &dyn Signer,
    ) -> Result<Self, UpbitError> {
        let authorization = signer.authorization(Some(&params))?;
        Ok(Self {
            method,
            url,
            params,
            authorization: Some(authorization),
        })
    }

    /// Parameters travel in the body for POST and in the URL otherwise.
    pub fn carries_body(&self) -> bool {
        self.method == Method::POST
    }

    /// URL including the canonical query string when it belongs in the URL.
    pub fn full_url(&self) -> String {
        if self.carries_body() || self.params.is_empty() {
            self.url.clone()
        } else {
            format!("{}?{}", self.url, self.params.encode())
        }
    }
}

/// Raw transport result handed to the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub remaining_req: Option<String>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            remaining_req: None,
        }
    }

    pub fn with_remaining_req(mut self, header: impl Into<String>) -> Self {
        self.remaining_req = Some(header.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// REST transport trait
///
/// Executes one prepared request and returns the raw status, body and rate-limit
/// header. Implementations never retry and never interpret the body.
#[async_trait]
pub trait RestClient: Send + Sync {
    async fn execute(&self, request: SignedRequest) -> Result<HttpResponse, UpbitError>;
}

#[async_trait]
impl<T: RestClient + ?Sized> RestClient for std::sync::Arc<T> {
    async fn execute(&self, request: SignedRequest) -> Result<HttpResponse, UpbitError> {
        (**self).execute(request).await
    }
}

/// Send a request through `rest`, classify failures and decode the body.
///
/// Every REST call site goes through here so that exchange failures always come
/// back as typed errors.
pub async fn dispatch<R, T>(rest: &R, request: SignedRequest) -> Result<RestResponse<T>, UpbitError>
where
    R: RestClient + ?Sized,
    T: DeserializeOwned,
{
    let response = classify(rest.execute(request).await?)?;

    // The call already succeeded; an unreadable budget header must not turn it into a failure.
    let remaining_req = match response.remaining_req.as_deref().map(RemainingReq::parse) {
        Some(Ok(parsed)) => Some(parsed),
        Some(Err(e)) => {
            warn!(error = %e, "ignoring unreadable Remaining-Req header");
            None
        }
        None => None,
    };

    let data = serde_json::from_str(&response.body).map_err(|e| {
        UpbitError::Deserialization(format!("Failed to parse JSON response: {}", e))
    })?;

    Ok(RestResponse {
        data,
        remaining_req,
    })
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            exchange_name: "upbit".to_string(),
            timeout_seconds: 30,
            user_agent: concat!("upbit-connector/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl RestClientConfig {
    pub fn new(exchange_name: String) -> Self {
        Self {
            exchange_name,
            ..Self::default()
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<ReqwestRest, UpbitError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| UpbitError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(ReqwestRest {
            client,
            config: self.config,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone, Debug)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
}

impl ReqwestRest {
    pub fn new() -> Result<Self, UpbitError> {
        RestClientBuilder::new(RestClientConfig::default()).build()
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(
        skip(self, request),
        fields(exchange = %self.config.exchange_name, method = %request.method, url = %request.url)
    )]
    async fn execute(&self, request: SignedRequest) -> Result<HttpResponse, UpbitError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.full_url());

        if let Some(authorization) = &request.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }

        if request.carries_body() {
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(request.params.encode());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UpbitError::Network(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let remaining_req = response
            .headers()
            .get(REMAINING_REQ_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|e| {
            UpbitError::Network(format!("Failed to read response body: {}", e))
        })?;

        trace!(status, "Response body: {}", body);

        Ok(HttpResponse {
            status,
            body,
            remaining_req,
        })
    }
}
