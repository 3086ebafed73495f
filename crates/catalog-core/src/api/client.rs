//! API client for communicating with the catalog REST API.
//!
//! This module provides the `ApiClient` struct for the password-grant login
//! and the tenant-scoped product endpoints. It does not know about sessions;
//! callers pass the tenant and bearer token for each request.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{AccessToken, Authenticator};
use crate::models::{Product, ProductId, ProductInput};
use crate::schema::Credentials;

use super::error::{truncate_body, AuthError, FetchError, Operation};

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint, relative to the base URL
const LOGIN_PATH: &str = "login/access-token";

/// API client for the catalog service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client. No request timeout is applied unless given.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: Self::normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Parse the base URL and make sure relative paths join beneath it.
    fn normalize_base_url(raw: &str) -> Result<Url> {
        let mut url = Url::parse(raw).with_context(|| format!("Invalid API URL: {}", raw))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("API URL must be http or https: {}", raw);
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    fn products_url(&self, tenant: &str, id: Option<ProductId>) -> Result<Url, FetchError> {
        // Dot segments would be resolved by `join` and leave `tenants/`
        if matches!(tenant, "" | "." | "..") {
            return Err(FetchError::InvalidTenant(tenant.to_string()));
        }
        let tenant = urlencoding::encode(tenant);
        let path = match id {
            Some(id) => format!("tenants/{}/products/{}", tenant, id),
            None => format!("tenants/{}/products/", tenant),
        };
        Ok(self.base_url.join(&path)?)
    }

    fn authorized(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // ===== Login =====

    /// POST form-encoded credentials and return the issued token.
    pub async fn login(&self, credentials: &Credentials) -> Result<AccessToken, AuthError> {
        let url = self
            .base_url
            .join(LOGIN_PATH)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        debug!(%url, username = credentials.username(), "Sending login request");

        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("username", credentials.username()),
                ("password", credentials.password()),
            ])
            .send()
            .await
            .map_err(AuthError::Unreachable)?;

        let status = response.status();
        let body = response.text().await.map_err(AuthError::Unreachable)?;

        if !status.is_success() {
            debug!(%status, body = %truncate_body(&body), "Login rejected");
            return Err(AuthError::from_status(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "Failed to parse login response");
            AuthError::InvalidResponse(e.to_string())
        })
    }

    // ===== Response handling =====

    /// Pass 2xx responses through; turn anything else into a `FetchError`.
    async fn check_response(op: Operation, response: Response) -> Result<Response, FetchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(%op, %status, body = %truncate_body(&body), "Request failed");
        Err(FetchError::Status { op, status })
    }

    async fn send_json<T: DeserializeOwned>(
        op: Operation,
        request: RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = request
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Transport { op, source })?;
        let response = Self::check_response(op, response).await?;
        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport { op, source })?;

        serde_json::from_str(&body).map_err(|source| {
            warn!(%op, error = %source, body = %truncate_body(&body), "Response failed validation");
            FetchError::InvalidResponse { op, source }
        })
    }

    // ===== Products =====

    pub async fn list_products(
        &self,
        tenant: &str,
        token: Option<&str>,
    ) -> Result<Vec<Product>, FetchError> {
        let url = self.products_url(tenant, None)?;
        debug!(%url, "GET products");
        let request = Self::authorized(self.client.get(url), token);
        Self::send_json(Operation::ListProducts, request).await
    }

    pub async fn get_product(
        &self,
        tenant: &str,
        id: ProductId,
        token: Option<&str>,
    ) -> Result<Product, FetchError> {
        let url = self.products_url(tenant, Some(id))?;
        debug!(%url, "GET product");
        let request = Self::authorized(self.client.get(url), token);
        Self::send_json(Operation::GetProduct, request).await
    }

    pub async fn create_product(
        &self,
        tenant: &str,
        input: &ProductInput,
        token: Option<&str>,
    ) -> Result<Product, FetchError> {
        let url = self.products_url(tenant, None)?;
        debug!(%url, slug = %input.slug, "POST product");
        let request = Self::authorized(self.client.post(url).json(input), token);
        Self::send_json(Operation::CreateProduct, request).await
    }

    /// Full replacement of the product's writable fields.
    pub async fn update_product(
        &self,
        tenant: &str,
        id: ProductId,
        input: &ProductInput,
        token: Option<&str>,
    ) -> Result<Product, FetchError> {
        let url = self.products_url(tenant, Some(id))?;
        debug!(%url, "PUT product");
        let request = Self::authorized(self.client.put(url).json(input), token);
        Self::send_json(Operation::UpdateProduct, request).await
    }

    pub async fn delete_product(
        &self,
        tenant: &str,
        id: ProductId,
        token: Option<&str>,
    ) -> Result<(), FetchError> {
        let op = Operation::DeleteProduct;
        let url = self.products_url(tenant, Some(id))?;
        debug!(%url, "DELETE product");
        let response = Self::authorized(self.client.delete(url), token)
            .send()
            .await
            .map_err(|source| FetchError::Transport { op, source })?;
        Self::check_response(op, response).await?;
        Ok(())
    }
}

impl Authenticator for ApiClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, AuthError> {
        self.login(credentials).await
    }
}
