//! REST client for the dashboard backend.
//!
//! Implements [`AclBackend`] and [`AnnotationSource`] over the backend's
//! HTTP API using [`reqwest`].

use async_trait::async_trait;

use dashpanel_core::acl::{AclUpdatePayload, PermissionEntry};
use dashpanel_core::series::Annotation;
use dashpanel_core::types::DbId;

use crate::backend::{AclBackend, AnnotationSource};
use crate::config::ClientConfig;
use crate::error::{PanelError, PanelResult};

/// HTTP client for one dashboard backend.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpBackend {
    /// Build a client honouring the configured timeout.
    pub fn new(config: &ClientConfig) -> PanelResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            base_url: config.backend_url.clone(),
            api_token: config.api_token.clone(),
        }
    }

    fn acl_url(&self, dashboard_id: DbId) -> String {
        format!("{}/api/dashboards/id/{dashboard_id}/acl", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // ---- private helpers ----

    /// Turn a non-2xx response into [`PanelError::Api`] carrying the body.
    async fn ensure_success(response: reqwest::Response) -> PanelResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PanelError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> PanelResult<T> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AclBackend for HttpBackend {
    /// `GET /api/dashboards/id/{id}/acl`
    async fn fetch_acl(&self, dashboard_id: DbId) -> PanelResult<Vec<PermissionEntry>> {
        let response = self
            .authorize(self.client.get(self.acl_url(dashboard_id)))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /api/dashboards/id/{id}/acl` with `{ "items": [...] }`
    async fn save_acl(&self, dashboard_id: DbId, payload: &AclUpdatePayload) -> PanelResult<()> {
        let response = self
            .authorize(self.client.post(self.acl_url(dashboard_id)))
            .json(payload)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AnnotationSource for HttpBackend {
    /// `GET /api/annotations?dashboardId={id}`
    async fn get_annotations(&self, dashboard_id: DbId) -> PanelResult<Vec<Annotation>> {
        let url = format!("{}/api/annotations?dashboardId={dashboard_id}", self.base_url);
        let response = self.authorize(self.client.get(url)).send().await?;
        Self::parse_response(response).await
    }
}
