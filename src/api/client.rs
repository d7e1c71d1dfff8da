//! HTTP client for the Bible Chat backend

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::Config;
use crate::models::{Locale, Verse};

use super::{
    ApiError, Backend, ChatRequest, ChatResponse, VerifyRequest, VerifyResponse, VerseEnvelope,
};

/// Backend API client
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the app configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.backend_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Build API URL
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api{}", self.base_url, endpoint)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(response.json().await?)
    }

    async fn fetch_verse(&self, url: &str, endpoint: &'static str) -> Result<Verse, ApiError> {
        let response = self.client.get(url).send().await?;
        let envelope: VerseEnvelope = Self::read_json(response).await?;
        match envelope {
            VerseEnvelope {
                success: true,
                data: Some(verse),
            } => Ok(verse),
            _ => Err(ApiError::Unsuccessful { endpoint }),
        }
    }
}

impl Backend for ApiClient {
    async fn chat(&self, text: &str, locale: Locale) -> Result<ChatResponse, ApiError> {
        tracing::debug!("POST /api/chat ({} chars, {})", text.len(), locale);

        let response = self
            .client
            .post(self.api_url("/chat"))
            .json(&ChatRequest { text, locale })
            .send()
            .await?;

        let chat: ChatResponse = Self::read_json(response).await?;
        if !chat.success {
            return Err(ApiError::Unsuccessful { endpoint: "chat" });
        }
        Ok(chat)
    }

    async fn scripture(&self, reference: &str, locale: Locale) -> Result<Verse, ApiError> {
        let url = self.api_url(&format!(
            "/scripture/{}?locale={}",
            urlencoding::encode(reference),
            locale.code()
        ));
        tracing::debug!("GET {}", url);
        self.fetch_verse(&url, "scripture").await
    }

    async fn daily_verse(&self, locale: Locale) -> Result<Verse, ApiError> {
        let url = self.api_url(&format!("/daily-verse?locale={}", locale.code()));
        tracing::debug!("GET {}", url);
        self.fetch_verse(&url, "daily-verse").await
    }

    async fn verify_subscription(&self, request: &VerifyRequest) -> Result<VerifyResponse, ApiError> {
        tracing::debug!("POST /api/subscription/verify ({})", request.platform);

        let response = self
            .client
            .post(self.api_url("/subscription/verify"))
            .json(request)
            .send()
            .await?;

        Self::read_json(response).await
    }
}
