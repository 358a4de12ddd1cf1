//! HTTP client for the remote expense store.
//!
//! This module provides the `ApiClient` struct, which maps the store's
//! CRUD endpoints onto the `ExpenseBackend` trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{Expense, NewExpense};

use super::{ApiError, ExpenseBackend};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Resource collection holding every user's expenses
const EXPENSES_PATH: &str = "expenses";

/// API client for the expense store.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (e.g. `https://host/api/v1`)
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(header::ACCEPT, "application/json");
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_status(status, &body);
        if !error.is_not_found() {
            warn!(status = %status, error = %error, "API error response");
        }
        Err(error)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response, url: &Url) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::Decode(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }
}

#[async_trait]
impl ExpenseBackend for ApiClient {
    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, ApiError> {
        let url = self.endpoint(&[EXPENSES_PATH])?;
        debug!(url = %url, user_id, "Fetching expenses");

        let response = self
            .authorize(self.client.get(url.clone()))
            .query(&[("userId", user_id)])
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        let expenses: Vec<Expense> = Self::read_json(response, &url).await?;
        debug!(user_id, count = expenses.len(), "Fetched expenses");
        Ok(expenses)
    }

    async fn create_expense(&self, expense: &NewExpense) -> Result<Expense, ApiError> {
        let url = self.endpoint(&[EXPENSES_PATH])?;

        let response = self
            .authorize(self.client.post(url.clone()))
            .json(expense)
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        Self::read_json(response, &url).await
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<Expense, ApiError> {
        let url = self.endpoint(&[EXPENSES_PATH, expense_id])?;

        let response = self
            .authorize(self.client.delete(url.clone()))
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        Self::read_json(response, &url).await
    }
}
