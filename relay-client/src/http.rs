//! HTTP client for the relay REST API

use std::net::SocketAddr;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{
    ApiResponse, CreateOrderRequest, HealthResponse, Order, OrderStatus, Product,
    UpdateStatusRequest,
};

use crate::{ClientConfig, ClientError, ClientResult};

/// HTTP client for the relay (`/health`, `/api/products`, `/api/orders`)
#[derive(Debug, Clone)]
pub struct RelayHttpClient {
    client: Client,
    base_url: String,
}

impl RelayHttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url(),
        })
    }

    /// Client for a discovered relay address
    pub fn for_addr(addr: SocketAddr, config: &ClientConfig) -> ClientResult<Self> {
        let mut client = Self::new(config)?;
        client.base_url = format!("http://{}", addr);
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// GET returning the `data` of an `ApiResponse`
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::handle_response(response).await
    }

    /// POST with JSON body returning the `data` of an `ApiResponse`
    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ClientResult<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Decode the unified response body; error bodies become [`ClientError::Api`]
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        let text = response.text().await?;

        let body: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            ClientError::InvalidResponse(format!("HTTP {}: {} ({})", status.as_u16(), e, text))
        })?;

        match body.into_result() {
            Ok(Some(data)) => Ok(data),
            Ok(None) => Err(ClientError::InvalidResponse(format!(
                "HTTP {}: missing data",
                status.as_u16()
            ))),
            Err(e) => Err(ClientError::Api {
                code: e.code,
                message: e.message,
            }),
        }
    }

    // ========== Health ==========

    /// `GET /health` (plain body, not wrapped in `ApiResponse`)
    pub async fn health(&self) -> ClientResult<HealthResponse> {
        let response = self.client.get(self.url("/health")).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }

    // ========== Products ==========

    pub async fn products(&self) -> ClientResult<Vec<Product>> {
        self.get("/api/products").await
    }

    // ========== Orders ==========

    /// `POST /api/orders`
    pub async fn create_order(&self, request: &CreateOrderRequest) -> ClientResult<Order> {
        self.post("/api/orders", request).await
    }

    /// `GET /api/orders`: open orders, used to overwrite the local array after reconnect
    pub async fn active_orders(&self) -> ClientResult<Vec<Order>> {
        self.get("/api/orders").await
    }

    pub async fn order_history(&self) -> ClientResult<Vec<Order>> {
        self.get("/api/orders/history").await
    }

    pub async fn order(&self, id: &str) -> ClientResult<Order> {
        self.get(&format!("/api/orders/{}", id)).await
    }

    /// `POST /api/orders/{id}/status`
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> ClientResult<Order> {
        self.post(
            &format!("/api/orders/{}/status", id),
            &UpdateStatusRequest { status },
        )
        .await
    }
}
