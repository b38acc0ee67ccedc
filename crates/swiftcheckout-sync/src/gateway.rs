//! # Remote Sales Gateway
//!
//! HTTP client for the hosted backend, plus the trait seam the sync engine
//! tests against.
//!
//! ## Wire Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Hosted Backend Endpoints                             │
//! │                                                                         │
//! │  GET  /stores/{id}/products    → {success, products[]}                  │
//! │  GET  /stores/{id}/inventory   → {success, inventories[]}               │
//! │  POST /sale-groups             → {success, saleGroup:{id}}              │
//! │       body: {storeId, totalAmount, paymentMethod, customerId,          │
//! │              emailReceipt, clientRef}                                   │
//! │       IDEMPOTENT on clientRef: a duplicate call returns the EXISTING   │
//! │       group instead of creating a second one. This is what makes       │
//! │       replay-after-partial-failure safe.                               │
//! │  POST /sales                   → {success, sale:{id}}                   │
//! │       body: {storeId, saleGroupId, productId, quantity, unitPrice,     │
//! │              deviceIds[], deviceSizes[], paymentMethod, customerId}    │
//! │  GET  /devices/{id}/sold?storeId= → {alreadySold, sale?}               │
//! │                                                                         │
//! │  All payloads are camelCase JSON. `success=false` or a non-2xx status  │
//! │  maps to SyncError::GatewayRejected.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::GatewaySettings;
use crate::error::{SyncError, SyncResult};
use swiftcheckout_core::types::{
    parse_device_ids, parse_device_sizes, CachedInventory, CachedProduct,
};

// =============================================================================
// Request / Response Types
// =============================================================================

/// Request body for creating a remote sale group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleGroupRequest {
    pub store_id: i64,
    /// Effective sale total in cents.
    pub total_amount: i64,
    pub payment_method: String,
    pub customer_id: Option<String>,
    pub email_receipt: bool,
    /// Idempotency token. The backend keys group creation on this.
    pub client_ref: String,
}

/// A remote sale group (one checkout transaction).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSaleGroup {
    pub id: String,
}

/// Request body for creating one remote sale line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineRequest {
    pub store_id: i64,
    pub sale_group_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents.
    pub unit_price: i64,
    pub device_ids: Vec<String>,
    pub device_sizes: Vec<String>,
    pub payment_method: String,
    pub customer_id: Option<String>,
}

/// A remote sale line record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSale {
    pub id: String,
    #[serde(default)]
    pub sale_group_id: Option<String>,
}

/// Result of the "already sold" device check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSoldCheck {
    pub already_sold: bool,
    /// The blocking sale's metadata, present when `already_sold` is true.
    #[serde(default)]
    pub sale: Option<RemoteSale>,
}

/// Product payload as the backend serializes it: device lists in
/// delimited form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub device_ids: String,
    #[serde(default)]
    pub device_sizes: String,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: Option<i64>,
}

impl RemoteProduct {
    /// Converts the wire shape into a cache entry for a store, parsing the
    /// delimited device lists and stamping the re-cache time.
    pub fn into_cached(self, store_id: i64) -> CachedProduct {
        let mut product = CachedProduct {
            id: self.id,
            store_id,
            name: self.name,
            device_ids: parse_device_ids(&self.device_ids),
            device_sizes: parse_device_sizes(&self.device_sizes),
            price_cents: self.price_cents,
            cost_cents: self.cost_cents,
            cached_at: Utc::now(),
        };
        product.align_sizes();
        product
    }
}

/// Inventory payload as the backend serializes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteInventory {
    pub product_id: String,
    pub available_qty: i64,
    #[serde(default)]
    pub total_sold: i64,
}

impl RemoteInventory {
    pub fn into_cached(self, store_id: i64) -> CachedInventory {
        CachedInventory {
            product_id: self.product_id,
            store_id,
            available_qty: self.available_qty,
            total_sold: self.total_sold,
            cached_at: Utc::now(),
        }
    }
}

// Response envelopes: every endpoint wraps its payload in {success, ...}.

#[derive(Debug, Deserialize)]
struct ProductsEnvelope {
    success: bool,
    #[serde(default)]
    products: Vec<RemoteProduct>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InventoryEnvelope {
    success: bool,
    #[serde(default)]
    inventories: Vec<RemoteInventory>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaleGroupEnvelope {
    success: bool,
    #[serde(default)]
    sale_group: Option<RemoteSaleGroup>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaleEnvelope {
    success: bool,
    #[serde(default)]
    sale: Option<RemoteSale>,
    #[serde(default)]
    message: Option<String>,
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// The remote sales gateway consumed by the sync engine and cache manager.
///
/// A trait so the engine can be tested against an in-process double; the
/// production implementation is [`HttpSalesGateway`].
#[async_trait]
pub trait SalesGateway: Send + Sync {
    /// Fetches the product catalog for a store.
    async fn fetch_products(&self, store_id: i64) -> SyncResult<Vec<CachedProduct>>;

    /// Fetches inventory levels for a store.
    async fn fetch_inventory(&self, store_id: i64) -> SyncResult<Vec<CachedInventory>>;

    /// Creates a sale group, idempotent on `client_ref`.
    ///
    /// Calling this twice with the same `client_ref` MUST return the same
    /// group; the backend guarantees it and the engine's replay safety
    /// depends on it.
    async fn create_sale_group(&self, request: &SaleGroupRequest) -> SyncResult<RemoteSaleGroup>;

    /// Creates one sale line within an existing group.
    async fn create_sale_line(&self, request: &SaleLineRequest) -> SyncResult<RemoteSale>;

    /// Checks whether a device identifier appears in a prior confirmed
    /// sale for the store.
    async fn check_device_already_sold(
        &self,
        device_id: &str,
        store_id: i64,
    ) -> SyncResult<DeviceSoldCheck>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// Production gateway client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSalesGateway {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpSalesGateway {
    /// Builds a gateway client from settings.
    pub fn new(settings: &GatewaySettings) -> SyncResult<Self> {
        let base_url = Url::parse(&settings.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| SyncError::Internal(format!("http client build failed: {e}")))?;

        Ok(HttpSalesGateway {
            client,
            base_url,
            api_key: settings.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> SyncResult<Url> {
        self.base_url.join(path).map_err(SyncError::from)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    fn rejected(operation: &str, message: Option<String>) -> SyncError {
        SyncError::GatewayRejected {
            operation: operation.to_string(),
            message: message.unwrap_or_else(|| "no message".to_string()),
        }
    }
}

#[async_trait]
impl SalesGateway for HttpSalesGateway {
    async fn fetch_products(&self, store_id: i64) -> SyncResult<Vec<CachedProduct>> {
        let url = self.endpoint(&format!("stores/{store_id}/products"))?;
        debug!(%url, "Fetching products");

        let response = self.authorize(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::rejected(
                "fetchProducts",
                Some(format!("status {}", response.status())),
            ));
        }

        let envelope: ProductsEnvelope = response.json().await?;
        if !envelope.success {
            return Err(Self::rejected("fetchProducts", envelope.message));
        }

        Ok(envelope
            .products
            .into_iter()
            .map(|p| p.into_cached(store_id))
            .collect())
    }

    async fn fetch_inventory(&self, store_id: i64) -> SyncResult<Vec<CachedInventory>> {
        let url = self.endpoint(&format!("stores/{store_id}/inventory"))?;
        debug!(%url, "Fetching inventory");

        let response = self.authorize(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::rejected(
                "fetchInventory",
                Some(format!("status {}", response.status())),
            ));
        }

        let envelope: InventoryEnvelope = response.json().await?;
        if !envelope.success {
            return Err(Self::rejected("fetchInventory", envelope.message));
        }

        Ok(envelope
            .inventories
            .into_iter()
            .map(|i| i.into_cached(store_id))
            .collect())
    }

    async fn create_sale_group(&self, request: &SaleGroupRequest) -> SyncResult<RemoteSaleGroup> {
        let url = self.endpoint("sale-groups")?;
        debug!(client_ref = %request.client_ref, "Creating sale group");

        let response = self
            .authorize(self.client.post(url))
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::rejected(
                "createSaleGroup",
                Some(format!("status {}", response.status())),
            ));
        }

        let envelope: SaleGroupEnvelope = response.json().await?;
        if !envelope.success {
            return Err(Self::rejected("createSaleGroup", envelope.message));
        }

        envelope
            .sale_group
            .ok_or_else(|| SyncError::UnexpectedResponse("missing saleGroup in response".into()))
    }

    async fn create_sale_line(&self, request: &SaleLineRequest) -> SyncResult<RemoteSale> {
        let url = self.endpoint("sales")?;
        debug!(
            sale_group_id = %request.sale_group_id,
            product_id = %request.product_id,
            "Creating sale line"
        );

        let response = self
            .authorize(self.client.post(url))
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::rejected(
                "createSaleLine",
                Some(format!("status {}", response.status())),
            ));
        }

        let envelope: SaleEnvelope = response.json().await?;
        if !envelope.success {
            return Err(Self::rejected("createSaleLine", envelope.message));
        }

        envelope
            .sale
            .ok_or_else(|| SyncError::UnexpectedResponse("missing sale in response".into()))
    }

    async fn check_device_already_sold(
        &self,
        device_id: &str,
        store_id: i64,
    ) -> SyncResult<DeviceSoldCheck> {
        let url = self.endpoint(&format!("devices/{device_id}/sold?storeId={store_id}"))?;
        debug!(device_id, store_id, "Checking device sold status");

        let response = self.authorize(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::rejected(
                "checkDeviceAlreadySold",
                Some(format!("status {}", response.status())),
            ));
        }

        Ok(response.json().await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
