//! REST client for the Freshmart backend.
//!
//! Uses `reqwest` for HTTP with a bearer token on every call. Catalog reads
//! (products, categories, delivery centres) are cached using `moka`; cart,
//! wishlist and order calls are never cached.

mod cache;
mod conversions;
pub mod wire;

use std::sync::Arc;

use freshmart_core::{
    Cart, CartLine, Category, CategoryId, CheckoutDetails, DeliveryCentre, Order, OrderId,
    OrderStatus, Product, ProductId, RateOption, RateSelection, UserId, Wishlist, WishlistEntryId,
};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

use cache::CacheValue;
use conversions::{
    address_to_wire, convert_cart, convert_category, convert_delivery_centre, convert_order,
    convert_product, convert_wishlist, order_item_from_line,
};
use wire::{
    ActualLineWire, ActualQuantitiesBody, AddToCartBody, AddToWishlistBody, CartEnvelope,
    CategoryWire, CreateOrderBody, DeliveryCentreWire, ErrorBody, ListEnvelope, NewOrderWire,
    OrderDetailsWire, OrderEnvelope, OrderStatusBody, OrderWire, ProductEnvelope, ProductWire,
    RemoveFromCartBody, UpdateCartBody, WishlistEntryWire,
};

/// Longest body excerpt written to logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront REST backend.
///
/// Cheaply cloneable; clones share the HTTP connection pool and the catalog
/// cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: String,
    user_id: UserId,
    cache: Cache<String, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("user_id", &self.inner.user_id)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                token: config.bearer().to_string(),
                user_id: config.user_id.clone(),
                cache,
            }),
        })
    }

    /// The signed-in user this client acts for.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.inner.user_id
    }

    /// Build an endpoint URL from path segments (each segment is escaped).
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        Ok(self
            .inner
            .client
            .request(method, url)
            .bearer_auth(&self.inner.token)
            .header("Accept", "application/json"))
    }

    /// Send a request and return the body of a successful response.
    async fn send_raw(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::into_message);
            if status.is_server_error() {
                tracing::error!(
                    status = %status,
                    path = %url,
                    body = %excerpt(&body),
                    "Backend returned server error"
                );
            } else {
                tracing::warn!(
                    status = %status,
                    path = %url,
                    message = message.as_deref().unwrap_or(""),
                    "Backend rejected request"
                );
            }
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    /// Send a request and parse the JSON body of a successful response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.send_raw(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&body),
                "Failed to parse backend response"
            );
            ClientError::Parse(e)
        })
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Fetch the signed-in user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the snapshot is malformed.
    /// A missing cart surfaces as `ClientError::Http { status: 500, .. }`;
    /// the cart store decides how to treat it.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Cart> {
        let request = self.request(Method::GET, &["cart"])?;
        let envelope: CartEnvelope = self.send(request).await?;
        convert_cart(envelope.into_inner())
    }

    /// Add a product line (or increase the matching line).
    ///
    /// `line` carries the quantity to add, the chosen unit and the display
    /// fields the backend stores alongside it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the snapshot is malformed.
    #[instrument(skip(self, line), fields(product_id = %line.product_id, unit = %line.rate.key, quantity = line.quantity))]
    pub async fn add_to_cart(&self, line: &CartLine) -> Result<Cart> {
        let body = AddToCartBody {
            user_id: self.inner.user_id.as_str(),
            prod_id: line.product_id.as_str(),
            quantity: line.quantity,
            selected_rate: &line.rate,
            prod_name: &line.display.name,
            image: &line.display.image,
            prod_rate: line.rates.iter().map(RateOption::to_json).collect(),
            prod_category: &line.display.category,
        };
        let request = self.request(Method::POST, &["cart", "add"])?.json(&body);
        let envelope: CartEnvelope = self.send(request).await?;
        convert_cart(envelope.into_inner())
    }

    /// Change the quantity and optionally the unit of one line.
    ///
    /// `current` identifies the line; `selected` is the unit it should have
    /// afterwards (equal to `current` when the unit does not change).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the snapshot is malformed.
    #[instrument(skip(self, current, selected), fields(unit = %current.key, new_unit = %selected.key))]
    pub async fn update_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
        current: &RateSelection,
        selected: &RateSelection,
    ) -> Result<Cart> {
        let body = UpdateCartBody {
            user_id: self.inner.user_id.as_str(),
            prod_id: product_id.as_str(),
            quantity,
            current_rate: current,
            selected_rate: selected,
        };
        let request = self.request(Method::POST, &["cart", "update"])?.json(&body);
        let envelope: CartEnvelope = self.send(request).await?;
        convert_cart(envelope.into_inner())
    }

    /// Remove one line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the snapshot is malformed.
    #[instrument(skip(self, rate), fields(unit = %rate.key))]
    pub async fn remove_from_cart(&self, product_id: &ProductId, rate: &RateSelection) -> Result<Cart> {
        let body = RemoveFromCartBody {
            selected_rate: rate,
        };
        let request = self
            .request(Method::DELETE, &["cart", "remove", product_id.as_str()])?
            .json(&body);
        let envelope: CartEnvelope = self.send(request).await?;
        convert_cart(envelope.into_inner())
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Place an order for `cart` with the given delivery details.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the created order is
    /// malformed.
    #[instrument(skip(self, cart, details), fields(lines = cart.len()))]
    pub async fn create_order(&self, cart: &Cart, details: &CheckoutDetails) -> Result<Order> {
        let totals = cart.totals();
        let status = OrderStatus::OrderPlaced.to_string();
        let body = CreateOrderBody {
            orderdetails: OrderDetailsWire {
                order: NewOrderWire {
                    user_id: self.inner.user_id.as_str(),
                    items: cart.lines().iter().map(order_item_from_line).collect(),
                    total: totals.total,
                    gst: totals.gst,
                    delivery_charge: totals.delivery_charge,
                    discount: totals.discount,
                    grand_total: totals.grand_total,
                    status: &status,
                    address: address_to_wire(&details.address),
                    delivery_day: &details.slot.day,
                    delivery_time: &details.slot.time,
                    delivery_centre: details.delivery_centre.as_str(),
                    notes: details.notes.as_deref(),
                },
            },
        };
        let request = self.request(Method::POST, &["createorder"])?.json(&body);
        let envelope: OrderEnvelope = self.send(request).await?;
        convert_order(envelope.into_inner())
    }

    /// Orders visible to the signed-in user (all orders for delivery staff).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or an order is malformed.
    #[instrument(skip(self))]
    pub async fn get_orders(&self) -> Result<Vec<Order>> {
        let request = self.request(Method::GET, &["orders"])?;
        let list: ListEnvelope<OrderWire> = self.send(request).await?;
        list.into_inner().into_iter().map(convert_order).collect()
    }

    /// One order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the order is malformed.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order> {
        let request = self.request(Method::GET, &["orders", order_id.as_str()])?;
        let envelope: OrderEnvelope = self.send(request).await?;
        convert_order(envelope.into_inner())
    }

    /// Set an order's delivery status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the order is malformed.
    #[instrument(skip(self), fields(order_id = %order_id, status = %status))]
    pub async fn update_order_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<Order> {
        let status = status.to_string();
        let request = self
            .request(Method::PUT, &["orders", order_id.as_str(), "status"])?
            .json(&OrderStatusBody { status: &status });
        let envelope: OrderEnvelope = self.send(request).await?;
        convert_order(envelope.into_inner())
    }

    /// Persist the actual quantities recorded on `order`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the order is malformed.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn save_actual_quantities(&self, order: &Order) -> Result<Order> {
        let items = order
            .lines
            .iter()
            .filter_map(|line| {
                let actual_quantity = line.actual_quantity?;
                Some(ActualLineWire {
                    prod_id: line.product_id.to_string(),
                    selected_rate: line.rate.clone(),
                    actual_quantity,
                    actual_subtotal: line.effective_subtotal(),
                })
            })
            .collect();
        let body = ActualQuantitiesBody {
            items,
            actual_grand_total: order.compute_actual_grand_total(),
        };
        let request = self
            .request(Method::PUT, &["orders", order.id.as_str(), "actual"])?
            .json(&body);
        let envelope: OrderEnvelope = self.send(request).await?;
        convert_order(envelope.into_inner())
    }

    // =========================================================================
    // Wishlist Methods
    // =========================================================================

    /// Fetch the signed-in user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or an entry is malformed.
    #[instrument(skip(self))]
    pub async fn get_wishlist(&self) -> Result<Wishlist> {
        let user = &self.inner.user_id;
        let request = self.request(Method::GET, &["wishlist", user.as_str()])?;
        let list: ListEnvelope<WishlistEntryWire> = self.send(request).await?;
        convert_wishlist(user, list.into_inner())
    }

    /// Save a product to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_wishlist(&self, product_id: &ProductId) -> Result<()> {
        let body = AddToWishlistBody {
            user_id: self.inner.user_id.as_str(),
            prod_id: product_id.as_str(),
        };
        let request = self.request(Method::POST, &["wishlist"])?.json(&body);
        self.send_raw(request).await.map(drop)
    }

    /// Delete a wishlist entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(entry_id = %entry_id))]
    pub async fn remove_from_wishlist(&self, entry_id: &WishlistEntryId) -> Result<()> {
        let request = self.request(Method::DELETE, &["wishlist", entry_id.as_str()])?;
        self.send_raw(request).await.map(drop)
    }

    // =========================================================================
    // Catalog Methods (cached)
    // =========================================================================

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Product> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let request = self.request(Method::GET, &["products", product_id.as_str()])?;
        let envelope: ProductEnvelope = self.send(request).await?;
        let product = convert_product(envelope.into_inner());

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List products, optionally within one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self, category: Option<&CategoryId>) -> Result<Vec<Product>> {
        let cache_key = format!("products:{}", category.map_or("", CategoryId::as_str));

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut request = self.request(Method::GET, &["products"])?;
        if let Some(category) = category {
            request = request.query(&[("category", category.as_str())]);
        }
        let list: ListEnvelope<ProductWire> = self.send(request).await?;
        let products: Vec<Product> = list.into_inner().into_iter().map(convert_product).collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// List categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        let cache_key = "categories".to_string();

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let request = self.request(Method::GET, &["categories"])?;
        let list: ListEnvelope<CategoryWire> = self.send(request).await?;
        let categories: Vec<Category> =
            list.into_inner().into_iter().map(convert_category).collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    /// List delivery centres.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_delivery_centres(&self) -> Result<Vec<DeliveryCentre>> {
        let cache_key = "delivery_centres".to_string();

        if let Some(CacheValue::DeliveryCentres(centres)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for delivery centres");
            return Ok(centres);
        }

        let request = self.request(Method::GET, &["deliverycentres"])?;
        let list: ListEnvelope<DeliveryCentreWire> = self.send(request).await?;
        let centres: Vec<DeliveryCentre> = list
            .into_inner()
            .into_iter()
            .map(convert_delivery_centre)
            .collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::DeliveryCentres(centres.clone()))
            .await;

        Ok(centres)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, product_id: &ProductId) {
        self.inner
            .cache
            .invalidate(&format!("product:{product_id}"))
            .await;
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

/// Whether an error is the backend's "no cart row yet" response.
#[must_use]
pub fn is_missing_cart(err: &ClientError) -> bool {
    err.is_status(StatusCode::INTERNAL_SERVER_ERROR.as_u16())
}

fn excerpt(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}
