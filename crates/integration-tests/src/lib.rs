//! In-process fake of the Freshmart REST backend.
//!
//! [`FakeBackend::start`] binds an axum server on `127.0.0.1:0` that speaks
//! the backend's JSON dialect. Cart keying goes through
//! [`freshmart_core::Cart::apply`]; totals are priced here the way the real
//! backend prices them (5% GST, flat delivery under the free-delivery
//! threshold). Tests can inject a failure, a garbled body, a delay or a
//! foreign cart owner for the next request, and count requests per route.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p freshmart-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use freshmart_client::{ChangeBus, ClientConfig, Session};
use freshmart_core::{
    Cart, CartLine, CartMutation, CartTotals, DeliveryAddress, DeliveryCentreId, DeliverySlot,
    LineDisplay, LineKey, Order, OrderId, OrderLine, OrderStatus, Price, ProductId,
    RateSelection, UserId, WishlistEntry, WishlistEntryId, parse_rates,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// A regular customer.
pub const ALICE: &str = "alice";
/// Another customer.
pub const BOB: &str = "bob";

/// Flat delivery charge below [`FREE_DELIVERY_FROM`].
pub const DELIVERY_CHARGE: i64 = 20;
/// Cart total from which delivery is free.
pub const FREE_DELIVERY_FROM: i64 = 500;

type Shared = Arc<Mutex<BackendState>>;

/// What the next request should get instead of a normal answer.
#[derive(Debug, Clone)]
enum Failure {
    Status(StatusCode, Option<String>),
    Garbage,
}

#[derive(Debug, Default)]
struct BackendState {
    tokens: HashMap<String, UserId>,
    products: Vec<Value>,
    categories: Vec<Value>,
    centres: Vec<Value>,
    carts: HashMap<UserId, Cart>,
    wishlists: HashMap<UserId, Vec<WishlistEntry>>,
    orders: Vec<Order>,
    hits: HashMap<&'static str, usize>,
    fail_next: Option<Failure>,
    route_failures: HashMap<String, Failure>,
    delay_next: Option<Duration>,
    cart_owner_override: Option<UserId>,
}

impl BackendState {
    fn seeded() -> Self {
        Self {
            products: vec![
                json!({
                    "_id": "apple",
                    "prod_Name": "Apple",
                    "prod_category": {"_id": "fruits", "name": "Fruits"},
                    "prod_Rate": [{"1kg": 50}, {"500g": "30"}],
                    "stock": 40,
                    "isActive": true,
                    "images": ["apple.jpg"]
                }),
                json!({
                    "_id": "milk",
                    "prod_Name": "Milk",
                    "prod_category": {"_id": "dairy", "name": "Dairy"},
                    "prod_Rate": [{"1l": 60}],
                    "stock": 12,
                    "isActive": true,
                    "images": ["milk.jpg"]
                }),
                json!({
                    "_id": "saffron",
                    "prod_Name": "Saffron",
                    "prod_category": {"_id": "spices", "name": "Spices"},
                    "prod_Rate": [{"1g": "ask"}, {"2g": 10, "5g": 20}],
                    "stock": 3,
                    "isActive": true,
                    "images": ["saffron.jpg"]
                }),
            ],
            categories: vec![
                json!({"_id": "fruits", "name": "Fruits", "image": "fruits.jpg", "isActive": true}),
                json!({"_id": "dairy", "name": "Dairy", "isActive": true}),
                json!({"_id": "spices", "name": "Spices", "isActive": false}),
            ],
            centres: vec![
                json!({"_id": "dc-north", "name": "North Hub", "address": "Sector 4", "isActive": true}),
                json!({"_id": "dc-old", "name": "Old Depot", "address": "Ring Road", "isActive": false}),
            ],
            ..Self::default()
        }
    }
}

// =============================================================================
// FakeBackend
// =============================================================================

/// A running fake backend. The server stops when this is dropped.
#[derive(Debug)]
pub struct FakeBackend {
    base_url: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl FakeBackend {
    /// Start a server with the seeded catalog and no carts.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState::seeded()));
        let app = Router::new().nest("/api", routes()).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read local address");
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Fake backend stopped: {e}");
            }
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
            server,
        }
    }

    /// Base URL clients should use.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client configuration for `user`, registering their bearer token.
    ///
    /// # Panics
    ///
    /// Panics if the base URL does not parse.
    #[must_use]
    pub fn config(&self, user: &str) -> ClientConfig {
        let token = format!("token-{user}");
        lock(&self.state)
            .tokens
            .insert(token.clone(), UserId::new(user));
        let mut config = ClientConfig::new(&self.base_url, token, UserId::new(user))
            .expect("Fake backend URL should parse");
        config.request_timeout = Duration::from_secs(5);
        config
    }

    /// A session for `user` with its own change bus.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn session(&self, user: &str) -> Session {
        Session::new(&self.config(user)).expect("Failed to build session")
    }

    /// A session for `user` publishing on `bus`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn session_on(&self, user: &str, bus: ChangeBus) -> Session {
        Session::with_bus(&self.config(user), bus).expect("Failed to build session")
    }

    /// Answer the next request with `status` and an optional message body.
    pub fn fail_next(&self, status: u16, message: Option<&str>) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        lock(&self.state).fail_next = Some(Failure::Status(status, message.map(str::to_string)));
    }

    /// Answer the next request to `route` (e.g. `"GET /wishlist/:userId"`)
    /// with `status`, leaving other routes alone.
    pub fn fail_next_on(&self, route: &str, status: u16, message: Option<&str>) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        lock(&self.state).route_failures.insert(
            route.to_string(),
            Failure::Status(status, message.map(str::to_string)),
        );
    }

    /// Answer the next request with 200 and a body that is not JSON.
    pub fn garble_next(&self) {
        lock(&self.state).fail_next = Some(Failure::Garbage);
    }

    /// Hold the next request for `delay` before handling it.
    pub fn delay_next(&self, delay: Duration) {
        lock(&self.state).delay_next = Some(delay);
    }

    /// Report every cart as owned by `user` from now on.
    pub fn report_cart_owner(&self, user: &str) {
        lock(&self.state).cart_owner_override = Some(UserId::new(user));
    }

    /// Requests received for `route` (e.g. `"POST /cart/add"`).
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        lock(&self.state).hits.get(route).copied().unwrap_or(0)
    }

    /// The cart as the server holds it.
    #[must_use]
    pub fn server_cart(&self, user: &str) -> Option<Cart> {
        lock(&self.state).carts.get(&UserId::new(user)).cloned()
    }

    /// Entries in the server-side wishlist of `user`.
    #[must_use]
    pub fn server_wishlist_len(&self, user: &str) -> usize {
        lock(&self.state)
            .wishlists
            .get(&UserId::new(user))
            .map_or(0, Vec::len)
    }

    /// An order as the server holds it.
    #[must_use]
    pub fn server_order(&self, order_id: &OrderId) -> Option<Order> {
        lock(&self.state)
            .orders
            .iter()
            .find(|o| &o.id == order_id)
            .cloned()
    }

    /// Add a product document to the catalog.
    pub fn add_product(&self, doc: Value) {
        lock(&self.state).products.push(doc);
    }

    /// Replace a product document (matched by `_id`).
    pub fn replace_product(&self, doc: Value) {
        let mut st = lock(&self.state);
        let id = doc.get("_id").cloned();
        st.products.retain(|p| p.get("_id") != id.as_ref());
        st.products.push(doc);
    }
}

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Routes
// =============================================================================

fn routes() -> Router<Shared> {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/add", post(add_to_cart))
        .route("/cart/update", post(update_cart))
        .route("/cart/remove/{prod_id}", delete(remove_from_cart))
        .route("/createorder", post(create_order))
        .route("/wishlist", post(add_to_wishlist))
        .route("/wishlist/{id}", get(get_wishlist).delete(remove_from_wishlist))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/categories", get(list_categories))
        .route("/deliverycentres", get(list_centres))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", put(set_order_status))
        .route("/orders/{id}/actual", put(set_actual_quantities))
}

/// Count the request, apply any injected failure and authenticate.
fn begin(
    app: &Shared,
    route: &'static str,
    headers: &HeaderMap,
) -> Result<(UserId, Option<Duration>), Response> {
    let mut st = lock(app);
    *st.hits.entry(route).or_default() += 1;

    let failure = st
        .fail_next
        .take()
        .or_else(|| st.route_failures.remove(route));
    match failure {
        Some(Failure::Status(status, message)) => {
            let body = message.map_or_else(|| json!({}), |m| json!({ "message": m }));
            return Err((status, Json(body)).into_response());
        }
        Some(Failure::Garbage) => {
            return Err((StatusCode::OK, "<html>gateway error</html>").into_response());
        }
        None => {}
    }

    let user = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| st.tokens.get(token))
        .cloned()
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Unauthorized"))?;

    Ok((user, st.delay_next.take()))
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn ok(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

macro_rules! begin_or_return {
    ($app:expr, $route:literal, $headers:expr) => {
        match begin(&$app, $route, &$headers) {
            Ok((user, delay)) => {
                pause(delay).await;
                user
            }
            Err(response) => return response,
        }
    };
}

// =============================================================================
// Cart
// =============================================================================

async fn get_cart(State(app): State<Shared>, headers: HeaderMap) -> Response {
    let user = begin_or_return!(app, "GET /cart", headers);
    let st = lock(&app);
    st.carts.get(&user).map_or_else(
        || error(StatusCode::INTERNAL_SERVER_ERROR, "Cart not found"),
        |cart| ok(cart_json(cart, st.cart_owner_override.as_ref())),
    )
}

async fn add_to_cart(
    State(app): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let user = begin_or_return!(app, "POST /cart/add", headers);
    let line = match line_from_body(&body) {
        Ok(line) => line,
        Err(message) => return error(StatusCode::BAD_REQUEST, message),
    };
    mutate_cart(&app, &user, CartMutation::Add(line), "Item added to cart", true)
}

async fn update_cart(
    State(app): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let user = begin_or_return!(app, "POST /cart/update", headers);
    let Some(product_id) = str_field(&body, "prod_ID") else {
        return error(StatusCode::BAD_REQUEST, "prod_ID is required");
    };
    let Some(current) = rate_field(&body, "currentRate") else {
        return error(StatusCode::BAD_REQUEST, "currentRate is required");
    };
    let Some(quantity) = quantity_field(&body, "quantity") else {
        return error(StatusCode::BAD_REQUEST, "quantity is required");
    };
    let mutation = CartMutation::SetQuantity {
        key: LineKey::new(product_id, current.key),
        quantity,
        new_rate: rate_field(&body, "selectedRate"),
    };
    mutate_cart(&app, &user, mutation, "Cart updated", false)
}

async fn remove_from_cart(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(prod_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let user = begin_or_return!(app, "DELETE /cart/remove", headers);
    let Some(rate) = rate_field(&body, "selectedRate") else {
        return error(StatusCode::BAD_REQUEST, "selectedRate is required");
    };
    let mutation = CartMutation::Remove(LineKey::new(prod_id, rate.key));
    mutate_cart(&app, &user, mutation, "Item removed from cart", false)
}

fn mutate_cart(
    app: &Shared,
    user: &UserId,
    mutation: CartMutation,
    message: &str,
    create: bool,
) -> Response {
    let mut st = lock(app);
    let owner_override = st.cart_owner_override.clone();
    if create {
        st.carts
            .entry(user.clone())
            .or_insert_with(|| Cart::empty(Some(user.clone())));
    }
    let Some(cart) = st.carts.get_mut(user) else {
        return error(StatusCode::NOT_FOUND, "Cart not found");
    };
    if let Err(e) = cart.apply(mutation) {
        return error(StatusCode::NOT_FOUND, &e.to_string());
    }
    reprice(cart);
    ok(json!({
        "message": message,
        "cart": cart_json(cart, owner_override.as_ref()),
    }))
}

fn line_from_body(body: &Value) -> Result<CartLine, &'static str> {
    let product_id = str_field(body, "prod_ID").ok_or("prod_ID is required")?;
    let rate = rate_field(body, "selectedRate").ok_or("selectedRate is required")?;
    let quantity = quantity_field(body, "quantity").ok_or("quantity is required")?;
    let display = LineDisplay {
        name: str_field(body, "prod_Name").unwrap_or_default(),
        image: str_field(body, "image").unwrap_or_default(),
        category: str_field(body, "prod_category").unwrap_or_default(),
    };
    if display.first_missing().is_some() {
        return Err("Missing product details");
    }
    let rates = body
        .get("prod_Rate")
        .and_then(Value::as_array)
        .map(|r| parse_rates(r))
        .unwrap_or_default();
    Ok(CartLine {
        product_id: ProductId::new(product_id),
        rate,
        quantity,
        display,
        rates,
    })
}

/// Price the cart: 5% GST, flat delivery under the threshold, no discount.
fn reprice(cart: &mut Cart) {
    let total = cart.lines_subtotal();
    let gst = Price::from((total.amount() * Decimal::new(5, 2)).round_dp(2));
    let delivery_charge = if total.is_zero() || total >= Price::from_rupees(FREE_DELIVERY_FROM) {
        Price::ZERO
    } else {
        Price::from_rupees(DELIVERY_CHARGE)
    };
    cart.set_totals(CartTotals {
        total,
        gst,
        delivery_charge,
        discount: Price::ZERO,
        grand_total: total + gst + delivery_charge,
    });
}

fn cart_json(cart: &Cart, owner_override: Option<&UserId>) -> Value {
    let totals = cart.totals();
    let items: Vec<Value> = cart
        .lines()
        .iter()
        .map(|line| {
            json!({
                "prod_ID": line.product_id,
                "prod_Name": line.display.name,
                "image": line.display.image,
                "selectedRate": line.rate,
                "quantity": line.quantity,
                "prod_Rate": line.rates.iter().map(freshmart_core::RateOption::to_json).collect::<Vec<_>>(),
                "prod_category": line.display.category,
            })
        })
        .collect();
    json!({
        "user_id": owner_override.or_else(|| cart.owner()),
        "items": items,
        "total": totals.total,
        "gst": totals.gst,
        "deliveryCharge": totals.delivery_charge,
        "discount": totals.discount,
        "grandTotal": totals.grand_total,
    })
}

// =============================================================================
// Orders
// =============================================================================

async fn create_order(
    State(app): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let user = begin_or_return!(app, "POST /createorder", headers);
    let Some(doc) = body.pointer("/orderdetails/order") else {
        return error(StatusCode::BAD_REQUEST, "orderdetails.order is required");
    };
    let lines: Vec<OrderLine> = doc
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(order_line_from_item).collect())
        .unwrap_or_default();
    if lines.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Order has no items");
    }

    let address = doc.get("address").cloned().unwrap_or_default();
    let order = Order {
        id: OrderId::new(uuid::Uuid::new_v4().to_string()),
        user_id: user.clone(),
        lines,
        totals: CartTotals {
            total: price_field(doc, "total"),
            gst: price_field(doc, "gst"),
            delivery_charge: price_field(doc, "deliveryCharge"),
            discount: price_field(doc, "discount"),
            grand_total: price_field(doc, "grandTotal"),
        },
        actual_grand_total: None,
        status: OrderStatus::OrderPlaced,
        address: DeliveryAddress {
            name: str_field(&address, "name").unwrap_or_default(),
            line1: str_field(&address, "addressLine1").unwrap_or_default(),
            line2: str_field(&address, "addressLine2"),
            city: str_field(&address, "city").unwrap_or_default(),
            pincode: str_field(&address, "pincode").unwrap_or_default(),
            phone: str_field(&address, "phone").unwrap_or_default(),
        },
        slot: DeliverySlot {
            day: str_field(doc, "deliveryDay").unwrap_or_default(),
            time: str_field(doc, "deliveryTime").unwrap_or_default(),
        },
        delivery_centre: str_field(doc, "deliveryCentre").map(DeliveryCentreId::new),
        notes: str_field(doc, "notes"),
        created_at: Some(Utc::now()),
    };

    let mut st = lock(&app);
    st.carts.insert(user.clone(), Cart::empty(Some(user)));
    let body = json!({ "message": "Order placed", "order": order_json(&order) });
    st.orders.push(order);
    ok(body)
}

fn order_line_from_item(item: &Value) -> Option<OrderLine> {
    let rate = rate_field(item, "selectedRate")?;
    let quantity =
        quantity_field(item, "order_quantity").or_else(|| quantity_field(item, "quantity"))?;
    Some(OrderLine {
        product_id: ProductId::new(str_field(item, "prod_ID")?),
        subtotal: item
            .get("subtotal")
            .and_then(|v| Price::from_json(v).ok())
            .unwrap_or_else(|| rate.value.times(quantity)),
        rate,
        quantity,
        display: LineDisplay {
            name: str_field(item, "prod_Name").unwrap_or_default(),
            image: str_field(item, "image").unwrap_or_default(),
            category: str_field(item, "prod_category").unwrap_or_default(),
        },
        actual_quantity: None,
        actual_subtotal: None,
    })
}

async fn list_orders(State(app): State<Shared>, headers: HeaderMap) -> Response {
    let user = begin_or_return!(app, "GET /orders", headers);
    let st = lock(&app);
    let orders: Vec<Value> = st
        .orders
        .iter()
        .filter(|o| o.user_id == user)
        .rev()
        .map(order_json)
        .collect();
    ok(json!({ "orders": orders }))
}

async fn get_order(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    begin_or_return!(app, "GET /orders/:id", headers);
    let st = lock(&app);
    st.orders
        .iter()
        .find(|o| o.id.as_str() == id)
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Order not found"),
            |order| ok(order_json(order)),
        )
}

async fn set_order_status(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    begin_or_return!(app, "PUT /orders/:id/status", headers);
    let Some(status) = body
        .get("status")
        .cloned()
        .and_then(|s| serde_json::from_value::<OrderStatus>(s).ok())
    else {
        return error(StatusCode::BAD_REQUEST, "Unknown status");
    };

    let mut st = lock(&app);
    let Some(order) = st.orders.iter_mut().find(|o| o.id.as_str() == id) else {
        return error(StatusCode::NOT_FOUND, "Order not found");
    };
    if !order.actions().iter().any(|a| a.target() == status) {
        return error(StatusCode::CONFLICT, "Invalid status transition");
    }
    order.status = status;
    ok(json!({ "order": order_json(order) }))
}

async fn set_actual_quantities(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    begin_or_return!(app, "PUT /orders/:id/actual", headers);
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut st = lock(&app);
    let Some(order) = st.orders.iter_mut().find(|o| o.id.as_str() == id) else {
        return error(StatusCode::NOT_FOUND, "Order not found");
    };
    for item in &items {
        let (Some(product_id), Some(rate)) =
            (str_field(item, "prod_ID"), rate_field(item, "selectedRate"))
        else {
            return error(StatusCode::BAD_REQUEST, "Line needs prod_ID and selectedRate");
        };
        let Some(line) = order
            .lines
            .iter_mut()
            .find(|l| l.product_id.as_str() == product_id && l.rate.key == rate.key)
        else {
            return error(StatusCode::NOT_FOUND, "Order line not found");
        };
        let actual = item
            .get("actual_quantity")
            .and_then(Value::as_u64)
            .and_then(|q| u32::try_from(q).ok());
        line.actual_quantity = actual;
        line.actual_subtotal = item
            .get("actual_subtotal")
            .and_then(|v| Price::from_json(v).ok());
    }
    order.actual_grand_total = body
        .get("actual_grandTotal")
        .and_then(|v| Price::from_json(v).ok());
    ok(json!({ "order": order_json(order) }))
}

fn order_json(order: &Order) -> Value {
    let items: Vec<Value> = order
        .lines
        .iter()
        .map(|line| {
            json!({
                "prod_ID": line.product_id,
                "prod_Name": line.display.name,
                "image": line.display.image,
                "prod_category": line.display.category,
                "selectedRate": line.rate,
                "order_quantity": line.quantity,
                "subtotal": line.subtotal,
                "actual_quantity": line.actual_quantity,
                "actual_subtotal": line.actual_subtotal,
            })
        })
        .collect();
    json!({
        "_id": order.id,
        "user_id": order.user_id,
        "items": items,
        "total": order.totals.total,
        "gst": order.totals.gst,
        "deliveryCharge": order.totals.delivery_charge,
        "discount": order.totals.discount,
        "grandTotal": order.totals.grand_total,
        "actual_grandTotal": order.actual_grand_total,
        "status": order.status,
        "address": {
            "name": order.address.name,
            "addressLine1": order.address.line1,
            "addressLine2": order.address.line2,
            "city": order.address.city,
            "pincode": order.address.pincode,
            "phone": order.address.phone,
        },
        "deliveryDay": order.slot.day,
        "deliveryTime": order.slot.time,
        "deliveryCentre": order.delivery_centre,
        "notes": order.notes,
        "createdAt": order.created_at.map(|t| t.to_rfc3339()),
    })
}

// =============================================================================
// Wishlist
// =============================================================================

async fn get_wishlist(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response {
    let user = begin_or_return!(app, "GET /wishlist/:userId", headers);
    if user.as_str() != user_id {
        return error(StatusCode::FORBIDDEN, "Not your wishlist");
    }
    let st = lock(&app);
    let entries: Vec<Value> = st
        .wishlists
        .get(&user)
        .map(|entries| {
            entries
                .iter()
                .map(|e| json!({ "_id": e.id, "prod_ID": e.product_id }))
                .collect()
        })
        .unwrap_or_default();
    ok(json!({ "wishlist": entries }))
}

async fn add_to_wishlist(
    State(app): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let user = begin_or_return!(app, "POST /wishlist", headers);
    let Some(product_id) = str_field(&body, "prod_ID") else {
        return error(StatusCode::BAD_REQUEST, "prod_ID is required");
    };
    let product_id = ProductId::new(product_id);

    let mut st = lock(&app);
    let entries = st.wishlists.entry(user).or_default();
    if entries.iter().any(|e| e.product_id == product_id) {
        return error(StatusCode::BAD_REQUEST, "Product already in wishlist");
    }
    entries.push(WishlistEntry {
        id: WishlistEntryId::new(uuid::Uuid::new_v4().to_string()),
        product_id,
    });
    ok(json!({ "message": "Added to wishlist" }))
}

async fn remove_from_wishlist(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let user = begin_or_return!(app, "DELETE /wishlist/:id", headers);
    let mut st = lock(&app);
    let entries = st.wishlists.entry(user).or_default();
    let before = entries.len();
    entries.retain(|e| e.id.as_str() != id);
    if entries.len() == before {
        return error(StatusCode::NOT_FOUND, "Wishlist entry not found");
    }
    ok(json!({ "message": "Removed from wishlist" }))
}

// =============================================================================
// Catalog
// =============================================================================

async fn list_products(
    State(app): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    begin_or_return!(app, "GET /products", headers);
    let st = lock(&app);
    let products: Vec<Value> = st
        .products
        .iter()
        .filter(|p| {
            query.get("category").is_none_or(|c| {
                p.pointer("/prod_category/_id").and_then(Value::as_str) == Some(c.as_str())
            })
        })
        .cloned()
        .collect();
    ok(json!({ "products": products }))
}

async fn get_product(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    begin_or_return!(app, "GET /products/:id", headers);
    let st = lock(&app);
    st.products
        .iter()
        .find(|p| p.get("_id").and_then(Value::as_str) == Some(id.as_str()))
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Product not found"),
            |p| ok(p.clone()),
        )
}

async fn list_categories(State(app): State<Shared>, headers: HeaderMap) -> Response {
    begin_or_return!(app, "GET /categories", headers);
    ok(Value::Array(lock(&app).categories.clone()))
}

async fn list_centres(State(app): State<Shared>, headers: HeaderMap) -> Response {
    begin_or_return!(app, "GET /deliverycentres", headers);
    ok(json!({ "data": lock(&app).centres.clone() }))
}

// =============================================================================
// Body helpers
// =============================================================================

fn str_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn rate_field(body: &Value, key: &str) -> Option<RateSelection> {
    body.get(key)
        .cloned()
        .and_then(|v| serde_json::from_value::<RateSelection>(v).ok())
        .filter(|r| !r.is_placeholder())
}

fn quantity_field(body: &Value, key: &str) -> Option<u32> {
    body.get(key)
        .and_then(Value::as_u64)
        .and_then(|q| u32::try_from(q).ok())
}

fn price_field(body: &Value, key: &str) -> Price {
    body.get(key)
        .and_then(|v| Price::from_json(v).ok())
        .unwrap_or_default()
}
