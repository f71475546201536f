//! In-memory stand-in for the storefront REST API.
//!
//! Serves the routes the client core calls (auth, products, users, bookings)
//! under `/api`, checks bearer tokens the way the hosted backend does, and
//! can emulate the hosted backend's slow first response after idling.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{Path, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@storefront.test";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const CUSTOMER_EMAIL: &str = "asha@storefront.test";
pub const CUSTOMER_PASSWORD: &str = "asha123";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub availability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub stock: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub condition: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub availability: String,
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: String,
}

#[derive(Clone, Debug)]
struct Account {
    user: User,
    password: String,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_image: Option<String>,
    pub product_category: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub quantity: u32,
    pub booking_date: String,
    pub actual_price: f64,
    pub strike_price: u64,
    pub selling_price: u64,
    pub total_amount: u64,
    pub discount_percentage: u8,
    pub status: BookingStatus,
    pub coupon_code: String,
    pub order_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

impl Booking {
    fn is_open(&self) -> bool {
        matches!(self.status, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    pub product_id: String,
    pub product_name: String,
    pub product_image: Option<String>,
    #[serde(default)]
    pub product_category: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub quantity: u32,
    pub booking_date: String,
    #[serde(default)]
    pub actual_price: f64,
    pub strike_price: u64,
    pub selling_price: u64,
    pub total_amount: u64,
    pub discount_percentage: u8,
}

#[derive(Deserialize)]
pub struct CancelBooking {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Default)]
pub struct Store {
    products: HashMap<String, Product>,
    accounts: Vec<Account>,
    bookings: Vec<Booking>,
    tokens: HashMap<String, String>,
}

impl Store {
    /// One admin, one customer, and a single priced product.
    pub fn seeded() -> Self {
        let mut store = Self::default();
        store.accounts.push(Account {
            user: User {
                id: new_id(),
                name: "Store Admin".to_string(),
                email: ADMIN_EMAIL.to_string(),
                phone: None,
                role: "admin".to_string(),
            },
            password: ADMIN_PASSWORD.to_string(),
        });
        store.accounts.push(Account {
            user: User {
                id: new_id(),
                name: "Asha".to_string(),
                email: CUSTOMER_EMAIL.to_string(),
                phone: Some("9876543210".to_string()),
                role: "user".to_string(),
            },
            password: CUSTOMER_PASSWORD.to_string(),
        });
        let product = Product {
            id: new_id(),
            name: "Pixel 7".to_string(),
            description: "Lightly used, battery at 91%".to_string(),
            category: "Mobiles".to_string(),
            condition: "Excellent".to_string(),
            kind: "Refurbished".to_string(),
            availability: "In Stock".to_string(),
            price: Some(1000.0),
            stock: 5,
            features: vec!["8GB RAM".to_string(), "128GB storage".to_string()],
            images: vec!["https://img.storefront.test/pixel7.jpg".to_string()],
        };
        store.products.insert(product.id.clone(), product);
        store
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    cold_start: Option<Duration>,
    warmed: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            db: Arc::new(RwLock::new(store)),
            cold_start: None,
            warmed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Delay the very first request by `delay`.
    pub fn with_cold_start(mut self, delay: Duration) -> Self {
        self.cold_start = Some(delay).filter(|d| !d.is_zero());
        self
    }
}

/// Error body in the backend's `{"message": ...}` shape.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiFailure>;

pub fn app() -> Router {
    app_with_state(AppState::new(Store::seeded()))
}

pub fn app_with_state(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/users", get(list_users))
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/coupon/{code}", get(find_by_coupon))
        .route("/bookings/{id}/cancel", patch(cancel_booking))
        .route("/bookings/{id}/complete", patch(complete_booking));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), cold_start))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn cold_start(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(delay) = state.cold_start {
        if !state.warmed.swap(true, Ordering::SeqCst) {
            log::info!("cold start: delaying first request by {delay:?}");
            tokio::time::sleep(delay).await;
        }
    }
    next.run(request).await
}

/// Parse a `COLD_START_MS` value. Unset or malformed means no delay; a
/// malformed value is logged rather than silently dropped.
pub fn cold_start_delay(raw: Option<&str>) -> Duration {
    let Some(raw) = raw else {
        return Duration::ZERO;
    };
    match raw.trim().parse() {
        Ok(ms) => Duration::from_millis(ms),
        Err(e) => {
            log::warn!("ignoring COLD_START_MS={raw:?}: {e}");
            Duration::ZERO
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn coupon_code() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("SF-{}", id[..8].to_uppercase())
}

fn authenticate(store: &Store, headers: &HeaderMap) -> ApiResult<User> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "No token provided"))?;
    let user_id = store
        .tokens
        .get(token)
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;
    store
        .accounts
        .iter()
        .find(|a| &a.user.id == user_id)
        .map(|a| a.user.clone())
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "User no longer exists"))
}

fn require_admin(store: &Store, headers: &HeaderMap) -> ApiResult<User> {
    let user = authenticate(store, headers)?;
    if user.role != "admin" {
        return Err(ApiFailure::new(StatusCode::FORBIDDEN, "Admin access required"));
    }
    Ok(user)
}

async fn login(State(state): State<AppState>, Json(input): Json<Credentials>) -> ApiResult<Json<serde_json::Value>> {
    let mut store = state.db.write().await;
    let user = store
        .accounts
        .iter()
        .find(|a| a.user.email.eq_ignore_ascii_case(input.email.trim()) && a.password == input.password)
        .map(|a| a.user.clone())
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;
    let token = new_id();
    store.tokens.insert(token.clone(), user.id.clone());
    Ok(Json(json!({ "token": token, "user": user })))
}

async fn list_products(State(state): State<AppState>) -> Json<serde_json::Value> {
    let store = state.db.read().await;
    let mut products: Vec<&Product> = store.products.values().collect();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Json(json!({ "products": products }))
}

fn validate_product(input: &ProductInput) -> ApiResult<()> {
    if input.name.trim().is_empty() {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Product name is required"));
    }
    if input.price.is_some_and(|p| p < 0.0) {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Price must be non-negative"));
    }
    Ok(())
}

fn product_from_input(id: String, input: ProductInput) -> Product {
    Product {
        id,
        name: input.name,
        description: input.description,
        category: input.category,
        condition: input.condition,
        kind: input.kind,
        availability: input.availability,
        price: input.price,
        stock: input.stock,
        features: input.features,
        images: input.images,
    }
}

async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<ProductInput>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let mut store = state.db.write().await;
    require_admin(&store, &headers)?;
    validate_product(&input)?;
    let product = product_from_input(new_id(), input);
    store.products.insert(product.id.clone(), product.clone());
    Ok((StatusCode::CREATED, Json(json!({ "product": product }))))
}

async fn update_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut store = state.db.write().await;
    require_admin(&store, &headers)?;
    validate_product(&input)?;
    if !store.products.contains_key(&id) {
        return Err(ApiFailure::new(StatusCode::NOT_FOUND, "Product not found"));
    }
    let product = product_from_input(id.clone(), input);
    store.products.insert(id, product.clone());
    Ok(Json(json!({ "product": product })))
}

async fn delete_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let mut store = state.db.write().await;
    require_admin(&store, &headers)?;
    store
        .products
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Product not found"))
}

async fn list_users(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<serde_json::Value>> {
    let store = state.db.read().await;
    require_admin(&store, &headers)?;
    let users: Vec<&User> = store.accounts.iter().map(|a| &a.user).collect();
    Ok(Json(json!({ "users": users })))
}

async fn list_bookings(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<serde_json::Value>> {
    let store = state.db.read().await;
    let user = authenticate(&store, &headers)?;
    let bookings: Vec<&Booking> = store
        .bookings
        .iter()
        .rev()
        .filter(|b| user.role == "admin" || b.user_id == user.id)
        .collect();
    Ok(Json(json!({ "bookings": bookings })))
}

async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateBooking>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let mut store = state.db.write().await;
    let user = authenticate(&store, &headers)?;
    if input.quantity == 0 {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Quantity must be at least 1"));
    }
    let product = store
        .products
        .get_mut(&input.product_id)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Product not found"))?;
    if product.stock < input.quantity {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Insufficient stock"));
    }
    product.stock -= input.quantity;

    let booking = Booking {
        id: new_id(),
        user_id: user.id,
        product_id: input.product_id,
        product_name: input.product_name,
        product_image: input.product_image,
        product_category: input.product_category,
        customer_name: input.customer_name,
        customer_phone: input.customer_phone,
        customer_address: input.customer_address,
        quantity: input.quantity,
        booking_date: input.booking_date,
        actual_price: input.actual_price,
        strike_price: input.strike_price,
        selling_price: input.selling_price,
        total_amount: input.total_amount,
        discount_percentage: input.discount_percentage,
        status: BookingStatus::Pending,
        coupon_code: coupon_code(),
        order_date: now(),
        completed_at: None,
        updated_at: None,
        cancellation_reason: None,
    };
    store.bookings.push(booking.clone());
    Ok((StatusCode::CREATED, Json(json!({ "booking": booking }))))
}

async fn find_by_coupon(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let store = state.db.read().await;
    require_admin(&store, &headers)?;
    store
        .bookings
        .iter()
        .find(|b| b.coupon_code.eq_ignore_ascii_case(code.trim()))
        .map(|b| Json(json!({ "booking": b })))
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Booking not found"))
}

async fn cancel_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<CancelBooking>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut guard = state.db.write().await;
    let store = &mut *guard;
    let user = authenticate(store, &headers)?;
    let booking = store
        .bookings
        .iter_mut()
        .find(|b| b.id == id)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Booking not found"))?;
    if user.role != "admin" && booking.user_id != user.id {
        return Err(ApiFailure::new(StatusCode::FORBIDDEN, "Not your booking"));
    }
    if !booking.is_open() {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Booking can no longer be cancelled"));
    }
    booking.status = BookingStatus::Cancelled;
    booking.cancellation_reason = Some(input.reason.unwrap_or_else(|| "Cancelled".to_string()));
    booking.updated_at = Some(now());
    let booking = booking.clone();
    if let Some(product) = store.products.get_mut(&booking.product_id) {
        product.stock += booking.quantity;
    }
    Ok(Json(json!({ "booking": booking })))
}

async fn complete_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut store = state.db.write().await;
    require_admin(&store, &headers)?;
    let booking = store
        .bookings
        .iter_mut()
        .find(|b| b.id == id)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Booking not found"))?;
    if !booking.is_open() {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Booking is already closed"));
    }
    let stamp = now();
    booking.status = BookingStatus::Completed;
    booking.completed_at = Some(stamp.clone());
    booking.updated_at = Some(stamp);
    Ok(Json(json!({ "booking": booking })))
}
