//! Stateless request builder and response parser for the storefront API.
//!
//! # Design
//! `StoreClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Executing the round-trip (credential, retry, sign-out) is `HttpClient`'s
//! job; `Storefront` wires the two together.

use serde::de::DeserializeOwned;
use serde::Serialize;
use urlencoding::encode;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Booking, BookingEnvelope, BookingList, CancelBooking, CreateBooking, Credentials, LoginResponse, Product,
    ProductEnvelope, ProductInput, ProductList, User, UserList,
};

/// Synchronous, stateless client for the storefront API.
#[derive(Debug, Clone)]
pub struct StoreClient {
    base_url: String,
}

impl StoreClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn json_request<T: Serialize>(&self, method: HttpMethod, path: &str, input: &T) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest::new(method, self.url(path))
            .with_header("content-type", "application/json")
            .with_body(body))
    }

    // --- auth ---

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/login", credentials)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResponse, ApiError> {
        check_status(&response, &[200])?;
        decode(&response)
    }

    // --- products ---

    pub fn build_list_products(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url("/products"))
    }

    pub fn parse_list_products(&self, response: HttpResponse) -> Result<Vec<Product>, ApiError> {
        check_status(&response, &[200])?;
        decode::<ProductList>(&response).map(|l| l.products)
    }

    pub fn build_create_product(&self, input: &ProductInput) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        self.json_request(HttpMethod::Post, "/products", input)
    }

    pub fn parse_create_product(&self, response: HttpResponse) -> Result<Product, ApiError> {
        check_status(&response, &[201])?;
        decode::<ProductEnvelope>(&response).map(|e| e.product)
    }

    pub fn build_update_product(&self, id: &str, input: &ProductInput) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        self.json_request(HttpMethod::Put, &format!("/products/{}", encode(id)), input)
    }

    pub fn parse_update_product(&self, response: HttpResponse) -> Result<Product, ApiError> {
        check_status(&response, &[200])?;
        decode::<ProductEnvelope>(&response).map(|e| e.product)
    }

    pub fn build_delete_product(&self, id: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Delete, self.url(&format!("/products/{}", encode(id))))
    }

    pub fn parse_delete_product(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, &[200, 204])
    }

    // --- users ---

    pub fn build_list_users(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url("/users"))
    }

    pub fn parse_list_users(&self, response: HttpResponse) -> Result<Vec<User>, ApiError> {
        check_status(&response, &[200])?;
        decode::<UserList>(&response).map(|l| l.users)
    }

    // --- bookings ---

    pub fn build_list_bookings(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url("/bookings"))
    }

    pub fn parse_list_bookings(&self, response: HttpResponse) -> Result<Vec<Booking>, ApiError> {
        check_status(&response, &[200])?;
        decode::<BookingList>(&response).map(|l| l.bookings)
    }

    pub fn build_create_booking(&self, input: &CreateBooking) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/bookings", input)
    }

    pub fn parse_create_booking(&self, response: HttpResponse) -> Result<Booking, ApiError> {
        check_status(&response, &[201])?;
        decode::<BookingEnvelope>(&response).map(|e| e.booking)
    }

    pub fn build_find_booking_by_coupon(&self, coupon_code: &str) -> Result<HttpRequest, ApiError> {
        let code = coupon_code.trim();
        if code.is_empty() {
            return Err(ApiError::Validation("coupon code is required".to_string()));
        }
        Ok(HttpRequest::new(HttpMethod::Get, self.url(&format!("/bookings/coupon/{}", encode(code)))))
    }

    pub fn parse_find_booking_by_coupon(&self, response: HttpResponse) -> Result<Booking, ApiError> {
        check_status(&response, &[200])?;
        decode::<BookingEnvelope>(&response).map(|e| e.booking)
    }

    pub fn build_cancel_booking(&self, id: &str, reason: &str) -> Result<HttpRequest, ApiError> {
        let input = CancelBooking {
            reason: reason.to_string(),
        };
        self.json_request(HttpMethod::Patch, &format!("/bookings/{}/cancel", encode(id)), &input)
    }

    pub fn parse_cancel_booking(&self, response: HttpResponse) -> Result<Booking, ApiError> {
        check_status(&response, &[200])?;
        decode::<BookingEnvelope>(&response).map(|e| e.booking)
    }

    pub fn build_complete_booking(&self, id: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Patch, self.url(&format!("/bookings/{}/complete", encode(id))))
    }

    pub fn parse_complete_booking(&self, response: HttpResponse) -> Result<Booking, ApiError> {
        check_status(&response, &[200])?;
        decode::<BookingEnvelope>(&response).map(|e| e.booking)
    }
}

/// Map unexpected status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: &[u16]) -> Result<(), ApiError> {
    if expected.contains(&response.status) {
        return Ok(());
    }
    if response.is_success() {
        return Err(ApiError::Http {
            status: response.status,
            message: format!("unexpected status, wanted one of {expected:?}"),
            body: response.body.clone(),
        });
    }
    Err(ApiError::from_status(response.status, &response.body))
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
