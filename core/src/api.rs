//! `Storefront`: every API operation as one call.
//!
//! Each method is `build_*` → `HttpClient::send` → `parse_*`. Failures from
//! any stage are returned to the caller; the sign-out side effect of a 401
//! has already happened by the time the error comes back.

use std::sync::Arc;

use log::info;

use crate::client::StoreClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http_client::HttpClient;
use crate::session::{AuthListener, SessionStore};
use crate::transport::Transport;
use crate::types::{Booking, BookingForm, CreateBooking, Credentials, LoginResponse, Product, ProductInput, User};

#[derive(Debug, Clone)]
pub struct Storefront {
    client: StoreClient,
    http: HttpClient,
}

impl Storefront {
    pub fn new(http: HttpClient) -> Self {
        Self {
            client: StoreClient::new(&http.config().base_url),
            http,
        }
    }

    /// Storefront over the default blocking transport.
    pub fn connect(config: ClientConfig, session: Arc<dyn SessionStore>, listener: Arc<dyn AuthListener>) -> Self {
        Self::new(HttpClient::from_config(config, session, listener))
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionStore>,
        listener: Arc<dyn AuthListener>,
    ) -> Self {
        Self::new(HttpClient::new(config, transport, session, listener))
    }

    pub fn client(&self) -> &StoreClient {
        &self.client
    }

    pub fn is_signed_in(&self) -> bool {
        self.http.session().get().is_some()
    }

    /// Authenticate and keep the returned token for subsequent calls.
    pub fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let req = self.client.build_login(credentials)?;
        let login = self.client.parse_login(self.http.send(req)?)?;
        self.http.session().store(&login.token);
        info!("signed in as {}", login.user.email);
        Ok(login)
    }

    /// Drop the local credential. Unlike a rejected token, this is not
    /// reported to the `AuthListener`.
    pub fn logout(&self) {
        self.http.session().clear();
    }

    pub fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let req = self.client.build_list_products();
        self.client.parse_list_products(self.http.send(req)?)
    }

    pub fn create_product(&self, input: &ProductInput) -> Result<Product, ApiError> {
        let req = self.client.build_create_product(input)?;
        self.client.parse_create_product(self.http.send(req)?)
    }

    pub fn update_product(&self, id: &str, input: &ProductInput) -> Result<Product, ApiError> {
        let req = self.client.build_update_product(id, input)?;
        self.client.parse_update_product(self.http.send(req)?)
    }

    pub fn delete_product(&self, id: &str) -> Result<(), ApiError> {
        let req = self.client.build_delete_product(id);
        self.client.parse_delete_product(self.http.send(req)?)
    }

    pub fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let req = self.client.build_list_users();
        self.client.parse_list_users(self.http.send(req)?)
    }

    pub fn list_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        let req = self.client.build_list_bookings();
        self.client.parse_list_bookings(self.http.send(req)?)
    }

    /// Price and place a booking for `product`.
    pub fn book(&self, product: &Product, form: &BookingForm) -> Result<Booking, ApiError> {
        let order = CreateBooking::for_product(product, form)?;
        let req = self.client.build_create_booking(&order)?;
        self.client.parse_create_booking(self.http.send(req)?)
    }

    pub fn find_booking_by_coupon(&self, coupon_code: &str) -> Result<Booking, ApiError> {
        let req = self.client.build_find_booking_by_coupon(coupon_code)?;
        self.client.parse_find_booking_by_coupon(self.http.send(req)?)
    }

    pub fn cancel_booking(&self, id: &str, reason: &str) -> Result<Booking, ApiError> {
        let req = self.client.build_cancel_booking(id, reason)?;
        self.client.parse_cancel_booking(self.http.send(req)?)
    }

    pub fn complete_booking(&self, id: &str) -> Result<Booking, ApiError> {
        let req = self.client.build_complete_booking(id);
        self.client.parse_complete_booking(self.http.send(req)?)
    }
}
