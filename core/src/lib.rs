//! Client core for the second-hand electronics storefront.
//!
//! # Overview
//! Two leaf utilities and the API surface built on them:
//!
//! - [`display_prices`] turns an admin-entered base price into the strike
//!   price, selling price, and discount shown to customers.
//! - [`HttpClient`] attaches the stored bearer token to every request,
//!   retries once on timeout, and signs the user out when the backend
//!   answers 401.
//! - [`StoreClient`] builds and parses the individual REST calls
//!   (products, bookings, users, login) without touching the network, and
//!   [`Storefront`] runs them through `HttpClient`.
//!
//! # Design
//! - Credential storage and the sign-out hook are injected
//!   ([`SessionStore`], [`AuthListener`]), as is the network ([`Transport`]).
//! - Types use owned `String` / `Vec` fields; DTOs are defined independently
//!   from the mock-server crate and integration tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod http_client;
pub mod price;
pub mod session;
pub mod transport;
pub mod types;

pub use api::Storefront;
pub use client::StoreClient;
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use http_client::HttpClient;
pub use price::{display_prices, PriceQuote};
pub use session::{AuthListener, FileSessionStore, MemorySessionStore, NoopAuthListener, SessionStore, LOGIN_ROUTE};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Booking, BookingForm, BookingStatus, CancelBooking, CreateBooking, Credentials, LoginResponse, Product,
    ProductFilter, ProductInput, User,
};
