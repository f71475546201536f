//! Storefront DTOs.
//!
//! # Design
//! These mirror the backend's JSON schema (camelCase fields, document ids
//! under `_id`) but are defined independently from the mock-server crate.
//! Integration tests catch schema drift between the two.
//!
//! The backend wraps every payload in a named envelope (`{"products": [...]}`,
//! `{"booking": {...}}`); the envelope structs are crate-private.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::price::{display_prices, PriceQuote};

/// Catch-all value for category and condition filters.
pub const ALL: &str = "All";

pub const DESCRIPTION_MIN_CHARS: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// A catalogue item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
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
    /// Admin-entered base price. Absent means "contact for price".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Product {
    pub fn display_prices(&self) -> PriceQuote {
        display_prices(self.price.unwrap_or_default())
    }

    /// First gallery image, falling back to the legacy single `image` field.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().or(self.image.as_ref()).map(String::as_str)
    }
}

/// Admin payload for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub availability: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub stock: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ProductInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("product name is required".to_string()));
        }
        let len = self.description.chars().count();
        if !(DESCRIPTION_MIN_CHARS..=DESCRIPTION_MAX_CHARS).contains(&len) {
            return Err(ApiError::Validation(format!(
                "description must be between {DESCRIPTION_MIN_CHARS} and {DESCRIPTION_MAX_CHARS} characters"
            )));
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(ApiError::Validation("price must be a non-negative number".to_string()));
            }
        }
        Ok(())
    }

    /// Blank feature lines are dropped and the rest trimmed.
    pub fn normalized(mut self) -> Self {
        self.features = self
            .features
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        self
    }
}

/// Catalogue search as offered on the products page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub search: String,
    pub category: Option<String>,
    pub condition: Option<String>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let needle = self.search.trim().to_lowercase();
        let text_ok = needle.is_empty()
            || product.name.to_lowercase().contains(&needle)
            || product.description.to_lowercase().contains(&needle);
        text_ok
            && facet_matches(self.category.as_deref(), &product.category)
            && facet_matches(self.condition.as_deref(), &product.condition)
    }

    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

fn facet_matches(wanted: Option<&str>, actual: &str) -> bool {
    match wanted {
        None | Some(ALL) => true,
        Some(w) => w == actual,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

/// A customer's reservation of a product, as tracked by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
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
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

impl Booking {
    /// Still actionable: neither completed nor cancelled.
    pub fn is_open(&self) -> bool {
        !matches!(self.status, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn savings(&self) -> u64 {
        self.strike_price
            .saturating_mul(u64::from(self.quantity))
            .saturating_sub(self.total_amount)
    }

    /// Short display reference: last eight characters of the id, uppercased.
    pub fn reference(&self) -> String {
        let skip = self.id.chars().count().saturating_sub(8);
        self.id.chars().skip(skip).collect::<String>().to_uppercase()
    }
}

/// What the customer enters in the booking form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingForm {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub quantity: u32,
    pub booking_date: String,
}

impl BookingForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        let required = [
            ("customer name", &self.customer_name),
            ("customer phone", &self.customer_phone),
            ("customer address", &self.customer_address),
            ("booking date", &self.booking_date),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ApiError::Validation(format!("{field} is required")));
        }
        if self.quantity == 0 {
            return Err(ApiError::Validation("quantity must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Order payload sent to `POST /bookings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
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
}

impl CreateBooking {
    /// Validate `form` and price the order from the product's base price.
    pub fn for_product(product: &Product, form: &BookingForm) -> Result<Self, ApiError> {
        form.validate()?;
        let quote = product.display_prices();
        Ok(Self {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            product_image: product.primary_image().map(str::to_string),
            product_category: product.category.clone(),
            customer_name: form.customer_name.trim().to_string(),
            customer_phone: form.customer_phone.trim().to_string(),
            customer_address: form.customer_address.trim().to_string(),
            quantity: form.quantity,
            booking_date: form.booking_date.clone(),
            actual_price: product.price.unwrap_or_default(),
            strike_price: quote.strike_price,
            selling_price: quote.selling_price,
            total_amount: quote.total(form.quantity),
            discount_percentage: quote.discount_percentage,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBooking {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductList {
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductEnvelope {
    pub product: Product,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserList {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookingList {
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookingEnvelope {
    pub booking: Booking,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> Product {
        serde_json::from_str(
            r#"{
                "_id": "665f1c2ab1e4a0f9d3c7e001",
                "name": "Pixel 7",
                "description": "Lightly used, battery at 91%",
                "category": "Mobiles",
                "condition": "Excellent",
                "type": "Refurbished",
                "availability": "In Stock",
                "price": 1000,
                "stock": 3,
                "images": ["https://img.test/p7.jpg"]
            }"#,
        )
        .unwrap()
    }

    fn form() -> BookingForm {
        BookingForm {
            customer_name: "Asha".to_string(),
            customer_phone: "9876543210".to_string(),
            customer_address: "12 MG Road".to_string(),
            quantity: 2,
            booking_date: "2026-10-20".to_string(),
        }
    }

    #[test]
    fn product_parses_backend_shape() {
        let p = phone();
        assert_eq!(p.kind, "Refurbished");
        assert_eq!(p.price, Some(1000.0));
        assert!(p.features.is_empty());
        assert_eq!(p.primary_image(), Some("https://img.test/p7.jpg"));
    }

    #[test]
    fn primary_image_falls_back_to_legacy_field() {
        let mut p = phone();
        p.images.clear();
        p.image = Some("legacy.jpg".to_string());
        assert_eq!(p.primary_image(), Some("legacy.jpg"));
    }

    #[test]
    fn unpriced_product_quotes_zero() {
        let mut p = phone();
        p.price = None;
        assert!(!p.display_prices().is_priced());
    }

    #[test]
    fn booking_payload_uses_shared_pricing() {
        let order = CreateBooking::for_product(&phone(), &form()).unwrap();
        assert_eq!(order.strike_price, 1160);
        assert_eq!(order.selling_price, 1080);
        assert_eq!(order.discount_percentage, 7);
        assert_eq!(order.total_amount, 2160);
        assert_eq!(order.actual_price, 1000.0);
        assert_eq!(order.product_image.as_deref(), Some("https://img.test/p7.jpg"));

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["productId"], "665f1c2ab1e4a0f9d3c7e001");
        assert_eq!(json["totalAmount"], 2160);
    }

    #[test]
    fn booking_form_requires_every_field() {
        let mut f = form();
        f.customer_address = "   ".to_string();
        let err = CreateBooking::for_product(&phone(), &f).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "customer address is required"));

        let mut f = form();
        f.quantity = 0;
        assert!(f.validate().is_err());
    }

    #[test]
    fn filter_by_search_category_and_condition() {
        let mut laptop = phone();
        laptop.name = "ThinkPad X1".to_string();
        laptop.description = "Business laptop".to_string();
        laptop.category = "Laptops".to_string();
        laptop.condition = "Good".to_string();
        let catalogue = vec![phone(), laptop];

        let all = ProductFilter::default();
        assert_eq!(all.apply(&catalogue).len(), 2);

        let search = ProductFilter {
            search: "BATTERY".to_string(),
            ..Default::default()
        };
        assert_eq!(search.apply(&catalogue)[0].name, "Pixel 7");

        let category = ProductFilter {
            category: Some("Laptops".to_string()),
            condition: Some(ALL.to_string()),
            ..Default::default()
        };
        assert_eq!(category.apply(&catalogue)[0].name, "ThinkPad X1");

        let none = ProductFilter {
            condition: Some("Fair".to_string()),
            ..Default::default()
        };
        assert!(none.apply(&catalogue).is_empty());
    }

    #[test]
    fn product_input_validation() {
        let input = ProductInput {
            name: "Galaxy S21".to_string(),
            description: "short".to_string(),
            category: "Mobiles".to_string(),
            condition: "Good".to_string(),
            kind: "Used".to_string(),
            availability: "In Stock".to_string(),
            price: Some(15000.0),
            stock: 1,
            features: vec![" 8GB RAM ".to_string(), "".to_string()],
            images: Vec::new(),
        };
        assert!(input.validate().is_err());

        let input = ProductInput {
            description: "Works perfectly, minor scuffs".to_string(),
            ..input
        }
        .normalized();
        assert!(input.validate().is_ok());
        assert_eq!(input.features, vec!["8GB RAM".to_string()]);

        let negative = ProductInput {
            price: Some(-1.0),
            ..input
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn booking_helpers() {
        let booking: Booking = serde_json::from_str(
            r#"{
                "_id": "665f1c2ab1e4a0f9d3c7e0ab",
                "productId": "p1",
                "productName": "Pixel 7",
                "customerName": "Asha",
                "customerPhone": "9876543210",
                "customerAddress": "12 MG Road",
                "quantity": 2,
                "bookingDate": "2026-10-20",
                "strikePrice": 1160,
                "sellingPrice": 1080,
                "totalAmount": 2160,
                "discountPercentage": 7,
                "status": "confirmed",
                "couponCode": "SF-1A2B3C4D"
            }"#,
        )
        .unwrap();
        assert!(booking.is_open());
        assert_eq!(booking.savings(), 160);
        assert_eq!(booking.reference(), "D3C7E0AB");

        let done = Booking {
            status: BookingStatus::Cancelled,
            ..booking
        };
        assert!(!done.is_open());
    }
}
