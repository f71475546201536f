//! Display pricing for catalogue items.
//!
//! # Design
//! Every product carries a single admin-entered base price. The storefront
//! shows two prices derived from it: a crossed-out strike price and the
//! selling price actually charged. Both listing and booking go through
//! `display_prices` so the two markups can never drift apart.
//!
//! The discount percentage is computed from the *rounded* prices, so the
//! advertised percentage always matches the two numbers shown next to it.

use serde::{Deserialize, Serialize};

/// Markup applied to the base price to obtain the strike price.
pub const STRIKE_MARKUP: f64 = 1.16;

/// Markup applied to the base price to obtain the selling price.
pub const SELLING_MARKUP: f64 = 1.08;

/// The prices shown for one product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub strike_price: u64,
    pub selling_price: u64,
    pub discount_percentage: u8,
}

impl PriceQuote {
    /// `false` for the all-zero quote; callers render "contact for price".
    pub fn is_priced(&self) -> bool {
        self.selling_price > 0
    }

    pub fn total(&self, quantity: u32) -> u64 {
        self.selling_price.saturating_mul(u64::from(quantity))
    }

    /// Amount saved against the strike price for `quantity` units.
    pub fn savings(&self, quantity: u32) -> u64 {
        self.strike_price
            .saturating_mul(u64::from(quantity))
            .saturating_sub(self.total(quantity))
    }
}

/// Derive strike price, selling price, and discount from a base price.
///
/// Zero, negative, and non-finite inputs produce the all-zero quote.
pub fn display_prices(base_price: f64) -> PriceQuote {
    if !base_price.is_finite() || base_price <= 0.0 {
        return PriceQuote::default();
    }

    let strike_price = (base_price * STRIKE_MARKUP).round() as u64;
    let selling_price = (base_price * SELLING_MARKUP).round() as u64;
    if strike_price == 0 {
        return PriceQuote::default();
    }

    let spread = strike_price.saturating_sub(selling_price) as f64;
    let discount_percentage = (100.0 * spread / strike_price as f64).round() as u8;

    PriceQuote {
        strike_price,
        selling_price,
        discount_percentage,
    }
}
