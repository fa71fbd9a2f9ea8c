//! Pure pricing math. Everything here is deterministic and side-effect free; the orchestrator assembles a quote
//! from these pieces once and persists exactly the numbers it showed the caller.

use serde::{Deserialize, Serialize};

use crate::db_types::{Cents, Laundromat};

/// The marketplace's cut, as a percentage of the final (post-discount) price. Collected on both sides of the
/// charge: added on top of the final price for the customer's total, and withheld from the final price for the
/// merchant's payout. The provider's application fee is therefore `total_charge - merchant_payout`, two fee slices.
pub const PLATFORM_FEE_PERCENT: u32 = 15;

const EARTH_RADIUS_MILES: f64 = 3959.0;

/// The platform's fee on a final price, rounded half-up to the cent.
pub fn platform_fee(final_price: Cents) -> Cents {
    final_price.percent_of(PLATFORM_FEE_PERCENT)
}

/// The discount a promo grants on `base_price`: `percent` of it, capped at `cap`, never negative and never more
/// than the base price itself.
pub fn discount_amount(base_price: Cents, percent: u32, cap: Cents) -> Cents {
    if base_price <= Cents::ZERO {
        return Cents::ZERO;
    }
    let raw = base_price.percent_of(percent);
    raw.min(cap).min(base_price).max(Cents::ZERO)
}

/// Great-circle distance between two coordinates, in miles.
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Picks the nearest laundromat that can actually serve the given point: it must be active and the point must fall
/// within its own delivery radius. Ties go to the first qualifying laundromat in iteration order.
pub fn nearest_laundromat(lat: f64, lon: f64, laundromats: &[Laundromat]) -> Option<(&Laundromat, f64)> {
    let mut best: Option<(&Laundromat, f64)> = None;
    for shop in laundromats.iter().filter(|l| l.active) {
        let distance = haversine_miles(lat, lon, shop.latitude, shop.longitude);
        if distance > shop.delivery_radius {
            continue;
        }
        match best {
            Some((_, d)) if distance >= d => {},
            _ => best = Some((shop, distance)),
        }
    }
    best
}

//--------------------------------------    PriceBreakdown     -------------------------------------------------------
/// The full money picture for one order. Assembled once per quote; every consumer (the order row, the payment row,
/// the provider charge, the response body) reads from the same breakdown so the components always balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// The laundromat's advertised price for the service.
    pub service_price: Cents,
    pub discount: Cents,
    /// `max(0, service_price - discount)`.
    pub final_price: Cents,
    pub platform_fee: Cents,
    /// What the laundromat receives: `final_price - platform_fee`. Balances to the cent by construction.
    pub merchant_payout: Cents,
    /// What the customer is charged: `final_price + platform_fee`.
    pub total_charge: Cents,
}

impl PriceBreakdown {
    pub fn quote(service_price: Cents, discount: Cents) -> Self {
        let final_price = (service_price - discount).max(Cents::ZERO);
        let platform_fee = platform_fee(final_price);
        Self {
            service_price,
            discount,
            final_price,
            platform_fee,
            merchant_payout: final_price - platform_fee,
            total_charge: final_price + platform_fee,
        }
    }
}
