// Ticket pricing
//
// All amounts are integer cents in AUD.

pub const CURRENCY: &str = "aud";

/// Booking fee as a fraction of the base cost
const BOOKING_FEE_RATE: f64 = 0.15;

/// Fees are rounded to the nearest multiple of this many cents
const BOOKING_FEE_STEP: i64 = 50;

/// Booking fee for a base cost: 15%, rounded to the nearest 50 cents.
pub fn booking_fee(base_cost: i64) -> i64 {
    if base_cost <= 0 {
        return 0;
    }
    let steps = (base_cost as f64 * BOOKING_FEE_RATE / BOOKING_FEE_STEP as f64).round() as i64;
    steps * BOOKING_FEE_STEP
}

/// Amount charged to the attendee
pub fn total_amount(base_cost: i64) -> i64 {
    base_cost + booking_fee(base_cost)
}
