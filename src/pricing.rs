//! Pricing calculator
//!
//! Pure fee computation for a rental quote. No I/O, no clock, no state;
//! the same input always yields the same breakdown. Amounts are exact
//! decimals rounded to cents, so the snapshot stored on the booking matches
//! what the gateway is asked to authorize.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::FeesConfig,
    error::{AppError, AppResult},
};

/// Input to a pricing computation
#[derive(Debug, Clone)]
pub struct PricingInput {
    pub daily_rate: Decimal,
    pub days: u32,
    pub include_insurance: bool,
    pub security_deposit: Decimal,
    pub delivery_fee: Decimal,
}

/// Full fee breakdown for a rental.
///
/// `total_amount` is the non-refundable charge (base + service fee +
/// insurance + delivery); the refundable deposit is tracked separately.
/// `total_renter_pays` is what the gateway authorizes: `total_amount`
/// plus the deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PricingBreakdown {
    pub base_price: Decimal,
    pub service_fee: Decimal,
    pub insurance: Decimal,
    pub delivery_fee: Decimal,
    pub security_deposit: Decimal,
    pub total_amount: Decimal,
    pub total_renter_pays: Decimal,
    pub platform_commission: Decimal,
    pub owner_receives: Decimal,
}

/// Round to currency-minor-unit (cent) precision
pub fn to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Platform commission on a base rental price. Applied to the subtotal,
/// never the fee-inclusive total, so fees do not compound.
pub fn commission_on(subtotal: Decimal, rates: &FeesConfig) -> Decimal {
    to_cents(subtotal * rates.commission_rate)
}

/// Owner's net proceeds for a booking's base price
pub fn owner_net(subtotal: Decimal, rates: &FeesConfig) -> Decimal {
    subtotal - commission_on(subtotal, rates)
}

/// Compute the fee breakdown for a rental quote.
///
/// The renter-side service fee and the owner-side commission are both
/// percentages of the base price, never of fee-inclusive totals, so fees do
/// not compound. The two rates are independent platform revenue streams and
/// are not reconciled against each other.
pub fn calculate(input: &PricingInput, rates: &FeesConfig) -> AppResult<PricingBreakdown> {
    if input.daily_rate <= Decimal::ZERO {
        return Err(AppError::Validation("daily_rate must be positive".to_string()));
    }
    if input.days == 0 {
        return Err(AppError::Validation("days must be positive".to_string()));
    }
    if input.security_deposit < Decimal::ZERO {
        return Err(AppError::Validation("security_deposit must not be negative".to_string()));
    }
    if input.delivery_fee < Decimal::ZERO {
        return Err(AppError::Validation("delivery_fee must not be negative".to_string()));
    }

    let days = Decimal::from(input.days);
    let base_price = to_cents(input.daily_rate * days);
    let service_fee = to_cents(base_price * rates.service_fee_rate);
    let insurance = if input.include_insurance {
        to_cents(input.daily_rate * rates.insurance_rate * days)
    } else {
        Decimal::ZERO
    };
    let delivery_fee = to_cents(input.delivery_fee);
    let security_deposit = to_cents(input.security_deposit);

    let total_amount = base_price + service_fee + insurance + delivery_fee;
    let total_renter_pays = total_amount + security_deposit;

    let platform_commission = to_cents(base_price * rates.commission_rate);
    let owner_receives = base_price - platform_commission;

    Ok(PricingBreakdown {
        base_price,
        service_fee,
        insurance,
        delivery_fee,
        security_deposit,
        total_amount,
        total_renter_pays,
        platform_commission,
        owner_receives,
    })
}
