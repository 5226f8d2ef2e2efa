//! Conversion engine.

use fxledger_common::{
    CanonicalRate, ConversionPolicy, ConversionRequest, ConversionResponse, CurrencyCode,
    RateQuote, RateTable, SameCurrencyPolicy,
};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::error::{FxError, FxResult};

/// Description attached to both sides of a passed-through conversion.
pub const SAME_CURRENCY_DESCRIPTION: &str = "Same currency conversion";

/// Converts amounts through the reference currency using a rate snapshot.
///
/// The engine is stateless apart from its policy; callers hand it the
/// snapshot to read so a conversion never observes a half-applied refresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionEngine {
    policy: ConversionPolicy,
}

impl ConversionEngine {
    /// Create an engine with the given policy.
    pub fn new(policy: ConversionPolicy) -> Self {
        Self { policy }
    }

    /// The policy in force.
    pub fn policy(&self) -> ConversionPolicy {
        self.policy
    }

    /// Convert `request.amount` from `request.from` into `request.to`.
    ///
    /// `converted = round(amount * rate(from) / rate(to))` with banker's
    /// rounding at the policy precision.
    #[instrument(skip(self, rates), fields(from = %request.from, to = %request.to, amount = %request.amount))]
    pub fn convert(
        &self,
        request: &ConversionRequest,
        rates: &RateTable,
    ) -> FxResult<ConversionResponse> {
        if request.is_same_currency() {
            return match self.policy.same_currency {
                SameCurrencyPolicy::PassThrough => {
                    debug!("Same-currency conversion passed through");
                    Ok(ConversionResponse {
                        from_currency_code: request.from.clone(),
                        from_currency_desc: SAME_CURRENCY_DESCRIPTION.to_string(),
                        to_currency_code: request.to.clone(),
                        to_currency_desc: SAME_CURRENCY_DESCRIPTION.to_string(),
                        original_amount: request.amount,
                        converted_amount: request.amount,
                    })
                }
                SameCurrencyPolicy::Reject => Err(FxError::SameCurrency(request.from.clone())),
            };
        }

        let from_rate = lookup(rates, &request.from)?;
        let to_rate = lookup(rates, &request.to)?;

        let overflow = || FxError::Overflow {
            amount: request.amount.to_string(),
            from: request.from.clone(),
            to: request.to.clone(),
        };

        let base_amount = request
            .amount
            .checked_mul(from_rate.rate)
            .ok_or_else(overflow)?;
        let converted = base_amount.checked_div(to_rate.rate).ok_or_else(overflow)?;
        let converted = self.policy.precision.round(converted);

        debug!(
            base_amount = %base_amount,
            converted = %converted,
            "Conversion computed"
        );

        Ok(ConversionResponse {
            from_currency_code: from_rate.code.clone(),
            from_currency_desc: from_rate.description.clone(),
            to_currency_code: to_rate.code.clone(),
            to_currency_desc: to_rate.description.clone(),
            original_amount: request.amount,
            converted_amount: converted,
        })
    }

    /// The canonical rate of one unit of `code`, expressed in `reference`.
    pub fn get_rate(
        &self,
        code: &CurrencyCode,
        rates: &RateTable,
        reference: &CurrencyCode,
    ) -> FxResult<RateQuote> {
        let rate = lookup(rates, code)?;

        Ok(RateQuote {
            base_currency_code: rate.code.clone(),
            base_currency_desc: rate.description.clone(),
            base_currency_amount: Decimal::ONE,
            converted_currency_code: reference.clone(),
            converted_currency_amount: rate.rate,
            as_of: rate.as_of,
        })
    }
}

fn lookup<'a>(rates: &'a RateTable, code: &CurrencyCode) -> FxResult<&'a CanonicalRate> {
    rates
        .get(code)
        .ok_or_else(|| FxError::UnknownCurrencyCode(code.clone()))
}
