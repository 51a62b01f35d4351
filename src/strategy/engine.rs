//! Pair-cost entry evaluation
//!
//! Buys whichever side keeps the combined average cost of one YES and one
//! NO share below the threshold, while holding inventory roughly balanced.
//! Pure function of its inputs: no state, no I/O.

use super::types::{Entry, HoldReason, Signal, StrategyParams};
use crate::config::duration_secs;
use crate::market::{Market, Side};
use crate::position::PositionSnapshot;
use crate::quote::Quote;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Per-side result of the threshold and balance checks
#[derive(Debug, Clone, Copy)]
struct Candidate {
    side: Side,
    ask: Decimal,
    pair_cost: Decimal,
    below_threshold: bool,
    within_balance: bool,
}

impl Candidate {
    fn qualifies(&self) -> bool {
        self.below_threshold && self.within_balance
    }
}

/// Stateless pair-cost strategy
#[derive(Debug, Clone)]
pub struct StrategyEngine {
    params: StrategyParams,
}

impl StrategyEngine {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Threshold after slippage, safety and fee margins; never above the configured one
    pub fn effective_threshold(&self, market: &Market) -> Decimal {
        let mut ceiling = Decimal::ONE - self.params.slippage_buffer - self.params.safety_margin;
        if market.fees_enabled {
            ceiling -= self.params.fee_enabled_extra_margin;
        }
        self.params.pair_cost_threshold.min(ceiling)
    }

    /// Pair cost after buying `side` at `ask`
    ///
    /// Uses the other side's average cost when held, else its current ask.
    pub fn hypothetical_pair_cost(
        &self,
        side: Side,
        ask: Decimal,
        other_ask: Decimal,
        position: &PositionSnapshot,
    ) -> Decimal {
        ask + position.average(side.other()).unwrap_or(other_ask)
    }

    /// Evaluate one market against its latest YES and NO quotes
    pub fn evaluate(
        &self,
        market: &Market,
        quote_yes: &Quote,
        quote_no: &Quote,
        position: &PositionSnapshot,
        now: DateTime<Utc>,
    ) -> Signal {
        let (yes_ask, no_ask) = match self.tradeable_asks(quote_yes, quote_no) {
            Ok(asks) => asks,
            Err(reason) => return self.hold(market, reason),
        };

        let margin = duration_secs(self.params.expiry_safety_margin_secs);
        if market.time_to_expiry(now) <= margin {
            return self.hold(market, HoldReason::NearExpiry);
        }

        let threshold = self.effective_threshold(market);
        let yes = self.candidate(Side::Yes, yes_ask, no_ask, threshold, position);
        let no = self.candidate(Side::No, no_ask, yes_ask, threshold, position);

        let chosen = match (yes.qualifies(), no.qualifies()) {
            (true, true) => Self::prefer(yes, no, position),
            (true, false) => yes,
            (false, true) => no,
            (false, false) => {
                let reason = if yes.below_threshold {
                    HoldReason::ImbalanceLimit(Side::Yes)
                } else if no.below_threshold {
                    HoldReason::ImbalanceLimit(Side::No)
                } else {
                    HoldReason::AboveThreshold {
                        best_pair_cost: yes.pair_cost.min(no.pair_cost),
                    }
                };
                return self.hold(market, reason);
            }
        };

        tracing::debug!(
            market = %market.id,
            side = %chosen.side,
            ask = %chosen.ask,
            pair_cost = %chosen.pair_cost,
            threshold = %threshold,
            "Entry qualifies"
        );

        Signal::buy(
            chosen.side,
            Entry {
                price: chosen.ask,
                size: self.params.order_size,
                pair_cost: chosen.pair_cost,
                threshold,
            },
        )
    }

    fn tradeable_asks(
        &self,
        quote_yes: &Quote,
        quote_no: &Quote,
    ) -> Result<(Decimal, Decimal), HoldReason> {
        let yes_ask = quote_yes
            .valid_ask()
            .ok_or(HoldReason::NoValidAsk(Side::Yes))?;
        let no_ask = quote_no
            .valid_ask()
            .ok_or(HoldReason::NoValidAsk(Side::No))?;
        for quote in [quote_yes, quote_no] {
            if quote.size < self.params.min_liquidity {
                return Err(HoldReason::InsufficientLiquidity {
                    side: quote.side,
                    size: quote.size,
                });
            }
        }
        Ok((yes_ask, no_ask))
    }

    fn candidate(
        &self,
        side: Side,
        ask: Decimal,
        other_ask: Decimal,
        threshold: Decimal,
        position: &PositionSnapshot,
    ) -> Candidate {
        let pair_cost = self.hypothetical_pair_cost(side, ask, other_ask, position);
        let size = self.params.order_size;
        // A single lot of unmatched inventory is allowed so a flat market can be opened.
        let within_balance = position.imbalance_after(side, size) <= self.params.max_imbalance
            || position.unmatched_after(side, size) <= size;
        Candidate {
            side,
            ask,
            pair_cost,
            below_threshold: pair_cost < threshold,
            within_balance,
        }
    }

    /// Smaller existing quantity first, then the cheaper ask, then YES
    fn prefer(yes: Candidate, no: Candidate, position: &PositionSnapshot) -> Candidate {
        let yes_qty = position.quantity(Side::Yes);
        let no_qty = position.quantity(Side::No);
        if yes_qty != no_qty {
            return if yes_qty < no_qty { yes } else { no };
        }
        if no.ask < yes.ask {
            no
        } else {
            yes
        }
    }

    fn hold(&self, market: &Market, reason: HoldReason) -> Signal {
        tracing::trace!(market = %market.id, reason = %reason, "Hold");
        Signal::Hold(reason)
    }
}
