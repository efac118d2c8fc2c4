//! Additive back-adjustment of contract series into a continuous series.
//!
//! Each segment is shifted by the sum of the roll deltas that follow it, so
//! the most recent contract keeps its raw prices and price changes inside a
//! segment are unchanged.

use contango_core::{
    Bar, ContinuousSeries, ContractSeries, Error, Result, RollConfig, RollEvent, ScDateTime,
};
use tracing::debug;

use crate::calendar::roll_boundaries;

/// Last bar whose time key is at or before `ts`.
fn last_at_or_before(bars: &[Bar], ts: ScDateTime) -> Option<&Bar> {
    let idx = bars.partition_point(|b| b.time_key() <= ts);
    idx.checked_sub(1).map(|i| &bars[i])
}

/// Stitches contract series under one roll policy.
#[derive(Debug, Clone)]
pub struct RollEngine {
    config: RollConfig,
}

impl RollEngine {
    pub fn new(config: RollConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RollConfig {
        &self.config
    }

    /// Roll events for adjacent contracts, deltas measured at each boundary.
    pub fn roll_events(&self, contracts: &[ContractSeries]) -> Result<Vec<RollEvent>> {
        let boundaries = roll_boundaries(contracts, &self.config)?;
        contracts
            .windows(2)
            .zip(boundaries)
            .map(|(pair, boundary)| {
                let (front, back) = (&pair[0], &pair[1]);
                let overlap = || Error::Overlap {
                    front: front.symbol.clone(),
                    back: back.symbol.clone(),
                    boundary: boundary.micros(),
                };
                let front_ref = last_at_or_before(&front.bars, boundary).ok_or_else(overlap)?;
                let back_ref = last_at_or_before(&back.bars, boundary).ok_or_else(overlap)?;
                if back.last_ts().map_or(true, |last| last < boundary) {
                    return Err(overlap());
                }

                let delta = back_ref.close - front_ref.close;
                debug!(
                    out = %front.symbol,
                    into = %back.symbol,
                    %boundary,
                    delta,
                    "roll"
                );
                Ok(RollEvent {
                    boundary,
                    contract_out: front.symbol.clone(),
                    contract_in: back.symbol.clone(),
                    delta,
                    front_price: front_ref.close,
                    back_price: back_ref.close,
                })
            })
            .collect()
    }

    /// Build the back-adjusted continuous series.
    ///
    /// Contract `k` contributes its bars from the previous boundary up to
    /// (excluding) boundary `k`, shifted by the deltas of every later roll.
    pub fn stitch(&self, symbol: &str, contracts: &[ContractSeries]) -> Result<ContinuousSeries> {
        let rolls = self.roll_events(contracts)?;

        let mut bars = Vec::new();
        for (k, contract) in contracts.iter().enumerate() {
            let from = k.checked_sub(1).map(|j| rolls[j].boundary);
            let until = rolls.get(k).map(|r| r.boundary);
            let offset: f64 = rolls[k..].iter().map(|r| r.delta).sum();

            let segment = contract.bars.iter().filter(|b| {
                let ts = b.time_key();
                from.map_or(true, |f| ts >= f) && until.map_or(true, |u| ts < u)
            });
            let before = bars.len();
            bars.extend(segment.map(|b| b.shifted(offset)));
            debug!(
                contract = %contract.symbol,
                bars = bars.len() - before,
                offset,
                "segment stitched"
            );
        }

        Ok(ContinuousSeries {
            symbol: symbol.to_string(),
            bars,
            rolls,
        })
    }
}
