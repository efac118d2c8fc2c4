//! Roll date selection for adjacent contracts.
//!
//! A roll date hands the continuous series from the front contract to the
//! back contract at 00:00 of that date in the configured trading calendar.
//! Valid dates lie after the front contract's first trading day and no later
//! than its last one, and after the previous roll.

use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::{Duration, NaiveDate};
use contango_core::{ContractSeries, Error, Result, RollConfig, RollPolicy, ScDateTime};
use tracing::debug;

/// Check that at least two contracts are given, ordered by expiration, each
/// with strictly increasing bars.
pub fn validate_contracts(contracts: &[ContractSeries]) -> Result<()> {
    if contracts.len() < 2 {
        return Err(Error::config(format!(
            "rolling needs at least two contracts, got {}",
            contracts.len()
        )));
    }
    for pair in contracts.windows(2) {
        if pair[1].expiration <= pair[0].expiration {
            return Err(Error::config(format!(
                "contracts not ordered by expiration: {} ({}) before {} ({})",
                pair[0].symbol, pair[0].expiration, pair[1].symbol, pair[1].expiration
            )));
        }
    }
    contracts.iter().try_for_each(ContractSeries::validate)
}

/// Traded volume per calendar day.
pub fn daily_volume(series: &ContractSeries, utc_offset_minutes: i32) -> BTreeMap<NaiveDate, u64> {
    let mut days = BTreeMap::new();
    for bar in &series.bars {
        *days
            .entry(bar.time_key().local_date(utc_offset_minutes))
            .or_insert(0) += bar.volume;
    }
    days
}

/// First and last trading day of a contract.
fn active_window(series: &ContractSeries, utc_offset_minutes: i32) -> Option<(NaiveDate, NaiveDate)> {
    let first = series.first_ts()?.local_date(utc_offset_minutes);
    let last = series.last_ts()?.local_date(utc_offset_minutes);
    Some((first, last))
}

/// One roll date per adjacent contract pair.
pub fn roll_dates(contracts: &[ContractSeries], config: &RollConfig) -> Result<Vec<NaiveDate>> {
    validate_contracts(contracts)?;
    let offset = config.utc_offset_minutes;
    let mut dates: Vec<NaiveDate> = Vec::with_capacity(contracts.len() - 1);

    for (i, pair) in contracts.windows(2).enumerate() {
        let (front, back) = (&pair[0], &pair[1]);
        let (first, last) = active_window(front, offset).ok_or_else(|| {
            Error::missing_roll_date(&front.symbol, &back.symbol, "front contract has no bars")
        })?;
        // Earliest admissible roll date.
        let floor = match dates.last() {
            Some(prev) => first.max(*prev),
            None => first,
        };
        let admissible = |date: NaiveDate| date > floor && date <= last;

        let date = match &config.policy {
            RollPolicy::FixedCalendar { days_before_expiry } => {
                let date = front.expiration - Duration::days(*days_before_expiry as i64);
                if !admissible(date) {
                    return Err(Error::missing_roll_date(
                        &front.symbol,
                        &back.symbol,
                        format!("{date} is outside the front contract's data ({first} to {last})"),
                    ));
                }
                date
            }
            RollPolicy::VolumeCrossover => {
                let front_volume = daily_volume(front, offset);
                let back_volume = daily_volume(back, offset);
                back_volume
                    .range((Bound::Excluded(floor), Bound::Included(last)))
                    .find(|(day, volume)| **volume > front_volume.get(*day).copied().unwrap_or(0))
                    .map(|(day, _)| *day)
                    .ok_or_else(|| {
                        Error::missing_roll_date(
                            &front.symbol,
                            &back.symbol,
                            format!("back volume never exceeds front volume by {last}"),
                        )
                    })?
            }
            RollPolicy::ExplicitDates(explicit) => {
                let date = *explicit.get(i).ok_or_else(|| {
                    Error::missing_roll_date(
                        &front.symbol,
                        &back.symbol,
                        format!("explicit roll date list has {} entries", explicit.len()),
                    )
                })?;
                if !admissible(date) {
                    return Err(Error::missing_roll_date(
                        &front.symbol,
                        &back.symbol,
                        format!("{date} is outside the front contract's data ({first} to {last})"),
                    ));
                }
                date
            }
        };

        debug!(front = %front.symbol, back = %back.symbol, %date, "roll date");
        dates.push(date);
    }
    Ok(dates)
}

/// Roll boundaries: 00:00 of each roll date in the trading calendar.
pub fn roll_boundaries(contracts: &[ContractSeries], config: &RollConfig) -> Result<Vec<ScDateTime>> {
    Ok(roll_dates(contracts, config)?
        .into_iter()
        .map(|date| ScDateTime::start_of_local_date(date, config.utc_offset_minutes))
        .collect())
}
