//! Rolling volume-at-price profile.
//!
//! Maintains volume and signed delta per price tick over a session, a time
//! window, or a trade-count window. Every contribution is kept until it is
//! evicted, so eviction subtracts exactly what was added and the live
//! totals can always be checked against a fresh recomputation.

use std::collections::{BTreeMap, VecDeque};

use contango_core::time::{MICROS_PER_DAY, MICROS_PER_MINUTE};
use contango_core::{
    Error, MarketRecord, ProfileConfig, ProfileLevel, Result, ScDateTime, TradeRecord,
    VolumeProfile, WindowPolicy,
};
use contango_ingestion::{ClassificationStats, OrderBook, SideClassifier};
use tracing::debug;

use crate::value_area::ValueAreaComputer;

/// Volume and delta held at one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LevelTotals {
    volume: u64,
    delta: i64,
}

/// One trade's contribution to the profile.
#[derive(Debug, Clone, Copy)]
struct Contribution {
    ts: ScDateTime,
    price_tick: i64,
    volume: u64,
    delta: i64,
}

/// Live volume profile over one symbol's record stream.
pub struct VolumeProfileEngine {
    config: ProfileConfig,
    levels: BTreeMap<i64, LevelTotals>,
    /// Contributions in the current window, oldest first.
    window: VecDeque<Contribution>,
    total_volume: u64,
    total_delta: i64,
    /// Latest timestamp applied.
    as_of: Option<ScDateTime>,
    /// Session index of the current window (session policy only).
    session: Option<i64>,
    book: OrderBook,
    classifier: SideClassifier,
    value_area: ValueAreaComputer,
}

impl VolumeProfileEngine {
    pub fn new(config: ProfileConfig) -> Result<Self> {
        config.validate()?;
        let value_area = ValueAreaComputer::new(config.value_area_fraction);
        Ok(Self {
            config,
            levels: BTreeMap::new(),
            window: VecDeque::new(),
            total_volume: 0,
            total_delta: 0,
            as_of: None,
            session: None,
            book: OrderBook::new(),
            classifier: SideClassifier::new(),
            value_area,
        })
    }

    /// Quantize a price to the nearest tick.
    #[inline]
    pub fn price_tick(&self, price: f64) -> i64 {
        (price / self.config.tick_size).round() as i64
    }

    fn tick_price(&self, tick: i64) -> f64 {
        tick as f64 * self.config.tick_size
    }

    fn session_of(ts: ScDateTime, utc_offset_minutes: i32, start_minute: u32) -> i64 {
        let shift = (utc_offset_minutes as i64 - start_minute as i64) * MICROS_PER_MINUTE;
        ts.micros().saturating_add(shift).div_euclid(MICROS_PER_DAY)
    }

    /// Apply one record. Depth updates move the book; trades move the profile.
    pub fn apply(&mut self, record: &MarketRecord) -> Result<()> {
        match record {
            MarketRecord::Depth(depth) => {
                self.book.apply(depth);
                Ok(())
            }
            MarketRecord::Trade(trade) => self.add_trade(trade),
        }
    }

    /// Classify a trade, add it to its level, then evict what left the window.
    pub fn add_trade(&mut self, trade: &TradeRecord) -> Result<()> {
        if let WindowPolicy::Session {
            utc_offset_minutes,
            start_minute,
        } = self.config.window
        {
            let session = Self::session_of(trade.ts, utc_offset_minutes, start_minute);
            match self.session {
                Some(current) if session > current => {
                    debug!(from = current, to = session, "new profile session");
                    self.evict_while(|_| true)?;
                    self.session = Some(session);
                }
                Some(current) if session < current => {
                    debug!(ts = %trade.ts, session, current, "trade from a closed session skipped");
                    return Ok(());
                }
                None => self.session = Some(session),
                _ => {}
            }
        }

        let quote = if self.book.is_synced() {
            self.book.quote()
        } else {
            None
        };
        let side = self.classifier.classify(trade, quote);

        let contribution = Contribution {
            ts: trade.ts,
            price_tick: self.price_tick(trade.price),
            volume: trade.volume as u64,
            delta: side.signed(trade.volume),
        };
        let level = self.levels.entry(contribution.price_tick).or_default();
        level.volume += contribution.volume;
        level.delta += contribution.delta;
        self.total_volume += contribution.volume;
        self.total_delta += contribution.delta;
        match self.config.window {
            // Kept in time order so eviction from the front also catches
            // late trades.
            WindowPolicy::RollingTime { .. } => {
                let at = self.window.partition_point(|c| c.ts <= contribution.ts);
                self.window.insert(at, contribution);
            }
            _ => self.window.push_back(contribution),
        }

        let latest = self.as_of.map_or(trade.ts, |t| t.max(trade.ts));
        self.as_of = Some(latest);

        match self.config.window {
            WindowPolicy::RollingTime { window_micros } => {
                let cutoff = latest.add_micros(-window_micros);
                self.evict_while(|c| c.ts <= cutoff)?;
            }
            WindowPolicy::RollingCount { trades } => {
                while self.window.len() > trades {
                    self.evict_front()?;
                }
            }
            WindowPolicy::Session { .. } => {}
        }
        Ok(())
    }

    fn evict_while(&mut self, mut pred: impl FnMut(&Contribution) -> bool) -> Result<()> {
        while self.window.front().is_some_and(&mut pred) {
            self.evict_front()?;
        }
        Ok(())
    }

    fn evict_front(&mut self) -> Result<()> {
        match self.window.pop_front() {
            Some(contribution) => self.subtract(contribution),
            None => Ok(()),
        }
    }

    /// Remove a contribution from its level.
    fn subtract(&mut self, c: Contribution) -> Result<()> {
        let held = self.levels.get(&c.price_tick).map_or(0, |l| l.volume);
        if held < c.volume {
            return Err(Error::WindowUnderflow {
                price_tick: c.price_tick,
                held,
                evicted: c.volume,
            });
        }
        if let Some(level) = self.levels.get_mut(&c.price_tick) {
            level.volume -= c.volume;
            level.delta -= c.delta;
            if level.volume == 0 {
                self.levels.remove(&c.price_tick);
            }
        }
        self.total_volume -= c.volume;
        self.total_delta -= c.delta;
        Ok(())
    }

    fn to_levels<'a>(&self, totals: impl Iterator<Item = (&'a i64, &'a LevelTotals)>) -> Vec<ProfileLevel> {
        totals
            .map(|(&tick, totals)| ProfileLevel {
                price: self.tick_price(tick),
                price_tick: tick,
                volume: totals.volume,
                delta: totals.delta,
            })
            .collect()
    }

    /// Live levels ordered by price.
    pub fn levels(&self) -> Vec<ProfileLevel> {
        self.to_levels(self.levels.iter())
    }

    /// Levels rebuilt from scratch over the contributions in the window.
    pub fn recompute(&self) -> Vec<ProfileLevel> {
        let mut rebuilt: BTreeMap<i64, LevelTotals> = BTreeMap::new();
        for c in &self.window {
            let level = rebuilt.entry(c.price_tick).or_default();
            level.volume += c.volume;
            level.delta += c.delta;
        }
        self.to_levels(rebuilt.iter())
    }

    /// Point-in-time copy of the profile with its value area.
    pub fn snapshot(&self) -> VolumeProfile {
        let levels = self.levels();
        let value_area = self.value_area.compute(&levels);
        VolumeProfile {
            tick_size: self.config.tick_size,
            window: self.config.window,
            as_of: self.as_of,
            levels,
            total_volume: self.total_volume,
            total_delta: self.total_delta,
            value_area,
            incomplete: false,
        }
    }

    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    pub fn total_delta(&self) -> i64 {
        self.total_delta
    }

    /// Trades currently in the window.
    pub fn trade_count(&self) -> usize {
        self.window.len()
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn classification_stats(&self) -> &ClassificationStats {
        self.classifier.stats()
    }

    /// Drop all state, book and classifier history included.
    pub fn reset(&mut self) {
        self.levels.clear();
        self.window.clear();
        self.total_volume = 0;
        self.total_delta = 0;
        self.as_of = None;
        self.session = None;
        self.book.clear();
        self.classifier.clear();
    }
}
