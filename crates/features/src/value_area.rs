//! Value Area computation (POC, VAH, VAL).
//!
//! Computes Point of Control and Value Area boundaries from profile levels.

use contango_core::{ProfileLevel, ValueArea};

/// Value Area computer.
#[derive(Debug, Clone)]
pub struct ValueAreaComputer {
    /// Target VA coverage (e.g., 0.70 for 70%).
    fraction: f64,
}

impl ValueAreaComputer {
    pub fn new(fraction: f64) -> Self {
        Self { fraction }
    }

    /// Compute the Value Area of `levels`, which must be ordered by price.
    ///
    /// Returns `None` for a profile without volume.
    pub fn compute(&self, levels: &[ProfileLevel]) -> Option<ValueArea> {
        let total_volume: u64 = levels.iter().map(|l| l.volume).sum();
        if total_volume == 0 {
            return None;
        }

        // POC: highest volume, lowest price on ties.
        let poc_idx = levels
            .iter()
            .enumerate()
            .fold(0, |best, (i, l)| if l.volume > levels[best].volume { i } else { best });

        let target_volume = total_volume as f64 * self.fraction;

        // Expand outward from POC
        let mut cumulative_volume = levels[poc_idx].volume;
        let mut low_idx = poc_idx;
        let mut high_idx = poc_idx;
        let mut included = 1u32;

        while (cumulative_volume as f64) < target_volume {
            let next_low = low_idx.checked_sub(1);
            let next_high = (high_idx + 1 < levels.len()).then_some(high_idx + 1);

            // Expand to the higher-volume neighbour, downward on ties.
            let added = match (next_low, next_high) {
                (Some(l), Some(h)) if levels[l].volume >= levels[h].volume => {
                    low_idx = l;
                    l
                }
                (Some(_), Some(h)) | (None, Some(h)) => {
                    high_idx = h;
                    h
                }
                (Some(l), None) => {
                    low_idx = l;
                    l
                }
                (None, None) => break,
            };
            cumulative_volume += levels[added].volume;
            included += 1;
        }

        Some(ValueArea {
            poc: levels[poc_idx].price,
            vah: levels[high_idx].price,
            val: levels[low_idx].price,
            coverage: cumulative_volume as f64 / total_volume as f64,
            level_count: included,
        })
    }
}

impl Default for ValueAreaComputer {
    fn default() -> Self {
        Self::new(0.70)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_levels(data: &[(f64, u64)]) -> Vec<ProfileLevel> {
        data.iter()
            .map(|&(price, volume)| ProfileLevel {
                price,
                price_tick: (price * 4.0).round() as i64,
                volume,
                delta: 0,
            })
            .collect()
    }

    #[test]
    fn test_simple_va() {
        let computer = ValueAreaComputer::default();

        // Symmetric around 100
        let levels = make_levels(&[
            (99.50, 50),
            (99.75, 100),
            (100.00, 200), // POC
            (100.25, 100),
            (100.50, 50),
        ]);

        let va = computer.compute(&levels).unwrap();
        assert!((va.poc - 100.0).abs() < 1e-10);
        // 200 + 100 (low, tie) + 100 = 400 of 500 >= 350
        assert!((va.val - 99.75).abs() < 1e-10);
        assert!((va.vah - 100.25).abs() < 1e-10);
        assert_eq!(va.level_count, 3);
        assert!((va.coverage - 0.8).abs() < 1e-10);
    }

    #[test]
    fn test_asymmetric_va() {
        let computer = ValueAreaComputer::default();

        // More volume above POC
        let levels = make_levels(&[
            (99.50, 10),
            (99.75, 20),
            (100.00, 100), // POC
            (100.25, 80),
            (100.50, 60),
        ]);

        let va = computer.compute(&levels).unwrap();
        assert!((va.poc - 100.0).abs() < 1e-10);
        assert!((va.val - 100.0).abs() < 1e-10);
        assert!((va.vah - 100.50).abs() < 1e-10);
    }

    #[test]
    fn test_poc_at_edge() {
        let computer = ValueAreaComputer::default();

        let levels = make_levels(&[
            (100.00, 200), // POC at edge
            (100.25, 50),
            (100.50, 50),
            (100.75, 50),
        ]);

        let va = computer.compute(&levels).unwrap();
        // Can only expand upward
        assert!((va.val - 100.0).abs() < 1e-10);
        assert!(va.coverage >= 0.70);
    }

    #[test]
    fn test_poc_tie_takes_lowest_price() {
        let computer = ValueAreaComputer::default();
        let levels = make_levels(&[(100.0, 10), (100.25, 10)]);
        let va = computer.compute(&levels).unwrap();
        assert!((va.poc - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_full_coverage() {
        let computer = ValueAreaComputer::new(1.0);
        let levels = make_levels(&[(99.0, 1), (100.0, 5), (101.0, 1)]);
        let va = computer.compute(&levels).unwrap();
        assert_eq!(va.level_count, 3);
        assert!((va.coverage - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_profile() {
        let computer = ValueAreaComputer::default();
        assert!(computer.compute(&[]).is_none());
    }
}
