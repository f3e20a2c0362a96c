use std::{fmt::Display, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Clone, Copy)]
pub struct Seconds(u16);
impl Display for Seconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl Seconds {
    pub fn as_u64(&self) -> u64 {
        self.0 as u64
    }
}

impl From<u16> for Seconds {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<Seconds> for Duration {
    fn from(value: Seconds) -> Self {
        Duration::from_secs(value.as_u64())
    }
}

/// Bounds (inclusive) for the pause between two sends
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
pub struct DelayRange {
    pub min: Seconds,
    pub max: Seconds,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min: 120.into(),
            max: 480.into(),
        }
    }
}

impl DelayRange {
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// Picks a random number of whole seconds within the range
    pub fn pick(&self) -> Seconds {
        if self.min >= self.max {
            return self.min;
        }
        Seconds(rand::thread_rng().gen_range(self.min.0..=self.max.0))
    }
}

impl Display for DelayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Human friendly rendering used when announcing a wait, e.g. "3 min 5s"
pub fn minutes_and_seconds(value: Seconds) -> String {
    let total = value.as_u64();
    format!("{} min {}s", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(120, 480)]
    #[case(0, 0)]
    #[case(5, 6)]
    fn delay_within_bounds(#[case] min: u16, #[case] max: u16) {
        let range = DelayRange {
            min: min.into(),
            max: max.into(),
        };
        for _ in 0..50 {
            let actual = range.pick();
            assert!(actual >= range.min && actual <= range.max, "{actual} outside {range}");
        }
    }

    #[test]
    fn inverted_range_is_invalid() {
        let range = DelayRange {
            min: 10.into(),
            max: 2.into(),
        };
        assert!(!range.is_valid());
        assert_eq!(range.pick(), Seconds(10));
    }

    #[rstest]
    #[case(0, "0 min 0s")]
    #[case(59, "0 min 59s")]
    #[case(185, "3 min 5s")]
    fn minutes_display(#[case] secs: u16, #[case] expected: &str) {
        assert_eq!(minutes_and_seconds(secs.into()), expected);
    }
}
