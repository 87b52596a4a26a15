//! Readings, leaderboard entries, and the input rules that produce them.
//!
//! A [`Reading`] is immutable once persisted. Ordering across the leaderboard is
//! always bac descending, then timestamp ascending; [`leaderboard_order`] is the
//! single definition of that rule.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One persisted breath reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub name: String,
    pub bac: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(name: impl Into<String>, bac: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            bac,
            timestamp,
        }
    }
}

/// Total order of the leaderboard: higher bac first, earlier timestamp first on ties.
pub fn leaderboard_order(a: &Reading, b: &Reading) -> Ordering {
    b.bac
        .total_cmp(&a.bac)
        .then_with(|| a.timestamp.cmp(&b.timestamp))
}

/// A reading together with its 1-based leaderboard position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    pub bac: f64,
    pub timestamp: DateTime<Utc>,
}

impl LeaderboardEntry {
    pub fn from_reading(reading: Reading, rank: usize) -> Self {
        Self {
            rank,
            name: reading.name,
            bac: reading.bac,
            timestamp: reading.timestamp,
        }
    }
}

/// Raw BAC as submitted by a client: sensors post numbers, HTML forms post strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BacInput {
    Number(f64),
    Text(String),
}

impl BacInput {
    /// Parse to a finite float. Range is not checked here.
    pub fn parse(&self) -> Result<f64, ValidationError> {
        let value = match self {
            BacInput::Number(n) => *n,
            BacInput::Text(s) => s.trim().parse::<f64>().map_err(|e| {
                ValidationError::invalid("bac", format!("'{s}' is not a number: {e}"))
            })?,
        };

        if !value.is_finite() {
            return Err(ValidationError::invalid("bac", "must be a finite number"));
        }
        Ok(value)
    }
}

impl From<f64> for BacInput {
    fn from(value: f64) -> Self {
        BacInput::Number(value)
    }
}

impl From<&str> for BacInput {
    fn from(value: &str) -> Self {
        BacInput::Text(value.to_string())
    }
}

/// What to do with a well-formed BAC outside `[0, max_bac]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRangePolicy {
    #[default]
    Clamp,
    Reject,
}

/// Accepted BAC range and the policy applied outside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacLimits {
    pub max_bac: f64,
    pub policy: OutOfRangePolicy,
}

impl BacLimits {
    pub fn new(max_bac: f64, policy: OutOfRangePolicy) -> Self {
        Self { max_bac, policy }
    }

    /// Parse `raw` and bring it into range according to the policy.
    pub fn normalize(&self, raw: &BacInput) -> Result<f64, ValidationError> {
        let value = raw.parse()?;
        if value == 0.0 {
            // -0.0 would sort below 0.0 under total_cmp.
            return Ok(0.0);
        }
        if (0.0..=self.max_bac).contains(&value) {
            return Ok(value);
        }

        match self.policy {
            OutOfRangePolicy::Clamp => Ok(value.clamp(0.0, self.max_bac)),
            OutOfRangePolicy::Reject => Err(ValidationError::OutOfRange {
                field: "bac".to_string(),
                value,
                min: 0.0,
                max: self.max_bac,
            }),
        }
    }
}

impl Default for BacLimits {
    fn default() -> Self {
        Self::new(0.5, OutOfRangePolicy::Clamp)
    }
}

/// Trim, strip commas, and cap a display name at `max_chars` characters.
pub fn sanitize_name(raw: &str, max_chars: usize) -> Result<String, ValidationError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let capped: String = cleaned.chars().take(max_chars).collect();
    let name = capped.trim();

    if name.is_empty() {
        return Err(ValidationError::invalid("name", "name is required"));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn order_puts_higher_bac_first() {
        let low = Reading::new("a", 0.05, at(0));
        let high = Reading::new("b", 0.12, at(10));
        assert_eq!(leaderboard_order(&high, &low), Ordering::Less);
    }

    #[test]
    fn order_breaks_ties_by_earlier_timestamp() {
        let first = Reading::new("a", 0.10, at(0));
        let second = Reading::new("b", 0.10, at(60));
        assert_eq!(leaderboard_order(&first, &second), Ordering::Less);
        assert_eq!(leaderboard_order(&second, &first), Ordering::Greater);
    }

    #[test]
    fn bac_input_accepts_numbers_and_numeric_strings() {
        assert_eq!(BacInput::Number(0.08).parse().unwrap(), 0.08);
        assert_eq!(BacInput::from(" 0.11 ").parse().unwrap(), 0.11);
    }

    #[test]
    fn bac_input_rejects_garbage_and_non_finite() {
        assert!(BacInput::from("abc").parse().is_err());
        assert!(BacInput::from("NaN").parse().is_err());
        assert!(BacInput::from("inf").parse().is_err());
        assert!(BacInput::Number(f64::INFINITY).parse().is_err());
    }

    #[test]
    fn bac_input_deserializes_untagged() {
        let n: BacInput = serde_json::from_str("0.2").unwrap();
        let s: BacInput = serde_json::from_str("\"0.2\"").unwrap();
        assert_eq!(n, BacInput::Number(0.2));
        assert_eq!(s, BacInput::Text("0.2".to_string()));
    }

    #[test]
    fn clamp_policy_bounds_both_ends() {
        let limits = BacLimits::new(0.5, OutOfRangePolicy::Clamp);
        assert_eq!(limits.normalize(&BacInput::Number(0.6)).unwrap(), 0.5);
        assert_eq!(limits.normalize(&BacInput::Number(-0.1)).unwrap(), 0.0);
        assert_eq!(limits.normalize(&BacInput::Number(0.3)).unwrap(), 0.3);
    }

    #[test]
    fn negative_zero_is_stored_as_zero() {
        for policy in [OutOfRangePolicy::Clamp, OutOfRangePolicy::Reject] {
            let limits = BacLimits::new(0.5, policy);
            let value = limits.normalize(&BacInput::Number(-0.0)).unwrap();
            assert!(value.is_sign_positive());
            let value = limits.normalize(&BacInput::Text("-0".into())).unwrap();
            assert!(value.is_sign_positive());
        }

        let zero = Reading::new("a", 0.0, at(0));
        let bac = BacLimits::default().normalize(&BacInput::Number(-0.0)).unwrap();
        let normalized = Reading::new("b", bac, at(1));
        assert_eq!(leaderboard_order(&zero, &normalized), Ordering::Less);
    }

    #[test]
    fn reject_policy_reports_range() {
        let limits = BacLimits::new(0.5, OutOfRangePolicy::Reject);
        let err = limits.normalize(&BacInput::Number(0.6)).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange { value, max, .. } if value == 0.6 && max == 0.5
        ));
    }

    #[test]
    fn sanitize_name_trims_strips_commas_and_caps() {
        assert_eq!(sanitize_name("  Jack, Jr.  ", 40).unwrap(), "Jack Jr.");
        let long = "x".repeat(60);
        assert_eq!(sanitize_name(&long, 40).unwrap().chars().count(), 40);
    }

    #[test]
    fn sanitize_name_rejects_blank() {
        assert!(sanitize_name("   ", 40).is_err());
        assert!(sanitize_name(",,,", 40).is_err());
    }
}
