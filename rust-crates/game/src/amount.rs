use crate::{
    Result,
    RulesError,
};
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
    de,
};
use std::{
    fmt,
    str::FromStr,
};

/// The native currency has 18 decimals.
pub const DECIMALS: u32 = 18;
pub const WEI_PER_UNIT: u128 = 10u128.pow(DECIMALS);
pub const MIN_BET_UNITS: u64 = 1;
pub const MAX_BET_UNITS: u64 = 100;

/// A bet that is known to be inside the legal `[1, 100]` unit range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BetAmount {
    wei: u128,
}

impl BetAmount {
    pub const MIN: BetAmount = BetAmount {
        wei: MIN_BET_UNITS as u128 * WEI_PER_UNIT,
    };
    pub const MAX: BetAmount = BetAmount {
        wei: MAX_BET_UNITS as u128 * WEI_PER_UNIT,
    };

    pub fn from_units(units: u64) -> Result<Self> {
        let wei = u128::from(units)
            .checked_mul(WEI_PER_UNIT)
            .ok_or_else(|| invalid(units.to_string(), "amount overflows"))?;
        Self::from_wei_checked(wei, units.to_string())
    }

    pub fn from_wei(wei: u128) -> Result<Self> {
        Self::from_wei_checked(wei, format_units(wei))
    }

    /// Parses a decimal amount in whole units, e.g. `"12"` or `"2.5"`.
    pub fn parse(input: &str) -> Result<Self> {
        let wei = parse_units(input)?;
        Self::from_wei_checked(wei, input.trim().to_string())
    }

    /// Clamps a unit count into the legal range.
    pub fn clamped_units(units: u64) -> Self {
        let units = units.clamp(MIN_BET_UNITS, MAX_BET_UNITS);
        BetAmount {
            wei: u128::from(units) * WEI_PER_UNIT,
        }
    }

    pub fn wei(self) -> u128 {
        self.wei
    }

    fn from_wei_checked(wei: u128, input: String) -> Result<Self> {
        if wei < Self::MIN.wei {
            return Err(invalid(input, "below the 1 unit minimum"));
        }
        if wei > Self::MAX.wei {
            return Err(invalid(input, "above the 100 unit maximum"));
        }
        Ok(BetAmount { wei })
    }
}

impl FromStr for BetAmount {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self> {
        BetAmount::parse(s)
    }
}

impl fmt::Display for BetAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_units(self.wei))
    }
}

/// Formats wei as a decimal unit string without trailing zeros.
pub fn format_units(wei: u128) -> String {
    let whole = wei / WEI_PER_UNIT;
    let frac = wei % WEI_PER_UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}", width = DECIMALS as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

fn parse_units(input: &str) -> Result<u128> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid(input.to_string(), "empty"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid(input.to_string(), "negative"));
    }
    let (whole, frac) = match trimmed.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (trimmed, ""),
    };
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !is_digits(whole) || !is_digits(frac) {
        return Err(invalid(input.to_string(), "not a number"));
    }
    if frac.len() > DECIMALS as usize {
        return Err(invalid(input.to_string(), "too many decimal places"));
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| invalid(input.to_string(), "amount overflows"))?
    };
    let frac_wei: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = DECIMALS as usize);
        padded
            .parse()
            .map_err(|_| invalid(input.to_string(), "not a number"))?
    };
    whole
        .checked_mul(WEI_PER_UNIT)
        .and_then(|w| w.checked_add(frac_wei))
        .ok_or_else(|| invalid(input.to_string(), "amount overflows"))
}

fn invalid(input: String, reason: &'static str) -> RulesError {
    RulesError::InvalidAmount { input, reason }
}

impl Serialize for BetAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// Tool-call arguments show up as numbers or strings, so both are accepted.
impl<'de> Deserialize<'de> for BetAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl de::Visitor<'_> for AmountVisitor {
            type Value = BetAmount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a bet amount between 1 and 100 units")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<BetAmount, E> {
                BetAmount::parse(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<BetAmount, E> {
                BetAmount::from_units(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<BetAmount, E> {
                let units = u64::try_from(v).map_err(|_| {
                    E::custom(invalid(v.to_string(), "negative"))
                })?;
                BetAmount::from_units(units).map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<BetAmount, E> {
                if !v.is_finite() {
                    return Err(E::custom(invalid(v.to_string(), "not a number")));
                }
                BetAmount::parse(&v.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn parse__accepts_inclusive_bounds() {
        assert_eq!(BetAmount::parse("1").unwrap(), BetAmount::MIN);
        assert_eq!(BetAmount::parse("100").unwrap(), BetAmount::MAX);
        assert_eq!(BetAmount::from_units(1).unwrap(), BetAmount::MIN);
        assert_eq!(BetAmount::from_units(100).unwrap(), BetAmount::MAX);
    }

    #[test]
    fn parse__rejects_out_of_range_and_garbage() {
        for input in ["0", "-1", "101", "abc", "", "  ", "1e3", "12.5.1", ".", "100.000001"] {
            let result = BetAmount::parse(input);
            assert!(
                matches!(result, Err(RulesError::InvalidAmount { .. })),
                "{input:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn parse__handles_fractions() {
        let amount = BetAmount::parse("2.5").unwrap();
        assert_eq!(amount.wei(), 2 * WEI_PER_UNIT + WEI_PER_UNIT / 2);
        assert_eq!(amount.to_string(), "2.5");
        assert!(BetAmount::parse("0.5").is_err());
    }

    #[test]
    fn clamped_units__stays_in_range() {
        assert_eq!(BetAmount::clamped_units(0), BetAmount::MIN);
        assert_eq!(BetAmount::clamped_units(500), BetAmount::MAX);
        assert_eq!(BetAmount::clamped_units(42).to_string(), "42");
    }

    #[test]
    fn deserialize__accepts_numbers_and_strings() {
        let from_number: BetAmount = serde_json::from_str("25").unwrap();
        let from_string: BetAmount = serde_json::from_str("\"25\"").unwrap();
        let from_float: BetAmount = serde_json::from_str("12.5").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_float.to_string(), "12.5");
        assert!(serde_json::from_str::<BetAmount>("-1").is_err());
        assert!(serde_json::from_str::<BetAmount>("101").is_err());
        assert!(serde_json::from_str::<BetAmount>("\"lots\"").is_err());
    }

    #[test]
    fn format_units__trims_trailing_zeros() {
        assert_eq!(format_units(0), "0");
        assert_eq!(format_units(WEI_PER_UNIT / 10), "0.1");
        assert_eq!(format_units(3 * WEI_PER_UNIT), "3");
    }
}
