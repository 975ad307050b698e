// Exact decimal quantities and money, backed by `bigdecimal`.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use serde::{Serialize, Serializer};

/// Fractional digits kept when a spreadsheet float is converted. Binary noise
/// (`0.30000000000000004`) sits far below this.
pub const FLOAT_PLACES: i64 = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Decimal(BigDecimal);

impl Decimal {
    pub fn from_int(n: i64) -> Self {
        Decimal(BigDecimal::from(n))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a financial number string.
    ///
    /// Strips `$`, commas and whitespace; `(12.50)` is negative. Any number of
    /// fractional digits is held exactly. Returns `None` for non-numeric text.
    pub fn parse(s: &str) -> Option<Self> {
        let mut cleaned: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',' && *c != '$')
            .collect();

        let mut negative = false;
        if cleaned.starts_with('(') && cleaned.ends_with(')') && cleaned.len() > 2 {
            negative = true;
            cleaned = cleaned[1..cleaned.len() - 1].to_string();
        }
        let body = if let Some(rest) = cleaned.strip_prefix('-') {
            negative = !negative;
            rest
        } else {
            cleaned.strip_prefix('+').unwrap_or(&cleaned)
        };

        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        // `.5` and `7.` are spelled out for the parser
        let int_part = if int_part.is_empty() { "0" } else { int_part };
        let sign = if negative { "-" } else { "" };
        let text = if frac_part.is_empty() {
            format!("{sign}{int_part}")
        } else {
            format!("{sign}{int_part}.{frac_part}")
        };
        BigDecimal::from_str(&text).ok().map(Decimal)
    }

    /// Convert a spreadsheet float: its shortest decimal representation,
    /// rounded to [`FLOAT_PLACES`]. `None` only for NaN and infinities.
    pub fn from_f64(n: f64) -> Option<Self> {
        if !n.is_finite() {
            return None;
        }
        // f64 Display never uses exponent notation
        Self::parse(&format!("{n}")).map(|d| d.round(FLOAT_PLACES))
    }

    pub fn round(&self, places: i64) -> Self {
        Decimal(self.0.round(places))
    }

    /// Same value without trailing fractional zeros, never in exponent form.
    fn canonical(&self) -> BigDecimal {
        let n = self.0.normalized();
        let (_, scale) = n.as_bigint_and_exponent();
        if scale < 0 {
            n.with_scale(0)
        } else {
            n
        }
    }
}

impl Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn add(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 + &rhs.0)
    }
}

impl Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn sub(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 - &rhs.0)
    }
}

impl FromStr for Decimal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::parse(s).ok_or_else(|| format!("not a decimal number: '{s}'"))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::parse(s).unwrap()
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(d("10").to_string(), "10");
        assert_eq!(d("12.5").to_string(), "12.5");
        assert_eq!(d("-0.25").to_string(), "-0.25");
        assert_eq!(d("$1,234.5600").to_string(), "1234.56");
        assert_eq!(d("(3.10)").to_string(), "-3.1");
        assert_eq!(d(".5").to_string(), "0.5");
        assert_eq!(d("7.").to_string(), "7");
        assert_eq!(d("1.500000").to_string(), "1.5");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Decimal::parse("").is_none());
        assert!(Decimal::parse("abc").is_none());
        assert!(Decimal::parse("1.2.3").is_none());
        assert!(Decimal::parse("-").is_none());
        assert!(Decimal::parse("1e5").is_none());
    }

    #[test]
    fn long_fractions_are_exact() {
        assert_eq!(d("1.23456").to_string(), "1.23456");
        assert_eq!(d("0.0125").to_string(), "0.0125");
        assert_eq!((d("1.23456") - d("0.00006")).to_string(), "1.2345");
    }

    #[test]
    fn arithmetic_is_exact() {
        assert_eq!((d("10") - d("7")).to_string(), "3");
        assert_eq!((d("0.3") - d("0.1")).to_string(), "0.2");
        assert_eq!((&d("7") - &d("10.25")).to_string(), "-3.25");
        assert_eq!((d("2.5") + d("2.5")).to_string(), "5");
        assert!((d("1.10") - d("1.1")).is_zero());
    }

    #[test]
    fn from_spreadsheet_float() {
        assert_eq!(Decimal::from_f64(10.0).unwrap(), Decimal::from_int(10));
        assert_eq!(Decimal::from_f64(12.3).unwrap().to_string(), "12.3");
        assert_eq!(Decimal::from_f64(1.23456).unwrap().to_string(), "1.23456");
        assert!(Decimal::from_f64(f64::NAN).is_none());
        assert!(Decimal::from_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn float_noise_is_rounded_away() {
        assert_eq!(Decimal::from_f64(0.1 + 0.2).unwrap(), d("0.3"));
        assert_eq!(Decimal::from_f64(3.3000000000000003).unwrap().to_string(), "3.3");
        assert_eq!(Decimal::from_f64(-0.30000000000000004).unwrap().to_string(), "-0.3");
        assert_eq!(Decimal::from_f64(2.675).unwrap().to_string(), "2.675");
    }

    #[test]
    fn serializes_as_string() {
        assert_eq!(serde_json::to_string(&d("3.5")).unwrap(), "\"3.5\"");
        assert_eq!(serde_json::to_string(&(d("2.5") + d("2.5"))).unwrap(), "\"5\"");
    }
}
