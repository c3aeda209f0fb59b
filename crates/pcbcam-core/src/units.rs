//! Unit handling
//!
//! Handles conversion between millimeters and inches. Every persisted
//! length, feed rate and Z height in the engine is scaled through
//! [`ConvertUnits`] when an object switches units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Length units of a document or output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Millimeters
    #[default]
    Mm,
    /// Inches
    Inch,
}

impl Units {
    /// Factor that converts a value expressed in `self` into `to`.
    pub fn factor_to(self, to: Units) -> f64 {
        match (self, to) {
            (Units::Mm, Units::Inch) => 1.0 / MM_PER_INCH,
            (Units::Inch, Units::Mm) => MM_PER_INCH,
            _ => 1.0,
        }
    }

    /// Convert a value from `self` into `to`.
    pub fn convert(self, value: f64, to: Units) -> f64 {
        value * self.factor_to(to)
    }

    /// Short label ("mm" or "in").
    pub fn label(self) -> &'static str {
        match self {
            Units::Mm => "mm",
            Units::Inch => "in",
        }
    }

    /// Upper-case keyword used by the Gerber and Excellon formats.
    pub fn keyword(self) -> &'static str {
        match self {
            Units::Mm => "MM",
            Units::Inch => "IN",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mm" | "metric" | "millimeters" => Ok(Self::Mm),
            "in" | "inch" | "inches" | "imperial" => Ok(Self::Inch),
            _ => Err(format!("Unknown units: {}", s)),
        }
    }
}

/// Round `value` to `decimals` decimal places.
pub fn round_to(value: f64, decimals: u8) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Scale every persisted numeric field by a units conversion factor.
///
/// Implementors must scale lengths, Z heights, offsets and feed rates,
/// and leave dimensionless values (counts, ratios, angles, RPM) untouched.
pub trait ConvertUnits {
    fn convert_units(&mut self, factor: f64);
}

impl ConvertUnits for f64 {
    fn convert_units(&mut self, factor: f64) {
        *self *= factor;
    }
}

impl<T: ConvertUnits> ConvertUnits for Option<T> {
    fn convert_units(&mut self, factor: f64) {
        if let Some(v) = self {
            v.convert_units(factor);
        }
    }
}

impl<T: ConvertUnits> ConvertUnits for Vec<T> {
    fn convert_units(&mut self, factor: f64) {
        for v in self.iter_mut() {
            v.convert_units(factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_between_units() {
        assert_eq!(Units::Inch.factor_to(Units::Mm), 25.4);
        assert!((Units::Mm.factor_to(Units::Inch) - 1.0 / 25.4).abs() < 1e-12);
        assert_eq!(Units::Mm.factor_to(Units::Mm), 1.0);
        assert_eq!(Units::Inch.convert(2.0, Units::Mm), 50.8);
    }

    #[test]
    fn test_units_from_str() {
        assert_eq!("MM".parse::<Units>().unwrap(), Units::Mm);
        assert_eq!("inch".parse::<Units>().unwrap(), Units::Inch);
        assert_eq!(" in ".parse::<Units>().unwrap(), Units::Inch);
        assert!("furlong".parse::<Units>().is_err());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(1.005, 0), 1.0);
        assert_eq!(round_to(-2.55555, 2), -2.56);
    }

    #[test]
    fn test_convert_units_option_and_vec() {
        let mut v = vec![1.0, 2.0];
        v.convert_units(25.4);
        assert_eq!(v, vec![25.4, 50.8]);

        let mut o: Option<f64> = Some(2.0);
        o.convert_units(0.5);
        assert_eq!(o, Some(1.0));
    }
}
