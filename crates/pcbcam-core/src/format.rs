//! Fixed-point coordinate formats
//!
//! Gerber and Excellon write coordinates as bare digit strings whose
//! decimal point is implied by a fixed integer/decimal digit split. One
//! side of the digit string may be omitted: leading zero suppression
//! drops the zero digits at the front, trailing zero suppression drops
//! the zero digits at the end.

use crate::error::{FormatError, FormatResult};
use crate::units::Units;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_DIGITS: u8 = 12;

/// Which zero digits are omitted from a fixed-point digit string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ZeroSuppression {
    /// Leading zero digits are omitted (`%FSLA...`).
    #[default]
    Leading,
    /// Trailing zero digits are omitted (`%FSTA...`).
    Trailing,
}

impl ZeroSuppression {
    /// Letter used in a Gerber `%FS` statement.
    pub fn gerber_letter(self) -> char {
        match self {
            ZeroSuppression::Leading => 'L',
            ZeroSuppression::Trailing => 'T',
        }
    }

    /// Excellon header keyword. Excellon names the zeros that are *kept*,
    /// so leading suppression is `TZ` and trailing suppression is `LZ`.
    pub fn excellon_keyword(self) -> &'static str {
        match self {
            ZeroSuppression::Leading => "TZ",
            ZeroSuppression::Trailing => "LZ",
        }
    }
}

impl fmt::Display for ZeroSuppression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leading => write!(f, "Leading"),
            Self::Trailing => write!(f, "Trailing"),
        }
    }
}

/// How Excellon coordinates are written on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateStyle {
    /// Implied decimal point with zero suppression.
    #[default]
    Fixed,
    /// Explicit decimal point (`X12.700Y8.300`).
    Decimal,
}

/// How Excellon slots are written on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlotStyle {
    /// Canned slot: `X..Y..G85X..Y..`
    #[default]
    G85,
    /// Routed slot: `G00` position, `M15`, `G01` route, `M16`.
    Routed,
}

/// Persisted export/import format settings for one file kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Units written to (or assumed for) the file
    pub units: Units,
    /// Integer digits of a coordinate
    pub int_digits: u8,
    /// Decimal digits of a coordinate
    pub dec_digits: u8,
    /// Zero suppression mode
    pub zeros: ZeroSuppression,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            units: Units::Inch,
            int_digits: 2,
            dec_digits: 4,
            zeros: ZeroSuppression::Leading,
        }
    }
}

impl FormatConfig {
    pub fn new(units: Units, int_digits: u8, dec_digits: u8, zeros: ZeroSuppression) -> Self {
        Self {
            units,
            int_digits,
            dec_digits,
            zeros,
        }
    }

    /// Codec writing values given in `source_units` into this format.
    pub fn codec_from(&self, source_units: Units) -> CoordinateCodec {
        CoordinateCodec::new(self.int_digits, self.dec_digits, self.zeros)
            .with_factor(source_units.factor_to(self.units))
    }

    /// Check the digit layout is usable.
    pub fn validate(&self) -> FormatResult<()> {
        check_layout(self.int_digits, self.dec_digits)
    }
}

fn check_layout(int_digits: u8, dec_digits: u8) -> FormatResult<()> {
    if int_digits == 0 || int_digits > MAX_DIGITS || dec_digits > MAX_DIGITS {
        return Err(FormatError::InvalidLayout {
            int_digits,
            dec_digits,
        });
    }
    Ok(())
}

/// Fixed-point encoder/decoder for one digit layout.
///
/// `factor` is applied on encode (value * factor) and undone on decode
/// (value / factor); it carries the units conversion between the
/// document and the file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateCodec {
    pub int_digits: u8,
    pub dec_digits: u8,
    pub zeros: ZeroSuppression,
    pub factor: f64,
}

impl CoordinateCodec {
    pub fn new(int_digits: u8, dec_digits: u8, zeros: ZeroSuppression) -> Self {
        Self {
            int_digits,
            dec_digits,
            zeros,
            factor: 1.0,
        }
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    fn total_digits(&self) -> usize {
        self.int_digits as usize + self.dec_digits as usize
    }

    /// Format a value as a zero-suppressed digit string without a decimal point.
    pub fn encode(&self, value: f64) -> FormatResult<String> {
        check_layout(self.int_digits, self.dec_digits)?;
        let v = value * self.factor;
        let overflow = FormatError::Overflow {
            value: v,
            int_digits: self.int_digits,
        };
        if !v.is_finite() {
            return Err(overflow);
        }

        let scaled = (v.abs() * 10f64.powi(self.dec_digits as i32)).round();
        if scaled >= 10f64.powi(self.total_digits() as i32) {
            return Err(overflow);
        }
        let scaled = scaled as u64;

        let digits = format!("{:0width$}", scaled, width = self.total_digits());
        let trimmed = match self.zeros {
            ZeroSuppression::Leading => digits.trim_start_matches('0'),
            ZeroSuppression::Trailing => digits.trim_end_matches('0'),
        };

        let mut out = String::with_capacity(self.total_digits() + 1);
        if v < 0.0 && scaled != 0 {
            out.push('-');
        }
        if trimmed.is_empty() {
            out.push('0');
        } else {
            out.push_str(trimmed);
        }
        Ok(out)
    }

    /// Parse a digit string back into a value.
    ///
    /// Strings containing an explicit decimal point are read as plain
    /// decimals and bypass the implied-point logic.
    pub fn decode(&self, raw: &str) -> FormatResult<f64> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(FormatError::Empty);
        }
        let invalid = || FormatError::InvalidDigits {
            raw: raw.to_string(),
        };

        let (negative, body) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };
        if body.is_empty() {
            return Err(invalid());
        }

        let value = if body.contains('.') {
            if body.chars().filter(|c| *c == '.').count() > 1
                || !body.chars().all(|c| c.is_ascii_digit() || c == '.')
            {
                return Err(invalid());
            }
            body.parse::<f64>().map_err(|_| invalid())?
        } else {
            check_layout(self.int_digits, self.dec_digits)?;
            if !body.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            let total = self.total_digits();
            if body.len() > total {
                return Err(FormatError::TooManyDigits {
                    raw: raw.to_string(),
                    max: total,
                });
            }
            let pad = "0".repeat(total - body.len());
            let padded = match self.zeros {
                ZeroSuppression::Leading => format!("{}{}", pad, body),
                ZeroSuppression::Trailing => format!("{}{}", body, pad),
            };
            let n: u64 = padded.parse().map_err(|_| invalid())?;
            n as f64 / 10f64.powi(self.dec_digits as i32)
        };

        let value = if negative { -value } else { value };
        Ok(value / self.factor)
    }
}

/// Encode `value` with the given layout and no units scaling.
pub fn encode(
    value: f64,
    int_digits: u8,
    dec_digits: u8,
    zeros: ZeroSuppression,
) -> FormatResult<String> {
    CoordinateCodec::new(int_digits, dec_digits, zeros).encode(value)
}

/// Decode `raw` with the given layout and no units scaling.
pub fn decode(
    raw: &str,
    int_digits: u8,
    dec_digits: u8,
    zeros: ZeroSuppression,
) -> FormatResult<f64> {
    CoordinateCodec::new(int_digits, dec_digits, zeros).decode(raw)
}

/// Plain decimal formatting with a fixed number of decimals.
pub fn format_decimal(value: f64, decimals: u8) -> String {
    let s = format!("{:.*}", decimals as usize, value);
    if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
        s[1..].to_string()
    } else {
        s
    }
}
