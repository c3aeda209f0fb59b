//! NC drill writer

use super::ExcellonDocument;
use crate::error::CamToolResult;
use pcbcam_core::format::format_decimal;
use pcbcam_core::geometry::Point;
use pcbcam_core::{CoordinateCodec, CoordinateStyle, FormatConfig, SlotStyle, Units};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::debug;

/// How a drill file is written.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ExcellonExportSettings {
    pub format: FormatConfig,
    #[serde(default)]
    pub coordinates: CoordinateStyle,
    #[serde(default)]
    pub slots: SlotStyle,
}

struct Coordinates {
    codec: CoordinateCodec,
    style: CoordinateStyle,
    factor: f64,
    decimals: u8,
}

impl Coordinates {
    fn value(&self, v: f64) -> CamToolResult<String> {
        Ok(match self.style {
            CoordinateStyle::Fixed => self.codec.encode(v)?,
            CoordinateStyle::Decimal => format_decimal(v * self.factor, self.decimals),
        })
    }

    fn xy(&self, p: Point) -> CamToolResult<String> {
        Ok(format!("X{}Y{}", self.value(p.x)?, self.value(p.y)?))
    }
}

/// Tool diameters use 2 decimals in metric files and 4 in inch files,
/// whatever the coordinate precision.
fn diameter_text(diameter: f64, units: Units) -> String {
    match units {
        Units::Mm => format!("{:.2}", diameter),
        Units::Inch => format!("{:.4}", diameter),
    }
}

/// Write `doc` as an NC drill file.
pub fn export_excellon(doc: &ExcellonDocument, settings: &ExcellonExportSettings) -> CamToolResult<String> {
    let format = &settings.format;
    format.validate()?;
    let factor = doc.units.factor_to(format.units);
    let coords = Coordinates {
        codec: format.codec_from(doc.units),
        style: settings.coordinates,
        factor,
        decimals: format.dec_digits,
    };

    let mut out = String::new();
    writeln!(out, "M48")?;
    writeln!(out, ";EXCELLON GENERATED BY PCBCAM v{}", env!("CARGO_PKG_VERSION"))?;
    let units_kw = match format.units {
        Units::Mm => "METRIC",
        Units::Inch => "INCH",
    };
    match settings.coordinates {
        CoordinateStyle::Fixed => {
            writeln!(out, ";FILE_FORMAT={}:{}", format.int_digits, format.dec_digits)?;
            writeln!(out, "{},{}", units_kw, format.zeros.excellon_keyword())?;
        }
        CoordinateStyle::Decimal => writeln!(out, "{}", units_kw)?,
    }
    for (id, tool) in doc.tools.iter() {
        writeln!(out, "T{}F00S00C{}", id, diameter_text(tool.diameter * factor, format.units))?;
    }
    writeln!(out, "%")?;
    writeln!(out, "G90")?;
    writeln!(out, "G05")?;

    for (id, tool) in doc.tools.iter() {
        if tool.hit_count() == 0 {
            continue;
        }
        writeln!(out, "T{}", id)?;
        for p in &tool.drills {
            writeln!(out, "{}", coords.xy(*p)?)?;
        }
        for slot in &tool.slots {
            let (start, end) = (coords.xy(slot.start)?, coords.xy(slot.end)?);
            match settings.slots {
                SlotStyle::G85 => writeln!(out, "{}G85{}", start, end)?,
                SlotStyle::Routed => {
                    writeln!(out, "G00{}", start)?;
                    writeln!(out, "M15")?;
                    writeln!(out, "G01{}", end)?;
                    writeln!(out, "M16")?;
                    writeln!(out, "G05")?;
                }
            }
        }
    }
    writeln!(out, "M30")?;

    debug!("Exported {} drill hits", doc.total_drills());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excellon::{parse_excellon, ExcellonParseOptions};
    use pcbcam_core::{DrillTool, Slot, ZeroSuppression};

    fn doc() -> ExcellonDocument {
        let mut doc = ExcellonDocument::new(Units::Mm);
        let mut tool = DrillTool::new(0.8, 4);
        tool.drills.push(Point::new(1.5, 2.0));
        tool.slots.push(Slot {
            start: Point::new(0.0, 0.0),
            end: Point::new(3.0, 0.0),
        });
        doc.tools.insert_with_id(1, tool);
        doc
    }

    fn metric_fixed() -> ExcellonExportSettings {
        ExcellonExportSettings {
            format: FormatConfig::new(Units::Mm, 3, 3, ZeroSuppression::Leading),
            coordinates: CoordinateStyle::Fixed,
            slots: SlotStyle::G85,
        }
    }

    #[test]
    fn test_header_and_body() {
        let text = export_excellon(&doc(), &metric_fixed()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "M48");
        assert!(lines.contains(&";FILE_FORMAT=3:3"));
        assert!(lines.contains(&"METRIC,TZ"));
        assert!(lines.contains(&"T1F00S00C0.80"));
        assert!(lines.contains(&"X1500Y2000"));
        assert!(lines.contains(&"X0Y0G85X3000Y0"));
        assert_eq!(*lines.last().unwrap(), "M30");
    }

    #[test]
    fn test_inch_diameters_use_four_decimals() {
        let mut settings = metric_fixed();
        settings.format = FormatConfig::new(Units::Inch, 2, 4, ZeroSuppression::Leading);
        let text = export_excellon(&doc(), &settings).unwrap();
        assert!(text.contains("T1F00S00C0.0315\n"));
    }

    #[test]
    fn test_decimal_routed_round_trip() {
        let settings = ExcellonExportSettings {
            coordinates: CoordinateStyle::Decimal,
            slots: SlotStyle::Routed,
            ..metric_fixed()
        };
        let text = export_excellon(&doc(), &settings).unwrap();
        assert!(text.contains("X1.500Y2.000\n"));
        assert!(text.contains("M15\nG01X3.000Y0.000\nM16\n"));

        let back = parse_excellon(&text, &ExcellonParseOptions::default()).unwrap();
        assert_eq!(back.units, Units::Mm);
        let tool = back.tools.get(1).unwrap();
        assert_eq!(tool.drills, vec![Point::new(1.5, 2.0)]);
        assert_eq!(tool.slots.len(), 1);
        assert_eq!(tool.slots[0].end, Point::new(3.0, 0.0));
    }
}
