//! RS-274X writer
//!
//! Elements are written back in draw order. Apertures that have no
//! standard definition (regions, macros) are emitted as G36/G37 regions
//! built from their filled area.

use super::{ApertureElement, ApertureId, GerberDocument, Polarity};
use crate::error::CamToolResult;
use pcbcam_core::geometry::{Point, Polygon, Shape};
use pcbcam_core::{CoordinateCodec, FormatConfig};
use std::collections::BTreeSet;
use std::fmt::Write;
use tracing::debug;

struct GerberWriter {
    codec: CoordinateCodec,
    out: String,
    aperture: Option<ApertureId>,
    polarity: Polarity,
}

impl GerberWriter {
    fn xy(&self, p: Point) -> CamToolResult<String> {
        Ok(format!(
            "X{}Y{}",
            self.codec.encode(p.x)?,
            self.codec.encode(p.y)?
        ))
    }

    fn select(&mut self, id: ApertureId) -> CamToolResult<()> {
        if self.aperture != Some(id) {
            writeln!(self.out, "D{}*", id.0)?;
            self.aperture = Some(id);
        }
        Ok(())
    }

    fn set_polarity(&mut self, polarity: Polarity) -> CamToolResult<()> {
        if self.polarity != polarity {
            let letter = match polarity {
                Polarity::Dark => 'D',
                Polarity::Clear => 'C',
            };
            writeln!(self.out, "%LP{}*%", letter)?;
            self.polarity = polarity;
        }
        Ok(())
    }

    fn path(&mut self, points: &[Point], closed: bool) -> CamToolResult<()> {
        let Some(first) = points.first() else {
            return Ok(());
        };
        let start = self.xy(*first)?;
        writeln!(self.out, "{}D02*", start)?;
        for p in &points[1..] {
            let xy = self.xy(*p)?;
            writeln!(self.out, "{}D01*", xy)?;
        }
        if closed && points.len() > 2 {
            writeln!(self.out, "{}D01*", start)?;
        }
        writeln!(self.out, "D02*")?;
        Ok(())
    }

    fn contour(&mut self, ring: &[Point]) -> CamToolResult<()> {
        if ring.len() < 3 {
            return Ok(());
        }
        writeln!(self.out, "G36*")?;
        self.path(ring, true)?;
        writeln!(self.out, "G37*")?;
        Ok(())
    }

    /// Filled polygons as regions; holes of dark polygons are cleared.
    fn regions(&mut self, polys: &[Polygon]) -> CamToolResult<()> {
        for poly in polys {
            self.contour(&poly.exterior)?;
            if poly.interiors.is_empty() {
                continue;
            }
            if self.polarity == Polarity::Clear {
                debug!("Dropping {} holes of a clear region", poly.interiors.len());
                continue;
            }
            self.set_polarity(Polarity::Clear)?;
            for hole in &poly.interiors {
                self.contour(hole)?;
            }
            self.set_polarity(Polarity::Dark)?;
        }
        Ok(())
    }

    fn element(&mut self, id: ApertureId, element: &ApertureElement, standard: bool) -> CamToolResult<()> {
        self.set_polarity(element.polarity())?;
        if !standard {
            return self.regions(element.area());
        }
        match &element.follow {
            Shape::Point(p) => {
                self.select(id)?;
                let xy = self.xy(*p)?;
                writeln!(self.out, "{}D03*", xy)?;
            }
            Shape::Line(points) => {
                self.select(id)?;
                self.path(points, false)?;
            }
            Shape::Ring(points) => {
                self.select(id)?;
                self.path(points, true)?;
            }
            Shape::Polygon(_) => self.regions(element.area())?,
        }
        Ok(())
    }
}

/// Write `doc` as RS-274X text in the layout given by `config`.
pub fn export_gerber(doc: &GerberDocument, config: &FormatConfig) -> CamToolResult<String> {
    config.validate()?;
    let factor = doc.units.factor_to(config.units);
    let mut writer = GerberWriter {
        codec: config.codec_from(doc.units),
        out: String::new(),
        aperture: None,
        polarity: Polarity::Dark,
    };

    writeln!(writer.out, "G04 Generated by PCBCam {}*", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        writer.out,
        "%FS{}AX{}{}Y{}{}*%",
        config.zeros.gerber_letter(),
        config.int_digits,
        config.dec_digits,
        config.int_digits,
        config.dec_digits
    )?;
    writeln!(writer.out, "%MO{}*%", config.units.keyword())?;

    let mut standard = BTreeSet::new();
    for (id, aperture) in doc.apertures.iter() {
        if aperture.elements.is_empty() {
            continue;
        }
        if let Some(def) = aperture.shape.definition(factor, config.dec_digits as usize) {
            writeln!(writer.out, "%ADD{}{}*%", id.0, def)?;
            standard.insert(id);
        }
    }

    writeln!(writer.out, "G01*")?;
    writeln!(writer.out, "%LPD*%")?;
    let elements = doc.apertures.elements_in_order();
    for (id, element) in &elements {
        writer.element(*id, element, standard.contains(id))?;
    }
    writeln!(writer.out, "M02*")?;

    debug!("Exported {} Gerber elements", elements.len());
    Ok(writer.out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gerber::{ApertureShape, GerberParseOptions};
    use crate::gerber::parse_gerber;
    use pcbcam_core::{Units, ZeroSuppression};

    #[test]
    fn test_flash_output() {
        let mut doc = GerberDocument::new(Units::Mm);
        doc.add_flash(
            ApertureShape::Circle {
                diameter: 0.2,
                hole: None,
            },
            Point::new(10.0, 10.0),
        );
        let config = FormatConfig::new(Units::Mm, 2, 4, ZeroSuppression::Leading);
        let text = export_gerber(&doc, &config).unwrap();

        assert!(text.contains("%FSLAX24Y24*%"));
        assert!(text.contains("%MOMM*%"));
        assert!(text.contains("%ADD10C,0.2000*%"));
        let select = text.find("D10*\n").unwrap();
        let flash = text.find("X100000Y100000D03*").unwrap();
        assert!(select < flash);
        assert!(text.trim_end().ends_with("M02*"));
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut doc = GerberDocument::new(Units::Mm);
        doc.add_flash(
            ApertureShape::Circle {
                diameter: 0.2,
                hole: None,
            },
            Point::new(1000.0, 0.0),
        );
        let config = FormatConfig::new(Units::Mm, 2, 4, ZeroSuppression::Leading);
        assert!(export_gerber(&doc, &config).is_err());
    }

    #[test]
    fn test_region_round_trip() {
        let text = "%FSLAX24Y24*%\n%MOMM*%\nG36*\nX0Y0D02*\nX50000Y0D01*\nX50000Y50000D01*\nX0Y50000D01*\nX0Y0D01*\nG37*\nM02*\n";
        let doc = parse_gerber(text, &GerberParseOptions::default()).unwrap();
        let config = FormatConfig::new(Units::Mm, 2, 4, ZeroSuppression::Leading);
        let out = export_gerber(&doc, &config).unwrap();
        assert!(out.contains("G36*"));
        assert!(!out.contains("%ADD"));

        let again = parse_gerber(&out, &GerberParseOptions::default()).unwrap();
        let area: f64 = again.solid_geometry().iter().map(|p| p.area()).sum();
        assert!((area - 25.0).abs() < 1e-6);
    }
}
