//! Machine dialects
//!
//! A [`Preprocessor`] turns the assembler's abstract moves into the text
//! one controller family understands. Dialects are looked up by name in
//! a [`PreprocessorRegistry`].

use pcbcam_core::format::format_decimal;
use pcbcam_core::geometry::Point;
use pcbcam_core::{MachiningParams, Units};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Name of the dialect used when a requested one is unknown.
pub const DEFAULT_PREPROCESSOR: &str = "default";

/// Comment and header flavour, picked from the dialect name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// `(text)` comments
    Gcode,
    /// `;text` comments for 3D printer firmware
    Printer,
    /// `CO "text";` plotter comments
    Hpgl,
}

impl HeaderStyle {
    pub fn for_preprocessor(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("hpgl") {
            HeaderStyle::Hpgl
        } else if name.contains("marlin") || name.contains("repetier") {
            HeaderStyle::Printer
        } else {
            HeaderStyle::Gcode
        }
    }

    pub fn comment(self, text: &str) -> String {
        match self {
            HeaderStyle::Gcode => format!("({})", text.replace(['(', ')'], "")),
            HeaderStyle::Printer => format!(";{}", text),
            HeaderStyle::Hpgl => format!("CO \"{}\";", text.replace('"', "'")),
        }
    }
}

/// Values a dialect needs while emitting one tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub tool_id: u32,
    pub diameter: f64,
    pub params: &'a MachiningParams,
    pub units: Units,
    pub coord_decimals: u8,
    pub feed_decimals: u8,
}

impl ToolContext<'_> {
    /// Coordinate text.
    pub fn c(&self, value: f64) -> String {
        format_decimal(value, self.coord_decimals)
    }

    /// Feed rate text.
    pub fn f(&self, value: f64) -> String {
        format_decimal(value, self.feed_decimals)
    }
}

/// One controller dialect.
///
/// Every method returns zero or more complete lines without a trailing
/// newline; an empty string emits nothing.
pub trait Preprocessor: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// When false the program carries no generated header or footer.
    fn include_header(&self) -> bool {
        true
    }

    fn style(&self) -> HeaderStyle {
        HeaderStyle::for_preprocessor(self.name())
    }

    fn comment(&self, text: &str) -> String {
        self.style().comment(text)
    }

    fn start_code(&self, ctx: &ToolContext) -> String;

    fn toolchange_code(&self, ctx: &ToolContext) -> String;

    fn spindle_start(&self, ctx: &ToolContext) -> String;

    fn dwell(&self, ctx: &ToolContext) -> String;

    /// Raise to (or travel at) height `z`.
    fn travel_z(&self, ctx: &ToolContext, z: f64) -> String;

    fn rapid_xy(&self, ctx: &ToolContext, p: Point) -> String;

    /// Feed down to cutting height `z`.
    fn plunge(&self, ctx: &ToolContext, z: f64) -> String;

    /// Switch to the horizontal cutting feed after a plunge.
    fn cut_feed(&self, _ctx: &ToolContext) -> String {
        String::new()
    }

    fn feed_xy(&self, ctx: &ToolContext, p: Point) -> String;

    fn end_code(&self, ctx: &ToolContext) -> String;

    fn spindle_stop(&self, ctx: &ToolContext) -> String;

    fn program_end(&self) -> String;
}

/// Arc-wrapped dialect for sharing.
pub type PreprocessorHandle = Arc<dyn Preprocessor>;

/// How a dialect pauses for a tool swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolchangeStyle {
    /// `T` + `M6` with an operator pause
    M6,
    /// Operator pause only (GRBL 1.1 has no M6)
    Pause,
    /// `M6`, then probe the new tool length with `G31` and zero Z
    Probe,
}

/// RS-274 style G-code shared by the CNC controller dialects.
#[derive(Debug, Clone)]
pub struct StandardGcode {
    name: &'static str,
    description: &'static str,
    toolchange: ToolchangeStyle,
    include_header: bool,
}

impl StandardGcode {
    pub fn generic() -> Self {
        Self {
            name: DEFAULT_PREPROCESSOR,
            description: "Generic G-code with M6 tool changes",
            toolchange: ToolchangeStyle::M6,
            include_header: true,
        }
    }

    pub fn grbl_11() -> Self {
        Self {
            name: "grbl_11",
            description: "GRBL 1.1, tool changes as an operator pause",
            toolchange: ToolchangeStyle::Pause,
            include_header: true,
        }
    }

    pub fn toolchange_probe_mach3() -> Self {
        Self {
            name: "toolchange_probe_mach3",
            description: "Mach3 with probe based tool length setting",
            toolchange: ToolchangeStyle::Probe,
            include_header: true,
        }
    }

    pub fn nccad9() -> Self {
        Self {
            name: "nccad9",
            description: "Headerless G-code for NCCAD9 controllers",
            toolchange: ToolchangeStyle::Pause,
            include_header: false,
        }
    }
}

impl Preprocessor for StandardGcode {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn include_header(&self) -> bool {
        self.include_header
    }

    fn start_code(&self, ctx: &ToolContext) -> String {
        let units = match ctx.units {
            Units::Mm => "G21",
            Units::Inch => "G20",
        };
        format!("{}\nG90\nG94", units)
    }

    fn toolchange_code(&self, ctx: &ToolContext) -> String {
        let p = ctx.params;
        let mut lines = vec![format!("G00 Z{}", ctx.c(p.toolchange_z))];
        if let Some(xy) = p.toolchange_xy {
            lines.push(format!("G00 X{} Y{}", ctx.c(xy.x), ctx.c(xy.y)));
        }
        let dia = ctx.c(ctx.diameter);
        match self.toolchange {
            ToolchangeStyle::M6 => {
                lines.push(format!("T{}", ctx.tool_id));
                lines.push("M5".to_string());
                lines.push("M6".to_string());
                lines.push(format!("(MSG, Change to Tool Dia = {})", dia));
                lines.push("M0".to_string());
            }
            ToolchangeStyle::Pause => {
                lines.push("M5".to_string());
                lines.push(format!("(MSG, Change to Tool Dia = {})", dia));
                lines.push("M0".to_string());
            }
            ToolchangeStyle::Probe => {
                lines.push("M5".to_string());
                lines.push(format!("T{} M6", ctx.tool_id));
                lines.push(format!("(MSG, Change to Tool Dia = {} and attach the probe)", dia));
                lines.push("M0".to_string());
                lines.push(format!(
                    "G31 Z{} F{}",
                    ctx.c(p.extras.probe_z),
                    ctx.f(p.extras.probe_feedrate)
                ));
                lines.push("G92 Z0".to_string());
                lines.push(format!("G00 Z{}", ctx.c(p.toolchange_z)));
                lines.push("(MSG, Remove the probe)".to_string());
                lines.push("M0".to_string());
            }
        }
        lines.join("\n")
    }

    fn spindle_start(&self, ctx: &ToolContext) -> String {
        match ctx.params.spindle_speed {
            Some(s) => format!("M03 S{}", s.round() as i64),
            None => "M03".to_string(),
        }
    }

    fn dwell(&self, ctx: &ToolContext) -> String {
        format!("G04 P{}", ctx.f(ctx.params.dwell_time))
    }

    fn travel_z(&self, ctx: &ToolContext, z: f64) -> String {
        format!("G00 Z{}", ctx.c(z))
    }

    fn rapid_xy(&self, ctx: &ToolContext, p: Point) -> String {
        format!("G00 X{} Y{}", ctx.c(p.x), ctx.c(p.y))
    }

    fn plunge(&self, ctx: &ToolContext, z: f64) -> String {
        format!("G01 Z{} F{}", ctx.c(z), ctx.f(ctx.params.feedrate_z))
    }

    fn cut_feed(&self, ctx: &ToolContext) -> String {
        format!("G01 F{}", ctx.f(ctx.params.feedrate))
    }

    fn feed_xy(&self, ctx: &ToolContext, p: Point) -> String {
        format!("G01 X{} Y{}", ctx.c(p.x), ctx.c(p.y))
    }

    fn end_code(&self, ctx: &ToolContext) -> String {
        let p = ctx.params;
        let mut out = format!("G00 Z{}", ctx.c(p.end_z));
        if let Some(xy) = p.end_xy {
            out.push_str(&format!("\nG00 X{} Y{}", ctx.c(xy.x), ctx.c(xy.y)));
        }
        out
    }

    fn spindle_stop(&self, _ctx: &ToolContext) -> String {
        "M05".to_string()
    }

    fn program_end(&self) -> String {
        "M02".to_string()
    }
}

/// Marlin and Repetier firmware: feed on every move, `;` comments.
#[derive(Debug, Clone)]
pub struct PrinterGcode {
    name: &'static str,
    description: &'static str,
    /// Repetier reads `G4 P` in milliseconds, Marlin takes `G4 S` seconds
    dwell_ms: bool,
}

impl PrinterGcode {
    pub fn marlin() -> Self {
        Self {
            name: "marlin",
            description: "Marlin firmware",
            dwell_ms: false,
        }
    }

    pub fn repetier() -> Self {
        Self {
            name: "repetier",
            description: "Repetier firmware",
            dwell_ms: true,
        }
    }
}

impl Preprocessor for PrinterGcode {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn start_code(&self, ctx: &ToolContext) -> String {
        let units = match ctx.units {
            Units::Mm => "G21",
            Units::Inch => "G20",
        };
        format!("{}\nG90", units)
    }

    fn toolchange_code(&self, ctx: &ToolContext) -> String {
        let p = ctx.params;
        let mut lines = vec![format!(
            "G0 Z{} F{}",
            ctx.c(p.toolchange_z),
            ctx.f(p.feedrate_rapid)
        )];
        if let Some(xy) = p.toolchange_xy {
            lines.push(format!(
                "G0 X{} Y{} F{}",
                ctx.c(xy.x),
                ctx.c(xy.y),
                ctx.f(p.feedrate_rapid)
            ));
        }
        lines.push("M5".to_string());
        lines.push(format!("M0 Change to tool {} dia {}", ctx.tool_id, ctx.c(ctx.diameter)));
        lines.join("\n")
    }

    fn spindle_start(&self, ctx: &ToolContext) -> String {
        match ctx.params.spindle_speed {
            Some(s) => format!("M3 S{}", s.round() as i64),
            None => "M3".to_string(),
        }
    }

    fn dwell(&self, ctx: &ToolContext) -> String {
        if self.dwell_ms {
            format!("G4 P{}", (ctx.params.dwell_time * 1000.0).round() as i64)
        } else {
            format!("G4 S{}", ctx.f(ctx.params.dwell_time))
        }
    }

    fn travel_z(&self, ctx: &ToolContext, z: f64) -> String {
        format!("G0 Z{} F{}", ctx.c(z), ctx.f(ctx.params.feedrate_rapid))
    }

    fn rapid_xy(&self, ctx: &ToolContext, p: Point) -> String {
        format!(
            "G0 X{} Y{} F{}",
            ctx.c(p.x),
            ctx.c(p.y),
            ctx.f(ctx.params.feedrate_rapid)
        )
    }

    fn plunge(&self, ctx: &ToolContext, z: f64) -> String {
        format!("G1 Z{} F{}", ctx.c(z), ctx.f(ctx.params.feedrate_z))
    }

    fn feed_xy(&self, ctx: &ToolContext, p: Point) -> String {
        format!(
            "G1 X{} Y{} F{}",
            ctx.c(p.x),
            ctx.c(p.y),
            ctx.f(ctx.params.feedrate)
        )
    }

    fn end_code(&self, ctx: &ToolContext) -> String {
        let p = ctx.params;
        let mut out = format!("G0 Z{} F{}", ctx.c(p.end_z), ctx.f(p.feedrate_rapid));
        if let Some(xy) = p.end_xy {
            out.push_str(&format!(
                "\nG0 X{} Y{} F{}",
                ctx.c(xy.x),
                ctx.c(xy.y),
                ctx.f(p.feedrate_rapid)
            ));
        }
        out
    }

    fn spindle_stop(&self, _ctx: &ToolContext) -> String {
        "M5".to_string()
    }

    fn program_end(&self) -> String {
        "M84".to_string()
    }
}

/// HP-GL pen plotters: pen up/down instead of Z, `PA` absolute moves.
#[derive(Debug, Clone, Default)]
pub struct Hpgl;

impl Preprocessor for Hpgl {
    fn name(&self) -> &str {
        "hpgl"
    }

    fn description(&self) -> &str {
        "HP-GL plotter output"
    }

    fn start_code(&self, _ctx: &ToolContext) -> String {
        "IN;".to_string()
    }

    fn toolchange_code(&self, ctx: &ToolContext) -> String {
        format!("SP{};", ctx.tool_id)
    }

    fn spindle_start(&self, _ctx: &ToolContext) -> String {
        String::new()
    }

    fn dwell(&self, _ctx: &ToolContext) -> String {
        String::new()
    }

    fn travel_z(&self, _ctx: &ToolContext, _z: f64) -> String {
        "PU;".to_string()
    }

    fn rapid_xy(&self, ctx: &ToolContext, p: Point) -> String {
        format!("PA{},{};", ctx.c(p.x), ctx.c(p.y))
    }

    fn plunge(&self, _ctx: &ToolContext, _z: f64) -> String {
        "PD;".to_string()
    }

    fn feed_xy(&self, ctx: &ToolContext, p: Point) -> String {
        format!("PA{},{};", ctx.c(p.x), ctx.c(p.y))
    }

    fn end_code(&self, ctx: &ToolContext) -> String {
        match ctx.params.end_xy {
            Some(xy) => format!("PU;\nPA{},{};", ctx.c(xy.x), ctx.c(xy.y)),
            None => "PU;".to_string(),
        }
    }

    fn spindle_stop(&self, _ctx: &ToolContext) -> String {
        String::new()
    }

    fn program_end(&self) -> String {
        "SP0;".to_string()
    }
}

type PreprocessorFactory = Arc<dyn Fn() -> PreprocessorHandle + Send + Sync>;

/// Dialects by case-insensitive name.
pub struct PreprocessorRegistry {
    factories: HashMap<String, PreprocessorFactory>,
}

impl PreprocessorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every built-in dialect.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(DEFAULT_PREPROCESSOR, || Arc::new(StandardGcode::generic()))
            .register("grbl_11", || Arc::new(StandardGcode::grbl_11()))
            .register("toolchange_probe_mach3", || {
                Arc::new(StandardGcode::toolchange_probe_mach3())
            })
            .register("nccad9", || Arc::new(StandardGcode::nccad9()))
            .register("marlin", || Arc::new(PrinterGcode::marlin()))
            .register("repetier", || Arc::new(PrinterGcode::repetier()))
            .register("hpgl", || Arc::new(Hpgl));
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> PreprocessorHandle + Send + Sync + 'static,
    {
        self.factories
            .insert(name.into().to_lowercase(), Arc::new(factory));
        self
    }

    pub fn create(&self, name: &str) -> Option<PreprocessorHandle> {
        self.factories.get(&name.trim().to_lowercase()).map(|f| f())
    }

    /// Dialect for `name`, falling back to the default one.
    pub fn resolve(&self, name: &str) -> PreprocessorHandle {
        if let Some(pp) = self.create(name) {
            return pp;
        }
        warn!(
            "Unknown preprocessor '{}', using '{}'",
            name, DEFAULT_PREPROCESSOR
        );
        self.create(DEFAULT_PREPROCESSOR)
            .unwrap_or_else(|| Arc::new(StandardGcode::generic()))
    }

    /// Registered names, sorted.
    pub fn list_registered(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for PreprocessorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
