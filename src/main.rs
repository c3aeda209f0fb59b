use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use pcbcam::pipeline::{self, IsolateOverrides};
use pcbcam::{init_logging, Config, Preprocessor, PreprocessorRegistry, Units, BUILD_DATE, VERSION};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "pcbcam")]
#[command(about = "Isolation routing and drilling programs from Gerber and Excellon files", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mill around the copper of a Gerber layer
    Isolate {
        /// Gerber file to isolate
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        /// Program to write
        #[arg(short, long)]
        output: PathBuf,

        /// Units of the program
        #[arg(short, long, default_value = "mm")]
        units: Units,

        /// Tool diameter, overriding the configuration
        #[arg(long)]
        tool_diameter: Option<f64>,

        /// Number of passes, overriding the configuration
        #[arg(long)]
        passes: Option<usize>,

        /// Cut along track centre lines instead of around the copper
        #[arg(long)]
        follow: bool,
    },

    /// Drill the holes of an Excellon file
    Drill {
        /// Excellon file to drill
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        /// Program to write
        #[arg(short, long)]
        output: PathBuf,

        /// Units of the program
        #[arg(short, long, default_value = "mm")]
        units: Units,
    },

    /// Rewrite a Gerber file in the configured format
    Gerber {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rewrite an Excellon file in the configured format
    Excellon {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show a summary of a Gerber or drill file
    Info {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the machine dialects
    Preprocessors,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return Config::load_from_file(path)
            .with_context(|| format!("failed to load {}", path.display()));
    }
    match Config::default_path() {
        Ok(path) if path.exists() => Ok(Config::load_from_file(&path)?),
        _ => Ok(Config::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    init_logging(level)?;
    info!("pcbcam {} (built {})", VERSION, BUILD_DATE);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Isolate {
            input,
            output,
            units,
            tool_diameter,
            passes,
            follow,
        } => {
            let overrides = IsolateOverrides {
                tool_diameter,
                passes,
                follow,
            };
            let job = pipeline::isolate(&config, &input, &output, units, &overrides)?;
            println!(
                "{}: {} tool(s), {:.2} {} of cutting",
                output.display(),
                job.blocks().len(),
                job.cut_length(),
                units.label()
            );
        }
        Commands::Drill {
            input,
            output,
            units,
        } => {
            let job = pipeline::drill(&config, &input, &output, units)?;
            println!("{}: {} tool(s)", output.display(), job.blocks().len());
        }
        Commands::Gerber { input, output } => pipeline::convert_gerber(&config, &input, &output)?,
        Commands::Excellon { input, output } => {
            pipeline::convert_excellon(&config, &input, &output)?
        }
        Commands::Info { input, format } => {
            let summary = pipeline::summarize(&config, &input)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text => {
                    println!("Type:     {}", summary.kind);
                    println!("Units:    {}", summary.units.label());
                    println!("Tools:    {}", summary.tools);
                    println!("Elements: {}", summary.elements);
                    if let Some(b) = summary.bounds {
                        println!(
                            "Bounds:   ({:.4}, {:.4}) - ({:.4}, {:.4})",
                            b.min_x, b.min_y, b.max_x, b.max_y
                        );
                    }
                }
            }
        }
        Commands::Preprocessors => {
            let registry = PreprocessorRegistry::default();
            for name in registry.list_registered() {
                if let Some(pp) = registry.create(name) {
                    println!("{:<24} {}", name, pp.description());
                }
            }
        }
    }

    Ok(())
}
