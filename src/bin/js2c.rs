//! js2c Command Line Interface
//!
//! Expands natives macros in JavaScript modules and embeds the result in a
//! C++ source file.
//!
//! # Usage
//!
//! ```bash
//! # Build the C++ file; macros.py among the sources holds the definitions
//! js2c build --output gen/natives.cc src/macros.py src/init.js src/util.js
//!
//! # Same, also dumping expanded modules to gen/js/
//! js2c build --output gen/natives.cc --debug src/macros.py src/*.js
//!
//! # Print one module after expansion
//! js2c expand --macros src/macros.py src/init.js
//!
//! # List the definitions in a macros file
//! js2c check src/macros.py --format json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use js2c::{build, read_definitions, BuildOptions, Js2cConfig, Pipeline, CONFIG_ENV_VAR};
use macro_core::{DefinitionKind, Definitions, ParamSubstitution};

#[derive(Parser)]
#[command(name = "js2c")]
#[command(version = "0.1.0")]
#[command(about = "Natives macro preprocessor and C++ source embedder")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to ./js2c.yaml when present)
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand all modules and write the C++ source file
    Build {
        /// C++ file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Also write expanded modules to a js/ directory next to the output
        #[arg(long)]
        debug: bool,

        /// Definitions file (otherwise the source named like macros_file_name)
        #[arg(long)]
        macros: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// C++ namespace for the generated arrays
        #[arg(long)]
        namespace: Option<String>,

        /// Definitions file and JavaScript modules
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },

    /// Print one module after expansion and validation
    Expand {
        /// Definitions file (otherwise looked up next to the module)
        #[arg(long)]
        macros: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// Module to expand
        file: PathBuf,
    },

    /// Parse a definitions file and list what it declares
    Check {
        /// Definitions file
        macros: PathBuf,

        /// Output format
        #[arg(long, default_value = "text", value_enum)]
        format: OutputFormat,
    },
}

/// Flags that override the config file
#[derive(Args)]
struct Overrides {
    /// Strip comments and trailing whitespace from expanded modules
    #[arg(long)]
    strip_comments: bool,

    /// How template parameters are substituted
    #[arg(long, value_enum)]
    substitution: Option<Substitution>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Substitution {
    Substring,
    Token,
}

impl From<Substitution> for ParamSubstitution {
    fn from(value: Substitution) -> Self {
        match value {
            Substitution::Substring => ParamSubstitution::Substring,
            Substitution::Token => ParamSubstitution::Token,
        }
    }
}

impl Overrides {
    fn apply(&self, config: &mut Js2cConfig) {
        if self.strip_comments {
            config.strip_comments = true;
        }
        if let Some(substitution) = self.substitution {
            config.param_substitution = substitution.into();
        }
    }
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Build {
            output,
            debug,
            macros,
            overrides,
            namespace,
            sources,
        } => {
            let mut config = config;
            overrides.apply(&mut config);
            if let Some(namespace) = namespace {
                config.namespace = namespace;
            }
            cmd_build(
                BuildOptions {
                    output,
                    sources,
                    macros,
                    debug,
                },
                &config,
            )
        }
        Commands::Expand {
            macros,
            overrides,
            file,
        } => {
            let mut config = config;
            overrides.apply(&mut config);
            cmd_expand(&file, macros.as_deref(), &config)
        }
        Commands::Check { macros, format } => cmd_check(&macros, format),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Js2cConfig> {
    match path {
        Some(path) => Js2cConfig::load(path),
        None => Js2cConfig::from_env(),
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn cmd_build(options: BuildOptions, config: &Js2cConfig) -> Result<()> {
    config.check().context("Invalid options")?;
    let report = build(&options, config)?;

    println!(
        "{} Wrote {} module(s), {} bytes, to {}",
        "OK".green().bold(),
        report.modules.len(),
        report.bytes,
        options.output.display()
    );
    if let Some(dir) = report.debug_dir {
        println!("   Expanded modules in {}", dir.display().to_string().dimmed());
    }
    Ok(())
}

fn cmd_expand(file: &Path, macros: Option<&Path>, config: &Js2cConfig) -> Result<()> {
    let definitions = match macros {
        Some(path) => read_definitions(path)?,
        None => sibling_definitions(file, &config.macros_file_name)?,
    };

    let pipeline = Pipeline::new(&definitions, config)?;
    let module = pipeline.process_file(file)?;
    print!("{}", module.text);
    Ok(())
}

/// Definitions file next to `file`, or empty tables when there is none
fn sibling_definitions(file: &Path, macros_file_name: &str) -> Result<Definitions> {
    let candidate = file
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(macros_file_name);

    if candidate.is_file() {
        read_definitions(&candidate)
    } else {
        Ok(Definitions::new())
    }
}

fn cmd_check(macros: &Path, format: OutputFormat) -> Result<()> {
    let definitions = read_definitions(macros)?;
    let summary = definitions.summary();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("JSON serialization failed")?
            );
        }
        OutputFormat::Text => {
            println!(
                "{} {} constant(s), {} macro(s)",
                "OK".green().bold(),
                definitions.constants().len(),
                definitions.macros().len()
            );
            for item in &summary {
                let tag = match item.kind {
                    DefinitionKind::Constant => "[const]".dimmed(),
                    DefinitionKind::Macro => "[macro]".blue(),
                    DefinitionKind::ComputedMacro => "[computed]".yellow(),
                };
                match item.kind {
                    DefinitionKind::Constant => {
                        println!("  {} {} = {}", tag, item.name.green(), item.body)
                    }
                    _ => println!(
                        "  {} {}({}) = {}",
                        tag,
                        item.name.green().bold(),
                        item.params.join(", "),
                        item.body
                    ),
                }
            }
        }
    }

    Ok(())
}
