//! jscover CLI - Command line interface for the jscover instrumenter

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Args, Parser, Subcommand};
use serde_json::Value as JsonValue;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use jscover_instrument::{InstrumentError, Instrumenter, InstrumenterOptions};
use jscover_parser::{parse, ParseError};
use jscover_recovery::read_initial_coverage;

#[derive(Parser)]
#[command(name = "jscover")]
#[command(about = "JavaScript coverage instrumenter", long_about = None)]
#[command(version)]
struct Cli {
    /// Log instrumentation decisions and the generated code
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Instrument a file and print the result
    Instrument {
        /// Input file
        file: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the coverage descriptor as JSON to this file
        #[arg(long)]
        coverage: Option<PathBuf>,
        /// Write the generated source map to this file
        #[arg(long)]
        source_map: Option<PathBuf>,
        /// Source map of the input file
        #[arg(long)]
        input_source_map: Option<PathBuf>,
        /// Name recorded as the file path (default: the input path)
        #[arg(long)]
        path: Option<String>,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Print the coverage descriptor embedded in instrumented code
    ReadCoverage {
        /// Instrumented file
        file: PathBuf,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Parse a file and output the AST as JSON
    Parse {
        /// Input file
        file: PathBuf,
        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
        #[command(flatten)]
        options: OptionArgs,
    },
}

/// Instrumenter options; flags override values from `--config`
#[derive(Args)]
struct OptionArgs {
    /// JSON file with instrumenter options
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Global variable the counters are stored under
    #[arg(long)]
    coverage_variable: Option<String>,
    /// Parse as a script instead of a module
    #[arg(long)]
    script: bool,
    /// Pretty print the generated code
    #[arg(long)]
    no_compact: bool,
    /// Keep comments in the generated code
    #[arg(long)]
    preserve_comments: bool,
    /// Expression naming the global object
    #[arg(long)]
    global_scope: Option<String>,
    /// Leave methods with this name uninstrumented
    #[arg(long = "ignore-class-method", value_name = "NAME")]
    ignore_class_methods: Vec<String>,
    /// Enable a parser plugin
    #[arg(long = "plugin", value_name = "NAME")]
    plugins: Vec<String>,
}

impl OptionArgs {
    fn resolve(&self, debug: bool) -> InstrumenterOptions {
        let mut options = match &self.config {
            Some(path) => {
                let text = read_file(path);
                match serde_json::from_str::<InstrumenterOptions>(&text) {
                    Ok(options) => options,
                    Err(e) => fail(&format!("Invalid config {}: {}", path.display(), e)),
                }
            }
            None => InstrumenterOptions::default(),
        };

        if let Some(variable) = &self.coverage_variable {
            options.coverage_variable = variable.clone();
        }
        if self.script {
            options.es_modules = false;
        }
        if self.no_compact {
            options.compact = false;
        }
        if self.preserve_comments {
            options.preserve_comments = true;
        }
        if let Some(scope) = &self.global_scope {
            options.coverage_global_scope = scope.clone();
        }
        options
            .ignore_class_methods
            .extend(self.ignore_class_methods.iter().cloned());
        options.plugins.extend(self.plugins.iter().cloned());
        options.debug |= debug;
        options
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Commands::Instrument {
            file,
            output,
            coverage,
            source_map,
            input_source_map,
            path,
            options,
        } => {
            let mut options = options.resolve(cli.debug);
            options.produce_source_map |= source_map.is_some();
            cmd_instrument(
                &file,
                options,
                Outputs {
                    code: output,
                    coverage,
                    source_map,
                },
                input_source_map,
                path,
            )
        }
        Commands::ReadCoverage { file, options } => {
            cmd_read_coverage(&file, &options.resolve(cli.debug))
        }
        Commands::Parse {
            file,
            pretty,
            options,
        } => cmd_parse(&file, pretty, &options.resolve(cli.debug)),
    }
}

/// `JSCOVER_LOG` selects what is logged, `--debug` forces debug level
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("JSCOVER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct Outputs {
    code: Option<PathBuf>,
    coverage: Option<PathBuf>,
    source_map: Option<PathBuf>,
}

fn cmd_instrument(
    file: &Path,
    options: InstrumenterOptions,
    outputs: Outputs,
    input_source_map: Option<PathBuf>,
    path: Option<String>,
) {
    let source = read_file(file);
    let input_source_map = input_source_map.map(|map_file| {
        match serde_json::from_str::<JsonValue>(&read_file(&map_file)) {
            Ok(map) => map,
            Err(e) => fail(&format!("Invalid source map {}: {}", map_file.display(), e)),
        }
    });
    let path = path.unwrap_or_else(|| file.to_string_lossy().to_string());

    let mut instrumenter = Instrumenter::new(options).with_source_map_url_callback(|file, url| {
        debug!(file, url, "input declares a source map");
    });
    let code = match instrumenter.instrument_sync(source.as_str(), &path, input_source_map) {
        Ok(code) => code,
        Err(InstrumentError::Parse(e)) => {
            report_parse_error(&source, file, &e);
            process::exit(1);
        }
        Err(e) => fail(&format!("Error instrumenting {}: {}", file.display(), e)),
    };

    match &outputs.code {
        Some(out_path) => write_file(out_path, &code),
        None => println!("{}", code),
    }

    if let Some(out_path) = &outputs.coverage {
        match instrumenter.last_file_coverage() {
            Some(coverage) => write_json(out_path, coverage),
            None => eprintln!("{}: no coverage data (file ignored)", file.display()),
        }
    }

    if let (Some(out_path), Some(map)) = (&outputs.source_map, instrumenter.last_source_map()) {
        write_json(out_path, map);
    }
}

fn cmd_read_coverage(file: &Path, options: &InstrumenterOptions) {
    let source = read_file(file);
    let program = match parse(&source, &options.parse_options()) {
        Ok(program) => program,
        Err(e) => {
            report_parse_error(&source, file, &e);
            process::exit(1);
        }
    };

    match read_initial_coverage(&program) {
        Some(coverage) => println!("{}", to_json(&coverage, true)),
        None => fail(&format!("{}: no coverage data found", file.display())),
    }
}

fn cmd_parse(file: &Path, pretty: bool, options: &InstrumenterOptions) {
    let source = read_file(file);
    match parse(&source, &options.parse_options()) {
        Ok(program) => println!("{}", to_json(&program, pretty)),
        Err(e) => {
            report_parse_error(&source, file, &e);
            process::exit(1);
        }
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn read_file(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => fail(&format!("Error reading {}: {}", path.display(), e)),
    }
}

fn write_file(path: &Path, contents: &str) {
    if let Err(e) = fs::write(path, contents) {
        fail(&format!("Error writing {}: {}", path.display(), e));
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> String {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(json) => json,
        Err(e) => fail(&format!("Error serializing output: {}", e)),
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) {
    write_file(path, &to_json(value, true));
}

fn report_parse_error(source: &str, file: &Path, error: &ParseError) {
    let name = file.to_string_lossy().to_string();
    let span = error.span();
    let report = Report::build(ReportKind::Error, name.clone(), span.start)
        .with_message(error.to_string())
        .with_label(
            Label::new((name.clone(), span.start..span.end))
                .with_message(error.to_string())
                .with_color(Color::Red),
        )
        .finish();
    if report.eprint((name, Source::from(source))).is_err() {
        eprintln!("{}: {}", file.display(), error);
    }
}
