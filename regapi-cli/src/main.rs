mod ingress;
mod telemetry;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use ingress::{Ingress, Quotas, parse_delimiters};
use regapi::{
    EngineAccess, EngineCapabilities, MatchConfigProp, PatternRecord, RegexEngine, Registry,
    RequestHandler, SampleMatches, open_engine, registry,
};
use telemetry::LogFormat;

#[derive(Parser)]
#[command(name = "regapi")]
#[command(about = "regapi - test, match and replace with several regex engines")]
#[command(version)]
struct Cli {
    /// Engine to use
    #[arg(short, long, global = true, default_value = "rust-regex")]
    engine: String,
    /// JSON file replacing the built-in engine table
    #[arg(long, global = true)]
    engines: Option<PathBuf>,
    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available engines
    Engines,
    /// Check whether a pattern compiles
    Test {
        /// The regex pattern
        pattern: String,
        /// Modifiers (engine default when omitted)
        #[arg(short, long)]
        modifiers: Option<String>,
        /// Delimiters, one character or an opening and closing pair
        #[arg(short, long)]
        delimiters: Option<String>,
    },
    /// Match patterns against samples
    Match {
        /// Pattern to run; repeat to build a chain
        #[arg(short = 'r', long = "regex", required = true)]
        regexes: Vec<String>,
        /// Replacement for the pattern at the same position
        #[arg(short = 'R', long = "replace")]
        replacements: Vec<String>,
        /// Modifiers applied to every pattern
        #[arg(short, long, default_value = "g")]
        modifiers: String,
        /// Sample strings
        samples: Vec<String>,
        /// Match every pattern against the original sample
        #[arg(long)]
        no_chain: bool,
        /// Render whitespace in matches visibly
        #[arg(short = 'w', long)]
        show_white_space: bool,
        /// Print the raw JSON results
        #[arg(long)]
        json: bool,
    },
    /// Run samples through a chain of replacements
    Replace {
        /// Pattern to run; repeat to build a chain
        #[arg(short = 'r', long = "regex", required = true)]
        regexes: Vec<String>,
        /// Replacement for the pattern at the same position
        #[arg(short = 'R', long = "replace")]
        replacements: Vec<String>,
        /// Modifiers applied to every pattern
        #[arg(short, long, default_value = "g")]
        modifiers: String,
        /// Sample strings
        samples: Vec<String>,
    },
    /// Answer a request envelope read from a file or stdin
    Request {
        /// Envelope file; stdin when omitted
        file: Option<PathBuf>,
        #[arg(long, default_value_t = Quotas::default().max_regexes)]
        max_regexes: usize,
        #[arg(long, default_value_t = Quotas::default().max_samples)]
        max_samples: usize,
        #[arg(long, default_value_t = Quotas::default().max_sample_length)]
        max_sample_length: usize,
        #[arg(long, default_value_t = Quotas::default().max_total_sample_length)]
        max_total_sample_length: usize,
        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,
    },
    /// Execute remote requests for an engine, one JSON request per line
    Serve,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = telemetry::initialise(cli.log_format) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    let registry = load_registry(cli.engines.as_deref());

    match cli.command {
        Commands::Engines => cmd_engines(&registry),
        Commands::Test {
            pattern,
            modifiers,
            delimiters,
        } => cmd_test(&registry, &cli.engine, &pattern, modifiers, delimiters).await,
        Commands::Match {
            regexes,
            replacements,
            modifiers,
            samples,
            no_chain,
            show_white_space,
            json,
        } => {
            let patterns = records(&regexes, &replacements, &modifiers);
            let options = MatchOptions {
                chain: !no_chain,
                show_white_space,
                json,
            };
            cmd_match(&registry, &cli.engine, &patterns, &samples, options).await
        }
        Commands::Replace {
            regexes,
            replacements,
            modifiers,
            samples,
        } => {
            let patterns = records(&regexes, &replacements, &modifiers);
            cmd_replace(&registry, &cli.engine, &patterns, &samples).await
        }
        Commands::Request {
            file,
            max_regexes,
            max_samples,
            max_sample_length,
            max_total_sample_length,
            pretty,
        } => {
            let quotas = Quotas {
                max_regexes,
                max_samples,
                max_sample_length,
                max_total_sample_length,
            };
            cmd_request(&registry, &cli.engine, quotas, file.as_deref(), pretty).await
        }
        Commands::Serve => cmd_serve(&registry, &cli.engine).await,
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), message);
    std::process::exit(1);
}

fn load_registry(path: Option<&Path>) -> Registry {
    let loaded = match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))
            .and_then(|json| Registry::from_json(&json).map_err(|e| e.to_string())),
        None => registry::builtin().map_err(|e| e.to_string()),
    };
    loaded.unwrap_or_else(|e| fail(e))
}

fn capabilities(registry: &Registry, id: &str) -> EngineCapabilities {
    registry.require(id).cloned().unwrap_or_else(|e| fail(e))
}

/// Pair each pattern with the replacement at the same position; patterns
/// are numbered from 1.
fn records(regexes: &[String], replacements: &[String], modifiers: &str) -> Vec<PatternRecord> {
    regexes
        .iter()
        .enumerate()
        .map(|(index, regex)| {
            let replace = replacements.get(index).cloned().unwrap_or_default();
            PatternRecord::new(index as i64 + 1, regex.clone())
                .modifiers(modifiers)
                .replace(replace)
        })
        .collect()
}

fn cmd_engines(registry: &Registry) {
    for caps in registry.iter() {
        let access = match caps.access() {
            EngineAccess::Local => "local".green(),
            EngineAccess::Remote => "remote".yellow(),
        };
        println!("{} {} [{}]", caps.id().cyan().bold(), caps.name(), access);
        let modifiers: String = caps.allowed_modifiers().iter().collect();
        println!("  {}: {}", caps.modifiers_label().as_str(), modifiers);
        let defaults = caps.defaults();
        println!(
            "  defaults: {}",
            defaults.delimiters().wrap("", defaults.modifiers())
        );
        let limits = caps.match_config().limits();
        println!(
            "  limits: whole {}, part {}, sample {}",
            limits.max_whole_match_len, limits.max_sub_match_len, limits.max_return_sample_len
        );
        if !caps.docs_url().is_empty() {
            println!("  docs: {}", caps.docs_url().dimmed());
        }
    }
}

async fn cmd_test(
    registry: &Registry,
    engine_id: &str,
    pattern: &str,
    modifiers: Option<String>,
    delimiters: Option<String>,
) {
    let delimiters = delimiters.map(|raw| {
        parse_delimiters(&raw)
            .unwrap_or_else(|| fail(format!("delimiters must be one or two characters: {raw:?}")))
    });
    let mut engine = open_engine(capabilities(registry, engine_id)).unwrap_or_else(|e| fail(e));

    println!("{}", "Testing pattern...".bold());
    println!("  Engine:  {}", engine_id.cyan());
    println!("  Pattern: {}", pattern.yellow());
    println!();

    match engine.test(pattern, modifiers.as_deref(), delimiters).await {
        Ok(true) => println!("{}", "✓ Pattern is valid".green().bold()),
        Ok(false) => {
            println!("{}", "✗ Pattern is invalid".red().bold());
            if let Ok(error) = engine.last_error(1) {
                println!("  {}", error.raw_message);
                if let (Some(offset), Some(bad)) = (error.offset, error.bad_character) {
                    println!("  at offset {offset}: {}", bad.to_string().red());
                }
                for message in &error.messages {
                    println!("  - {message}");
                }
            }
            std::process::exit(2);
        }
        Err(e) => fail(e),
    }
}

#[derive(Debug, Clone, Copy)]
struct MatchOptions {
    chain: bool,
    show_white_space: bool,
    json: bool,
}

async fn cmd_match(
    registry: &Registry,
    engine_id: &str,
    patterns: &[PatternRecord],
    samples: &[String],
    options: MatchOptions,
) {
    let mut engine = open_engine(capabilities(registry, engine_id)).unwrap_or_else(|e| fail(e));
    engine.set_match_config_prop(MatchConfigProp::ShowWhiteSpaceChars(options.show_white_space));

    let results = engine
        .match_samples(samples, patterns, Some(options.chain))
        .await
        .unwrap_or_else(|e| fail(e));

    if options.json {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{json}"),
            Err(e) => fail(e),
        }
        return;
    }
    for sample in &results {
        print_sample(sample);
    }
}

fn print_sample(sample: &SampleMatches) {
    println!("{} {}", format!("[{}]", sample.input_id).dimmed(), sample.sample.yellow());
    for outcome in &sample.all_matches {
        if let Some(error) = outcome.error.error() {
            println!("  #{} {} {}", outcome.regex_id, "invalid:".red().bold(), error.raw_message);
            continue;
        }
        if outcome.matches.is_empty() {
            println!("  #{} {}", outcome.regex_id, "no match".red());
            continue;
        }
        println!(
            "  #{} {} ({:.3}ms)",
            outcome.regex_id,
            format!("{} match(es)", outcome.matches.len()).green(),
            outcome.execution_time.as_secs_f64() * 1000.0
        );
        for m in &outcome.matches {
            println!("    {} at {}", m.whole.cyan(), m.position);
            for (key, value) in m.parts.iter() {
                match value {
                    Some(text) => println!("      {key}: {}", text.cyan()),
                    None => println!("      {key}: {}", "(none)".dimmed()),
                }
            }
        }
    }
}

async fn cmd_replace(
    registry: &Registry,
    engine_id: &str,
    patterns: &[PatternRecord],
    samples: &[String],
) {
    let engine = open_engine(capabilities(registry, engine_id)).unwrap_or_else(|e| fail(e));
    let outcomes = engine.test_all(patterns).await.unwrap_or_else(|e| fail(e));
    for outcome in outcomes.iter().filter(|o| !o.valid) {
        if let Some(error) = &outcome.error {
            warn!(regex_id = outcome.regex_id, "skipping invalid pattern: {}", error.raw_message);
            eprintln!("{} {}", "Skipped:".yellow().bold(), error);
        }
    }

    let results = engine
        .replace(samples, patterns)
        .await
        .unwrap_or_else(|e| fail(e));
    for result in results {
        println!("{}", result.text);
    }
}

async fn cmd_request(
    registry: &Registry,
    engine_id: &str,
    quotas: Quotas,
    file: Option<&Path>,
    pretty: bool,
) {
    let envelope = match file {
        Some(path) => fs::read_to_string(path)
            .unwrap_or_else(|e| fail(format!("cannot read {}: {e}", path.display()))),
        None => {
            let mut buffer = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut buffer) {
                fail(format!("cannot read stdin: {e}"));
            }
            buffer
        }
    };

    let response = Ingress::new(registry, engine_id, quotas).respond(&envelope).await;
    let json = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => fail(e),
    }
}

async fn cmd_serve(registry: &Registry, engine_id: &str) {
    let handler = RequestHandler::new(capabilities(registry, engine_id));
    info!(engine = engine_id, "serving remote requests on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => fail(format!("cannot read stdin: {e}")),
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = handler.handle(&line).unwrap_or_else(|e| {
            warn!(engine = engine_id, error = %e, "request failed");
            serde_json::json!({ "error": e.to_string() }).to_string()
        });
        let written = async {
            stdout.write_all(response.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await
        };
        if let Err(e) = written.await {
            fail(format!("cannot write stdout: {e}"));
        }
    }
}
