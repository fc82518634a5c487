use clap::Parser;
use rulegrid::prelude::*;
use std::fs;
use std::time::Instant;
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

/// Replays edit scripts against a persisted decision table and reports what is left to fix
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the rule payload JSON file ({"rules": [...], "actions": [...]})
    payload_path: String,

    /// Optional JSON array of edit commands to apply, in order
    #[arg(short, long)]
    script: Option<String>,

    /// Optional attribute and operator catalog JSON file
    #[arg(short, long)]
    catalog: Option<String>,

    /// Optional grid configuration JSON file
    #[arg(long)]
    config: Option<String>,

    /// Decision id to stamp on every row
    #[arg(short, long)]
    decision_id: Option<String>,

    /// Where to write the edited payload; prints to stdout when omitted
    #[arg(short, long)]
    output: Option<String>,

    /// Exit with an error when validation finds problems
    #[arg(long)]
    deny_issues: bool,

    /// Log edits as they are applied
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(if cli.verbose { Level::DEBUG } else { Level::WARN });

    let total_start = Instant::now();

    // --- 1. Loading ---
    let payload_json = fs::read_to_string(&cli.payload_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read payload file '{}': {}",
            &cli.payload_path, e
        ))
    });
    let payload = RulePayload::from_json(&payload_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse payload: {}", e)));
    let config = match &cli.config {
        Some(path) => GridConfig::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load config from '{}': {}", path, e))
        }),
        None => GridConfig::default(),
    };
    let catalog = match &cli.catalog {
        Some(path) => StaticCatalog::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load catalog: {}", e))),
        None => StaticCatalog::new(),
    };

    // --- 2. Hydration ---
    let mut builder = DecisionGrid::builder()
        .with_config(config)
        .with_payload(payload);
    if let Some(id) = &cli.decision_id {
        builder = builder.with_decision_id(id.as_str());
    }
    let mut grid = builder.build();
    if cli.catalog.is_some() {
        for data_type in DataType::ALL {
            if let Err(e) = grid.fetch_operators(&catalog, data_type) {
                exit_with_error(&format!("Failed to fetch operators: {}", e));
            }
        }
    }
    println!(
        "Loaded {} rules across {} columns",
        grid.rows().len(),
        grid.schema().len()
    );

    // --- 3. Edits ---
    if let Some(script_path) = &cli.script {
        let script_json = fs::read_to_string(script_path).unwrap_or_else(|e| {
            exit_with_error(&format!(
                "Failed to read script file '{}': {}",
                script_path, e
            ))
        });
        let commands: Vec<EditCommand> = serde_json::from_str(&script_json)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse script: {}", e)));

        let edit_start = Instant::now();
        for (step, command) in commands.iter().enumerate() {
            debug!(step, ?command, "applying command");
            let report = grid.apply(command, &catalog).unwrap_or_else(|e| {
                exit_with_error(&format!("Command {} was rejected: {}", step + 1, e))
            });
            for issue in report.issues {
                println!("  -> command {}: {}", step + 1, issue);
            }
        }
        info!(commands = commands.len(), elapsed = ?edit_start.elapsed(), "script applied");
        println!("Applied {} commands", commands.len());
    }

    // --- 4. Validation ---
    let issues = grid.validate();
    if issues.is_empty() {
        println!("No validation issues");
    } else {
        println!("\n--- Validation Issues ({}) ---", issues.len());
        for issue in &issues {
            println!("  - {}", issue);
        }
    }

    // --- 5. Output ---
    let edited = grid.to_payload();
    let json = edited
        .to_json()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize payload: {}", e)));
    match &cli.output {
        Some(path) => {
            fs::write(path, json).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to write '{}': {}", path, e))
            });
            println!("Saved {} rules to '{}'", edited.rules.len(), path);
        }
        None => println!("{}", json),
    }

    debug!(elapsed = ?total_start.elapsed(), "done");
    if cli.deny_issues && !issues.is_empty() {
        std::process::exit(2);
    }
}

/// Logs to stderr at `level`; `RUST_LOG` takes precedence.
fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,rulegrid={level},rulegrid_cli={level}",
            level = level.as_str().to_lowercase()
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
