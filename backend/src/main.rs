//! Tableshape CLI - Group, summarize and filter CSV files
//!
//! # Main Commands
//!
//! ```bash
//! tableshape serve                          # Start HTTP server (port 3000)
//! tableshape process input.csv -c view.json # Compute a processed table
//! tableshape suggest input.csv              # Ask the AI for a view config
//! ```
//!
//! # Helper Commands
//!
//! ```bash
//! tableshape parse input.csv           # Just parse CSV to JSON
//! tableshape check-config view.json    # Validate a view config
//! tableshape aggregations              # Show aggregation and filter kinds
//! tableshape example-config            # Show example view config
//! ```

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tableshape::transform::pipeline::{format_delimiter, suggest_for};
use tableshape::{
    parse_file_auto, parse_file_with_delimiter, process_file, to_csv, validate_view_config,
    PipelineOptions, ViewConfig,
};

#[derive(Parser)]
#[command(name = "tableshape")]
#[command(about = "Group, summarize and filter CSV files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV file and output JSON rows
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Full pipeline: CSV → view config (file or AI) → processed table
    Process {
        /// Input CSV file
        input: PathBuf,

        /// View configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Column types file ({"numeric": [...], "date": [...]})
        #[arg(short = 't', long)]
        types: Option<PathBuf>,

        /// Ask the AI for a configuration when none is given
        #[arg(long)]
        suggest: bool,

        /// Save the configuration used to file
        #[arg(long)]
        save_config: Option<PathBuf>,

        /// Number of preview rows for AI (default: 10)
        #[arg(long, default_value = "10")]
        preview_rows: usize,

        /// Skip schema validation of the configuration file
        #[arg(long)]
        no_validate: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },

    /// Ask the AI for a view configuration
    Suggest {
        /// Input CSV file
        input: PathBuf,

        /// Number of preview rows for AI (default: 10)
        #[arg(long, default_value = "10")]
        preview_rows: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a view configuration file against the schema
    CheckConfig {
        /// View configuration JSON file
        input: PathBuf,
    },

    /// Show available aggregation and filter kinds
    Aggregations,

    /// Show example view configuration
    ExampleConfig,

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Process {
            input,
            config,
            types,
            suggest,
            save_config,
            preview_rows,
            no_validate,
            output,
            csv,
        } => {
            let options = PipelineOptions {
                config_path: config.map(|p| p.to_string_lossy().to_string()),
                column_types_path: types.map(|p| p.to_string_lossy().to_string()),
                suggest,
                preview_rows,
                skip_validation: no_validate,
            };
            cmd_process(&input, options, save_config.as_deref(), output.as_deref(), csv).await
        }

        Commands::Suggest {
            input,
            preview_rows,
            output,
        } => cmd_suggest(&input, preview_rows, output.as_deref()).await,

        Commands::CheckConfig { input } => cmd_check_config(&input),

        Commands::Aggregations => cmd_aggregations(),

        Commands::ExampleConfig => cmd_example_config(),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = match delimiter {
        Some(d) => parse_file_with_delimiter(input, d)?,
        None => parse_file_auto(input)?,
    };

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} rows", result.rows.len());

    let json = serde_json::to_string_pretty(&json!({
        "headers": result.headers,
        "rows": result.rows,
    }))?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_process(
    input: &Path,
    options: PipelineOptions,
    save_config: Option<&Path>,
    output: Option<&Path>,
    csv: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let result = process_file(input, options).await?;

    eprintln!("   Encoding: {}", result.csv_info.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.csv_info.delimiter));
    eprintln!("   Rows: {}", result.csv_info.row_count);
    eprintln!("   Columns: {}", result.csv_info.headers.join(", "));
    if result.suggested {
        eprintln!("   Config: suggested by AI");
    }

    eprintln!(
        "\n⚙️  Processed: {} rows → {} output rows",
        result.csv_info.row_count,
        result.table.row_count()
    );

    if let Some(save_path) = save_config {
        fs::write(save_path, result.config.to_json()?)?;
        eprintln!("   💾 Config saved to: {}", save_path.display());
    }

    let content = if csv {
        to_csv(&result.table)?
    } else {
        serde_json::to_string_pretty(&result.table)?
    };
    write_output(&content, output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

async fn cmd_suggest(
    input: &Path,
    preview_rows: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🤖 Suggesting a configuration for: {}", input.display());

    let parsed = parse_file_auto(input)?;
    eprintln!("   Rows: {}", parsed.rows.len());
    eprintln!("   Columns: {}", parsed.headers.join(", "));

    let config = suggest_for(&parsed, preview_rows).await?;
    write_output(&config.to_json()?, output)?;

    Ok(())
}

fn cmd_check_config(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Checking: {}", input.display());

    let content = fs::read_to_string(input)?;
    let value: Value = serde_json::from_str(&content)?;

    if let Err(errors) = validate_view_config(&value) {
        eprintln!("\n❌ Invalid configuration:");
        for err in errors.iter().take(10) {
            eprintln!("   - {}", err);
        }
        std::process::exit(1);
    }

    let config: ViewConfig = serde_json::from_value(value)?;
    let normalized = config.normalized();
    eprintln!(
        "\n📊 {} grouping(s), {} summary(ies), {} filter(s)",
        normalized.groupings.len(),
        normalized.summaries.len(),
        normalized.filters.len()
    );
    eprintln!("✅ Configuration valid");

    Ok(())
}

fn cmd_aggregations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", tableshape::kinds_description());
    Ok(())
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    let config = tableshape::example_config();
    println!("{}", config.to_json()?);
    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    tableshape::server::start_server(port).await?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
