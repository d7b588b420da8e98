use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;

use trendgraph::session::Session;
use trendgraph::view::{self, DisplaySchema};
use trendgraph::{chart, RenderOptions};

#[derive(Parser, Debug)]
#[command(name = "trendgraph")]
#[command(about = "Load a tabular dataset, summarize it, and chart columns against a label", long_about = None)]
struct Args {
    /// Dataset to load (.csv, .tsv, .xlsx, .xlsm)
    file: PathBuf,

    /// Label column for the chart's x-axis (default: first column)
    #[arg(long)]
    label: Option<String>,

    /// Print the table grid
    #[arg(long)]
    view: bool,

    /// Print per-column max/min summaries
    #[arg(long)]
    summary: bool,

    /// Emit the summary as JSON instead of text
    #[arg(long, requires = "summary")]
    json: bool,

    /// Write the chart PNG to this path ("-" for stdout)
    #[arg(long)]
    chart: Option<PathBuf>,

    /// Chart width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Chart height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Authenticated username, used only for the greeting
    #[arg(long)]
    user: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut session = match &args.user {
        Some(name) => Session::for_user(name.clone()),
        None => Session::new(),
    };
    if let Some(greeting) = session.greeting() {
        println!("{}", greeting);
    }

    session
        .load_file(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    let table = session.table().expect("load_file stored a table");

    // With no action flags the tool behaves like the original window:
    // show the grid and the analysis.
    let default_actions = !args.view && !args.summary && args.chart.is_none();

    if args.view || default_actions {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        view::render_schema_into(table, &DisplaySchema::sales(), &mut handle)
            .context("Failed to render table view")?;
    }

    if args.summary || default_actions {
        let records = session.analyze().context("Failed to analyze data")?;
        if args.json {
            let encoded = serde_json::to_string_pretty(&records)
                .context("Failed to encode summary as JSON")?;
            println!("{}", encoded);
        } else if records.is_empty() {
            println!("No numerical columns found in the loaded data.");
        } else {
            for (column, record) in &records {
                println!("Maximum {}: {}", column, record.max);
                println!("Minimum {}: {}", column, record.min);
            }
        }
    }

    if let Some(output) = &args.chart {
        let label = match &args.label {
            Some(label) => label.clone(),
            None => table
                .column_names()
                .next()
                .context("Cannot plot a table with no columns")?
                .to_string(),
        };
        let plan = session.plan(&label).context("Failed to plan chart")?;
        let options = RenderOptions {
            width: args.width,
            height: args.height,
        };
        let png_bytes = chart::render(&plan, &options).context("Failed to render chart")?;

        if output.as_os_str() == "-" {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&png_bytes)
                .context("Failed to write PNG to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
        } else {
            std::fs::write(output, &png_bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
        }
    }

    Ok(())
}
