use clap::Parser;
use deploygen_core::{render_catalog, BatchRunner, Catalog, Reporter};
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Generates consolidated deploy scripts through the MergeSourceFile tool"
)]
struct DeploygenCli {
    /// Targets to generate (default: all)
    targets: Vec<String>,
    /// List the available targets and exit
    #[arg(long)]
    list: bool,
    /// Base directory of the project
    #[arg(long, default_value = ".")]
    path: PathBuf,
    /// Load the target catalog from a JSON file instead of the builtin set
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,
    /// Output JSON instead of a human-readable summary
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = DeploygenCli::parse();

    let catalog = match &cli.catalog {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin(),
    };

    if cli.list {
        output_listing(&catalog, cli.json)?;
        return Ok(());
    }

    let runner = BatchRunner::new(catalog.clone(), &cli.path).with_progress(!cli.json);
    let results = runner.run(&cli.targets)?;

    // Individual target failures are reported, not escalated to the exit
    // status; only an unlocatable tool or an unexpected error exits non-zero.
    if results.is_empty() {
        return Ok(());
    }

    let summary = Reporter::new(catalog, &cli.path).summarize(&results);
    if cli.json {
        let payload = json!({
            "results": results,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("\n{summary}");
    }

    Ok(())
}

fn output_listing(catalog: &Catalog, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(catalog)?);
    } else {
        println!("Available targets:");
        println!("{}", render_catalog(catalog));
    }
    Ok(())
}
