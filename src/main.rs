//! pdfmerge - merge PDF documents into a single document.

use anyhow::Context;
use clap::Parser;
use log::debug;
use std::process;

use pdfmerge::cli::Cli;
use pdfmerge::config::{Config, DocumentErrorPolicy, OverwriteMode};
use pdfmerge::error::MergeError;
use pdfmerge::io::{PdfReader, PdfWriter};
use pdfmerge::merge::{Merger, SourceInput};
use pdfmerge::output::{
    MergeReport, OutputFormatter, display_inspection_summary, display_load_statistics,
    display_merge_summary, display_skipped, display_warnings, print_json,
};
use pdfmerge::validation::Inspector;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err
            .downcast_ref::<MergeError>()
            .map_or(1, MergeError::exit_code);
        process::exit(code);
    }
}

/// Library diagnostics go through `log`; `RUST_LOG` takes precedence.
fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    cli.validate()?;
    let config = cli.to_config().await?;
    let formatter = OutputFormatter::from_config(&config);
    debug!("resolved {} input(s)", config.inputs.len());

    if formatter.should_print() {
        formatter.section(&format!("{} v{}", pdfmerge::NAME, pdfmerge::VERSION));
    }

    if config.dry_run {
        return dry_run(&config, &formatter).await;
    }

    Inspector::new().validate_output(&config).await?;
    handle_output_overwrite(&config, &formatter).await?;

    formatter.info(&format!("Reading {} file(s)...", config.inputs.len()));
    let inputs = load_inputs(&config, &formatter).await?;

    formatter.info("Merging documents...");
    let merger = Merger::new(config.options.clone());
    let output = merger.merge_async(inputs).await?;

    display_skipped(&formatter, &output.skipped);
    if !config.json {
        display_warnings(&formatter, &output.warnings);
    }

    let write_stats = PdfWriter::new()
        .save_with_stats(output.bytes, &config.output)
        .await
        .with_context(|| format!("writing {}", config.output.display()))?;

    if config.json {
        print_json(&MergeReport {
            output: config.output.display().to_string(),
            statistics: &output.statistics,
            warnings: &output.warnings,
            skipped: &output.skipped,
        })?;
    } else {
        display_merge_summary(&formatter, &output.statistics, &write_stats);
    }

    Ok(())
}

/// Inspect inputs and report, without writing anything.
async fn dry_run(config: &Config, formatter: &OutputFormatter) -> anyhow::Result<()> {
    let inputs = load_inputs(config, formatter).await?;
    let summary = Inspector::new()
        .inspect_all_async(inputs, config.effective_jobs())
        .await;

    if config.json {
        print_json(&summary)?;
    } else {
        display_inspection_summary(formatter, &summary);
        formatter.blank_line();
        formatter.success("Dry run completed");
        formatter.info(&format!("  Output would be: {}", config.output.display()));
    }

    Ok(())
}

/// Read all inputs. Files that cannot be read abort the run unless the
/// skip policy is set, in which case they are reported and left out.
async fn load_inputs(
    config: &Config,
    formatter: &OutputFormatter,
) -> anyhow::Result<Vec<SourceInput>> {
    let (results, stats) = PdfReader::new()
        .load_all(config.inputs(), config.effective_jobs())
        .await;
    display_load_statistics(formatter, &stats);

    let skip = config.options.on_document_error == DocumentErrorPolicy::Skip;
    let mut inputs = Vec::with_capacity(results.len());
    let mut first_error = None;

    for (position, result) in results.into_iter().enumerate() {
        let name = config.inputs[position].display().to_string();
        formatter.progress(position + 1, config.inputs.len(), &name);
        match result {
            Ok(loaded) => inputs.push(loaded.into_source_input()),
            Err(err) if skip => {
                formatter.warning(&format!("Skipped: {err}"));
                first_error.get_or_insert(err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    match first_error {
        Some(err) if inputs.is_empty() => Err(err.into()),
        _ => Ok(inputs),
    }
}

/// Decide what to do when the output file already exists.
async fn handle_output_overwrite(
    config: &Config,
    formatter: &OutputFormatter,
) -> Result<(), MergeError> {
    if !PdfWriter::new().exists(&config.output).await {
        return Ok(());
    }

    match config.overwrite_mode {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(MergeError::OutputExists {
            path: config.output.clone(),
        }),
        OverwriteMode::Prompt => {
            // Nobody to ask.
            if formatter.is_quiet() {
                return Err(MergeError::OutputExists {
                    path: config.output.clone(),
                });
            }

            formatter.warning(&format!(
                "Output file already exists: {}",
                config.output.display()
            ));

            use std::io::{self, Write};
            print!("Overwrite? [y/N]: ");
            io::stdout().flush().ok();

            let mut response = String::new();
            io::stdin().read_line(&mut response)?;

            match response.trim().to_lowercase().as_str() {
                "y" | "yes" => Ok(()),
                _ => Err(MergeError::Cancelled),
            }
        }
    }
}
