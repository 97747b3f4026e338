use std::io;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use crate::cli::{Args, Command, OutputFormat};
use crate::client::MatrixClient;
use crate::protocol::ItemId;
use crate::telemetry;

/// Runs one CLI command against the device and writes the receipt to `out`.
///
/// ```
/// # async fn demo() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = emx::Args::try_parse_from(["emx", "--fake", "run", "1"])?;
/// let mut out = Vec::new();
/// emx::run(args, &mut out, emx::OutputFormat::Pretty).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error when tracing initialisation, media conversion, the
/// transfer, or output writing fails.
pub async fn run<W>(args: Args, out: &mut W, format: OutputFormat) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing().map_err(|error| anyhow::anyhow!("{error}"))?;

    let endpoint = args.endpoint();
    let tuning = args.tuning()?;
    let connector = args.connector();
    let command = args.into_command();
    let client = MatrixClient::new(connector, endpoint).with_tuning(tuning);

    match command {
        Command::Upload { id, path } => {
            let bar = transfer_progress_bar();
            let observer_bar = bar.clone();
            let client = client.with_progress_observer(move |sent, total| {
                observer_bar.set_length(total);
                observer_bar.set_position(sent);
            });

            let result = client.upload(ItemId::new(id), &path).await;
            bar.finish_and_clear();
            let receipt = result?;

            match format {
                OutputFormat::Pretty => writeln!(
                    out,
                    "{} Uploaded {} frame(s) ({} bytes) to slot {}",
                    "✓".green(),
                    receipt.frame_count(),
                    receipt.transfer().payload_len(),
                    receipt.item_id(),
                )?,
                OutputFormat::Json => emit_json(out, &receipt)?,
            }
        }
        Command::Text { id, text } => {
            let receipt = client.send_text(ItemId::new(id), &text).await?;
            match format {
                OutputFormat::Pretty => writeln!(
                    out,
                    "{} Sent {} text byte(s) to slot {id}",
                    "✓".green(),
                    receipt.payload_len(),
                )?,
                OutputFormat::Json => emit_json(out, &receipt)?,
            }
        }
        Command::Delete { id } => {
            let receipt = client.delete_item(ItemId::new(id)).await?;
            match format {
                OutputFormat::Pretty => {
                    writeln!(out, "{} Deleted slot {id}", "✓".green())?;
                }
                OutputFormat::Json => emit_json(out, &receipt)?,
            }
        }
        Command::Run { id } => {
            let receipt = client.run_item(ItemId::new(id)).await?;
            match format {
                OutputFormat::Pretty => {
                    writeln!(out, "{} Running slot {id}", "✓".green())?;
                }
                OutputFormat::Json => emit_json(out, &receipt)?,
            }
        }
    }

    Ok(())
}

fn emit_json<W, T>(out: &mut W, receipt: &T) -> Result<()>
where
    W: io::Write,
    T: serde::Serialize,
{
    serde_json::to_writer_pretty(&mut *out, receipt)?;
    writeln!(out)?;
    Ok(())
}

fn transfer_progress_bar() -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{spinner:.cyan.bold} {bytes}/{total_bytes} [{bar:30}] {bytes_per_sec}",
    )
    .unwrap_or_else(|_error| ProgressStyle::default_bar());
    ProgressBar::no_length().with_style(style)
}
