use anyhow::Result;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::core::catalog::Catalog;
use crate::core::client::UsageClient;
use crate::core::collector;
use crate::core::config::ExporterConfig;
use crate::core::models::usage::UsageRecord;

#[derive(Serialize)]
struct RecordPayload<'a> {
    #[serde(flatten)]
    record: &'a UsageRecord,
    /// Exported metric name, absent for unknown categories
    metric: Option<&'static str>,
}

/// Run one collection cycle and print what a scrape would return.
///
/// Unlike the server, a failed fetch is reported as an error.
pub async fn run(config: ExporterConfig, opts: &OutputOptions) -> Result<()> {
    let catalog = Catalog::standard()?;
    let client = UsageClient::new(&config)?;

    tracing::debug!(url = %client.records_url(), "fetching usage records");
    let snapshot = tokio::task::spawn_blocking(move || client.fetch()).await??;

    let unknown = collector::unknown_categories(&catalog, &snapshot);
    if !unknown.is_empty() && opts.verbose {
        eprintln!(
            "Skipped {} record{} with unknown category: {}",
            unknown.len(),
            if unknown.len() == 1 { "" } else { "s" },
            unknown.join(", ")
        );
    }
    if snapshot.next_page_uri.is_some() && opts.verbose {
        eprintln!("More usage records are available; only the first page is exported.");
    }

    match opts.format {
        OutputFormat::Text => {
            let families = collector::dispatch(&catalog, &snapshot);
            let mut buffer = Vec::new();
            TextEncoder::new().encode(&families, &mut buffer)?;
            print!("{}", String::from_utf8(buffer)?);
        }
        OutputFormat::Json => {
            let payloads: Vec<RecordPayload> = snapshot
                .usage_records
                .iter()
                .map(|record| RecordPayload {
                    record,
                    metric: catalog.lookup(&record.category).map(|m| m.name),
                })
                .collect();

            let json = if opts.pretty {
                serde_json::to_string_pretty(&payloads)?
            } else {
                serde_json::to_string(&payloads)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}
