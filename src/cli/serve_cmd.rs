use anyhow::Result;
use prometheus::Registry;

use crate::core::catalog::Catalog;
use crate::core::client::UsageClient;
use crate::core::collector::UsageCollector;
use crate::core::config::ExporterConfig;
use crate::core::server;

pub async fn run(config: ExporterConfig) -> Result<()> {
    let registry = build_registry(&config)?;
    tracing::info!(
        account = %config.account_sid,
        upstream = %config.base_url,
        timeout_secs = config.timeout.as_secs(),
        "starting usage exporter"
    );
    server::serve(config.listen, registry).await
}

fn build_registry(config: &ExporterConfig) -> Result<Registry> {
    let catalog = Catalog::standard()?;
    let client = UsageClient::new(config)?;
    tracing::debug!(
        metrics = catalog.enumerate().len(),
        url = %client.records_url(),
        "usage collector ready"
    );

    let registry = Registry::new();
    registry.register(Box::new(UsageCollector::new(catalog, client)))?;
    Ok(registry)
}
