use std::collections::HashSet;

use prometheus::core::{Collector, Desc};
use prometheus::proto::{Counter, Metric, MetricFamily, MetricType};

use crate::core::catalog::{Catalog, MetricDescriptor};
use crate::core::client::UsageClient;
use crate::core::models::usage::UsageSnapshot;

/// Re-exports Twilio usage records as counters, fetching fresh data on every
/// scrape.
#[derive(Debug)]
pub struct UsageCollector {
    catalog: Catalog,
    client: UsageClient,
}

impl UsageCollector {
    pub fn new(catalog: Catalog, client: UsageClient) -> Self {
        Self { catalog, client }
    }
}

impl Collector for UsageCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.catalog.descs().iter().collect()
    }

    /// One upstream fetch per call. Yields one counter per record with a
    /// known category; if the page repeats a category only its first record
    /// is exported. A failed fetch yields nothing and is logged at `warn`.
    fn collect(&self) -> Vec<MetricFamily> {
        let snapshot = match self.client.fetch() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "usage collection failed");
                return Vec::new();
            }
        };

        let families = dispatch(&self.catalog, &snapshot);
        tracing::debug!(
            records = snapshot.usage_records.len(),
            emitted = families.len(),
            "usage collection finished"
        );
        families
    }
}

/// Map each record with a known category to a counter family, in record
/// order. Unknown categories are skipped. If a category repeats within one
/// page the first record wins, so the exposition never carries duplicate
/// series.
pub fn dispatch(catalog: &Catalog, snapshot: &UsageSnapshot) -> Vec<MetricFamily> {
    let mut seen = HashSet::new();
    let mut families = Vec::new();

    for record in &snapshot.usage_records {
        let Some(entry) = catalog.lookup(&record.category) else {
            tracing::debug!(category = %record.category, "skipping unknown usage category");
            continue;
        };
        if !seen.insert(entry.category) {
            tracing::debug!(category = %record.category, "skipping repeated usage category");
            continue;
        }
        families.push(counter_family(entry, record.count));
    }

    families
}

/// Categories in `snapshot` that have no exported metric.
pub fn unknown_categories<'a>(catalog: &Catalog, snapshot: &'a UsageSnapshot) -> Vec<&'a str> {
    snapshot
        .usage_records
        .iter()
        .filter(|r| catalog.lookup(&r.category).is_none())
        .map(|r| r.category.as_str())
        .collect()
}

fn counter_family(entry: &MetricDescriptor, value: f64) -> MetricFamily {
    let mut counter = Counter::default();
    counter.set_value(value);

    let mut metric = Metric::default();
    metric.set_counter(counter);

    let mut family = MetricFamily::default();
    family.set_name(entry.name.to_string());
    family.set_help(entry.help.to_string());
    family.set_field_type(MetricType::COUNTER);
    family.mut_metric().push(metric);
    family
}
