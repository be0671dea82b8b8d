use std::collections::HashMap;

use prometheus::core::Desc;

/// Exported metric for one upstream usage category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Category key as reported by the Usage Records API
    pub category: &'static str,
    /// Exported metric name
    pub name: &'static str,
    pub help: &'static str,
}

const fn metric(category: &'static str, name: &'static str, help: &'static str) -> MetricDescriptor {
    MetricDescriptor {
        category,
        name,
        help,
    }
}

/// Every usage category the exporter knows about, in exposition order.
///
/// Names and help strings are part of the exporter's public surface: existing
/// dashboards and alerts are keyed on them, so entries must not be renamed.
pub static USAGE_METRICS: &[MetricDescriptor] = &[
    metric("callerIDLookups", "twil_callerIDLookups", "Total CallerID Lookups"),
    metric("calls", "twil_calls", "Total Call Minutes"),
    metric("calls-client", "twil_calls_client", "Total Client Call Minutes"),
    metric("calls-sip", "twil_calls_sip", "SIP Minutes"),
    metric("calls-inbound", "twil_calls_inbound", "Inbound Voice Minutes"),
    metric("calls-inbound-local", "twil_calls_inbound_local", "Inbound Local Calls"),
    metric("calls-inbound-mobile", "twil_calls_mobile", "Inbound Mobile Calls"),
    metric("calls-inbound-tollfree", "twil_calls_tollfree", "Inbound Toll Free Calls"),
    metric("calls-outbound", "twil_calls_outbound", "Outbound Voice Minutes"),
    metric("phonenumbers", "twil_phonenumbers", "Phone Numbers"),
    metric("phonenumbers-mobile", "twil_phonenumbers_mobile", "Mobile Phone Numbers"),
    metric("phonenumbers-local", "twil_phonenumbers_local", "Local Phone Numbers"),
    metric("phonenumbers-tollfree", "twil_phonenumbers_tollfree", "Toll Free Phone Numbers"),
    metric("shortcodes", "twil_shortcodes", "Short Codes"),
    metric("shortcodes-customerowned", "twil_shortcodes_customer_owned", "Customer Owned Short Codes"),
    metric("shortcodes-random", "twil_shortcodes_random", "Random Short Codes"),
    metric("shortcodes-vanity", "twil_shortcodes_vanity", "Vanity Short Codes"),
    metric("sms", "twil_sms", "SMS"),
    metric("sms-inbound", "twil_sms_inbound", "Inbound SMS"),
    metric("sms-inbound-longcode", "twil_sms_inbound_standard", "Standard Inbound SMS"),
    metric("sms-inbound-shortcode", "twil_sms_inbound_shortcode", "Short Code Inbound SMS"),
    metric("sms-outbound", "twil_sms_outbound", "Outbound SMS"),
    metric("sms-outbound-longcode", "twil_sms_outbound_standard", "Standard Outbound SMS"),
    metric("sms-outbound-shortcode", "twil_sms_outbound_shortcode", "Short Code Outbound SMS"),
    metric("mms", "twil_mms", "MMS"),
    metric("mms-inbound", "twil_mms_inbound", "Inbound MMS"),
    metric("mms-inbound-longcode", "twil_mms_inbound_standard", "Standard Inbound MMS"),
    metric("mms-inbound-shortcode", "twil_mms_inbound_shortcode", "Short Code Inbound MMS"),
    metric("mms-outbound", "twil_mms_outbound", "Outbound MMS"),
    metric("mms-outbound-longcode", "twil_mms_outbound_standard", "Standard Outbound MMS"),
    metric("mms-outbound-shortcode", "twil_mms_outbound_shortcode", "Short Code Outbound MMS"),
    metric("recordings", "twil_recordings", "Recordings"),
    metric("recordingstorage", "twil_recordings_storage", "Recordings Storage"),
    metric("transcriptions", "twil_transcriptions", "Transcriptions"),
    metric("mediastorage", "twil_mediastorage", "Media Storage"),
    metric("authy-sms-outbound", "twil_authy_sms_outbound", "Authy/Verify Outbound SMS Messages"),
    metric("authy-calls-outbound", "twil_authy_calls_outbound", "Authy/Verify Outbound Calls"),
    metric("authy-authentications", "twil_authy_authentications", "Authy Authentications"),
    metric("authy-phone-verifications", "twil_authy_phone_verifications", "Verify"),
    metric("authy-phone-intelligence", "twil_authy_phone_intelligence", "Authy Phone Intelligence Requests"),
    metric("authy-monthly-fees", "twil_authy_monthly_fees", "Authy Monthly Fees"),
    metric("monitor-storage", "twil_monitor_storage", "Monitor Events Storage"),
    metric("monitor-reads", "twil_monitor_reads", "Monitor Events API Reads"),
    // The API spells this category in the singular.
    metric("monitor-write", "twil_monitor_writes", "Monitor Events API Writes"),
    metric("taskrouter-tasks", "twil_task_router_tasks", "Task Router Tasks Created"),
    metric("turnmegabytes", "twil_turn_megabytes", "TURN Megabytes"),
    metric("calls-recordings", "twil_call_recordings", "Call Recordings"),
    metric("trunking-recordings", "twil_trunking_recordings", "Trunking Recordings"),
    metric("trunking-termination", "twil_trunking_termination", "Trunking Termination Minutes"),
    metric("trunking-origination", "twil_trunking_origination", "Trunking Origination Minutes"),
];

/// Lookup table from category key to exported metric, plus the registry
/// descriptors advertised before any data has been fetched.
#[derive(Debug)]
pub struct Catalog {
    entries: &'static [MetricDescriptor],
    by_category: HashMap<&'static str, usize>,
    descs: Vec<Desc>,
}

impl Catalog {
    /// Build a catalog over `entries`. Fails on duplicate categories, duplicate
    /// metric names, or names the registry would reject.
    pub fn new(entries: &'static [MetricDescriptor]) -> prometheus::Result<Self> {
        let mut by_category = HashMap::with_capacity(entries.len());
        let mut names = HashMap::with_capacity(entries.len());
        let mut descs = Vec::with_capacity(entries.len());

        for (idx, entry) in entries.iter().enumerate() {
            if by_category.insert(entry.category, idx).is_some() {
                return Err(prometheus::Error::Msg(format!(
                    "duplicate usage category '{}'",
                    entry.category
                )));
            }
            if names.insert(entry.name, entry.category).is_some() {
                return Err(prometheus::Error::Msg(format!(
                    "duplicate metric name '{}'",
                    entry.name
                )));
            }
            descs.push(Desc::new(
                entry.name.to_string(),
                entry.help.to_string(),
                vec![],
                HashMap::new(),
            )?);
        }

        Ok(Self {
            entries,
            by_category,
            descs,
        })
    }

    /// The built-in Twilio usage catalog.
    pub fn standard() -> prometheus::Result<Self> {
        Self::new(USAGE_METRICS)
    }

    pub fn enumerate(&self) -> &[MetricDescriptor] {
        self.entries
    }

    pub fn lookup(&self, category: &str) -> Option<&MetricDescriptor> {
        self.by_category.get(category).map(|&idx| &self.entries[idx])
    }

    pub fn descs(&self) -> &[Desc] {
        &self.descs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_builds() {
        let catalog = Catalog::standard().unwrap();
        assert_eq!(catalog.enumerate().len(), 50);
        assert_eq!(catalog.descs().len(), 50);
    }

    /// Published metric names and help strings, kept apart from
    /// `USAGE_METRICS` so a rename in the table fails here.
    const PUBLISHED: [(&str, &str, &str); 50] = [
        ("callerIDLookups", "twil_callerIDLookups", "Total CallerID Lookups"),
        ("calls", "twil_calls", "Total Call Minutes"),
        ("calls-client", "twil_calls_client", "Total Client Call Minutes"),
        ("calls-sip", "twil_calls_sip", "SIP Minutes"),
        ("calls-inbound", "twil_calls_inbound", "Inbound Voice Minutes"),
        ("calls-inbound-local", "twil_calls_inbound_local", "Inbound Local Calls"),
        ("calls-inbound-mobile", "twil_calls_mobile", "Inbound Mobile Calls"),
        ("calls-inbound-tollfree", "twil_calls_tollfree", "Inbound Toll Free Calls"),
        ("calls-outbound", "twil_calls_outbound", "Outbound Voice Minutes"),
        ("phonenumbers", "twil_phonenumbers", "Phone Numbers"),
        ("phonenumbers-mobile", "twil_phonenumbers_mobile", "Mobile Phone Numbers"),
        ("phonenumbers-local", "twil_phonenumbers_local", "Local Phone Numbers"),
        ("phonenumbers-tollfree", "twil_phonenumbers_tollfree", "Toll Free Phone Numbers"),
        ("shortcodes", "twil_shortcodes", "Short Codes"),
        ("shortcodes-customerowned", "twil_shortcodes_customer_owned", "Customer Owned Short Codes"),
        ("shortcodes-random", "twil_shortcodes_random", "Random Short Codes"),
        ("shortcodes-vanity", "twil_shortcodes_vanity", "Vanity Short Codes"),
        ("sms", "twil_sms", "SMS"),
        ("sms-inbound", "twil_sms_inbound", "Inbound SMS"),
        ("sms-inbound-longcode", "twil_sms_inbound_standard", "Standard Inbound SMS"),
        ("sms-inbound-shortcode", "twil_sms_inbound_shortcode", "Short Code Inbound SMS"),
        ("sms-outbound", "twil_sms_outbound", "Outbound SMS"),
        ("sms-outbound-longcode", "twil_sms_outbound_standard", "Standard Outbound SMS"),
        ("sms-outbound-shortcode", "twil_sms_outbound_shortcode", "Short Code Outbound SMS"),
        ("mms", "twil_mms", "MMS"),
        ("mms-inbound", "twil_mms_inbound", "Inbound MMS"),
        ("mms-inbound-longcode", "twil_mms_inbound_standard", "Standard Inbound MMS"),
        ("mms-inbound-shortcode", "twil_mms_inbound_shortcode", "Short Code Inbound MMS"),
        ("mms-outbound", "twil_mms_outbound", "Outbound MMS"),
        ("mms-outbound-longcode", "twil_mms_outbound_standard", "Standard Outbound MMS"),
        ("mms-outbound-shortcode", "twil_mms_outbound_shortcode", "Short Code Outbound MMS"),
        ("recordings", "twil_recordings", "Recordings"),
        ("recordingstorage", "twil_recordings_storage", "Recordings Storage"),
        ("transcriptions", "twil_transcriptions", "Transcriptions"),
        ("mediastorage", "twil_mediastorage", "Media Storage"),
        ("authy-sms-outbound", "twil_authy_sms_outbound", "Authy/Verify Outbound SMS Messages"),
        ("authy-calls-outbound", "twil_authy_calls_outbound", "Authy/Verify Outbound Calls"),
        ("authy-authentications", "twil_authy_authentications", "Authy Authentications"),
        ("authy-phone-verifications", "twil_authy_phone_verifications", "Verify"),
        ("authy-phone-intelligence", "twil_authy_phone_intelligence", "Authy Phone Intelligence Requests"),
        ("authy-monthly-fees", "twil_authy_monthly_fees", "Authy Monthly Fees"),
        ("monitor-storage", "twil_monitor_storage", "Monitor Events Storage"),
        ("monitor-reads", "twil_monitor_reads", "Monitor Events API Reads"),
        ("monitor-write", "twil_monitor_writes", "Monitor Events API Writes"),
        ("taskrouter-tasks", "twil_task_router_tasks", "Task Router Tasks Created"),
        ("turnmegabytes", "twil_turn_megabytes", "TURN Megabytes"),
        ("calls-recordings", "twil_call_recordings", "Call Recordings"),
        ("trunking-recordings", "twil_trunking_recordings", "Trunking Recordings"),
        ("trunking-termination", "twil_trunking_termination", "Trunking Termination Minutes"),
        ("trunking-origination", "twil_trunking_origination", "Trunking Origination Minutes"),
    ];

    #[test]
    fn lookup_known_categories() {
        let catalog = Catalog::standard().unwrap();
        for (category, name, help) in PUBLISHED {
            let entry = catalog
                .lookup(category)
                .unwrap_or_else(|| panic!("missing category {}", category));
            assert_eq!(entry.category, category);
            assert_eq!(entry.name, name, "name for {}", category);
            assert_eq!(entry.help, help, "help for {}", category);
        }
    }

    #[test]
    fn published_names_cover_the_catalog() {
        let catalog = Catalog::standard().unwrap();
        let published: Vec<_> = PUBLISHED.iter().map(|(_, name, _)| *name).collect();
        let exported: Vec<_> = catalog.enumerate().iter().map(|e| e.name).collect();
        assert_eq!(exported, published);
    }

    #[test]
    fn lookup_help_text() {
        let catalog = Catalog::standard().unwrap();
        assert_eq!(catalog.lookup("calls").unwrap().help, "Total Call Minutes");
        assert_eq!(catalog.lookup("authy-phone-verifications").unwrap().help, "Verify");
        assert_eq!(
            catalog.lookup("authy-sms-outbound").unwrap().help,
            "Authy/Verify Outbound SMS Messages"
        );
    }

    #[test]
    fn lookup_unknown_category() {
        let catalog = Catalog::standard().unwrap();
        assert!(catalog.lookup("wireless-usage").is_none());
        assert!(catalog.lookup("").is_none());
        // Matching is case sensitive
        assert!(catalog.lookup("CALLS").is_none());
        assert!(catalog.lookup("monitor-writes").is_none());
    }

    #[test]
    fn every_entry_is_reachable_by_lookup() {
        let catalog = Catalog::standard().unwrap();
        for entry in catalog.enumerate() {
            assert_eq!(catalog.lookup(entry.category), Some(entry));
        }
    }

    #[test]
    fn every_name_is_prefixed() {
        for entry in USAGE_METRICS {
            assert!(entry.name.starts_with("twil_"), "{}", entry.name);
            assert!(!entry.help.is_empty(), "{}", entry.name);
        }
    }

    #[test]
    fn enumerate_is_stable() {
        let catalog = Catalog::standard().unwrap();
        let first: Vec<_> = catalog.enumerate().to_vec();
        let second: Vec<_> = catalog.enumerate().to_vec();
        assert_eq!(first, second);
        assert_eq!(first[0].name, "twil_callerIDLookups");
        assert_eq!(first[49].name, "twil_trunking_origination");
    }

    #[test]
    fn descs_follow_table_order() {
        let catalog = Catalog::standard().unwrap();
        for (desc, entry) in catalog.descs().iter().zip(catalog.enumerate()) {
            assert_eq!(desc.fq_name, entry.name);
            assert_eq!(desc.help, entry.help);
        }
    }

    static DUPLICATE_CATEGORY: &[MetricDescriptor] = &[
        metric("calls", "twil_calls", "Total Call Minutes"),
        metric("calls", "twil_calls_again", "Again"),
    ];

    static DUPLICATE_NAME: &[MetricDescriptor] = &[
        metric("calls", "twil_calls", "Total Call Minutes"),
        metric("calls-sip", "twil_calls", "SIP Minutes"),
    ];

    static INVALID_NAME: &[MetricDescriptor] = &[metric("calls", "twil-calls", "Dashes")];

    #[test]
    fn rejects_duplicate_category() {
        let err = Catalog::new(DUPLICATE_CATEGORY).unwrap_err();
        assert!(err.to_string().contains("duplicate usage category"));
    }

    #[test]
    fn rejects_duplicate_name() {
        let err = Catalog::new(DUPLICATE_NAME).unwrap_err();
        assert!(err.to_string().contains("duplicate metric name"));
    }

    #[test]
    fn rejects_invalid_metric_name() {
        assert!(Catalog::new(INVALID_NAME).is_err());
    }
}
