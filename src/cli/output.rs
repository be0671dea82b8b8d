#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    /// Prometheus text exposition
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub verbose: bool,
}

impl OutputOptions {
    pub fn new(json: bool, pretty: bool, verbose: bool) -> Self {
        Self {
            // --pretty only makes sense for JSON, so it implies it
            format: if json || pretty {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            pretty,
            verbose,
        }
    }
}
