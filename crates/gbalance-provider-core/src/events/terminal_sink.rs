use std::future::Future;
use std::io::Write;
use std::pin::Pin;

use super::{RequestOutcome, TelemetryError, TelemetrySink};

/// Prints one JSON line per outcome on stderr, keeping stdout free.
#[derive(Debug, Default)]
pub struct TerminalTelemetrySink;

impl TerminalTelemetrySink {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySink for TerminalTelemetrySink {
    fn write<'a>(
        &'a self,
        outcome: &'a RequestOutcome,
    ) -> Pin<Box<dyn Future<Output = Result<(), TelemetryError>> + Send + 'a>> {
        Box::pin(async move {
            let line = serde_json::to_string(outcome)?;
            let mut stderr = std::io::stderr().lock();
            writeln!(stderr, "{line}")?;
            Ok(())
        })
    }
}
