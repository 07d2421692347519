mod hub;
mod terminal_sink;
mod types;

pub use hub::{TelemetryError, TelemetryHub, TelemetrySink};
pub use terminal_sink::TerminalTelemetrySink;
pub use types::RequestOutcome;
