use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gigabit, TenGigabit and FastEthernet port abbreviations.
pub const DEFAULT_PREFIXES: [&str; 3] = ["Gi", "Te", "Fa"];

/// A single reading exactly as the switch printed it (e.g. `-14.1`).
/// Kept as text so nothing is lost to float formatting; `value()` gives the number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Measurement(String);

impl Measurement {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value, or `None` for placeholders like `N/A`.
    pub fn value(&self) -> Option<f64> {
        self.0.parse().ok()
    }
}

impl Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the transceiver table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceTelemetry {
    pub name: String,
    pub temperature_c: Measurement,
    pub voltage: Measurement,
    pub tx_power_dbm: Measurement,
    pub rx_power_dbm: Measurement,
}

impl Display for InterfaceTelemetry {
    /// Renders the record in the 5-column (no current) table form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.name, self.temperature_c, self.voltage, self.tx_power_dbm, self.rx_power_dbm
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Does not start with a recognised interface prefix (headers, separators, prompts).
    NotCandidate,
    /// Starts like an interface but has neither 5 nor 6 columns.
    TokenCount(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Parsed(InterfaceTelemetry),
    Skipped(SkipReason),
}

/// Parser for `show interface transceiver` output.
///
/// Two table layouts are in the wild and are told apart only by column count:
/// - 5 columns: `port temperature voltage tx rx`
/// - 6 columns: `port temperature voltage current tx rx` (current is dropped)
///
/// Anything else is skipped, which is what lets headers and footers through untouched.
#[derive(Debug, Clone)]
pub struct TransceiverParser {
    prefixes: Vec<String>,
}

impl Default for TransceiverParser {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIXES)
    }
}

impl TransceiverParser {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    fn is_candidate(&self, line: &str) -> bool {
        self.prefixes.iter().any(|p| line.starts_with(p.as_str()))
    }

    /// Classifies a single line. Trailing whitespace is ignored, leading whitespace is not.
    pub fn parse_line(&self, line: &str) -> LineOutcome {
        let line = line.trim_end();
        if !self.is_candidate(line) {
            return LineOutcome::Skipped(SkipReason::NotCandidate);
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (name, temperature, voltage, tx, rx) = match tokens.as_slice() {
            [name, temperature, voltage, tx, rx] => (name, temperature, voltage, tx, rx),
            [name, temperature, voltage, _current, tx, rx] => (name, temperature, voltage, tx, rx),
            other => return LineOutcome::Skipped(SkipReason::TokenCount(other.len())),
        };

        LineOutcome::Parsed(InterfaceTelemetry {
            name: name.to_string(),
            temperature_c: Measurement::new(*temperature),
            voltage: Measurement::new(*voltage),
            tx_power_dbm: Measurement::new(*tx),
            rx_power_dbm: Measurement::new(*rx),
        })
    }

    /// Parses every line, keeping accepted rows in input order.
    /// Duplicated interface names are passed through as-is.
    pub fn parse<I>(&self, lines: I) -> Vec<InterfaceTelemetry>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut records = Vec::new();
        for line in lines {
            let line = line.as_ref();
            match self.parse_line(line) {
                LineOutcome::Parsed(record) => records.push(record),
                LineOutcome::Skipped(SkipReason::TokenCount(count)) => {
                    debug!(line, count, "skipping interface row with unexpected column count");
                }
                LineOutcome::Skipped(SkipReason::NotCandidate) => continue,
            }
        }
        records
    }
}
