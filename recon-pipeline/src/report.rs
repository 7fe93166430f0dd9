//! Console tables printed around a run.

use crate::timing::{StageTiming, format_duration};
use recon_data::RunConfig;
use serde_json::Value as JsonValue;
use std::fmt;

const RULE: &str = "====================================";

fn write_header(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{RULE}")?;
    writeln!(f, "{title}")?;
    writeln!(f, "{RULE}")
}

/// Every configuration key with its resolved value.
pub struct ConfigReport<'a>(pub &'a RunConfig);

impl fmt::Display for ConfigReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let JsonValue::Object(entries) = serde_json::to_value(self.0).map_err(|_| fmt::Error)?
        else {
            return Err(fmt::Error);
        };

        write_header(f, "Configuration")?;
        for (key, value) in &entries {
            match value {
                JsonValue::String(text) => writeln!(f, "{key:>40} : {text}")?,
                other => writeln!(f, "{key:>40} : {other}")?,
            }
        }
        Ok(())
    }
}

/// Elapsed time per stage plus the total.
pub struct TimingReport<'a>(pub &'a StageTiming);

impl fmt::Display for TimingReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, "Elapsed time (in h:m:s)")?;
        for (kind, elapsed) in self.0.iter() {
            writeln!(f, "- {:<20}{}", kind.description(), format_duration(elapsed))?;
        }
        writeln!(f, "- {:<20}{}", "Total", format_duration(self.0.total()))
    }
}
