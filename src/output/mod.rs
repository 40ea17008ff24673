mod cli;
mod json;

pub use cli::print_cli_table;
pub use json::print_json;

use crate::model::ScanResult;
use anyhow::Result;

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'table' or 'json'", s)),
        }
    }
}

pub fn print_result(result: &ScanResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_cli_table(result),
        OutputFormat::Json => print_json(result),
    }
}

/// Format result to string for file output
pub fn format_result_to_string(result: &ScanResult, format: OutputFormat) -> Result<String> {
    match format {
        // Tables are for terminals; files always get JSON
        OutputFormat::Json | OutputFormat::Table => json::to_json_string(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GameCandidate, SourceKind};

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_file_output_is_json() {
        let result = ScanResult::new(vec![GameCandidate::new(
            SourceKind::DistributionClient,
            "Portal 2",
            "/lib/common/Portal 2",
        )
        .with_identity("620")]);

        let text = format_result_to_string(&result, OutputFormat::Table).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["games"][0]["identity_key"], "620");
        assert_eq!(value["games"][0]["display_name"], "Portal 2");
    }
}
