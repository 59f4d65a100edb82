//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{IndexCompatArgs, OutputFormat};
use crate::error::Result;
use crate::matrix::PlannedCheck;

/// Result structure for corpus writing.
#[derive(Debug, Serialize, Deserialize)]
pub struct CorpusWriteResult {
    pub directory: String,
    pub seed: Option<u64>,
    pub samples: usize,
    pub text_bytes: u64,
    pub binary_bytes: u64,
}

/// Result structure for corpus verification.
#[derive(Debug, Serialize, Deserialize)]
pub struct CorpusReadResult {
    pub directory: String,
    pub samples: usize,
    pub bitflags: u32,
    pub base_offset: i64,
    pub max_offset: i64,
    pub base_timestamp: i64,
    pub max_timestamp: i64,
}

/// Result structure for the self check.
#[derive(Debug, Serialize, Deserialize)]
pub struct SelfCheckResult {
    pub iterations: usize,
    pub seed: Option<u64>,
    pub total_samples: u64,
    pub duration_ms: u64,
}

/// Result structure for a cross-version plan.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlanResult {
    pub versions: Vec<String>,
    pub checks: Vec<PlannedCheck>,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &IndexCompatArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output a plan, one check per line in human mode.
pub fn output_plan(result: &PlanResult, args: &IndexCompatArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 0 {
                println!("Compatibility plan for {} versions", result.versions.len());
                println!();
            }
            for check in &result.checks {
                println!("{check}");
            }
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &IndexCompatArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    for line in format_lines(&value) {
        println!("{line}");
    }
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &IndexCompatArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Render an object as `key: value` lines.
fn format_lines(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Object(obj) => obj
            .iter()
            .map(|(key, val)| {
                let formatted_val = format_value(val);
                format!("{key}: {formatted_val}")
            })
            .collect(),
        _ => vec![format_value(value)],
    }
}

/// Format a JSON value for human output.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "-".to_string(),
    }
}
