//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{Scenario, StepChannel, SyncBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    latency_window_us: (i64, i64),
    session_timeout_secs: u64,
    max_retries: u32,
    sink_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario_steps: Option<usize>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_inputs(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_inputs(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();
    let scenario_path = args.scenario.as_ref().map(|p| p.display().to_string());
    let invalid = |error: String| ValidationResult {
        valid: false,
        config_path: config_path.clone(),
        scenario_path: scenario_path.clone(),
        error: Some(error),
        warnings: None,
        summary: None,
    };

    if !args.config.exists() {
        return invalid(format!("File not found: {}", args.config.display()));
    }

    let blueprint = match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => blueprint,
        Err(e) => return invalid(e.to_string()),
    };

    let scenario = match &args.scenario {
        Some(path) if !path.exists() => {
            return invalid(format!("File not found: {}", path.display()));
        }
        Some(path) => match config_loader::ConfigLoader::load_scenario_from_path(path) {
            Ok(scenario) => Some(scenario),
            Err(e) => return invalid(format!("scenario: {e}")),
        },
        None => None,
    };

    let warnings = collect_warnings(&blueprint, scenario.as_ref());

    ValidationResult {
        valid: true,
        config_path: config_path.clone(),
        scenario_path: scenario_path.clone(),
        error: None,
        warnings: if warnings.is_empty() {
            None
        } else {
            Some(warnings)
        },
        summary: Some(ConfigSummary {
            version: format!("{:?}", blueprint.version),
            latency_window_us: (
                blueprint.timing.min_latency_us,
                blueprint.timing.max_latency_us,
            ),
            session_timeout_secs: blueprint.timing.session_timeout_secs,
            max_retries: blueprint.session.max_retries,
            sink_count: blueprint.effective_sinks().len(),
            scenario_steps: scenario.as_ref().map(|s| s.steps.len()),
        }),
    }
}

/// Collect non-fatal issues
fn collect_warnings(blueprint: &SyncBlueprint, scenario: Option<&Scenario>) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - outcomes go to the default log sink".to_string());
    }

    if blueprint.timing.quality_grace_secs >= blueprint.timing.session_timeout_secs {
        warnings.push(
            "timing.quality_grace_secs >= session_timeout_secs - quality failures will surface as timeouts"
                .to_string(),
        );
    }

    if let Some(scenario) = scenario {
        if scenario.steps.is_empty() {
            warnings.push(format!("Scenario '{}' has no steps", scenario.name));
        }
        let visual = scenario.steps_for(StepChannel::Visual).count();
        if visual == 0 && scenario.camera_unavailable.is_none() {
            warnings.push(format!(
                "Scenario '{}' has no camera steps - the session can only time out",
                scenario.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);
        if let Some(ref scenario) = result.scenario_path {
            println!("✓ Scenario is valid: {}", scenario);
        }

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Latency window: {}..={} us",
                summary.latency_window_us.0, summary.latency_window_us.1
            );
            println!("  Session timeout: {}s", summary.session_timeout_secs);
            println!("  Max retries: {}", summary.max_retries);
            println!("  Sinks: {}", summary.sink_count);
            if let Some(steps) = summary.scenario_steps {
                println!("  Scenario steps: {}", steps);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
