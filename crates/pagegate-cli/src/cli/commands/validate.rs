use pagegate_core::adapters::load_rules_file;
use serde_json::json;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::exit_codes;

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let (rules, rejects) = match load_rules_file(&args.rules) {
        Ok(decoded) => decoded,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let exit_code = if rejects.is_empty() {
        exit_codes::SUCCESS
    } else {
        exit_codes::GATE_FAILED
    };

    match args.format {
        OutputFormat::Json => {
            let report = json!({
                "valid": rules.len(),
                "rules": rules.iter().map(|r| json!({
                    "label": r.label(),
                    "scope": r.scope.to_string(),
                    "rule": r.describe(),
                })).collect::<Vec<_>>(),
                "rejected": rejects.iter().map(|r| json!({
                    "index": r.index,
                    "error": r.error,
                })).collect::<Vec<_>>(),
                "exit_code": exit_code,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for rule in &rules {
                println!("✅ [{}] {}: {}", rule.scope, rule.label(), rule.describe());
            }
            for reject in &rejects {
                println!("❌ rule #{}: {}", reject.index, reject.error);
            }
            println!(
                "{} valid, {} rejected",
                rules.len(),
                rejects.len()
            );
        }
    }

    Ok(exit_code)
}
