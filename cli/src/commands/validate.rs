use std::io::Write;

use codepact_core::api as core_api;
use codepact_core::api::{ChangeScope, CliError, ValidationResult, ValidatorOptions};
use codepact_plugins::factory::{build_judge, build_registry};

use super::cli::ValidateArgs;

/// Returns the process exit code: 1 when a violation hits a fail-on severity.
pub async fn handle_validate(args: ValidateArgs, cfg: &core_api::AppConfig) -> Result<i32, CliError> {
    let workdir = match args.workdir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let opts = ValidatorOptions::from_config(&cfg.validator, workdir.clone());
    let policy_path = args
        .policy
        .unwrap_or_else(|| opts.config_dir.join(core_api::CODE_POLICY_FILE));
    let policy = core_api::load_policy(&policy_path)?;

    let scope = match (args.staged, args.base, args.head) {
        (true, _, _) => ChangeScope::Staged,
        (false, Some(base), Some(head)) => ChangeScope::Range { base, head },
        _ => ChangeScope::WorkingTree,
    };
    let changes = core_api::collect_changes(&workdir, &scope).await?;
    tracing::info!(
        policy = %policy_path.display(),
        changes = changes.len(),
        scope = ?scope,
        "validating"
    );

    let judge = build_judge(cfg).map_err(CliError::Judge)?;
    let mut validator = core_api::Validator::new(policy, build_registry()).with_options(opts);
    if let Some(judge) = judge {
        validator = validator.with_judge(judge);
    }
    let result = validator.validate(&changes).await?;
    let fail = result.should_fail(&validator.policy().enforce);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        let body = serde_json::to_string_pretty(&result).map_err(std::io::Error::from)?;
        writeln!(out, "{body}")?;
    } else {
        write_report(&mut out, &result)?;
    }

    Ok(if fail { 1 } else { 0 })
}

fn write_report(out: &mut impl Write, result: &ValidationResult) -> std::io::Result<()> {
    for v in &result.violations {
        writeln!(
            out,
            "{}:{}:{} {} [{}] {}",
            v.file, v.line, v.column, v.severity, v.rule_id, v.message
        )?;
    }
    for e in &result.errors {
        writeln!(
            out,
            "error ({}): {} [{}]",
            e.engine,
            e.message,
            e.rule_ids.join(", ")
        )?;
    }
    writeln!(
        out,
        "checked {} rules: {} passed, {} failed, {} skipped, {} errors ({} ms)",
        result.checked,
        result.passed,
        result.failed,
        result.skipped.len(),
        result.errors.len(),
        result.duration_ms
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use codepact_core::api::{Severity, ValidationError, Violation};

    #[test]
    fn report_lists_violations_errors_and_summary() {
        let mut result: ValidationResult = serde_json::from_value(serde_json::json!({
            "run_id": "r",
            "started_at": "2026-01-01T00:00:00Z",
            "duration_ms": 12,
            "violations": [],
            "errors": [],
            "checked": 3,
            "passed": 1,
            "failed": 1,
            "skipped": ["r9"],
        }))
        .unwrap();
        result.violations.push(Violation {
            file: "src/a.ts".into(),
            line: 4,
            column: 2,
            message: "Unexpected console statement.".into(),
            severity: Severity::Error,
            rule_id: "no-console-log".into(),
            tool_name: "eslint".into(),
            execution_ms: 30,
        });
        result.errors.push(ValidationError {
            rule_ids: vec!["r2".into()],
            engine: "llm-validator".into(),
            message: "timed out".into(),
        });

        let mut buf = Vec::new();
        write_report(&mut buf, &result).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("src/a.ts:4:2 error [no-console-log] Unexpected console statement."));
        assert!(text.contains("error (llm-validator): timed out [r2]"));
        assert!(text.contains("checked 3 rules: 1 passed, 1 failed, 1 skipped, 1 errors (12 ms)"));
    }
}
