use codepact_core::api as core_api;
use codepact_core::api::{CliError, CompileResult, CompilerOptions, PolicyCompiler};
use codepact_plugins::factory::{build_judge, build_registry};

use super::cli::ConvertArgs;

pub async fn handle_convert(args: ConvertArgs, cfg: &core_api::AppConfig) -> Result<i32, CliError> {
    let user = core_api::load_user_policy(&args.input)?;
    let judge = build_judge(cfg).map_err(CliError::Judge)?;
    if judge.is_none() {
        tracing::warn!("no judge configured; every rule goes to the llm-validator engine");
    }

    let mut opts = CompilerOptions::from_config(&cfg.compiler);
    if let Some(dir) = args.output_dir {
        opts.output_dir = dir;
    }
    tracing::info!(
        input = %args.input.display(),
        rules = user.rules.len(),
        output_dir = %opts.output_dir.display(),
        "compiling policy"
    );

    let result = PolicyCompiler::new(build_registry(), judge, opts)
        .compile(&user)
        .await?;
    println!("{}", summary(&result));
    Ok(0)
}

fn summary(result: &CompileResult) -> String {
    let mut lines = Vec::new();
    for path in &result.generated_files {
        lines.push(format!("wrote {}", path.display()));
    }
    for fb in &result.fallbacks {
        match &fb.reason {
            Some(reason) => lines.push(format!(
                "rule {} fell back from {} to llm-validator: {}",
                fb.rule_id, fb.tool, reason
            )),
            None => lines.push(format!(
                "rule {} fell back from {} to llm-validator",
                fb.rule_id, fb.tool
            )),
        }
    }
    for (tool, err) in &result.errors {
        lines.push(format!("{tool}: {err}"));
    }
    let judged = result
        .policy
        .rules
        .iter()
        .filter(|r| r.engine() == Some(core_api::LLM_VALIDATOR_ENGINE))
        .count();
    lines.push(format!(
        "{} rules compiled, {} checked by the judge, {} fallbacks",
        result.policy.rules.len(),
        judged,
        result.fallbacks.len()
    ));
    lines.join("\n")
}
