use std::collections::BTreeMap;

use codepact_core::api::CliError;
use codepact_plugins::factory::build_registry;
use serde_json::json;

use super::cli::ToolsArgs;

pub fn handle_tools(args: ToolsArgs) -> Result<i32, CliError> {
    let registry = build_registry();
    let tools: BTreeMap<String, Option<String>> = registry
        .tool_names()
        .into_iter()
        .map(|name| {
            let file = registry.config_file(&name);
            (name, file)
        })
        .collect();
    let languages = registry.build_language_mapping();

    if args.json {
        let body = json!({ "tools": tools, "languages": languages });
        let text = serde_json::to_string_pretty(&body).map_err(std::io::Error::from)?;
        println!("{text}");
        return Ok(0);
    }

    for (name, file) in &tools {
        println!("{name:<10} {}", file.as_deref().unwrap_or("-"));
    }
    println!();
    for (lang, names) in &languages {
        println!("{lang:<12} {}", names.join(", "));
    }
    Ok(0)
}
