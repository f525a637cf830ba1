//! `recast merge`: merges the configured inputs into the output directory.

use std::error::Error;

use recast_merge::{DirectoryInput, IncrementalMerger, MergeInput, MergeSettings, PackagingPolicy};
use tracing::info;

use crate::pipeline::{build_executor, load_project, print_report};
use crate::GlobalArgs;

/// Executes the merge command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = load_project(global)?;
    let Some(config) = project.config.merge.as_ref() else {
        return Err("recast.toml has no [merge] section".into());
    };

    let inputs = config
        .inputs
        .iter()
        .map(|input| DirectoryInput::scan(&input.name, input.scope, &input.path))
        .collect::<Result<Vec<_>, _>>()?;
    let views: Vec<&dyn MergeInput> = inputs.iter().map(|i| i as &dyn MergeInput).collect();

    let settings = MergeSettings::from_config(config);
    let policy = PackagingPolicy::from_config(&project.config.packaging)?;
    let executor = build_executor(&project.config, global)?;
    info!(
        project = %project.config.project.name,
        inputs = views.len(),
        content = ?settings.content,
        "merge"
    );

    let report = IncrementalMerger::new(&settings, policy, &executor)?.run(&views)?;
    print_report("merge", &report, global)?;
    Ok(0)
}
