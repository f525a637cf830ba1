//! `recast compile`: runs the incremental compiler over the configured sources.

use std::error::Error;

use recast_compile::{CompileSettings, IncrementalCompiler, ToolCompiler};
use tracing::info;

use crate::pipeline::{build_executor, load_project, print_report};
use crate::GlobalArgs;

/// Directory below the compile state dir receiving the tool's depfiles.
pub const DEPFILE_DIR: &str = "depfiles";

/// Executes the compile command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = load_project(global)?;
    let Some(config) = project.config.compile.as_ref() else {
        return Err("recast.toml has no [compile] section".into());
    };

    let settings = CompileSettings::from_config(config);
    let tool = ToolCompiler::new(
        &config.tool,
        config.tool_args.clone(),
        settings.state_dir.join(DEPFILE_DIR),
    );
    let executor = build_executor(&project.config, global)?;
    info!(
        project = %project.config.project.name,
        threads = executor.threads(),
        "compile"
    );

    let report = IncrementalCompiler::new(&settings, &tool, &executor).run()?;
    print_report("compile", &report, global)?;
    Ok(0)
}
