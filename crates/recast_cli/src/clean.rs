//! `recast clean`: forgets state and outputs so the next runs are full.

use std::error::Error;

use recast_compile::CompileSettings;
use recast_merge::MergeSettings;

use crate::pipeline::load_project;
use crate::{CleanArgs, GlobalArgs};

/// Executes the clean command. Steps missing from `recast.toml` are skipped.
pub fn run(args: &CleanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = load_project(global)?;

    if args.includes_compile() {
        if let Some(config) = &project.config.compile {
            CompileSettings::from_config(config).clean()?;
            report(global, "compile");
        }
    }
    if args.includes_merge() {
        if let Some(config) = &project.config.merge {
            MergeSettings::from_config(config).clean()?;
            report(global, "merge");
        }
    }
    Ok(0)
}

fn report(global: &GlobalArgs, step: &str) {
    if !global.quiet && !global.json {
        eprintln!("{:>12} {step}", "Cleaned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn clean_merge_only_keeps_compile_outputs() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("recast.toml"),
            r#"
[project]
name = "app"

[compile]
source_dirs = ["src"]
output_dir = "gen"
tool = "aidl"

[merge]
output_dir = "merged"
"#,
        )
        .unwrap();
        fs::create_dir_all(tmp.path().join("gen")).unwrap();
        fs::write(tmp.path().join("gen/A.java"), "a").unwrap();
        fs::create_dir_all(tmp.path().join("merged")).unwrap();
        fs::write(tmp.path().join("merged/x.txt"), "x").unwrap();

        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            json: false,
            threads: None,
            config: Some(tmp.path().display().to_string()),
        };
        let args = CleanArgs {
            compile: false,
            merge: true,
        };
        assert_eq!(run(&args, &global).unwrap(), 0);
        assert!(tmp.path().join("gen/A.java").exists());
        assert!(!tmp.path().join("merged/x.txt").exists());
    }
}
