//! Path resolution: anchoring relative configuration paths at the project root.

use crate::types::ProjectConfig;
use std::path::{Path, PathBuf};

/// Returns a copy of `config` with every relative path joined onto `root`.
///
/// Absolute paths are left untouched. Glob patterns and packaging tables are
/// not paths and are not rewritten.
pub fn resolve_paths(config: &ProjectConfig, root: &Path) -> ProjectConfig {
    let anchor = |p: &PathBuf| -> PathBuf {
        if p.is_absolute() {
            p.clone()
        } else {
            root.join(p)
        }
    };

    let mut resolved = config.clone();
    if let Some(compile) = resolved.compile.as_mut() {
        compile.source_dirs = compile.source_dirs.iter().map(anchor).collect();
        compile.import_dirs = compile.import_dirs.iter().map(anchor).collect();
        compile.output_dir = anchor(&compile.output_dir);
        compile.packaged_dir = compile.packaged_dir.as_ref().map(anchor);
        compile.state_dir = anchor(&compile.state_dir);
    }
    if let Some(merge) = resolved.merge.as_mut() {
        merge.output_dir = anchor(&merge.output_dir);
        merge.state_dir = anchor(&merge.state_dir);
        for input in &mut merge.inputs {
            input.path = anchor(&input.path);
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    fn sample_config() -> ProjectConfig {
        let toml = r#"
[project]
name = "app"

[compile]
source_dirs = ["src/aidl", "/abs/aidl"]
output_dir = "build/gen"
tool = "aidl"

[merge]
output_dir = "build/merged"

[[merge.inputs]]
name = "main"
path = "res"
"#;
        load_config_from_str(toml).unwrap()
    }

    #[test]
    fn relative_paths_anchor_at_root() {
        let resolved = resolve_paths(&sample_config(), Path::new("/work/app"));
        let compile = resolved.compile.unwrap();
        assert_eq!(compile.source_dirs[0], PathBuf::from("/work/app/src/aidl"));
        assert_eq!(compile.output_dir, PathBuf::from("/work/app/build/gen"));
        assert_eq!(
            compile.state_dir,
            PathBuf::from("/work/app/build/incremental/compile")
        );
        assert!(compile.packaged_dir.is_none());

        let merge = resolved.merge.unwrap();
        assert_eq!(merge.inputs[0].path, PathBuf::from("/work/app/res"));
        assert_eq!(
            merge.state_dir,
            PathBuf::from("/work/app/build/incremental/merge")
        );
    }

    #[test]
    fn absolute_paths_unchanged() {
        let resolved = resolve_paths(&sample_config(), Path::new("/work/app"));
        let compile = resolved.compile.unwrap();
        assert_eq!(compile.source_dirs[1], PathBuf::from("/abs/aidl"));
    }

    #[test]
    fn glob_not_rewritten() {
        let resolved = resolve_paths(&sample_config(), Path::new("/work/app"));
        assert_eq!(resolved.compile.unwrap().source_glob, "**/*.aidl");
    }
}
