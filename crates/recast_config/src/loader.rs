//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::collections::HashSet;
use std::path::Path;

/// Name of the configuration file at the project root.
pub const CONFIG_FILE: &str = "recast.toml";

/// Loads and validates a `recast.toml` configuration from a project directory.
///
/// Reads `<project_dir>/recast.toml`, parses it, and validates required fields.
/// Paths are returned as written; see [`resolve_paths`](crate::resolve_paths).
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration file by its exact path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `recast.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }

    if let Some(compile) = &config.compile {
        if compile.source_dirs.is_empty() {
            return Err(ConfigError::MissingField("compile.source_dirs".to_string()));
        }
        if compile.tool.is_empty() {
            return Err(ConfigError::MissingField("compile.tool".to_string()));
        }
        check_glob(&compile.source_glob)?;
    }

    if let Some(merge) = &config.merge {
        let mut seen = HashSet::new();
        for input in &merge.inputs {
            if input.name.is_empty() {
                return Err(ConfigError::MissingField("merge.inputs.name".to_string()));
            }
            if !seen.insert(input.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate merge input name '{}'",
                    input.name
                )));
            }
        }
    }

    let packaging = &config.packaging;
    for pattern in packaging
        .excludes
        .iter()
        .chain(&packaging.pick_firsts)
        .chain(&packaging.merges)
    {
        check_glob(pattern)?;
    }
    Ok(())
}

fn check_glob(pattern: &str) -> Result<(), ConfigError> {
    globset::Glob::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.kind().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentKind, Scope};
    use std::path::PathBuf;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "app"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "app");
        assert!(config.compile.is_none());
        assert!(config.merge.is_none());
        assert_eq!(config.executor.threads, 0);
        assert!(config.packaging.default_rules);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "app"

[executor]
threads = 4

[compile]
source_dirs = ["src/main/aidl"]
import_dirs = ["deps/aidl"]
output_dir = "build/generated/aidl"
packaged_dir = "build/packaged-aidl"
package_allowlist = ["com.example.api"]
tool = "aidl"
tool_args = ["-pframework.aidl"]

[merge]
content = "native-libs"
output_dir = "build/merged"

[[merge.inputs]]
name = "main"
path = "src/main/jniLibs"
scope = "project"

[[merge.inputs]]
name = "dep"
path = "deps/jni"

[packaging]
excludes = ["/META-INF/LICENSE"]
pick_firsts = ["**/*.properties"]
merges = ["/META-INF/services/**"]
default_rules = false
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.executor.threads, 4);

        let compile = config.compile.unwrap();
        assert_eq!(compile.source_dirs, vec![PathBuf::from("src/main/aidl")]);
        assert_eq!(compile.source_glob, "**/*.aidl");
        assert_eq!(compile.state_dir, PathBuf::from("build/incremental/compile"));
        assert_eq!(
            compile.package_allowlist,
            Some(vec!["com.example.api".to_string()])
        );

        let merge = config.merge.unwrap();
        assert_eq!(merge.content, ContentKind::NativeLibs);
        assert_eq!(merge.inputs.len(), 2);
        assert_eq!(merge.inputs[0].scope, Scope::Project);
        assert_eq!(merge.inputs[1].scope, Scope::External);
        assert!(!config.packaging.default_rules);
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn compile_without_sources_errors() {
        let toml = r#"
[project]
name = "app"

[compile]
source_dirs = []
output_dir = "out"
tool = "aidl"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "compile.source_dirs"));
    }

    #[test]
    fn duplicate_merge_input_errors() {
        let toml = r#"
[project]
name = "app"

[merge]
output_dir = "out"

[[merge.inputs]]
name = "lib"
path = "a"

[[merge.inputs]]
name = "lib"
path = "b"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn bad_glob_errors() {
        let toml = r#"
[project]
name = "app"

[packaging]
excludes = ["lib/[x86"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[project]\nname = \"disk\"\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "disk");
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
