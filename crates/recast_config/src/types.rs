//! Configuration types deserialized from `recast.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The top-level project configuration parsed from `recast.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Worker pool settings.
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Incremental compiler settings, if this project compiles sources.
    #[serde(default)]
    pub compile: Option<CompileConfig>,
    /// Incremental merger settings, if this project merges content.
    #[serde(default)]
    pub merge: Option<MergeConfig>,
    /// Path-pattern policy for merged content.
    #[serde(default)]
    pub packaging: PackagingConfig,
}

/// Core project metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorConfig {
    /// Number of worker threads; 0 uses one per available core.
    #[serde(default)]
    pub threads: usize,
}

/// Settings for the dependency-tracking incremental compiler.
#[derive(Debug, Clone, Deserialize)]
pub struct CompileConfig {
    /// Source roots whose matching files are compiled as main files.
    pub source_dirs: Vec<PathBuf>,
    /// Additional directories searched for imports but never compiled.
    #[serde(default)]
    pub import_dirs: Vec<PathBuf>,
    /// Glob selecting main files inside the source roots.
    #[serde(default = "default_source_glob")]
    pub source_glob: String,
    /// Directory receiving primary outputs.
    pub output_dir: PathBuf,
    /// Directory receiving secondary (packaged) outputs.
    #[serde(default)]
    pub packaged_dir: Option<PathBuf>,
    /// Package name prefixes eligible for secondary outputs. Absent means all.
    #[serde(default)]
    pub package_allowlist: Option<Vec<String>>,
    /// Directory holding the dependency store.
    #[serde(default = "default_compile_state_dir")]
    pub state_dir: PathBuf,
    /// Program invoked once per main file.
    pub tool: String,
    /// Extra arguments passed to the tool before the generated ones.
    #[serde(default)]
    pub tool_args: Vec<String>,
}

fn default_source_glob() -> String {
    "**/*.aidl".to_string()
}

fn default_compile_state_dir() -> PathBuf {
    PathBuf::from("build/incremental/compile")
}

/// Settings for the multi-input incremental merger.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    /// Which kind of content is merged; selects the path acceptance rules.
    #[serde(default)]
    pub content: ContentKind,
    /// Directory receiving merged outputs.
    pub output_dir: PathBuf,
    /// Directory holding the merge state.
    #[serde(default = "default_merge_state_dir")]
    pub state_dir: PathBuf,
    /// Contributing inputs, in declaration order.
    #[serde(default)]
    pub inputs: Vec<MergeInputConfig>,
}

fn default_merge_state_dir() -> PathBuf {
    PathBuf::from("build/incremental/merge")
}

/// One contributing input of the merger.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeInputConfig {
    /// Unique contributor name, recorded in the merge state.
    pub name: String,
    /// Directory holding the input tree.
    pub path: PathBuf,
    /// Where the input comes from.
    #[serde(default)]
    pub scope: Scope,
}

/// Origin tier of a merge input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Content of the module being built. Wins otherwise fatal conflicts.
    Project,
    /// Content of other modules of the same build.
    SubProject,
    /// Content of external dependencies (default).
    #[default]
    External,
}

impl Scope {
    /// Returns `true` for [`Scope::Project`].
    pub fn is_project(self) -> bool {
        self == Self::Project
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Project => "project",
            Self::SubProject => "sub-project",
            Self::External => "external",
        };
        f.write_str(s)
    }
}

/// Kind of content being merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    /// Generic resources: everything except compiled classes and native libraries.
    #[default]
    Resources,
    /// Native shared libraries laid out as `lib/<abi>/<file>`.
    NativeLibs,
}

/// Path-pattern policy tables for merged content.
#[derive(Debug, Clone, Deserialize)]
pub struct PackagingConfig {
    /// Patterns of paths dropped from every input.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub excludes: Vec<String>,
    /// Patterns of paths taken from the first contributor only.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub pick_firsts: Vec<String>,
    /// Patterns of paths whose contributors are concatenated.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub merges: Vec<String>,
    /// Whether the built-in exclude and merge patterns apply.
    #[serde(default = "default_true")]
    pub default_rules: bool,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            excludes: Vec::new(),
            pick_firsts: Vec::new(),
            merges: Vec::new(),
            default_rules: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `excludes = "/LICENSE"` as well as `excludes = ["/LICENSE", "/NOTICE"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
