//! Per-path packaging decisions.
//!
//! Patterns are globs matched against the path with a leading `/`, and `*`
//! does not cross directory boundaries: `/META-INF/*.SF` matches
//! `META-INF/CERT.SF` but not `META-INF/x/CERT.SF`.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use recast_common::ContentHash;
use recast_config::PackagingConfig;

use crate::error::MergeError;

/// Paths dropped from every input unless `default_rules` is turned off.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "/META-INF/LICENSE*",
    "/META-INF/NOTICE*",
    "/LICENSE*",
    "/NOTICE*",
    "/META-INF/*.DSA",
    "/META-INF/*.EC",
    "/META-INF/*.SF",
    "/META-INF/*.RSA",
    "/META-INF/maven/**",
    "**/.svn/**",
    "**/CVS/**",
    "**/SCCS/**",
];

/// Paths concatenated across inputs unless `default_rules` is turned off.
pub const DEFAULT_MERGES: &[&str] = &["/META-INF/services/**"];

/// What to do with a path offered by one or more inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagingAction {
    /// Drop the path from every input.
    Exclude,
    /// Keep the first contributor only.
    PickFirst,
    /// Concatenate all contributors in input order.
    Merge,
    /// Exactly one contributor is allowed.
    Single,
}

/// Compiled packaging tables. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct PackagingPolicy {
    excludes: GlobSet,
    pick_firsts: GlobSet,
    merges: GlobSet,
    fingerprint: ContentHash,
}

impl PackagingPolicy {
    /// Compiles the tables of `config`, adding the default rules if enabled.
    pub fn from_config(config: &PackagingConfig) -> Result<Self, MergeError> {
        let defaults = |list: &'static [&'static str]| -> Vec<&'static str> {
            if config.default_rules {
                list.to_vec()
            } else {
                Vec::new()
            }
        };
        let excludes = defaults(DEFAULT_EXCLUDES)
            .into_iter()
            .chain(config.excludes.iter().map(String::as_str));
        let merges = defaults(DEFAULT_MERGES)
            .into_iter()
            .chain(config.merges.iter().map(String::as_str));

        Ok(Self {
            excludes: build_set(excludes)?,
            pick_firsts: build_set(config.pick_firsts.iter().map(String::as_str))?,
            merges: build_set(merges)?,
            fingerprint: fingerprint(config),
        })
    }

    /// Fingerprint of the tables this policy was compiled from.
    pub fn fingerprint(&self) -> ContentHash {
        self.fingerprint
    }

    /// Decides the action for a relative path.
    ///
    /// Exclusion wins over pick-first, which wins over merge. Paths matched by
    /// no pattern allow a single contributor.
    pub fn action(&self, path: &str) -> PackagingAction {
        let rooted = format!("/{path}");
        if self.excludes.is_match(&rooted) {
            PackagingAction::Exclude
        } else if self.pick_firsts.is_match(&rooted) {
            PackagingAction::PickFirst
        } else if self.merges.is_match(&rooted) {
            PackagingAction::Merge
        } else {
            PackagingAction::Single
        }
    }
}

fn fingerprint(config: &PackagingConfig) -> ContentHash {
    let mut fields = Vec::new();
    for (name, patterns) in [
        ("excludes", &config.excludes),
        ("pick-firsts", &config.pick_firsts),
        ("merges", &config.merges),
    ] {
        fields.push(format!("\0{name}\0{}", patterns.len()));
        fields.extend(patterns.iter().cloned());
    }
    fields.push(format!("\0defaults\0{}", config.default_rules));
    ContentHash::from_fields(fields)
}

fn build_set<'p>(patterns: impl IntoIterator<Item = &'p str>) -> Result<GlobSet, MergeError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| MergeError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.kind().to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| MergeError::InvalidPattern {
        pattern: String::new(),
        reason: e.to_string(),
    })
}
