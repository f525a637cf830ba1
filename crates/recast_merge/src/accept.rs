//! Which paths each kind of merged content accepts.

use recast_config::ContentKind;
use regex::Regex;

use crate::error::MergeError;
use crate::policy::{PackagingAction, PackagingPolicy};

const NATIVE_LIB_PATTERN: &str = r"^lib/([^/]+)/([^/]+)$";

/// Debug helpers packaged next to native libraries.
const NATIVE_HELPERS: [&str; 2] = ["gdbserver", "gdb.setup"];

/// Path acceptance for one [`ContentKind`].
#[derive(Debug, Clone)]
pub enum ContentRules {
    /// Anything except compiled classes and native libraries.
    Resources,
    /// Only `lib/<abi>/<file>` where the file is a shared object or a
    /// debug helper.
    NativeLibs(Regex),
}

impl ContentRules {
    /// Builds the rules for `kind`.
    pub fn new(kind: ContentKind) -> Result<Self, MergeError> {
        match kind {
            ContentKind::Resources => Ok(Self::Resources),
            ContentKind::NativeLibs => Regex::new(NATIVE_LIB_PATTERN)
                .map(Self::NativeLibs)
                .map_err(|e| MergeError::InvalidPattern {
                    pattern: NATIVE_LIB_PATTERN.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Returns `true` if `path` is content of this kind.
    pub fn accepts(&self, path: &str) -> bool {
        match self {
            Self::Resources => !path.ends_with(".class") && !path.ends_with(".so"),
            Self::NativeLibs(pattern) => pattern.captures(path).is_some_and(|caps| {
                let file = &caps[2];
                file.ends_with(".so") || NATIVE_HELPERS.contains(&file)
            }),
        }
    }
}

/// Content rules combined with the packaging policy's exclusions.
#[derive(Debug, Clone)]
pub struct PathFilter {
    rules: ContentRules,
    policy: PackagingPolicy,
}

impl PathFilter {
    /// Combines content rules with a policy.
    pub fn new(rules: ContentRules, policy: PackagingPolicy) -> Self {
        Self { rules, policy }
    }

    /// The packaging policy.
    pub fn policy(&self) -> &PackagingPolicy {
        &self.policy
    }

    /// Returns `true` if `path` is accepted by the content rules and not
    /// excluded by the policy.
    pub fn accepts(&self, path: &str) -> bool {
        self.rules.accepts(path) && self.policy.action(path) != PackagingAction::Exclude
    }
}
