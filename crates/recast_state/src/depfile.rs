//! Make-style dependency files written by the compile tool.
//!
//! The first rule names the generated outputs as targets and the compiled
//! source followed by everything it imported as prerequisites:
//!
//! ```text
//! gen/com/example/IFoo.java : \
//!   src/com/example/IFoo.aidl \
//!   src/com/example/Bar.aidl
//! ```
//!
//! Later rules (phony targets some tools emit for each prerequisite) are ignored.

use std::path::PathBuf;

use crate::dependency::DependencyData;

impl DependencyData {
    /// Parses the contents of a dependency file into an edge.
    ///
    /// Returns `None` when the file names no prerequisite, since there is
    /// then no main file to own the edge.
    pub fn parse_depfile(content: &str) -> Option<DependencyData> {
        let rule = first_rule(content)?;
        let (targets, prerequisites) = rule.split_once(':')?;

        let mut prerequisites = prerequisites.split_whitespace();
        let mut data = DependencyData::new(PathBuf::from(prerequisites.next()?));
        for dep in prerequisites {
            data.add_dependency(dep);
        }
        for target in targets.split_whitespace() {
            data.add_output(target);
        }
        Some(data)
    }
}

/// Joins continuation lines and returns the first non-empty logical line.
fn first_rule(content: &str) -> Option<String> {
    let mut rule = String::new();
    for line in content.lines() {
        let line = line.trim_end();
        if let Some(head) = line.strip_suffix('\\') {
            rule.push_str(head);
            rule.push(' ');
            continue;
        }
        rule.push_str(line);
        if !rule.trim().is_empty() {
            return Some(rule);
        }
        rule.clear();
    }
    (!rule.trim().is_empty()).then_some(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn single_line_rule() {
        let data = DependencyData::parse_depfile("out/IFoo.java : src/IFoo.aidl src/Bar.aidl\n")
            .unwrap();
        assert_eq!(data.main_file, Path::new("src/IFoo.aidl"));
        assert_eq!(data.output_files, vec![PathBuf::from("out/IFoo.java")]);
        assert!(data.dependency_files.contains(Path::new("src/Bar.aidl")));
        assert_eq!(data.dependency_files.len(), 1);
    }

    #[test]
    fn continuation_lines() {
        let text = "out/IFoo.java : \\\n  src/IFoo.aidl \\\n  src/A.aidl \\\n  src/B.aidl\n";
        let data = DependencyData::parse_depfile(text).unwrap();
        assert_eq!(data.main_file, Path::new("src/IFoo.aidl"));
        assert_eq!(data.dependency_files.len(), 2);
    }

    #[test]
    fn phony_rules_ignored() {
        let text = "out/IFoo.java : src/IFoo.aidl src/A.aidl\n\nsrc/A.aidl :\n";
        let data = DependencyData::parse_depfile(text).unwrap();
        assert_eq!(data.dependency_files.len(), 1);
        assert_eq!(data.output_files.len(), 1);
    }

    #[test]
    fn main_file_listed_twice_is_not_a_dependency() {
        let data =
            DependencyData::parse_depfile("out/X.java : src/X.aidl src/X.aidl\n").unwrap();
        assert!(data.dependency_files.is_empty());
    }

    #[test]
    fn no_prerequisite_is_none() {
        assert!(DependencyData::parse_depfile("out/X.java :\n").is_none());
        assert!(DependencyData::parse_depfile("").is_none());
        assert!(DependencyData::parse_depfile("no colon here").is_none());
    }
}
