//! Ordering, renaming, and filtering the inputs before merging.

use recast_config::ContentKind;

use crate::accept::PathFilter;
use crate::input::{FilteredInput, MergeInput, RenamedInput};

/// Prefix added to directory-backed native library inputs.
pub const NATIVE_LIB_PREFIX: &str = "lib/";

/// Builds the ordered, filtered views the merger works on.
///
/// 1. Project-scoped inputs move to the front; the order within each group
///    is kept.
/// 2. For native libraries, directory-backed inputs see their paths prefixed
///    with `lib/`.
/// 3. Every input is filtered through `filter`.
pub fn plan_inputs<'a>(
    inputs: &[&'a dyn MergeInput],
    content: ContentKind,
    filter: &'a PathFilter,
) -> Vec<FilteredInput<'a>> {
    let mut ordered = inputs.to_vec();
    ordered.sort_by_key(|input| !input.scope().is_project());

    ordered
        .into_iter()
        .map(|input| {
            let view: Box<dyn MergeInput + 'a> =
                if content == ContentKind::NativeLibs && input.is_directory() {
                    Box::new(RenamedInput::new(input, NATIVE_LIB_PREFIX))
                } else {
                    Box::new(input)
                };
            FilteredInput::new(view, filter)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accept::ContentRules;
    use crate::input::MemoryInput;
    use crate::policy::PackagingPolicy;
    use recast_config::{PackagingConfig, Scope};

    fn filter(kind: ContentKind) -> PathFilter {
        PathFilter::new(
            ContentRules::new(kind).unwrap(),
            PackagingPolicy::from_config(&PackagingConfig::default()).unwrap(),
        )
    }

    #[test]
    fn project_inputs_first_stable() {
        let ext1 = MemoryInput::new("ext1", Scope::External).with_file("a", "1");
        let app = MemoryInput::new("app", Scope::Project).with_file("a", "2");
        let sub = MemoryInput::new("sub", Scope::SubProject).with_file("a", "3");
        let app2 = MemoryInput::new("app2", Scope::Project).with_file("a", "4");
        let f = filter(ContentKind::Resources);

        let planned = plan_inputs(&[&ext1, &app, &sub, &app2], ContentKind::Resources, &f);
        let names: Vec<_> = planned.iter().map(|i| i.name().to_string()).collect();
        assert_eq!(names, vec!["app", "app2", "ext1", "sub"]);
    }

    #[test]
    fn native_directories_get_lib_prefix() {
        let jni = MemoryInput::new("jni", Scope::Project)
            .with_file("x86/libfoo.so", "so")
            .as_directory();
        let aar = MemoryInput::new("aar", Scope::External).with_file("lib/x86/libbar.so", "so");
        let f = filter(ContentKind::NativeLibs);

        let planned = plan_inputs(&[&jni, &aar], ContentKind::NativeLibs, &f);
        assert_eq!(planned[0].paths(), vec!["lib/x86/libfoo.so"]);
        assert_eq!(planned[1].paths(), vec!["lib/x86/libbar.so"]);
    }

    #[test]
    fn resources_not_renamed() {
        let dir = MemoryInput::new("res", Scope::Project)
            .with_file("config.txt", "c")
            .with_file("Foo.class", "x")
            .as_directory();
        let f = filter(ContentKind::Resources);
        let planned = plan_inputs(&[&dir], ContentKind::Resources, &f);
        assert_eq!(planned[0].paths(), vec!["config.txt"]);
    }
}
