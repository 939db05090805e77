//! Filesystem path utilities are explicitly out of core scope (spec.md §1).
//! This trait is the narrow interface `#include` resolution and
//! `__FILENAME__` consult; `fpx::pathutil::StdPathResolver` supplies the
//! concrete implementation backed by `std::path`.

/// Pure (or I/O-pure, for `exists`/`cwd`) path helpers.
pub trait PathResolver {
    fn dirname(&self, path: &str) -> String;
    /// `keep_ext = false` strips the final extension, matching a typical
    /// `basename(path, keep_ext)` contract.
    fn basename(&self, path: &str, keep_ext: bool) -> String;
    fn join(&self, a: &str, b: &str) -> String;
    fn is_rooted(&self, path: &str) -> bool;
    fn cwd(&self) -> String;
    fn exists(&self, path: &str) -> bool;
}

/// Which delimiter an `#include` target used, since the two forms search
/// different paths (§4.6, Testable Property #13): `"f"` checks the
/// including file's directory first, `<f>` never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Quoted,
    Angle,
}

/// Resolves an `#include` target per §4.6: rooted paths are used as-is;
/// a quoted target then tries the including file's directory; both forms
/// then try each configured include directory in order, then the current
/// working directory.
pub fn resolve_include(
    resolver: &dyn PathResolver,
    target: &str,
    kind: IncludeKind,
    current_file_dir: &str,
    include_dirs: &[String],
) -> Option<String> {
    if resolver.is_rooted(target) {
        return resolver.exists(target).then(|| target.to_string());
    }

    if kind == IncludeKind::Quoted {
        let in_current_dir = resolver.join(current_file_dir, target);
        if resolver.exists(&in_current_dir) {
            return Some(in_current_dir);
        }
    }

    for dir in include_dirs {
        let candidate = resolver.join(dir, target);
        if resolver.exists(&candidate) {
            return Some(candidate);
        }
    }

    let in_cwd = resolver.join(&resolver.cwd(), target);
    if resolver.exists(&in_cwd) {
        return Some(in_cwd);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    struct FakeResolver {
        existing: HashSet<String>,
        cwd: String,
    }

    impl PathResolver for FakeResolver {
        fn dirname(&self, path: &str) -> String {
            match path.rfind('/') {
                Some(i) => path[..i].to_string(),
                None => String::new(),
            }
        }
        fn basename(&self, path: &str, keep_ext: bool) -> String {
            let base = path.rsplit('/').next().unwrap_or(path);
            if keep_ext {
                base.to_string()
            } else {
                match base.rfind('.') {
                    Some(i) => base[..i].to_string(),
                    None => base.to_string(),
                }
            }
        }
        fn join(&self, a: &str, b: &str) -> String {
            if a.is_empty() {
                b.to_string()
            } else {
                format!("{}/{}", a.trim_end_matches('/'), b)
            }
        }
        fn is_rooted(&self, path: &str) -> bool {
            path.starts_with('/')
        }
        fn cwd(&self) -> String {
            self.cwd.clone()
        }
        fn exists(&self, path: &str) -> bool {
            self.existing.contains(path)
        }
    }

    #[test]
    fn finds_relative_to_current_file_first() {
        let r = FakeResolver {
            existing: ["src/foo.inc".to_string(), "inc/foo.inc".to_string()].into_iter().collect(),
            cwd: "/work".to_string(),
        };
        let found = resolve_include(&r, "foo.inc", IncludeKind::Quoted, "src", &["inc".to_string()]);
        assert_eq!(found, Some("src/foo.inc".to_string()));
    }

    #[test]
    fn falls_back_to_include_dirs_then_cwd() {
        let r = RefCell::new(FakeResolver {
            existing: ["inc/foo.inc".to_string()].into_iter().collect(),
            cwd: "/work".to_string(),
        });
        let r = r.into_inner();
        let found = resolve_include(&r, "foo.inc", IncludeKind::Quoted, "src", &["inc".to_string()]);
        assert_eq!(found, Some("inc/foo.inc".to_string()));
    }

    #[test]
    fn rooted_path_is_used_as_is() {
        let r = FakeResolver {
            existing: ["/abs/foo.inc".to_string()].into_iter().collect(),
            cwd: "/work".to_string(),
        };
        let found = resolve_include(&r, "/abs/foo.inc", IncludeKind::Quoted, "src", &[]);
        assert_eq!(found, Some("/abs/foo.inc".to_string()));
    }

    #[test]
    fn missing_file_resolves_to_none() {
        let r = FakeResolver { existing: HashSet::new(), cwd: "/work".to_string() };
        assert_eq!(resolve_include(&r, "missing.inc", IncludeKind::Quoted, "src", &[]), None);
    }

    #[test]
    fn angle_include_skips_current_file_directory() {
        // Same-named file exists in both the including file's directory and
        // an `-I` directory: `<f>` must pick the `-I` copy, never the
        // current-directory one.
        let r = FakeResolver {
            existing: ["src/foo.inc".to_string(), "inc/foo.inc".to_string()].into_iter().collect(),
            cwd: "/work".to_string(),
        };
        let found = resolve_include(&r, "foo.inc", IncludeKind::Angle, "src", &["inc".to_string()]);
        assert_eq!(found, Some("inc/foo.inc".to_string()));
    }

    #[test]
    fn angle_include_with_no_directory_copy_still_falls_back_to_cwd() {
        let r = FakeResolver {
            existing: ["/work/foo.inc".to_string()].into_iter().collect(),
            cwd: "/work".to_string(),
        };
        let found = resolve_include(&r, "foo.inc", IncludeKind::Angle, "src", &[]);
        assert_eq!(found, Some("/work/foo.inc".to_string()));
    }
}
