//! Concrete [`fpx_core::paths::PathResolver`] backed by `std::path`.

use std::path::Path;

use fpx_core::paths::PathResolver;

pub struct StdPathResolver;

impl PathResolver for StdPathResolver {
    fn dirname(&self, path: &str) -> String {
        Path::new(path)
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    fn basename(&self, path: &str, keep_ext: bool) -> String {
        let p = Path::new(path);
        if keep_ext {
            p.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
        } else {
            p.file_stem().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
        }
    }

    fn join(&self, a: &str, b: &str) -> String {
        if a.is_empty() {
            return b.to_string();
        }
        Path::new(a).join(b).to_string_lossy().to_string()
    }

    fn is_rooted(&self, path: &str) -> bool {
        Path::new(path).is_absolute()
    }

    fn cwd(&self) -> String {
        std::env::current_dir()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirname_and_basename() {
        let r = StdPathResolver;
        assert_eq!(r.dirname("a/b/c.f"), "a/b");
        assert_eq!(r.basename("a/b/c.f", false), "c");
        assert_eq!(r.basename("a/b/c.f", true), "c.f");
    }

    #[test]
    fn join_matches_os_separator() {
        let r = StdPathResolver;
        let joined = r.join("a", "b.f");
        assert_eq!(joined, Path::new("a").join("b.f").to_string_lossy().to_string());
    }

    #[test]
    fn root_detection() {
        let r = StdPathResolver;
        assert!(!r.is_rooted("relative/path"));
    }
}
