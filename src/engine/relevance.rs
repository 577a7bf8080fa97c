//! Path relevance checks between change notifications and export roots.
//!
//! All comparisons happen on normalized, project-relative, lowercased
//! strings. Anything that cannot be normalized is "not relevant".

/// Decides whether changed paths fall under a profile's export roots.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    /// Normalized, lowercased project root with one trailing separator.
    project_root: Option<String>,
}

impl PathMatcher {
    /// Matcher without a project root. Absolute paths are never relevant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher that converts absolute paths under `root` to project-relative.
    ///
    /// A relative or empty `root` is ignored with a warning, which leaves
    /// every absolute path irrelevant.
    pub fn with_project_root(root: impl AsRef<str>) -> Self {
        let root = root.as_ref();
        let project_root = match clean_separators(root) {
            Some(cleaned) if is_absolute(&cleaned) => {
                let mut lowered = cleaned.to_lowercase();
                // A filesystem root already ends with its separator
                if !lowered.ends_with('/') {
                    lowered.push('/');
                }
                Some(lowered)
            }
            _ => {
                tracing::warn!("[matcher] ignoring project root {root:?}: not an absolute path");
                None
            }
        };

        Self { project_root }
    }

    /// Whether at least one changed path is under at least one root.
    pub fn is_relevant<R, P>(&self, roots: &[R], changed: &[P]) -> bool
    where
        R: AsRef<str>,
        P: AsRef<str>,
    {
        let roots: Vec<String> = roots
            .iter()
            .filter_map(|root| self.normalize(root.as_ref()))
            .collect();
        if roots.is_empty() {
            return false;
        }

        changed
            .iter()
            .filter_map(|path| self.normalize(path.as_ref()))
            .any(|path| roots.iter().any(|root| path_under_root(&path, root)))
    }

    /// Normalize a path to lowercase project-relative form without a
    /// trailing separator. Returns `None` for empty paths and absolute paths
    /// outside the project root.
    pub fn normalize(&self, path: &str) -> Option<String> {
        let cleaned = clean_separators(path)?;
        let lowered = cleaned.to_lowercase();

        let relative = if is_absolute(&cleaned) {
            let root = self.project_root.as_deref()?;
            lowered.strip_prefix(root)?.to_string()
        } else {
            lowered
        };

        let relative = strip_current_dir(&relative);
        if relative.is_empty() {
            None
        } else {
            Some(relative.to_string())
        }
    }
}

/// `path` equals `root` or has `root/` as a prefix. Both already normalized.
fn path_under_root(path: &str, root: &str) -> bool {
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Unify separators, collapse repeats and strip the trailing separator.
///
/// A lone `/` is kept so that the filesystem root stays absolute.
fn clean_separators(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut last_was_sep = false;
    for ch in trimmed.chars() {
        let is_sep = ch == '/' || ch == '\\';
        if is_sep {
            if !last_was_sep {
                out.push('/');
            }
        } else {
            out.push(ch);
        }
        last_was_sep = is_sep;
    }

    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }

    Some(out)
}

fn strip_current_dir(path: &str) -> &str {
    let mut rest = path;
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    if rest == "." { "" } else { rest }
}

/// Unix root or a Windows drive prefix (`C:`).
fn is_absolute(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_equal_to_root_is_relevant() {
        let matcher = PathMatcher::new();
        assert!(matcher.is_relevant(&["Assets/Foo"], &["Assets/Foo"]));
        assert!(matcher.is_relevant(&["Assets/Foo/"], &["Assets/Foo"]));
    }

    #[test]
    fn test_path_under_root_is_relevant() {
        let matcher = PathMatcher::new();
        assert!(matcher.is_relevant(&["Assets/Foo"], &["Assets/Foo/bar.png"]));
        assert!(matcher.is_relevant(&["Assets/Foo"], &["Assets/Foo/Deep/x/y.mat"]));
    }

    #[test]
    fn test_sibling_with_shared_prefix_is_not_relevant() {
        let matcher = PathMatcher::new();
        assert!(!matcher.is_relevant(&["Assets/Foo"], &["Assets/FooBar/baz.png"]));
        assert!(!matcher.is_relevant(&["Assets/Foo"], &["Assets/Fo"]));
    }

    #[test]
    fn test_case_and_separator_insensitive() {
        let matcher = PathMatcher::new();
        assert!(matcher.is_relevant(&["assets\\foo\\"], &["ASSETS/Foo//Bar.png"]));
        assert!(matcher.is_relevant(&["Assets/Foo"], &["assets\\foo\\bar.png"]));
    }

    #[test]
    fn test_absolute_paths_resolved_against_project_root() {
        let matcher = PathMatcher::with_project_root("C:\\Work\\Game\\");
        assert!(matcher.is_relevant(&["Assets/Foo"], &["c:/work/game/Assets/Foo/a.png"]));
        assert!(!matcher.is_relevant(&["Assets/Foo"], &["D:/Other/Assets/Foo/a.png"]));
    }

    #[test]
    fn test_absolute_root_declaration() {
        let matcher = PathMatcher::with_project_root("/work/game");
        assert!(matcher.is_relevant(&["/work/game/Assets/Foo"], &["Assets/Foo/a.png"]));
        assert!(!matcher.is_relevant(&["/elsewhere/Assets/Foo"], &["Assets/Foo/a.png"]));
    }

    #[test]
    fn test_filesystem_root_as_project_root() {
        let matcher = PathMatcher::with_project_root("/");
        assert_eq!(matcher.normalize("/Assets/Foo/a.png"), Some("assets/foo/a.png".to_string()));
        assert!(matcher.is_relevant(&["Assets/Foo"], &["/Assets/Foo/a.png"]));

        let matcher = PathMatcher::with_project_root("C:\\");
        assert!(matcher.is_relevant(&["Assets/Foo"], &["c:\\Assets\\Foo\\a.png"]));
    }

    #[test]
    fn test_relative_project_root_is_ignored() {
        let matcher = PathMatcher::with_project_root("work/game");
        assert!(!matcher.is_relevant(&["Assets/Foo"], &["/work/game/Assets/Foo/a.png"]));
        // Relative changes still match
        assert!(matcher.is_relevant(&["Assets/Foo"], &["Assets/Foo/a.png"]));
    }

    #[test]
    fn test_absolute_path_without_project_root_is_not_relevant() {
        let matcher = PathMatcher::new();
        assert!(!matcher.is_relevant(&["Assets/Foo"], &["/work/game/Assets/Foo/a.png"]));
    }

    #[test]
    fn test_project_root_itself_is_not_relevant() {
        let matcher = PathMatcher::with_project_root("/work/game");
        assert_eq!(matcher.normalize("/work/game"), None);
        assert_eq!(matcher.normalize("/work/game/"), None);
    }

    #[test]
    fn test_malformed_and_empty_inputs() {
        let matcher = PathMatcher::new();
        let no_roots: [&str; 0] = [];
        let no_changes: [&str; 0] = [];

        assert!(!matcher.is_relevant(&no_roots, &["Assets/Foo/a.png"]));
        assert!(!matcher.is_relevant(&["Assets/Foo"], &no_changes));
        assert!(!matcher.is_relevant(&["", "   "], &["Assets/Foo/a.png"]));
        assert!(!matcher.is_relevant(&["Assets/Foo"], &["", "\\", "./"]));
    }

    #[test]
    fn test_any_path_in_batch_suffices() {
        let matcher = PathMatcher::new();
        let batch = ["Packages/x.json", "Assets/Other/y.png", "Assets/Foo/z.png"];
        assert!(matcher.is_relevant(&["Assets/Foo"], &batch));
        assert!(!matcher.is_relevant(&["Assets/Bar"], &batch));
    }

    #[test]
    fn test_normalize() {
        let matcher = PathMatcher::new();
        assert_eq!(matcher.normalize("./Assets\\Foo\\"), Some("assets/foo".to_string()));
        assert_eq!(matcher.normalize("  "), None);
    }
}
