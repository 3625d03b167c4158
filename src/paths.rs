//! Path arithmetic for the `/`-separated namespace.
//!
//! Structure is never stored explicitly: parent/child relationships are
//! derived from path strings. Every prefix-membership test in the crate goes
//! through [`is_ancestor`] so that `/test2` is never mistaken for an ancestor
//! of `/test23`.

/// Path separator
pub const SEPARATOR: char = '/';

/// Path of the synthetic root
pub const ROOT: &str = "/";

/// Check if `candidate` is a proper ancestor of `path`.
///
/// The root is an ancestor of every other path. A path is never its own
/// ancestor.
pub fn is_ancestor(candidate: &str, path: &str) -> bool {
    if candidate == ROOT {
        return path != ROOT && path.starts_with(SEPARATOR);
    }

    path.len() > candidate.len()
        && path.starts_with(candidate)
        && path.as_bytes()[candidate.len()] == b'/'
}

/// Check if `path` is `candidate` itself or lies inside it
pub fn is_self_or_ancestor(candidate: &str, path: &str) -> bool {
    candidate == path || is_ancestor(candidate, path)
}

/// Parent of a path, with the root represented as `/`
pub fn parent_path(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(0) | None => ROOT,
        Some(idx) => &path[..idx],
    }
}

/// Last segment of a path
pub fn base_name(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Number of non-empty segments
pub fn depth(path: &str) -> usize {
    segments(path).count()
}

/// Non-empty segments of a path, root first
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}

/// Join a parent path and a child name without doubling the separator at root
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT || parent.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent.trim_end_matches(SEPARATOR), name)
    }
}

/// Substitute `old_prefix` with `new_prefix` if `path` is `old_prefix` or a
/// descendant of it. Returns `None` for unrelated paths.
pub fn replace_prefix(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if path == old_prefix {
        Some(new_prefix.to_string())
    } else if is_ancestor(old_prefix, path) {
        Some(format!("{}{}", new_prefix, &path[old_prefix.len()..]))
    } else {
        None
    }
}

/// Check whether a path is absolute, has no trailing separator and no empty
/// segments.
pub fn is_well_formed(path: &str) -> bool {
    path.len() > 1
        && path.starts_with(SEPARATOR)
        && !path.ends_with(SEPARATOR)
        && !path[1..].split(SEPARATOR).any(str::is_empty)
}

/// A name usable as a single path segment
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(SEPARATOR) && name != "." && name != ".."
}
