//! Where environment images are looked for.

use std::path::{Path, PathBuf};

/// Candidate locations for `file_name`, most specific first.
///
/// A leading `/` (as used by scene nodes) is stripped so the name is always
/// resolved relative to the search roots.
pub fn candidate_paths(file_name: &str, asset_roots: &[PathBuf]) -> Vec<PathBuf> {
    let name = file_name.trim_start_matches('/');
    let mut out: Vec<PathBuf> = Vec::new();
    let mut push = |p: PathBuf| {
        if !out.contains(&p) {
            out.push(p);
        }
    };
    push(Path::new(".").join(name));
    for root in asset_roots {
        push(root.join(name));
    }
    push(PathBuf::from(name));
    push(Path::new("..").join(name));
    push(Path::new("public").join(name));
    push(Path::new("..").join("public").join(name));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_without_roots() {
        let c = candidate_paths("dawn.hdr", &[]);
        let expected: Vec<PathBuf> = [
            "./dawn.hdr",
            "dawn.hdr",
            "../dawn.hdr",
            "public/dawn.hdr",
            "../public/dawn.hdr",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(c, expected);
    }

    #[test]
    fn roots_follow_current_dir_and_strip_slash() {
        let roots = vec![PathBuf::from("/srv/hdr"), PathBuf::from("assets")];
        let c = candidate_paths("/sky.hdr", &roots);
        assert_eq!(c[0], PathBuf::from("./sky.hdr"));
        assert_eq!(c[1], PathBuf::from("/srv/hdr/sky.hdr"));
        assert_eq!(c[2], PathBuf::from("assets/sky.hdr"));
        assert_eq!(c.len(), 7);
    }

    #[test]
    fn duplicates_removed() {
        let roots = vec![PathBuf::from("public"), PathBuf::from("public")];
        let c = candidate_paths("a.hdr", &roots);
        let publics = c.iter().filter(|p| *p == Path::new("public/a.hdr")).count();
        assert_eq!(publics, 1);
    }
}
