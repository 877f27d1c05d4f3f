//! Conflict resolution for stored filenames.

use std::collections::HashSet;

use imgshelf_common::paths::split_extension;

/// Pick a name for `base_name` that is not already taken.
///
/// Returns `base_name` unchanged when it is free. Otherwise a counter is
/// appended to the stem (`photo.png` becomes `photo_1.png`, then
/// `photo_2.png`, ...) and the first free candidate wins. Names without an
/// extension get a bare `_N` suffix.
///
/// Names are compared case-insensitively, so `Photo.png` counts as taken
/// when `photo.png` exists. On a case-insensitive filesystem both would
/// open the same file.
///
/// The result is only unique with respect to the `existing` snapshot; the
/// store still publishes with a no-clobber link and retries on collision.
pub fn resolve_conflict(base_name: &str, existing: &HashSet<String>) -> String {
    let taken: HashSet<String> = existing.iter().map(|name| name.to_lowercase()).collect();
    let is_free = |name: &str| !taken.contains(&name.to_lowercase());

    if is_free(base_name) {
        return base_name.to_string();
    }

    let (stem, ext) = split_extension(base_name);
    (1u64..)
        .map(|n| match ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        })
        .find(|candidate| is_free(candidate))
        .unwrap_or_else(|| base_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_free_name_is_unchanged() {
        assert_eq!(resolve_conflict("photo.png", &taken(&[])), "photo.png");
        assert_eq!(
            resolve_conflict("photo.png", &taken(&["other.png"])),
            "photo.png"
        );
    }

    #[test]
    fn test_first_conflict_gets_suffix_one() {
        assert_eq!(
            resolve_conflict("photo.png", &taken(&["photo.png"])),
            "photo_1.png"
        );
    }

    #[test]
    fn test_skips_taken_suffixes() {
        let existing = taken(&["photo.png", "photo_1.png", "photo_2.png"]);
        assert_eq!(resolve_conflict("photo.png", &existing), "photo_3.png");
    }

    #[test]
    fn test_fills_gaps() {
        let existing = taken(&["photo.png", "photo_2.png"]);
        assert_eq!(resolve_conflict("photo.png", &existing), "photo_1.png");
    }

    #[test]
    fn test_suffix_goes_before_last_extension() {
        let existing = taken(&["archive.tar.gz"]);
        assert_eq!(resolve_conflict("archive.tar.gz", &existing), "archive.tar_1.gz");
    }

    #[test]
    fn test_name_without_extension() {
        let existing = taken(&["README", "README_1"]);
        assert_eq!(resolve_conflict("README", &existing), "README_2");
    }

    #[test]
    fn test_case_differences_still_conflict() {
        let existing = taken(&["photo.png", "PHOTO_1.PNG"]);
        assert_eq!(resolve_conflict("Photo.png", &existing), "Photo_2.png");
        assert_eq!(resolve_conflict("photo.PNG", &taken(&["other.png"])), "photo.PNG");
    }

    #[test]
    fn test_deterministic_for_snapshot() {
        let existing = taken(&["a.jpg", "a_1.jpg"]);
        let first = resolve_conflict("a.jpg", &existing);
        let second = resolve_conflict("a.jpg", &existing);
        assert_eq!(first, second);
        assert!(!existing.contains(&first));
    }
}
