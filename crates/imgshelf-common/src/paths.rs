//! Filename rules: sanitizing client-supplied names, checking extensions
//! against an allow-list, and mapping extensions to MIME types.
//!
//! Everything in this module is pure string manipulation. Nothing touches the
//! filesystem, so the same rules apply whether a name arrives over HTTP or
//! from the command line.

/// Extensions accepted when no allow-list is configured.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// MIME type reported when an extension has no known mapping.
pub const UNKNOWN_MIME: &str = "image/unknown";

/// Longest name (in bytes) the sanitizer will produce.
///
/// Kept well under the common 255-byte filesystem limit so conflict suffixes
/// such as `_12` always fit.
pub const MAX_FILENAME_LEN: usize = 200;

/// Stem substituted when every character of the original stem was stripped
/// but the extension survived.
const FALLBACK_STEM: &str = "image";

const MAX_EXTENSION_LEN: usize = 16;

const MIME_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("avif", "image/avif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
];

/// Turn an arbitrary client-supplied filename into a safe base name.
///
/// Path separators (`/` and `\`) split the input into components; empty,
/// `.` and `..` components are dropped and the rest are joined with `_`.
/// Whitespace runs become a single `_`, runs of dots a single `.`, and
/// anything other than ASCII alphanumerics, `_`, `-` and `.` is removed.
/// Leading and trailing dots and underscores are trimmed, so the result is
/// never a hidden file.
///
/// Returns an empty string when nothing usable remains.
///
/// # Examples
///
/// ```
/// use imgshelf_common::paths::sanitize_filename;
///
/// assert_eq!(sanitize_filename("My Photo.PNG"), "My_Photo.PNG");
/// assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
/// assert_eq!(sanitize_filename("日本.png"), "image.png");
/// assert_eq!(sanitize_filename("../.."), "");
/// ```
pub fn sanitize_filename(raw: &str) -> String {
    let joined = raw
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect::<Vec<_>>()
        .join("_");

    let Some((raw_stem, raw_ext)) = joined.rsplit_once('.') else {
        return truncate(trim_edges(&clean(&joined)), MAX_FILENAME_LEN).to_string();
    };

    let ext: String = raw_ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_EXTENSION_LEN)
        .collect();
    if ext.is_empty() {
        return truncate(trim_edges(&clean(&joined)), MAX_FILENAME_LEN).to_string();
    }

    let cleaned_stem = clean(raw_stem);
    let stem = trim_edges(&cleaned_stem);
    let stem = if !stem.is_empty() {
        stem
    } else if raw_stem
        .chars()
        .all(|c| c == '.' || c == '_' || c.is_whitespace())
    {
        // Nothing was there to begin with (".png", "..gif"): keep the bare extension
        // the way a dotfile loses its leading dot.
        return ext;
    } else {
        FALLBACK_STEM
    };

    let stem = truncate(stem, MAX_FILENAME_LEN - ext.len() - 1);
    format!("{stem}.{ext}")
}

/// Split a name at its last `.` into stem and extension.
///
/// ```
/// use imgshelf_common::paths::split_extension;
///
/// assert_eq!(split_extension("photo.png"), ("photo", Some("png")));
/// assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", Some("gz")));
/// assert_eq!(split_extension("README"), ("README", None));
/// ```
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    }
}

/// Look up the MIME type for a filename by its extension.
///
/// ```
/// use imgshelf_common::paths::mime_for_name;
///
/// assert_eq!(mime_for_name("cat.JPG"), Some("image/jpeg"));
/// assert_eq!(mime_for_name("notes.txt"), None);
/// ```
pub fn mime_for_name(name: &str) -> Option<&'static str> {
    let (_, ext) = split_extension(name);
    let ext = ext?.to_lowercase();
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Set of permitted file extensions, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    extensions: Vec<String>,
}

impl AllowList {
    /// Build an allow-list. Entries are lower-cased and a leading `.` is
    /// stripped, so `".PNG"` and `"png"` are equivalent.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extensions: Vec<String> = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| !ext.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();
        Self { extensions }
    }

    /// True iff `name` contains a `.` and the text after the last `.`,
    /// lower-cased, is in the list.
    ///
    /// ```
    /// use imgshelf_common::paths::AllowList;
    ///
    /// let allow = AllowList::default();
    /// assert!(allow.is_allowed("holiday.JPEG"));
    /// assert!(!allow.is_allowed("virus.exe"));
    /// assert!(!allow.is_allowed("png"));
    /// ```
    pub fn is_allowed(&self, name: &str) -> bool {
        match split_extension(name) {
            (_, Some(ext)) => {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            }
            (_, None) => false,
        }
    }

    /// The normalized extensions, sorted.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_EXTENSIONS)
    }
}

/// Lower-case an extension and strip a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Keep filename-safe ASCII characters; collapse whitespace runs into `_`
/// and dot runs into a single `.`.
fn clean(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for c in input.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
            if pending_space && !out.is_empty() {
                out.push('_');
            }
            pending_space = false;
            if c == '.' && out.ends_with('.') {
                continue;
            }
            out.push(c);
        }
    }
    out
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c| c == '.' || c == '_')
}

/// Truncate an ASCII string to at most `max` bytes.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        s[..max].trim_end_matches(['.', '_'])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_safe_names() {
        assert_eq!(sanitize_filename("photo.png"), "photo.png");
        assert_eq!(sanitize_filename("file-name_123.jpg"), "file-name_123.jpg");
        assert_eq!(sanitize_filename("archive.tar.gz"), "archive.tar.gz");
    }

    #[test]
    fn test_sanitize_strips_traversal() {
        assert_eq!(sanitize_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename("/abs/path/cat.gif"), "abs_path_cat.gif");
        assert_eq!(sanitize_filename("./cat.gif"), "cat.gif");
    }

    #[test]
    fn test_sanitize_whitespace_and_symbols() {
        assert_eq!(sanitize_filename("my  summer\tphoto.jpg"), "my_summer_photo.jpg");
        assert_eq!(sanitize_filename("test<script>.png"), "testscript.png");
        assert_eq!(sanitize_filename("  padded.png  "), "padded.png");
        assert_eq!(sanitize_filename("nul\0byte.png"), "nulbyte.png");
    }

    #[test]
    fn test_sanitize_no_hidden_files() {
        assert_eq!(sanitize_filename(".htaccess"), "htaccess");
        assert_eq!(sanitize_filename("..png"), "png");
        assert_eq!(sanitize_filename("_under_.png"), "under.png");
    }

    #[test]
    fn test_sanitize_collapses_dot_runs() {
        assert_eq!(sanitize_filename("a..b.png"), "a.b.png");
        assert_eq!(sanitize_filename("x...y..png"), "x.y.png");
        assert_eq!(sanitize_filename("archive.tar.gz"), "archive.tar.gz");
    }

    #[test]
    fn test_sanitize_preserves_extension_when_stem_is_lost() {
        assert_eq!(sanitize_filename("日本.png"), "image.png");
        assert_eq!(sanitize_filename("<<>>.webp"), "image.webp");
    }

    #[test]
    fn test_sanitize_empty_results() {
        assert_eq!(sanitize_filename(""), "");
        assert_eq!(sanitize_filename("../.."), "");
        assert_eq!(sanitize_filename("///"), "");
        assert_eq!(sanitize_filename("日本語"), "");
        assert_eq!(sanitize_filename("..."), "");
    }

    #[test]
    fn test_sanitize_truncates_long_names() {
        let long_name = "a".repeat(300) + ".png";
        let result = sanitize_filename(&long_name);
        assert!(result.len() <= MAX_FILENAME_LEN);
        assert!(result.ends_with(".png"));
    }

    #[test]
    fn test_sanitize_is_deterministic() {
        let raw = "../weird name (1).JPG";
        assert_eq!(sanitize_filename(raw), sanitize_filename(raw));
        assert_eq!(sanitize_filename(raw), "weird_name_1.JPG");
    }

    #[test]
    fn test_sanitize_output_never_contains_separators() {
        let inputs = [
            "a/b/c.png",
            "..\\..\\x.png",
            "....//....//y.png",
            "/",
            "\\\\server\\share\\z.gif",
            "a..b.png",
            "x...y..png",
            "dots .. inside.gif",
        ];
        for raw in inputs {
            let safe = sanitize_filename(raw);
            assert!(!safe.contains('/'), "{raw:?} -> {safe:?}");
            assert!(!safe.contains('\\'), "{raw:?} -> {safe:?}");
            assert!(!safe.contains(".."), "{raw:?} -> {safe:?}");
            assert!(!safe.starts_with('.'), "{raw:?} -> {safe:?}");
        }
    }

    #[test]
    fn test_allow_list_default() {
        let allow = AllowList::default();
        for name in ["a.png", "a.jpg", "a.jpeg", "a.gif", "a.webp", "A.PNG", "b.JpEg"] {
            assert!(allow.is_allowed(name), "{name} should be allowed");
        }
        for name in ["a.exe", "a.bmp", "png", "a.png.exe", "a.", ""] {
            assert!(!allow.is_allowed(name), "{name} should be rejected");
        }
    }

    #[test]
    fn test_allow_list_normalizes_entries() {
        let allow = AllowList::new([".PNG", "tiff", "png", " "]);
        assert_eq!(allow.extensions(), &["png".to_string(), "tiff".to_string()]);
        assert!(allow.is_allowed("scan.TIFF"));
        assert!(!allow.is_allowed("scan.jpg"));
    }

    #[test]
    fn test_mime_for_name() {
        assert_eq!(mime_for_name("a.png"), Some("image/png"));
        assert_eq!(mime_for_name("a.jpeg"), Some("image/jpeg"));
        assert_eq!(mime_for_name("a.GIF"), Some("image/gif"));
        assert_eq!(mime_for_name("a.webp"), Some("image/webp"));
        assert_eq!(mime_for_name("a.xyz"), None);
        assert_eq!(mime_for_name("noext"), None);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.b.c"), ("a.b", Some("c")));
        assert_eq!(split_extension("plain"), ("plain", None));
        assert_eq!(split_extension("trailing."), ("trailing", Some("")));
    }
}
