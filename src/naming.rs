//! Centralized filename rules.
//!
//! Image filenames are the key everything else hangs off: the thumbnail blob
//! name is derived from them, metadata rows point at them, and a transform that
//! re-encodes an image rewrites them. All of those conventions live here.
//!
//! ## Conventions
//!
//! - Thumbnail of `photo.jpg` is stored as `photo.jpg.png`.
//! - Re-encoding replaces everything from the *first* dot: `a.tar.gif` → `a.jpg`.
//! - Natural order compares digit runs by value: `img2` < `img10`.

use std::cmp::Ordering;

const THUMBNAIL_SUFFIX: &str = ".png";

/// Thumbnail blob name for an image filename.
pub fn thumbnail_name(filename: &str) -> String {
    format!("{filename}{THUMBNAIL_SUFFIX}")
}

/// Image filename a thumbnail blob belongs to, or `None` if `thumbnail` does
/// not follow the convention.
pub fn image_name_for_thumbnail(thumbnail: &str) -> Option<&str> {
    thumbnail
        .strip_suffix(THUMBNAIL_SUFFIX)
        .filter(|name| !name.is_empty())
}

/// Replace everything from the first `.` with `.ext`.
///
/// A name with no dot, or whose only dot is the last character, is returned
/// unchanged.
///
/// ```
/// # use shoebox::naming::rewrite_extension;
/// assert_eq!(rewrite_extension("holiday.gif", "jpg"), "holiday.jpg");
/// assert_eq!(rewrite_extension("v1.2.final.png", "jpg"), "v1.jpg");
/// assert_eq!(rewrite_extension("README", "png"), "README");
/// ```
pub fn rewrite_extension(filename: &str, ext: &str) -> String {
    match filename.find('.') {
        Some(pos) if pos + 1 < filename.len() => format!("{}.{ext}", &filename[..pos]),
        _ => filename.to_string(),
    }
}

/// Shorten a caption to `limit` characters followed by `...`.
///
/// Text at or under the limit is returned as is.
pub fn truncate_label(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}

/// Compare two strings in "natural" order.
///
/// Runs of ASCII digits compare by numeric value (leading zeros ignored, a
/// longer run of zeros breaking ties); everything else compares byte by byte.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let run_a = digit_run(&a[i..]);
            let run_b = digit_run(&b[j..]);
            let ord = compare_numeric(&a[i..i + run_a], &b[j..j + run_b]);
            if ord != Ordering::Equal {
                return ord;
            }
            i += run_a;
            j += run_b;
        } else {
            match a[i].cmp(&b[j]) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                ord => return ord,
            }
        }
    }

    (a.len() - i).cmp(&(b.len() - j))
}

fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let trim = |s: &[u8]| -> usize { s.iter().take_while(|&&c| c == b'0').count() };
    let (za, zb) = (trim(a), trim(b));
    let (sig_a, sig_b) = (&a[za..], &b[zb..]);

    sig_a
        .len()
        .cmp(&sig_b.len())
        .then_with(|| sig_a.cmp(sig_b))
        .then_with(|| zb.cmp(&za))
}
