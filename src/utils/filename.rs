//! Output file naming.

use std::path::{Path, PathBuf};

/// Used when nothing of the query survives sanitizing
const EMPTY_QUERY_NAME: &str = "query";

/// Make a query safe to embed in a file name.
///
/// Hangul syllables, ASCII letters and ASCII digits are kept; every other
/// character becomes one `_`. Runs are not collapsed.
pub fn sanitize_query(query: &str) -> String {
    let sanitized: String = query
        .chars()
        .map(|c| if is_kept(c) { c } else { '_' })
        .collect();

    if sanitized.is_empty() {
        EMPTY_QUERY_NAME.to_string()
    } else {
        sanitized
    }
}

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric() || ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// `{dir}/books_{sanitized}.json` and `{dir}/books_{sanitized}.csv`
pub fn output_paths(dir: &Path, sanitized_query: &str) -> (PathBuf, PathBuf) {
    let stem = format!("books_{}", sanitized_query);
    (
        dir.join(format!("{stem}.json")),
        dir.join(format!("{stem}.csv")),
    )
}
