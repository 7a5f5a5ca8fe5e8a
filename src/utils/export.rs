//! JSON and CSV export of a deduplicated result set.
//!
//! Both files are rendered in memory, written to a temporary file in the
//! destination directory and renamed into place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::models::{scalar_text, Book};
use crate::utils::dedup::{canonical_isbn, ResultSet};
use crate::utils::filename::output_paths;

/// CSV header, in output order
pub const CSV_COLUMNS: [&str; 11] = [
    "title",
    "authors",
    "publisher",
    "isbn",
    "datetime",
    "price",
    "sale_price",
    "url",
    "thumbnail",
    "status",
    "contents",
];

/// Paths of the files produced by [`write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            ExportError::Io(err.into())
        } else {
            ExportError::Serialization(err.to_string())
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => ExportError::Io(io),
            _ => ExportError::Serialization(message),
        }
    }
}

/// Pretty-printed JSON array of the records, non-ASCII kept literal
pub fn render_json<'a, I>(books: I) -> Result<Vec<u8>, ExportError>
where
    I: IntoIterator<Item = &'a Book>,
{
    let books: Vec<&Book> = books.into_iter().collect();
    let mut out = serde_json::to_vec_pretty(&books)?;
    out.push(b'\n');
    Ok(out)
}

/// Scalar text of a field, empty for anything else
fn cell(book: &Book, key: &str) -> String {
    book.get(key)
        .and_then(scalar_text)
        .map(|text| text.into_owned())
        .unwrap_or_default()
}

/// One CSV row in [`CSV_COLUMNS`] order
pub fn csv_row(book: &Book) -> [String; 11] {
    [
        cell(book, "title"),
        book.authors_joined(),
        cell(book, "publisher"),
        canonical_isbn(&book.isbn()).unwrap_or_default().to_string(),
        cell(book, "datetime"),
        cell(book, "price"),
        cell(book, "sale_price"),
        cell(book, "url"),
        cell(book, "thumbnail"),
        cell(book, "status"),
        cell(book, "contents"),
    ]
}

/// CSV document with the fixed header and one row per record
pub fn render_csv<'a, I>(books: I) -> Result<Vec<u8>, ExportError>
where
    I: IntoIterator<Item = &'a Book>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(CSV_COLUMNS)?;
    for book in books {
        writer.write_record(csv_row(book))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// Write `results` as `books_{sanitized_query}.json` and `.csv` under
/// `destination_dir`, creating the directory if needed.
///
/// Both documents are rendered and staged in temp files before either is
/// renamed into place. The two files appear together or not at all.
pub fn write(
    results: &ResultSet,
    destination_dir: &Path,
    sanitized_query: &str,
) -> Result<WrittenFiles, ExportError> {
    let json = render_json(results.books())?;
    let csv = render_csv(results.books())?;

    fs::create_dir_all(destination_dir)?;
    let (json_path, csv_path) = output_paths(destination_dir, sanitized_query);

    let json_tmp = stage(destination_dir, &json)?;
    let csv_tmp = stage(destination_dir, &csv)?;

    json_tmp
        .persist(&json_path)
        .map_err(|e| ExportError::Io(e.error))?;
    if let Err(e) = csv_tmp.persist(&csv_path) {
        if let Err(cleanup) = fs::remove_file(&json_path) {
            tracing::warn!(path = %json_path.display(), error = %cleanup, "could not remove JSON output");
        }
        return Err(ExportError::Io(e.error));
    }

    tracing::info!(path = %json_path.display(), records = results.len(), "wrote JSON");
    tracing::info!(path = %csv_path.display(), records = results.len(), "wrote CSV");

    Ok(WrittenFiles {
        json_path,
        csv_path,
    })
}

/// Write `content` to a synced temp file in `dir`.
fn stage(dir: &Path, content: &[u8]) -> Result<NamedTempFile, ExportError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookBuilder;
    use crate::utils::dedupe;

    #[test]
    fn test_csv_header_for_empty_set() {
        let csv = render_csv(std::iter::empty()).unwrap();
        assert_eq!(
            String::from_utf8(csv).unwrap(),
            "title,authors,publisher,isbn,datetime,price,sale_price,url,thumbnail,status,contents\r\n"
        );
    }

    #[test]
    fn test_csv_row_normalizes_fields() {
        let book = BookBuilder::new("T")
            .authors(["A", "B"])
            .isbn(" 8966263151 9788966263158")
            .price(1000)
            .build();

        let row = csv_row(&book);
        assert_eq!(row[0], "T");
        assert_eq!(row[1], "A, B");
        assert_eq!(row[3], "8966263151");
        assert_eq!(row[5], "1000");
        assert_eq!(row[6], "");
        assert_eq!(row[10], "");
    }

    #[test]
    fn test_csv_quotes_embedded_delimiters() {
        let book = BookBuilder::new("Hello, \"World\"").authors(["A", "B"]).build();
        let csv = String::from_utf8(render_csv([&book]).unwrap()).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("\"Hello, \"\"World\"\"\",\"A, B\","));
    }

    #[test]
    fn test_csv_renders_scalars_and_blanks_the_rest() {
        let book: Book = serde_json::from_str(
            r#"{"title": "T", "price": "12000", "sale_price": 12000.5,
                "authors": ["a", null, "b"], "status": null, "url": ["x"]}"#,
        )
        .unwrap();

        let row = csv_row(&book);
        assert_eq!(row[1], "a, b");
        assert_eq!(row[5], "12000");
        assert_eq!(row[6], "12000.5");
        assert_eq!(row[7], "");
        assert_eq!(row[9], "");
    }

    #[test]
    fn test_json_reproduces_records_as_received() {
        let raw = r#"{"title":"a","price":null,"sale_price":-1,"translators":["z"],"zeta":1,"alpha":2}"#;
        let book: Book = serde_json::from_str(raw).unwrap();
        let json = String::from_utf8(render_json([&book]).unwrap()).unwrap();

        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        let object = parsed[0].as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["title", "price", "sale_price", "translators", "zeta", "alpha"]);
        assert_eq!(object["price"], serde_json::Value::Null);
        assert!(!object.contains_key("contents"));
        assert!(!object.contains_key("authors"));
    }

    #[test]
    fn test_json_keeps_non_ascii_literal() {
        let book = BookBuilder::new("파이썬")
            .extra("translators", serde_json::json!(["홍길동"]))
            .build();
        let json = String::from_utf8(render_json([&book]).unwrap()).unwrap();

        assert!(json.contains("\"title\": \"파이썬\""));
        assert!(json.contains("홍길동"));
        assert!(!json.contains("\\u"));
        assert!(json.starts_with("[\n  {\n    \"title\""));
        assert!(json.ends_with("]\n"));
    }

    #[test]
    fn test_empty_json() {
        let json = render_json(std::iter::empty()).unwrap();
        assert_eq!(json, b"[]\n");
    }

    #[test]
    fn test_write_creates_directory_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let set = dedupe(vec![
            BookBuilder::new("a").isbn("1").build(),
            BookBuilder::new("b").isbn("1").build(),
        ]);

        let files = write(&set, &out, "q").unwrap();
        assert_eq!(files.json_path, out.join("books_q.json"));
        assert_eq!(files.csv_path, out.join("books_q.csv"));

        let json: Vec<Book> =
            serde_json::from_str(&fs::read_to_string(&files.json_path).unwrap()).unwrap();
        assert_eq!(json.len(), 1);
        assert_eq!(json[0].title(), "a");

        let csv = fs::read_to_string(&files.csv_path).unwrap();
        assert_eq!(csv.lines().count(), 2);

        // no temp files left behind
        assert_eq!(fs::read_dir(&out).unwrap().count(), 2);
    }

    #[test]
    fn test_write_overwrites_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let first = dedupe(vec![BookBuilder::new("old").isbn("1").build()]);
        let second = dedupe(vec![BookBuilder::new("new").isbn("2").build()]);

        write(&first, dir.path(), "q").unwrap();
        let files = write(&second, dir.path(), "q").unwrap();

        let csv = fs::read_to_string(files.csv_path).unwrap();
        assert!(csv.contains("new"));
        assert!(!csv.contains("old"));
    }

    #[test]
    fn test_failed_csv_leaves_no_json_behind() {
        let dir = tempfile::tempdir().unwrap();
        let (json_path, csv_path) = output_paths(dir.path(), "q");
        // a directory in the way makes the CSV rename fail
        fs::create_dir(&csv_path).unwrap();

        let set = dedupe(vec![BookBuilder::new("a").isbn("1").build()]);
        let err = write(&set, dir.path(), "q").unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
        assert!(!json_path.exists());
        assert!(csv_path.is_dir());
        // staged temp files are cleaned up
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_into_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let err = write(&ResultSet::new(), &blocker, "q").unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}
