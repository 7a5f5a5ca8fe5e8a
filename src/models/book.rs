//! Book model representing one search result from the book search API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// A single book record as returned by the search API
///
/// The record is kept exactly as received: every key, in arrival order,
/// with its original value (including `null`). Serializing a `Book` writes
/// that object back unchanged. The fields the harvester consumes are read
/// through accessors that tolerate unexpected types, so one odd value never
/// makes a whole page unreadable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Book {
    fields: Map<String, Value>,
}

/// Text of a scalar JSON value; `None` for null, arrays and objects
pub fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl Book {
    /// Create a record with only a title
    pub fn new(title: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("title".to_string(), Value::String(title.into()));
        Self { fields }
    }

    /// Raw value of a field, if present
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The record as received
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Text of a field; empty when absent, null or not a scalar
    pub fn text(&self, key: &str) -> Cow<'_, str> {
        self.fields
            .get(key)
            .and_then(scalar_text)
            .unwrap_or(Cow::Borrowed(""))
    }

    pub fn title(&self) -> Cow<'_, str> {
        self.text("title")
    }

    pub fn publisher(&self) -> Cow<'_, str> {
        self.text("publisher")
    }

    /// Raw ISBN field; may hold an ISBN10 and an ISBN13 separated by a space
    pub fn isbn(&self) -> Cow<'_, str> {
        self.text("isbn")
    }

    /// Authors in listed order.
    ///
    /// Scalar entries are stringified; null and nested entries are skipped.
    /// A bare string is read as a single author.
    pub fn authors(&self) -> Vec<String> {
        match self.fields.get("authors") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(scalar_text)
                .map(Cow::into_owned)
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Authors flattened to a single `", "`-joined string
    pub fn authors_joined(&self) -> String {
        self.authors().join(", ")
    }
}

/// Builder for constructing Book objects
///
/// Keys are stored in the order the setters are called.
#[derive(Debug, Clone)]
pub struct BookBuilder {
    book: Book,
}

impl BookBuilder {
    /// Create a new builder with the title set
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            book: Book::new(title),
        }
    }

    fn set(mut self, key: &str, value: Value) -> Self {
        self.book.fields.insert(key.to_string(), value);
        self
    }

    /// Set authors
    pub fn authors<I, S>(self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let authors = authors
            .into_iter()
            .map(|a| Value::String(a.into()))
            .collect();
        self.set("authors", Value::Array(authors))
    }

    /// Set publisher
    pub fn publisher(self, publisher: impl Into<String>) -> Self {
        self.set("publisher", Value::String(publisher.into()))
    }

    /// Set the raw ISBN field
    pub fn isbn(self, isbn: impl Into<String>) -> Self {
        self.set("isbn", Value::String(isbn.into()))
    }

    /// Set publication timestamp
    pub fn datetime(self, datetime: impl Into<String>) -> Self {
        self.set("datetime", Value::String(datetime.into()))
    }

    /// Set list price
    pub fn price(self, price: i64) -> Self {
        self.set("price", Value::from(price))
    }

    /// Set sale price
    pub fn sale_price(self, sale_price: i64) -> Self {
        self.set("sale_price", Value::from(sale_price))
    }

    /// Set detail URL
    pub fn url(self, url: impl Into<String>) -> Self {
        self.set("url", Value::String(url.into()))
    }

    /// Set thumbnail URL
    pub fn thumbnail(self, thumbnail: impl Into<String>) -> Self {
        self.set("thumbnail", Value::String(thumbnail.into()))
    }

    /// Set sales status
    pub fn status(self, status: impl Into<String>) -> Self {
        self.set("status", Value::String(status.into()))
    }

    /// Set summary text
    pub fn contents(self, contents: impl Into<String>) -> Self {
        self.set("contents", Value::String(contents.into()))
    }

    /// Set any other field
    pub fn extra(self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        self.set(&key, value)
    }

    /// Build the Book
    pub fn build(self) -> Book {
        self.book
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_book_builder() {
        let book = BookBuilder::new("파이썬 코딩의 기술")
            .authors(["브렛 슬라킨"])
            .publisher("길벗")
            .isbn("8966263151 9788966263158")
            .price(32000)
            .build();

        assert_eq!(book.title(), "파이썬 코딩의 기술");
        assert_eq!(book.authors(), vec!["브렛 슬라킨".to_string()]);
        assert_eq!(book.get("price"), Some(&json!(32000)));
        assert_eq!(book.get("sale_price"), None);
    }

    #[test]
    fn test_authors_joined() {
        let book = BookBuilder::new("T").authors(["A", "B"]).build();
        assert_eq!(book.authors_joined(), "A, B");

        let empty = Book::new("T");
        assert_eq!(empty.authors_joined(), "");
    }

    #[test]
    fn test_deserialize_api_document() {
        let raw = r#"{
            "authors": ["Brett Slatkin"],
            "contents": "summary",
            "datetime": "2020-04-01T00:00:00.000+09:00",
            "isbn": "8966263151 9788966263158",
            "price": 32000,
            "publisher": "길벗",
            "sale_price": 28800,
            "status": "정상판매",
            "thumbnail": "https://example.com/t.jpg",
            "title": "Effective Python",
            "translators": ["곽현철"],
            "url": "https://example.com/b"
        }"#;

        let book: Book = serde_json::from_str(raw).unwrap();
        assert_eq!(book.title(), "Effective Python");
        assert_eq!(book.get("sale_price"), Some(&json!(28800)));
        assert_eq!(book.get("translators"), Some(&json!(["곽현철"])));
    }

    #[test]
    fn test_nulls_and_missing_fields_read_as_empty() {
        let raw = r#"{"title": null, "authors": null, "isbn": ""}"#;
        let book: Book = serde_json::from_str(raw).unwrap();
        assert_eq!(book.title(), "");
        assert!(book.authors().is_empty());
        assert_eq!(book.get("price"), None);
        assert_eq!(book.publisher(), "");
    }

    #[test]
    fn test_unexpected_types_are_tolerated() {
        let raw = r#"{"title": 42, "price": "12000", "sale_price": 12000.5,
                      "authors": ["a", null, 7, {"x": 1}], "isbn": 9788966263158}"#;
        let book: Book = serde_json::from_str(raw).unwrap();

        assert_eq!(book.title(), "42");
        assert_eq!(book.authors(), vec!["a".to_string(), "7".to_string()]);
        assert_eq!(book.isbn(), "9788966263158");
        assert_eq!(book.get("price"), Some(&json!("12000")));

        let single: Book = serde_json::from_str(r#"{"authors": "홍길동"}"#).unwrap();
        assert_eq!(single.authors(), vec!["홍길동".to_string()]);
    }

    #[test]
    fn test_serializes_as_received() {
        let raw = r#"{"title":"a","price":null,"translators":["z"],"zeta":1,"alpha":2}"#;
        let book: Book = serde_json::from_str(raw).unwrap();

        assert_eq!(serde_json::to_string(&book).unwrap(), raw);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!("x")).as_deref(), Some("x"));
        assert_eq!(scalar_text(&json!(12000)).as_deref(), Some("12000"));
        assert_eq!(scalar_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(scalar_text(&json!(null)), None);
        assert_eq!(scalar_text(&json!([1])), None);
    }
}
