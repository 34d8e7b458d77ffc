//! Flat-file record storage.
//!
//! Each entity type lives in its own comma-delimited file with a header line.
//! `RecordStore` reads every row on each call, appends single rows, and
//! rewrites the whole file for updates. There is no caching, no indexing and
//! no locking: two processes writing the same file can lose updates.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, error, warn};

use crate::error::StoreError;

/// A row type that can be stored in a `RecordStore`.
pub trait Record: Sized {
    /// Number of fields in every well-formed row.
    const ARITY: usize;
    /// First line of the file; skipped on read.
    const HEADER: &'static str;

    /// Build a record from exactly `ARITY` fields, or `None` if a field is invalid.
    fn from_fields(fields: &[String]) -> Option<Self>;

    fn to_fields(&self) -> Vec<String>;
}

/// What `RecordStore::edit_rows` does with one well-formed row.
#[derive(Debug)]
pub enum RowEdit<R> {
    Keep,
    Replace(R),
    Remove,
}

/// Read/append/edit access to one delimited file.
#[derive(Debug, Clone)]
pub struct RecordStore<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RecordStore<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RecordStore { path: path.into(), _record: PhantomData }
    }

    /// Read every well-formed row after the header.
    ///
    /// Malformed rows, including rows that are not valid UTF-8, are skipped
    /// with a warning. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<R>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "store file missing, reading as empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to open store file");
                return Err(StoreError::io(&self.path, e));
            }
        };

        let mut records = Vec::new();
        for (index, raw) in BufReader::new(file).split(b'\n').enumerate().skip(1) {
            let raw = raw.map_err(|e| {
                error!(path = %self.path.display(), error = %e, "failed to read store file");
                StoreError::io(&self.path, e)
            })?;
            if let Some(record) = self.decode_row(index + 1, &raw) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Parse one raw data line; `None` for blank or malformed lines.
    fn decode_row(&self, line_no: usize, raw: &[u8]) -> Option<R> {
        let Ok(line) = std::str::from_utf8(raw) else {
            warn!(path = %self.path.display(), line = line_no, "skipping row that is not valid UTF-8");
            return None;
        };
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            return None;
        }
        let fields = parse_line(line);
        if fields.len() != R::ARITY {
            warn!(
                path = %self.path.display(),
                line = line_no,
                fields = fields.len(),
                expected = R::ARITY,
                "skipping row with wrong field count"
            );
            return None;
        }
        let record = R::from_fields(&fields);
        if record.is_none() {
            warn!(path = %self.path.display(), line = line_no, "skipping unparsable row");
        }
        record
    }

    /// Append one row, creating the file with its header if needed.
    pub fn append(&self, record: &R) -> Result<(), StoreError> {
        self.write_append(record).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to append row");
            StoreError::io(&self.path, e)
        })
    }

    fn write_append(&self, record: &R) -> std::io::Result<()> {
        ensure_parent(&self.path)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        if file.metadata()?.len() == 0 {
            file.write_all(R::HEADER.as_bytes())?;
        }
        write!(file, "\n{}", format_line(&record.to_fields()))?;
        file.flush()
    }

    /// Replace or remove well-formed rows in place, returning how many changed.
    ///
    /// `edit` sees each well-formed row in file order. The header, blank and
    /// malformed lines, and every kept row are written back byte-for-byte.
    /// Nothing is written when no row changed or the file is missing.
    pub fn edit_rows(&self, mut edit: impl FnMut(&R) -> RowEdit<R>) -> Result<usize, StoreError> {
        let contents = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to read store file");
                return Err(StoreError::io(&self.path, e));
            }
        };

        let mut changed = 0;
        let mut lines: Vec<Vec<u8>> = Vec::new();
        for (index, raw) in contents.split(|b| *b == b'\n').enumerate() {
            let decoded = if index == 0 { None } else { self.decode_row(index + 1, raw) };
            match decoded.map(|record| edit(&record)) {
                None | Some(RowEdit::Keep) => lines.push(raw.to_vec()),
                Some(RowEdit::Replace(record)) => {
                    lines.push(format_line(&record.to_fields()).into_bytes());
                    changed += 1;
                }
                Some(RowEdit::Remove) => changed += 1,
            }
        }

        if changed > 0 {
            self.write_atomic(&lines.join(&b'\n')).map_err(|e| {
                error!(path = %self.path.display(), error = %e, "failed to rewrite store file");
                StoreError::io(&self.path, e)
            })?;
        }
        Ok(changed)
    }

    /// Write the whole file through a temp file and rename.
    fn write_atomic(&self, contents: &[u8]) -> std::io::Result<()> {
        ensure_parent(&self.path)?;
        let tmp = self.path.with_extension("csv.tmp");
        let result = fs::write(&tmp, contents).and_then(|()| fs::rename(&tmp, &self.path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    /// Create a header-only file if none exists. Returns whether it was created.
    pub fn create_if_not_exists(&self) -> Result<bool, StoreError> {
        if self.path.exists() {
            return Ok(false);
        }
        self.write_atomic(R::HEADER.as_bytes()).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to create store file");
            StoreError::io(&self.path, e)
        })?;
        Ok(true)
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// Split a row into fields.
///
/// A field is quoted only when it starts with `"`; inside it `""` is a
/// literal quote and a lone `"` closes it. Quotes anywhere else are literal,
/// so rows written without escaping read back unchanged.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if at_field_start => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current_field));
                at_field_start = true;
                continue;
            }
            _ => current_field.push(ch),
        }
        at_field_start = false;
    }

    fields.push(current_field);
    fields
}

/// Join fields into one row, quoting fields that contain commas or quotes.
pub fn format_line(fields: &[String]) -> String {
    fields.iter().map(|f| escape_field(f)).collect::<Vec<_>>().join(",")
}

fn escape_field(field: &str) -> String {
    // Rows are line-delimited, so embedded line breaks cannot survive.
    let field = field.replace(['\n', '\r'], " ");
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

/// Parse a numeric field, tolerating surrounding whitespace.
pub fn parse_field<T: FromStr>(field: &str) -> Option<T> {
    field.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq)]
    struct Pair {
        id: u32,
        label: String,
    }

    impl Record for Pair {
        const ARITY: usize = 2;
        const HEADER: &'static str = "id,label";

        fn from_fields(fields: &[String]) -> Option<Self> {
            Some(Pair { id: parse_field(&fields[0])?, label: fields[1].clone() })
        }

        fn to_fields(&self) -> Vec<String> {
            vec![self.id.to_string(), self.label.clone()]
        }
    }

    fn pair(id: u32, label: &str) -> Pair {
        Pair { id, label: label.to_string() }
    }

    #[test]
    fn test_parse_line_handles_quotes() {
        assert_eq!(parse_line("1,plain"), vec!["1", "plain"]);
        assert_eq!(parse_line("1,\"a,b\""), vec!["1", "a,b"]);
        assert_eq!(parse_line("1,\"say \"\"hi\"\"\""), vec!["1", "say \"hi\""]);
        assert_eq!(parse_line("1,,"), vec!["1", "", ""]);
    }

    #[test]
    fn test_parse_line_keeps_unescaped_quotes_literal() {
        assert_eq!(parse_line("2,say \"hi\",0,1"), vec!["2", "say \"hi\"", "0", "1"]);
        assert_eq!(parse_line("1,a\"b,0,1"), vec!["1", "a\"b", "0", "1"]);
        assert_eq!(parse_line("1,\"a\"b,c"), vec!["1", "ab", "c"]);
    }

    #[test]
    fn test_format_line_quotes_only_when_needed() {
        let fields = vec!["1".to_string(), "a,b".to_string(), "x\"y".to_string(), "ok".to_string()];
        let line = format_line(&fields);
        assert_eq!(line, "1,\"a,b\",\"x\"\"y\",ok");
        assert_eq!(parse_line(&line), fields);
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let store: RecordStore<Pair> = RecordStore::new(dir.path().join("none.csv"));
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_read_skips_header_and_malformed_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        fs::write(&path, "id,label\n1,one\n2\nx,bad\n\n3,three,extra\n4,four\r\n").unwrap();
        let store: RecordStore<Pair> = RecordStore::new(&path);
        assert_eq!(store.read_all().unwrap(), vec![pair(1, "one"), pair(4, "four")]);
    }

    #[test]
    fn test_append_creates_header_then_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("pairs.csv");
        let store: RecordStore<Pair> = RecordStore::new(&path);
        store.append(&pair(1, "one")).unwrap();
        store.append(&pair(2, "with,comma")).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "id,label\n1,one\n2,\"with,comma\"");
        assert_eq!(store.read_all().unwrap(), vec![pair(1, "one"), pair(2, "with,comma")]);
    }

    #[test]
    fn test_append_to_file_with_trailing_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        fs::write(&path, "id,label\n1,one\n").unwrap();
        let store: RecordStore<Pair> = RecordStore::new(&path);
        store.append(&pair(2, "two")).unwrap();
        assert_eq!(store.read_all().unwrap(), vec![pair(1, "one"), pair(2, "two")]);
    }

    #[test]
    fn test_read_skips_invalid_utf8_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        let mut raw = b"id,label\n1,one\n2,".to_vec();
        raw.extend_from_slice(&[0xFF, 0xFE]);
        raw.extend_from_slice(b"\n3,three");
        fs::write(&path, raw).unwrap();

        let store: RecordStore<Pair> = RecordStore::new(&path);
        assert_eq!(store.read_all().unwrap(), vec![pair(1, "one"), pair(3, "three")]);
    }

    #[test]
    fn test_edit_rows_replaces_and_removes_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        let store: RecordStore<Pair> = RecordStore::new(&path);
        for (id, label) in [(1, "a"), (2, "b"), (3, "c")] {
            store.append(&pair(id, label)).unwrap();
        }

        let changed = store
            .edit_rows(|p| match p.id {
                1 => RowEdit::Replace(pair(1, "z")),
                2 => RowEdit::Remove,
                _ => RowEdit::Keep,
            })
            .unwrap();
        assert_eq!(changed, 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "id,label\n1,z\n3,c");
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn test_edit_rows_leaves_other_lines_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        let mut raw = b"id,label\r\n1,say \"hi\"\nbroken\n\n2,".to_vec();
        raw.push(0xFF);
        raw.extend_from_slice(b"\n3,old\n");
        fs::write(&path, &raw).unwrap();

        let store: RecordStore<Pair> = RecordStore::new(&path);
        let changed = store
            .edit_rows(|p| if p.id == 3 { RowEdit::Replace(pair(3, "new")) } else { RowEdit::Keep })
            .unwrap();
        assert_eq!(changed, 1);

        let mut expected = b"id,label\r\n1,say \"hi\"\nbroken\n\n2,".to_vec();
        expected.push(0xFF);
        expected.extend_from_slice(b"\n3,new\n");
        assert_eq!(fs::read(&path).unwrap(), expected);
    }

    #[test]
    fn test_edit_rows_without_match_writes_nothing() {
        let dir = tempdir().unwrap();
        let store: RecordStore<Pair> = RecordStore::new(dir.path().join("pairs.csv"));
        assert_eq!(store.edit_rows(|_| RowEdit::Remove).unwrap(), 0);
        assert!(!dir.path().join("pairs.csv").exists());

        store.append(&pair(1, "one")).unwrap();
        assert_eq!(store.edit_rows(|_| RowEdit::Keep).unwrap(), 0);
        assert_eq!(store.read_all().unwrap(), vec![pair(1, "one")]);
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();

        let store: RecordStore<Pair> = RecordStore::new(&path);
        assert!(store.write_atomic(b"id,label").is_err());
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn test_create_if_not_exists_is_idempotent() {
        let dir = tempdir().unwrap();
        let store: RecordStore<Pair> = RecordStore::new(dir.path().join("pairs.csv"));
        assert!(store.create_if_not_exists().unwrap());
        store.append(&pair(1, "one")).unwrap();
        assert!(!store.create_if_not_exists().unwrap());
        assert_eq!(store.read_all().unwrap().len(), 1);
    }
}
