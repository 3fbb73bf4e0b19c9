//! Flat-file record store
//!
//! Parses a tab-delimited file (header row first, one record per row) into
//! an ordered list of records and writes the full set back with a
//! timestamped backup followed by write-temp-then-rename replacement.
//!
//! The store performs no locking of its own. Concurrent writers are
//! prevented by operational convention (a single scheduled run at a time),
//! not by this component.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Record, RowShape};
use crate::schema::RecordSchema;
use crate::time;

/// Field delimiter for every catalog and feed file
pub const DELIMITER: char = '\t';

/// A loaded record file: header row plus ordered records
#[derive(Debug, Clone)]
pub struct RecordFile {
    /// Header row as read from the file
    pub header: String,
    /// Records in file order; malformed rows are preserved in place
    pub records: Vec<Record>,
    /// Count of rows whose width matched no tolerated schema version
    pub malformed: usize,
}

/// Load a record file, padding tolerated historical rows to the current
/// schema width
///
/// A missing or unreadable file is fatal (`Error::SourceUnreadable`). A row
/// whose field count matches no tolerated width is preserved verbatim,
/// logged as a warning, and counted; it is never discarded.
pub fn load(path: &Path, schema: &RecordSchema) -> Result<RecordFile> {
    let content = fs::read_to_string(path).map_err(|e| Error::SourceUnreadable {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut lines = content.lines();
    let header = lines
        .next()
        .ok_or_else(|| Error::SourceUnreadable {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "missing header row"),
        })?
        .to_string();

    let mut records = Vec::new();
    let mut malformed = 0;

    for (line_no, line) in lines.enumerate() {
        let fields: Vec<String> = line.split(DELIMITER).map(str::to_string).collect();
        let width = fields.len();

        if width == schema.width() {
            records.push(Record::with_shape(fields, RowShape::Current));
        } else if schema.tolerates(width) {
            let mut padded = fields;
            padded.resize(schema.width(), String::new());
            records.push(Record::with_shape(padded, RowShape::Padded));
        } else {
            // Line numbers are 1-based and include the header row
            let err = Error::MalformedRecord {
                line: line_no + 2,
                expected: schema.width(),
                found: width,
            };
            warn!(
                file = %path.display(),
                kind = schema.name,
                %err,
                "malformed row preserved as-is"
            );
            malformed += 1;
            records.push(Record::with_shape(fields, RowShape::Malformed));
        }
    }

    debug!(
        file = %path.display(),
        kind = schema.name,
        records = records.len(),
        malformed,
        "loaded record file"
    );

    Ok(RecordFile {
        header,
        records,
        malformed,
    })
}

/// Backup path beside the target: `<stem>.<YYYYMMDDTHHMMSSZ>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    path.with_file_name(format!("{}.{}.bak", stem, time::backup_stamp()))
}

/// Replace the file at `path` with `header` + `records`
///
/// 1. Copy the current file to a timestamped backup (`Error::Backup` aborts
///    before any mutation).
/// 2. Write header and all records to a temp file in the same directory.
/// 3. Rename the temp file over the target (atomic on the same volume).
///
/// Returns the backup path. On `Error::AtomicReplace` the original file is
/// untouched and the backup is the manual recovery path.
pub fn atomic_replace(path: &Path, header: &str, records: &[Record]) -> Result<PathBuf> {
    let backup = backup_path(path);
    fs::copy(path, &backup).map_err(|e| Error::Backup {
        path: backup.clone(),
        source: e,
    })?;
    debug!(backup = %backup.display(), "backup written");

    let tmp = path.with_extension("tmp");
    write_all(&tmp, header, records).map_err(|e| Error::AtomicReplace {
        path: path.to_path_buf(),
        source: e,
    })?;

    fs::rename(&tmp, path).map_err(|e| Error::AtomicReplace {
        path: path.to_path_buf(),
        source: e,
    })?;

    debug!(
        file = %path.display(),
        records = records.len(),
        "atomic replace complete"
    );

    Ok(backup)
}

fn write_all(path: &Path, header: &str, records: &[Record]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    writeln!(file, "{}", header)?;
    for record in records {
        writeln!(file, "{}", record.to_line(DELIMITER))?;
    }
    file.flush()
}
