use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use encoding_rs::{GB18030, GBK};

use crate::error::AppError;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "txt", "xlsx", "xls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Delimited,
    Workbook,
}

pub type Row = Vec<String>;

fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

pub fn file_kind(path: &Path) -> Option<FileKind> {
    match normalized_extension(path)?.as_str() {
        "csv" | "txt" => Some(FileKind::Delimited),
        "xlsx" | "xls" => Some(FileKind::Workbook),
        _ => None,
    }
}

pub fn is_supported(path: &Path) -> bool {
    file_kind(path).is_some()
}

/// UTF-8 first (BOM stripped), then GBK, then lossy GB18030.
pub fn decode_text(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            let bytes = err.into_bytes();
            let (cow, _, had_errors) = GBK.decode(&bytes);
            if had_errors {
                GB18030.decode(&bytes).0.into_owned()
            } else {
                cow.into_owned()
            }
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

pub fn detect_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.contains('\t') {
        b'\t'
    } else if first_line.contains(';') {
        b';'
    } else {
        b','
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Byte offset and 1-based line number of every non-empty line. The csv
/// reader skips empty lines without reporting them, so a record's line is the
/// first entry at or after the offset where the reader started it.
fn non_empty_lines(text: &str) -> Vec<(u64, usize)> {
    let mut lines = Vec::new();
    let mut offset = 0u64;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        if !line.trim_end_matches(['\r', '\n']).is_empty() {
            lines.push((offset, idx + 1));
        }
        offset += line.len() as u64;
    }
    lines
}

enum RowSource {
    Delimited {
        records: csv::StringRecordsIntoIter<Cursor<Vec<u8>>>,
        lines: Vec<(u64, usize)>,
    },
    Workbook(std::vec::IntoIter<(usize, Row)>),
}

/// Rows of one file in source order, each paired with its 1-based physical
/// line (or sheet row) number. Blank rows are skipped but still counted.
pub struct Rows {
    file_name: String,
    source: RowSource,
}

impl Rows {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Iterator for Rows {
    type Item = Result<(usize, Row), AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (line, row) = match &mut self.source {
                RowSource::Delimited { records, lines } => match records.next()? {
                    Ok(record) => {
                        let start = record.position().map_or(0, |pos| pos.byte());
                        let idx = lines.partition_point(|&(offset, _)| offset < start);
                        let line = lines.get(idx).map_or(0, |&(_, line)| line);
                        (line, record.iter().map(str::to_string).collect::<Row>())
                    }
                    Err(e) => return Some(Err(AppError::parse(self.file_name.clone(), e))),
                },
                RowSource::Workbook(rows) => rows.next()?,
            };
            if !is_blank(&row) {
                return Some(Ok((line, row)));
            }
        }
    }
}

fn open_delimited(path: &Path, file_name: String) -> Result<Rows, AppError> {
    let bytes = std::fs::read(path).map_err(|e| AppError::parse(file_name.clone(), e))?;
    let text = decode_text(bytes);
    let delimiter = detect_delimiter(&text);
    let lines = non_empty_lines(&text);

    let records = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(text.into_bytes()))
        .into_records();

    Ok(Rows {
        file_name,
        source: RowSource::Delimited { records, lines },
    })
}

fn open_workbook(path: &Path, file_name: String) -> Result<Rows, AppError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| AppError::parse(file_name.clone(), e))?;

    let rows = match workbook.sheet_names().first().cloned() {
        Some(sheet_name) => {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| AppError::parse(file_name.clone(), e))?;
            // The used range may start below row 1 when leading rows are empty.
            let first_row = range.start().map_or(0, |(row, _)| row as usize);
            range
                .rows()
                .enumerate()
                .map(|(offset, row)| {
                    let cells = row.iter().map(|cell| cell.to_string()).collect::<Row>();
                    (first_row + offset + 1, cells)
                })
                .collect::<Vec<_>>()
        }
        None => Vec::new(),
    };

    Ok(Rows {
        file_name,
        source: RowSource::Workbook(rows.into_iter()),
    })
}

pub fn open_rows(path: &Path) -> Result<Rows, AppError> {
    let file_name = display_name(path);
    match file_kind(path) {
        Some(FileKind::Delimited) => open_delimited(path, file_name),
        Some(FileKind::Workbook) => open_workbook(path, file_name),
        None => Err(AppError::parse(
            file_name,
            format!("unsupported file type, expected one of: {}", SUPPORTED_EXTENSIONS.join(", ")),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_numbered(path: &Path) -> Vec<(usize, Row)> {
        open_rows(path)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn collect(path: &Path) -> Vec<Row> {
        collect_numbered(path).into_iter().map(|(_, row)| row).collect()
    }

    #[test]
    fn test_file_kind_by_extension() {
        assert_eq!(file_kind(Path::new("a.csv")), Some(FileKind::Delimited));
        assert_eq!(file_kind(Path::new("a.TXT")), Some(FileKind::Delimited));
        assert_eq!(file_kind(Path::new("a.xlsx")), Some(FileKind::Workbook));
        assert_eq!(file_kind(Path::new("a.XLS")), Some(FileKind::Workbook));
        assert_eq!(file_kind(Path::new("a.ods")), None);
        assert_eq!(file_kind(Path::new("README")), None);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a\tb,c\n"), b'\t');
        assert_eq!(detect_delimiter("a;b,c\n"), b';');
        assert_eq!(detect_delimiter("a,b\n1\t2"), b',');
        assert_eq!(detect_delimiter(""), b',');
    }

    #[test]
    fn test_decode_text_handles_bom_and_gbk() {
        assert_eq!(decode_text(b"\xef\xbb\xbfid,link".to_vec()), "id,link");

        let (gbk, _, _) = GBK.encode("编号,链接");
        assert_eq!(decode_text(gbk.into_owned()), "编号,链接");
    }

    #[test]
    fn test_csv_rows_are_verbatim_and_ragged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.csv");
        std::fs::write(&path, "id,link\n A1 ,https://x/a\nB2\n,,\nC3,https://x/c,extra\n").unwrap();

        let rows = collect(&path);
        assert_eq!(
            rows,
            vec![
                vec!["id".to_string(), "link".to_string()],
                vec![" A1 ".to_string(), "https://x/a".to_string()],
                vec!["B2".to_string()],
                vec![
                    "C3".to_string(),
                    "https://x/c".to_string(),
                    "extra".to_string()
                ],
            ]
        );
    }

    #[test]
    fn test_line_numbers_count_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gappy.csv");
        std::fs::write(&path, "\nid,link\nA1,https://x/a\n\n,,\nB2,https://x/b\n").unwrap();

        let lines: Vec<usize> = collect_numbered(&path).into_iter().map(|(line, _)| line).collect();
        assert_eq!(lines, vec![2, 3, 6]);
    }

    #[test]
    fn test_txt_uses_tab_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.txt");
        std::fs::write(&path, "id\tlink\nA1\thttps://x/a,with,commas\n").unwrap();

        let rows = collect(&path);
        assert_eq!(rows[1], vec!["A1", "https://x/a,with,commas"]);
    }

    #[test]
    fn test_empty_file_yields_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();

        assert!(collect(&path).is_empty());
    }

    #[test]
    fn test_corrupt_workbook_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"this is not a zip archive").unwrap();

        let err = open_rows(&path).err().unwrap();
        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().contains("broken.xlsx"));
    }

    #[test]
    fn test_unsupported_extension_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# hi").unwrap();

        assert_eq!(open_rows(&path).err().unwrap().kind(), "parse");
    }
}
