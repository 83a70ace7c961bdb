use crate::error::TileSheetError;
use crate::grid::Grid;
use std::path::Path;

pub const DELIMITER: char = ',';
const QUOTE: char = '"';
const TRIM_CHARS: [char; 4] = [' ', '\t', '\r', '\n'];

/// Parsed manifest: one row per input line, one column per field.
pub type TabularManifest = Grid<String>;

pub fn load(path: impl AsRef<Path>) -> Result<TabularManifest, TileSheetError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|err| {
        TileSheetError::missing(path, format!("cannot read manifest: {err}"))
    })?;
    Ok(parse_str(&text))
}

pub fn parse_str(text: &str) -> TabularManifest {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Grid::empty();
    }
    let width = 1 + lines.iter().map(|line| count_delimiters(line)).max().unwrap_or(0);
    let mut grid = Grid::new(width, lines.len());
    for (y, line) in lines.iter().enumerate() {
        for (x, field) in split_line(line).into_iter().enumerate() {
            grid.set(x as i64, y as i64, field);
        }
    }
    grid
}

/// Byte offsets of every delimiter that sits outside a quoted span. Quotes
/// pair left to right; an unmatched quote makes the rest of the line literal.
fn delimiter_positions(line: &str) -> Vec<usize> {
    let mut quoted = false;
    let mut positions = Vec::new();
    for (idx, ch) in line.char_indices() {
        if ch == QUOTE {
            quoted = !quoted;
        } else if ch == DELIMITER && !quoted {
            positions.push(idx);
        }
    }
    positions
}

pub fn count_delimiters(line: &str) -> usize {
    delimiter_positions(line).len()
}

/// Splits one line into trimmed fields. A field wrapped in a single pair of
/// quotes has them removed.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut start = 0;
    for pos in delimiter_positions(line) {
        fields.push(clean_field(&line[start..pos]));
        start = pos + DELIMITER.len_utf8();
    }
    fields.push(clean_field(&line[start..]));
    fields
}

pub fn trim_field(raw: &str) -> &str {
    raw.trim_matches(&TRIM_CHARS[..])
}

fn clean_field(raw: &str) -> String {
    let trimmed = trim_field(raw);
    let unquoted = trimmed
        .strip_prefix(QUOTE)
        .and_then(|rest| rest.strip_suffix(QUOTE))
        .filter(|inner| !inner.contains(QUOTE));
    unquoted.unwrap_or(trimmed).to_string()
}

/// One `(count, asset)` data row of a pack manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEntry {
    /// Zero-based manifest row the entry came from.
    pub row: usize,
    pub count: usize,
    pub asset: String,
}

/// A manifest row that was skipped instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    pub row: usize,
    pub reason: String,
}

impl From<RowIssue> for TileSheetError {
    fn from(value: RowIssue) -> Self {
        TileSheetError::MalformedManifestRow {
            row: value.row,
            reason: value.reason,
        }
    }
}

/// Extracts `(count, asset)` rows, skipping the header row. Malformed rows are
/// reported in the second vector; rows with a non-positive count or an empty
/// asset path are dropped without an issue.
pub fn pack_entries(manifest: &TabularManifest) -> (Vec<PackEntry>, Vec<RowIssue>) {
    let mut entries = Vec::new();
    let mut issues = Vec::new();
    for (row, fields) in manifest.rows().enumerate().skip(1) {
        if fields.len() < 2 {
            issues.push(RowIssue {
                row,
                reason: format!("expected 2 fields, found {}", fields.len()),
            });
            continue;
        }
        let count_field = fields[0].as_str();
        let asset = fields[1].as_str();
        if count_field.is_empty() && asset.is_empty() {
            continue;
        }
        let count = match count_field.parse::<i64>() {
            Ok(count) => count,
            Err(_) => {
                issues.push(RowIssue {
                    row,
                    reason: format!("count '{count_field}' is not an integer"),
                });
                continue;
            }
        };
        if count <= 0 || asset.is_empty() {
            continue;
        }
        entries.push(PackEntry {
            row,
            count: count as usize,
            asset: asset.to_string(),
        });
    }
    (entries, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(grid: &TabularManifest, y: usize) -> Vec<&str> {
        grid.row(y)
            .expect("row")
            .iter()
            .map(|s| s.as_str())
            .collect()
    }

    #[test]
    fn quoted_delimiters_do_not_split() {
        assert_eq!(split_line("a,\"b,c\",d"), vec!["a", "b,c", "d"]);
    }

    #[test]
    fn fields_are_trimmed() {
        assert_eq!(split_line("  x ,y\t"), vec!["x", "y"]);
        assert_eq!(split_line(" \t \r"), vec![""]);
    }

    #[test]
    fn unmatched_quote_makes_rest_of_line_literal() {
        assert_eq!(split_line("a,\"b,c,d"), vec!["a", "\"b,c,d"]);
        assert_eq!(count_delimiters("a,\"b,c,d"), 1);
    }

    #[test]
    fn quote_pairs_are_matched_left_to_right() {
        assert_eq!(count_delimiters("\"a,b\",\"c,d\",e"), 2);
        assert_eq!(split_line("x\"1,2\"y,z"), vec!["x\"1,2\"y", "z"]);
    }

    #[test]
    fn empty_input_yields_empty_grid() {
        let grid = parse_str("");
        assert_eq!((grid.width(), grid.height()), (0, 0));
    }

    #[test]
    fn whitespace_line_is_kept_as_one_empty_field() {
        let grid = parse_str("a,b\n   \nc");
        assert_eq!(grid.height(), 3);
        assert_eq!(row(&grid, 1), vec!["", ""]);
    }

    #[test]
    fn width_is_one_plus_max_delimiters() {
        let grid = parse_str("a\nb,c,d\ne,f");
        assert_eq!(grid.width(), 3);
        assert_eq!(row(&grid, 0), vec!["a", "", ""]);
        assert_eq!(row(&grid, 2), vec!["e", "f", ""]);
    }

    #[test]
    fn empty_fields_keep_their_column() {
        assert_eq!(split_line(",a,,b"), vec!["", "a", "", "b"]);
    }

    #[test]
    fn pack_entries_skip_header_and_bad_rows() {
        let grid = parse_str(
            "count,file\n3,orc.png\nmany,goblin.png\n0,zero.png\n2,\nsolo\n-1,neg.png\n1, \"troll, big.png\"",
        );
        let (entries, issues) = pack_entries(&grid);
        assert_eq!(
            entries,
            vec![
                PackEntry {
                    row: 1,
                    count: 3,
                    asset: "orc.png".to_string()
                },
                PackEntry {
                    row: 7,
                    count: 1,
                    asset: "troll, big.png".to_string()
                },
            ]
        );
        let rows: Vec<usize> = issues.iter().map(|i| i.row).collect();
        assert_eq!(rows, vec![2, 5]);
    }

    #[test]
    fn blank_rows_are_not_issues() {
        let grid = parse_str("count,file\n1,a.png\n\n");
        let (entries, issues) = pack_entries(&grid);
        assert_eq!(entries.len(), 1);
        assert!(issues.is_empty());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load("/definitely/not/here.csv").expect_err("missing");
        assert!(matches!(err, TileSheetError::MissingResource { .. }));
    }
}
