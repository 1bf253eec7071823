//! Delimiter-separated value parsing.
//!
//! The parser never fails: malformed input degrades to ragged rows and the
//! dataset validator decides whether the shape is acceptable.

use std::borrow::Cow;

use memchr::{memchr, memchr3};

/// Candidate delimiters in priority order.
pub const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Number of records tokenized per candidate when inferring the delimiter.
const PREVIEW_RECORDS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub delimiter: char,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            rows: Vec::new(),
            delimiter: DELIMITERS[0],
        }
    }
}

impl Dataset {
    /// Columns after `id` and `sequence`; one per optimization objective.
    pub fn value_columns(&self) -> &[String] {
        self.headers.get(2..).unwrap_or(&[])
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn to_text(&self) -> String {
        serialize(&self.headers, &self.rows, self.delimiter)
    }
}

/// Parse raw text into headers and rows, inferring the delimiter.
pub fn parse(text: &str) -> Dataset {
    let delimiter = detect_delimiter(text);
    let mut records = tokenize(text, delimiter, None).into_iter();

    let headers = records.next().unwrap_or_default();
    let rows = records.collect();

    Dataset {
        headers,
        rows,
        delimiter,
    }
}

/// Pick the candidate that splits the leading records into the most
/// consistent column count. Candidates that never split a line are ignored.
pub fn detect_delimiter(text: &str) -> char {
    let mut best: Option<(char, usize, usize)> = None;

    for candidate in DELIMITERS {
        let counts: Vec<usize> = tokenize(text, candidate, Some(PREVIEW_RECORDS))
            .iter()
            .filter(|record| !is_blank_record(record))
            .map(Vec::len)
            .collect();

        let Some(modal) = modal_count(&counts) else {
            continue;
        };
        if modal < 2 {
            continue;
        }

        let matching = counts.iter().filter(|&&count| count == modal).count();
        let total = counts.len();

        // matching / total > best_matching / best_total, without floats
        let better = match best {
            None => true,
            Some((_, best_matching, best_total)) => matching * best_total > best_matching * total,
        };
        if better {
            best = Some((candidate, matching, total));
        }
    }

    best.map(|(candidate, _, _)| candidate)
        .unwrap_or(DELIMITERS[0])
}

/// Write headers and rows back out, quoting cells that would not survive a
/// re-parse otherwise.
pub fn serialize(headers: &[String], rows: &[Vec<String>], delimiter: char) -> String {
    let header_line = (!headers.is_empty()).then_some(headers);
    let lines: Vec<String> = header_line
        .into_iter()
        .chain(rows.iter().map(Vec::as_slice))
        .map(|record| {
            if is_blank_record(record) {
                return "\"\"".to_string();
            }
            let mut line = String::new();
            for (j, cell) in record.iter().enumerate() {
                if j > 0 {
                    line.push(delimiter);
                }
                push_cell(&mut line, cell, delimiter);
            }
            line
        })
        .collect();

    lines.join("\n")
}

fn push_cell(out: &mut String, cell: &str, delimiter: char) {
    out.push_str(&quote_cell(cell, delimiter));
}

/// A cell as it has to be written to survive a re-parse: wrapped in quotes,
/// with inner quotes doubled, when it holds the delimiter, a quote or a line
/// break.
pub fn quote_cell(cell: &str, delimiter: char) -> Cow<'_, str> {
    let needs_quotes = cell
        .chars()
        .any(|c| c == delimiter || c == '"' || c == '\n' || c == '\r');

    if needs_quotes {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

fn is_blank_record(record: &[String]) -> bool {
    record.len() == 1 && record[0].is_empty()
}

fn modal_count(counts: &[usize]) -> Option<usize> {
    let mut tally: Vec<(usize, usize)> = Vec::new();
    for &count in counts {
        match tally.iter_mut().find(|(value, _)| *value == count) {
            Some((_, seen)) => *seen += 1,
            None => tally.push((count, 1)),
        }
    }
    tally
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(value, _)| value)
}

/// Split text into records of fields. Quoted fields may span delimiters and
/// line breaks; `""` inside quotes is a literal quote. A single trailing line
/// terminator does not produce an extra record.
fn tokenize(text: &str, delimiter: char, limit: Option<usize>) -> Vec<Vec<String>> {
    let bytes = text.as_bytes();
    let delim = delimiter as u8;
    let len = bytes.len();

    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut pos = 0;
    let mut field_start = true;

    while pos < len {
        if field_start && bytes[pos] == b'"' {
            pos += 1;
            loop {
                match memchr(b'"', &bytes[pos..]) {
                    None => {
                        // unterminated quote swallows the rest of the input
                        field.push_str(&text[pos..]);
                        pos = len;
                        break;
                    }
                    Some(offset) => {
                        field.push_str(&text[pos..pos + offset]);
                        pos += offset + 1;
                        if bytes.get(pos) == Some(&b'"') {
                            field.push('"');
                            pos += 1;
                        } else {
                            break;
                        }
                    }
                }
            }
            field_start = false;
            continue;
        }

        field_start = false;
        match memchr3(delim, b'\n', b'\r', &bytes[pos..]) {
            None => {
                field.push_str(&text[pos..]);
                pos = len;
            }
            Some(offset) => {
                field.push_str(&text[pos..pos + offset]);
                pos += offset;

                let byte = bytes[pos];
                record.push(std::mem::take(&mut field));
                field_start = true;

                if byte == delim {
                    pos += 1;
                    continue;
                }

                pos += if byte == b'\r' && bytes.get(pos + 1) == Some(&b'\n') {
                    2
                } else {
                    1
                };
                records.push(std::mem::take(&mut record));

                if limit.is_some_and(|limit| records.len() >= limit) {
                    return records;
                }
            }
        }
    }

    if !record.is_empty() || !field_start || !field.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    #[test]
    fn empty_input_has_no_headers_or_rows() {
        let dataset = parse("");
        assert!(dataset.headers.is_empty());
        assert!(dataset.rows.is_empty());
        assert_eq!(dataset.delimiter, ',');
    }

    #[test]
    fn parses_headers_and_rows() {
        let dataset = parse("id,sequence,value1\n1,ACD,0.5\n2,EFG,0.7\n");
        assert_eq!(dataset.headers, strings(&["id", "sequence", "value1"]));
        assert_eq!(
            dataset.rows,
            vec![strings(&["1", "ACD", "0.5"]), strings(&["2", "EFG", "0.7"])]
        );
        assert_eq!(dataset.value_columns(), &strings(&["value1"])[..]);
    }

    #[test]
    fn detects_each_candidate_delimiter() {
        assert_eq!(parse("a;b;c\n1;2;3").delimiter, ';');
        assert_eq!(parse("a\tb\tc\n1\t2\t3").delimiter, '\t');
        assert_eq!(parse("a|b|c\n1|2|3").delimiter, '|');
        assert_eq!(parse("a,b,c\n1,2,3").delimiter, ',');
    }

    #[test]
    fn prefers_the_most_consistent_split() {
        // commas appear inside the first column only on some lines
        let text = "id;note\n1;a,b\n2;c\n3;d,e,f";
        assert_eq!(detect_delimiter(text), ';');
    }

    #[test]
    fn ties_fall_back_to_priority_order() {
        assert_eq!(detect_delimiter("a,b;c\n1,2;3"), ',');
    }

    #[test]
    fn single_column_text_defaults_to_comma() {
        assert_eq!(detect_delimiter("id\n1\n2"), ',');
    }

    #[test]
    fn quoted_fields_keep_delimiters_newlines_and_quotes() {
        let dataset = parse("id,note\n1,\"a, b\"\n2,\"line\nbreak\"\n3,\"say \"\"hi\"\"\"");
        assert_eq!(dataset.rows[0], strings(&["1", "a, b"]));
        assert_eq!(dataset.rows[1], strings(&["2", "line\nbreak"]));
        assert_eq!(dataset.rows[2], strings(&["3", "say \"hi\""]));
    }

    #[test]
    fn ragged_rows_pass_through() {
        let dataset = parse("a,b,c\n1,2\n1,2,3,4");
        assert_eq!(dataset.rows[0], strings(&["1", "2"]));
        assert_eq!(dataset.rows[1], strings(&["1", "2", "3", "4"]));
    }

    #[test]
    fn blank_lines_become_sentinel_rows() {
        let dataset = parse("a,b\n1,2\n\n3,4");
        assert_eq!(dataset.rows.len(), 3);
        assert_eq!(dataset.rows[1], strings(&[""]));
    }

    #[test]
    fn crlf_line_endings() {
        let dataset = parse("a,b\r\n1,2\r\n");
        assert_eq!(dataset.headers, strings(&["a", "b"]));
        assert_eq!(dataset.rows, vec![strings(&["1", "2"])]);
    }

    #[test]
    fn trailing_delimiter_keeps_empty_cell() {
        let dataset = parse("a,b\n1,");
        assert_eq!(dataset.rows, vec![strings(&["1", ""])]);
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let headers = strings(&["id", "sequence", "note"]);
        let rows = vec![
            strings(&["1", "ACDE", "plain"]),
            strings(&["2", "KLMN", "has, comma"]),
            strings(&["3", "PQRS", "has \"quotes\""]),
            strings(&[""]),
            strings(&["4", "TVWY", "multi\nline"]),
        ];

        for delimiter in [',', ';', '|'] {
            let text = serialize(&headers, &rows, delimiter);
            let parsed = parse(&text);
            assert_eq!(parsed.headers, headers, "delimiter {delimiter:?}");
            assert_eq!(parsed.rows, rows, "delimiter {delimiter:?}");
            assert_eq!(parsed.delimiter, delimiter);
        }
    }

    #[test]
    fn to_text_uses_the_dataset_delimiter() {
        let dataset = parse("a\tb\n1\t2");
        assert_eq!(dataset.to_text(), "a\tb\n1\t2");
    }
}
