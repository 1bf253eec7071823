//! Dataset acceptance rules.
//!
//! Rules run in a fixed order and the first failure wins, so the editor can
//! show a single actionable message under the text area.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::dsv::{self, Dataset};

pub const MIN_ROWS: usize = 40;
pub const MAX_ROWS: usize = 10_000;
pub const MIN_VALUE_COLUMNS: usize = 1;
pub const MAX_VALUE_COLUMNS: usize = 5;

/// One-letter codes of the twenty standard amino acids.
pub static AMINO_ACIDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[ACDEFGHIKLMNPQRSTVWY]+$").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetError {
    TooFewRows,
    TooManyRows,
    IdRequired,
    IdDuplicate,
    SequenceRequired,
    SequenceInvalidFormat,
    TooFewValueColumns,
    TooManyValueColumns,
}

impl DatasetError {
    /// Stable identifier handed to the presentation layer for lookup.
    pub fn code(self) -> &'static str {
        match self {
            DatasetError::TooFewRows => "row.too_few",
            DatasetError::TooManyRows => "row.too_many",
            DatasetError::IdRequired => "id.required",
            DatasetError::IdDuplicate => "id.duplicate",
            DatasetError::SequenceRequired => "sequence.required",
            DatasetError::SequenceInvalidFormat => "sequence.invalid_format",
            DatasetError::TooFewValueColumns => "header.too_few",
            DatasetError::TooManyValueColumns => "header.too_many",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            DatasetError::TooFewRows => "the dataset needs at least 40 rows",
            DatasetError::TooManyRows => "the dataset may not exceed 10,000 rows",
            DatasetError::IdRequired => "the first column must be named \"id\"",
            DatasetError::IdDuplicate => "every id must be unique",
            DatasetError::SequenceRequired => "the second column must be named \"sequence\"",
            DatasetError::SequenceInvalidFormat => {
                "sequences may only contain the 20 standard amino-acid letters"
            }
            DatasetError::TooFewValueColumns => "add at least one value column",
            DatasetError::TooManyValueColumns => "use at most five value columns",
        }
    }
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.describe(), self.code())
    }
}

impl std::error::Error for DatasetError {}

/// Parse and validate raw dataset text.
pub fn validate(text: &str) -> Result<Dataset, DatasetError> {
    let dataset = dsv::parse(text);
    validate_dataset(&dataset)?;
    Ok(dataset)
}

pub fn validate_dataset(dataset: &Dataset) -> Result<(), DatasetError> {
    let Dataset { headers, rows, .. } = dataset;

    if rows.len() < MIN_ROWS {
        return Err(DatasetError::TooFewRows);
    }
    if rows.len() > MAX_ROWS {
        return Err(DatasetError::TooManyRows);
    }
    if headers.first().map(String::as_str) != Some("id") {
        return Err(DatasetError::IdRequired);
    }

    let mut seen = HashSet::with_capacity(rows.len());
    let unique = rows
        .iter()
        .all(|row| seen.insert(row.first().map(String::as_str)));
    if !unique {
        return Err(DatasetError::IdDuplicate);
    }

    if headers.get(1).map(String::as_str) != Some("sequence") {
        return Err(DatasetError::SequenceRequired);
    }

    let sequences_valid = rows.iter().all(|row| {
        row.get(1)
            .is_some_and(|sequence| AMINO_ACIDS.is_match(sequence))
    });
    if !sequences_valid {
        return Err(DatasetError::SequenceInvalidFormat);
    }

    let value_columns = headers.len().saturating_sub(2);
    if value_columns < MIN_VALUE_COLUMNS {
        return Err(DatasetError::TooFewValueColumns);
    }
    if value_columns > MAX_VALUE_COLUMNS {
        return Err(DatasetError::TooManyValueColumns);
    }

    Ok(())
}

/// Header-only gate used before rendering a table of rows.
pub fn check_table_headers(headers: &[String]) -> bool {
    headers.first().map(String::as_str) == Some("id")
        && headers.get(1).map(String::as_str) == Some("sequence")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQUENCES: [&str; 4] = ["ACDEFG", "HIKLMN", "PQRSTV", "WYACDE"];

    fn dataset_text(headers: &str, rows: usize) -> String {
        let columns = headers.split(',').count();
        let mut text = headers.to_string();
        for i in 0..rows {
            text.push('\n');
            text.push_str(&format!("{i},{}", SEQUENCES[i % SEQUENCES.len()]));
            for c in 2..columns {
                text.push_str(&format!(",{}.{c}", i % 7));
            }
        }
        text
    }

    #[test]
    fn valid_dataset_passes() {
        let text = dataset_text("id,sequence,value1", 40);
        let dataset = validate(&text).expect("dataset should validate");
        assert_eq!(dataset.rows.len(), 40);
        assert_eq!(dataset.value_columns(), &["value1".to_string()][..]);
    }

    #[test]
    fn row_count_bounds() {
        let too_few = dataset_text("id,sequence,value1", 39);
        assert_eq!(validate(&too_few), Err(DatasetError::TooFewRows));

        let too_many = dataset_text("id,sequence,value1", 10_001);
        assert_eq!(validate(&too_many), Err(DatasetError::TooManyRows));

        let upper = dataset_text("id,sequence,value1", 10_000);
        assert!(validate(&upper).is_ok());
    }

    #[test]
    fn renamed_id_header_fails() {
        let text = dataset_text("ID,sequence,value1", 40);
        let err = validate(&text).unwrap_err();
        assert_eq!(err, DatasetError::IdRequired);
        assert_eq!(err.code(), "id.required");
    }

    #[test]
    fn duplicate_ids_fail() {
        let mut text = dataset_text("id,sequence,value1", 40);
        text.push_str("\n0,ACDE,1.0");
        assert_eq!(validate(&text), Err(DatasetError::IdDuplicate));
    }

    #[test]
    fn sequence_header_required() {
        let text = dataset_text("id,seq,value1", 40);
        assert_eq!(validate(&text), Err(DatasetError::SequenceRequired));
    }

    #[test]
    fn sequence_alphabet_is_case_insensitive() {
        let text = dataset_text("id,sequence,value1", 40).replace("ACDEFG", "acdefg");
        assert!(validate(&text).is_ok());

        let bad = dataset_text("id,sequence,value1", 40).replace("HIKLMN", "HIKLMX");
        assert_eq!(validate(&bad), Err(DatasetError::SequenceInvalidFormat));
    }

    #[test]
    fn blank_line_rows_fail_sequence_check() {
        let text = dataset_text("id,sequence,value1", 40).replacen("\n3,", "\n\n3,", 1);
        assert_eq!(validate(&text), Err(DatasetError::SequenceInvalidFormat));
    }

    #[test]
    fn value_column_bounds() {
        let none = dataset_text("id,sequence", 40);
        assert_eq!(validate(&none), Err(DatasetError::TooFewValueColumns));

        let six = dataset_text("id,sequence,a,b,c,d,e,f", 40);
        assert_eq!(validate(&six), Err(DatasetError::TooManyValueColumns));

        let five = dataset_text("id,sequence,a,b,c,d,e", 40);
        assert!(validate(&five).is_ok());
    }

    #[test]
    fn rule_order_reports_first_failure() {
        // too few rows wins over the bad header
        let text = dataset_text("ID,seq", 3);
        assert_eq!(validate(&text), Err(DatasetError::TooFewRows));
    }

    #[test]
    fn validation_is_idempotent() {
        let text = dataset_text("id,sequence,value1", 45);
        assert_eq!(validate(&text), validate(&text));
    }

    #[test]
    fn table_header_gate() {
        let ok = vec!["id".to_string(), "sequence".to_string()];
        assert!(check_table_headers(&ok));
        assert!(!check_table_headers(&["id".to_string()]));
    }
}
