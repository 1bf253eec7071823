use super::dsv::Dataset;

/// Summary of a value column, shown next to each objective and used to seed
/// range bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

/// Statistics over the numeric cells of `column`. Cells that do not parse as
/// numbers are skipped; `None` when nothing numeric remains.
pub fn column_stats(dataset: &Dataset, column: &str) -> Option<ColumnStats> {
    let index = dataset.column_index(column)?;

    let mut values: Vec<f64> = dataset
        .rows
        .iter()
        .filter_map(|row| row.get(index))
        .filter_map(|cell| cell.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .collect();

    if values.is_empty() {
        return None;
    }

    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 0 {
        (values[count / 2 - 1] + values[count / 2]) / 2.0
    } else {
        values[count / 2]
    };

    Some(ColumnStats {
        min: values[0],
        max: values[count - 1],
        mean,
        median,
    })
}

impl ColumnStats {
    /// `min / max / mean / median` with at most three fraction digits.
    pub fn summary(&self) -> String {
        format!(
            "min {} / max {} / mean {} / median {}",
            format_stat(self.min),
            format_stat(self.max),
            format_stat(self.mean),
            format_stat(self.median)
        )
    }
}

fn format_stat(value: f64) -> String {
    let rounded = format!("{value:.3}");
    rounded
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
