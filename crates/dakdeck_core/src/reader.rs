//! Reading tables out of the solver's text report
//!
//! Each statistics section starts with a fixed title line and ends at the
//! next blank line. [`snip_text`] cuts a section out (title included) and
//! the parsers turn the whitespace-delimited block into a [`Table`].

/// Title of the Pearson correlation section
pub const PEARSON: &str = "Simple Correlation Matrix among all inputs and outputs:";
/// Title of the Spearman rank correlation section
pub const SPEARMAN: &str = "Simple Rank Correlation Matrix among all inputs and outputs:";
pub const PARTIAL: &str = "Partial Correlation Matrix between input and output:";
pub const PARTIAL_RANK: &str = "Partial Rank Correlation Matrix between input and output:";
pub const MOMENTS: &str = "Sample moment statistics for each response function:";
pub const CONFIDENCE_INTERVALS: &str = "95% confidence intervals for each response function:";

/// Column labels of the moments section; its header splits `Std Dev`
pub const MOMENT_COLUMNS: [&str; 4] = ["Mean", "Std Dev", "Skewness", "Kurtosis"];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReadError {
    #[error("starting string {0:?} was not found in text")]
    MissingStart(String),

    #[error("ending string {0:?} was not found in text")]
    MissingEnd(String),

    #[error("table line {line}: {message}")]
    Table { line: usize, message: String },
}

/// Slices `text` from the first occurrence of `start` up to the next `end`.
///
/// The slice includes `start` and excludes `end`. When `end` never follows
/// `start` the rest of the text is returned if `allow_eof` is set.
pub fn snip_text<'a>(
    text: &'a str,
    start: &str,
    end: &str,
    allow_eof: bool,
) -> Result<&'a str, ReadError> {
    let from = text
        .find(start)
        .ok_or_else(|| ReadError::MissingStart(start.to_string()))?;
    let rest = &text[from..];
    match rest.find(end) {
        Some(to) => Ok(&rest[..to]),
        None if allow_eof => Ok(rest),
        None => Err(ReadError::MissingEnd(end.to_string())),
    }
}

/// A section up to its terminating blank line; the report may end right
/// after the last section
fn section<'a>(text: &'a str, title: &str) -> Result<&'a str, ReadError> {
    snip_text(text, title, "\n\n", true)
}

/// Labelled numeric table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: Vec<String>,
    columns: Vec<String>,
    cells: Vec<Vec<f64>>,
}

impl Table {
    /// `cells` holds one row per label with one value per column; the
    /// parsers below check this before building a table
    pub(crate) fn new(rows: Vec<String>, columns: Vec<String>, cells: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(rows.len(), cells.len());
        debug_assert!(cells.iter().all(|row| row.len() == columns.len()));
        Self {
            rows,
            columns,
            cells,
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.rows.iter().position(|label| label == row)?;
        let c = self.columns.iter().position(|label| label == column)?;
        self.cells.get(r)?.get(c).copied()
    }

    pub fn row(&self, label: &str) -> Option<&[f64]> {
        let r = self.rows.iter().position(|row| row == label)?;
        self.cells.get(r).map(Vec::as_slice)
    }

    pub fn column(&self, label: &str) -> Option<Vec<f64>> {
        let c = self.columns.iter().position(|column| column == label)?;
        self.cells.iter().map(|row| row.get(c).copied()).collect()
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        let cells = (0..self.columns.len())
            .map(|c| self.cells.iter().map(|row| row[c]).collect())
            .collect();
        Self {
            rows: self.columns.clone(),
            columns: self.rows.clone(),
            cells,
        }
    }
}

fn parse_cell(raw: &str, line: usize) -> Result<f64, ReadError> {
    raw.parse::<f64>().map_err(|_| ReadError::Table {
        line,
        message: format!("non-numeric cell {raw:?}"),
    })
}

/// Splits a block into its header tokens and `<label> <values...>` rows,
/// after skipping `skip_rows` lines
fn split_block(
    block: &str,
    skip_rows: usize,
) -> Result<(Vec<String>, Vec<(usize, String, Vec<f64>)>), ReadError> {
    let mut lines = block
        .lines()
        .enumerate()
        .skip(skip_rows)
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (_, header) = lines.next().ok_or(ReadError::Table {
        line: skip_rows + 1,
        message: "missing column header".to_string(),
    })?;
    let columns = header.split_whitespace().map(str::to_string).collect();

    let mut rows = Vec::new();
    for (number, line) in lines {
        let mut tokens = line.split_whitespace();
        let Some(label) = tokens.next() else {
            continue;
        };
        let values = tokens
            .map(|raw| parse_cell(raw, number))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push((number, label.to_string(), values));
    }
    Ok((columns, rows))
}

/// Parses a rectangular whitespace-delimited table.
///
/// After `skip_rows` lines the first line holds the column labels and every
/// following line a row label and exactly one value per column.
pub fn parse_table(block: &str, skip_rows: usize) -> Result<Table, ReadError> {
    let (columns, rows) = split_block(block, skip_rows)?;
    parse_fixed(columns, rows)
}

fn parse_fixed(
    columns: Vec<String>,
    rows: Vec<(usize, String, Vec<f64>)>,
) -> Result<Table, ReadError> {
    let mut labels = Vec::with_capacity(rows.len());
    let mut cells = Vec::with_capacity(rows.len());
    for (number, label, values) in rows {
        if values.len() != columns.len() {
            return Err(ReadError::Table {
                line: number,
                message: format!(
                    "row {label:?} has {} values for {} columns",
                    values.len(),
                    columns.len()
                ),
            });
        }
        labels.push(label);
        cells.push(values);
    }
    Ok(Table::new(labels, columns, cells))
}

/// Parses a symmetric matrix printed as its lower triangle; the upper
/// triangle is mirrored from it
pub fn parse_lower_triangular(block: &str, skip_rows: usize) -> Result<Table, ReadError> {
    let (columns, rows) = split_block(block, skip_rows)?;
    let n = columns.len();
    let mut labels = Vec::with_capacity(rows.len());
    let mut cells = vec![vec![f64::NAN; n]; rows.len()];
    for (r, (number, label, values)) in rows.into_iter().enumerate() {
        if values.len() > n || values.len() != (r + 1).min(n) {
            return Err(ReadError::Table {
                line: number,
                message: format!("row {label:?} has {} values, expected {}", values.len(), r + 1),
            });
        }
        for (c, value) in values.into_iter().enumerate() {
            cells[r][c] = value;
        }
        labels.push(label);
    }
    for r in 0..labels.len() {
        for c in (r + 1)..n.min(labels.len()) {
            cells[r][c] = cells[c][r];
        }
    }
    Ok(Table::new(labels, columns, cells))
}

/// Pearson correlation among all inputs and outputs
pub fn read_pearson(text: &str) -> Result<Table, ReadError> {
    parse_lower_triangular(section(text, PEARSON)?, 1)
}

/// Spearman rank correlation among all inputs and outputs
pub fn read_spearman(text: &str) -> Result<Table, ReadError> {
    parse_lower_triangular(section(text, SPEARMAN)?, 1)
}

/// Partial correlation; one row per response function
pub fn read_partial(text: &str) -> Result<Table, ReadError> {
    read_partial_matrix(section(text, PARTIAL)?)
}

/// Partial rank correlation; one row per response function
pub fn read_partial_rank(text: &str) -> Result<Table, ReadError> {
    read_partial_matrix(section(text, PARTIAL_RANK)?)
}

/// The report lists inputs down the side; transposed so rows are responses
pub fn read_partial_matrix(block: &str) -> Result<Table, ReadError> {
    Ok(parse_table(block, 1)?.transpose())
}

/// Mean, standard deviation, skewness and kurtosis per response function
pub fn read_moments(text: &str) -> Result<Table, ReadError> {
    let (_, rows) = split_block(section(text, MOMENTS)?, 1)?;
    let columns = MOMENT_COLUMNS.iter().map(|c| c.to_string()).collect();
    parse_fixed(columns, rows)
}

/// Confidence interval bounds of the mean and standard deviation
pub fn read_confidence_intervals(text: &str) -> Result<Table, ReadError> {
    parse_table(section(text, CONFIDENCE_INTERVALS)?, 1)
}
