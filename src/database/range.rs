use crate::error::SheetOrmError;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::index_to_col;
use crate::spreadsheet::reference::row_to_number;
use regex::Regex;
use std::fmt::Display;
use thiserror::Error;

/// Errors related to A1-style range parsing.
#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid range format '{0}'")]
    FormatError(String),

    #[error("Range '{0}' ends before it starts")]
    BoundError(String),
}

/// A rectangular, sheet-qualified A1 range such as `Pets!A2:E2`, or
/// `Pets!A1:E` when it extends to the last row with data. A range without a
/// last column covers the whole used area of the sheet and renders as the
/// bare sheet name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeSpec {
    /// Sheet (tab) name
    pub sheet: String,
    /// First row (1-based)
    pub row_lower_bound: usize,
    /// Last row (1-based), None for unbounded
    pub row_upper_bound: Option<usize>,
    /// First column (0-based index)
    pub col_lower_bound: usize,
    /// Last column (0-based index), None for the whole used width
    pub col_upper_bound: Option<usize>,
}

impl RangeSpec {
    /// Exactly one row, spanning `width` columns from column A.
    pub fn row(sheet: &str, row: usize, width: usize) -> Self {
        Self {
            sheet: sheet.to_owned(),
            row_lower_bound: row,
            row_upper_bound: Some(row),
            col_lower_bound: 0,
            col_upper_bound: Some(width.saturating_sub(1)),
        }
    }

    /// The whole used area of a sheet, from A1 to its last row and column
    /// with data.
    pub fn sheet(sheet: &str) -> Self {
        Self {
            sheet: sheet.to_owned(),
            row_lower_bound: 1,
            row_upper_bound: None,
            col_lower_bound: 0,
            col_upper_bound: None,
        }
    }

    /// Every row from `row` down, spanning `width` columns from column A.
    pub fn rows_from(sheet: &str, row: usize, width: usize) -> Self {
        Self {
            row_upper_bound: None,
            ..Self::row(sheet, row, width)
        }
    }

    /// Number of columns covered, None when unbounded.
    pub fn width(&self) -> Option<usize> {
        self.col_upper_bound.map(|col| col - self.col_lower_bound + 1)
    }

    /// Sheet name as it must appear before `!`, quoted when it contains
    /// anything but letters, digits and underscores.
    fn quoted_sheet(&self) -> String {
        if !self.sheet.is_empty()
            && self.sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.sheet.to_owned()
        } else {
            format!("'{}'", self.sheet.replace('\'', "''"))
        }
    }
}

impl Display for RangeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let col_upper_bound = match self.col_upper_bound {
            Some(col) => col,
            None => return write!(f, "{}", self.quoted_sheet()),
        };
        write!(
            f,
            "{}!{}{}:{}",
            self.quoted_sheet(),
            index_to_col(self.col_lower_bound),
            self.row_lower_bound,
            index_to_col(col_upper_bound)
        )?;
        match self.row_upper_bound {
            Some(row) => write!(f, "{}", row),
            None => Ok(()),
        }
    }
}

impl TryFrom<&str> for RangeSpec {
    type Error = SheetOrmError;

    /// Parses a sheet-qualified range ("Pets!A2:E2", "'My Pets'!A1:E", "Pets!B3").
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^(?:'((?:[^']|'')+)'|([^!']+))!([A-Za-z]+)(\d+)(?::([A-Za-z]+)(\d*))?$")
            .expect("Hardcode regex pattern");
        let error = || RangeError::FormatError(value.to_owned());
        let captures = pattern.captures(value).ok_or_else(error)?;
        let sheet = captures
            .get(1)
            .map(|matcher| matcher.as_str().replace("''", "'"))
            .or_else(|| captures.get(2).map(|matcher| matcher.as_str().to_owned()))
            .ok_or_else(error)?;
        let col_lower_bound = captures
            .get(3)
            .map(|matcher| matcher.as_str())
            .and_then(col_to_index)
            .ok_or_else(error)?;
        let row_lower_bound = captures
            .get(4)
            .map(|matcher| matcher.as_str())
            .and_then(row_to_number)
            .ok_or_else(error)?;
        let (col_upper_bound, row_upper_bound) = match captures.get(5) {
            Some(letters) => {
                let col = col_to_index(letters.as_str()).ok_or_else(error)?;
                let row = match captures.get(6).map(|matcher| matcher.as_str()) {
                    Some("") | None => None,
                    Some(number) => Some(row_to_number(number).ok_or_else(error)?),
                };
                (col, row)
            }
            None => (col_lower_bound, Some(row_lower_bound)),
        };
        if col_upper_bound < col_lower_bound
            || row_upper_bound.map(|row| row < row_lower_bound).unwrap_or(false)
        {
            Err(RangeError::BoundError(value.to_owned()))?;
        }
        Ok(RangeSpec {
            sheet,
            row_lower_bound,
            row_upper_bound,
            col_lower_bound,
            col_upper_bound: Some(col_upper_bound),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_single_row() {
        assert_eq!(RangeSpec::row("Pets", 2, 5).to_string(), "Pets!A2:E2");
        assert_eq!(RangeSpec::row("Pets", 1, 1).to_string(), "Pets!A1:A1");
    }

    #[test]
    fn render_open_ended() {
        assert_eq!(RangeSpec::rows_from("Pets", 1, 5).to_string(), "Pets!A1:E");
    }

    #[test]
    fn render_whole_sheet() {
        assert_eq!(RangeSpec::sheet("Pets").to_string(), "Pets");
        assert_eq!(RangeSpec::sheet("My Pets").to_string(), "'My Pets'");
        assert_eq!(RangeSpec::sheet("Pets").width(), None);
    }

    #[test]
    fn render_past_twenty_six_columns() {
        assert_eq!(RangeSpec::row("Wide", 7, 28).to_string(), "Wide!A7:AB7");
        assert_eq!(RangeSpec::row("Wide", 7, 28).width(), Some(28));
    }

    #[test]
    fn render_quoted_sheet_names() {
        assert_eq!(RangeSpec::row("My Pets", 2, 2).to_string(), "'My Pets'!A2:B2");
        assert_eq!(RangeSpec::row("Bob's", 2, 2).to_string(), "'Bob''s'!A2:B2");
    }

    #[test]
    fn parse_ranges() {
        let range = RangeSpec::try_from("Pets!A2:E2").unwrap();
        assert_eq!(range, RangeSpec::row("Pets", 2, 5));

        let range = RangeSpec::try_from("Pets!A1:E").unwrap();
        assert_eq!(range, RangeSpec::rows_from("Pets", 1, 5));

        let range = RangeSpec::try_from("'Bob''s'!b3").unwrap();
        assert_eq!(range.sheet, "Bob's");
        assert_eq!(range.col_lower_bound, 1);
        assert_eq!(range.col_upper_bound, Some(1));
        assert_eq!(range.row_upper_bound, Some(3));
    }

    #[test]
    fn parse_rendered_ranges() {
        for range in [
            RangeSpec::row("Pets", 9, 30),
            RangeSpec::rows_from("My Pets", 1, 3),
        ] {
            assert_eq!(RangeSpec::try_from(range.to_string().as_str()).unwrap(), range);
        }
    }

    #[test]
    fn reject_malformed_ranges() {
        assert!(RangeSpec::try_from("A1:B2").is_err());
        assert!(RangeSpec::try_from("Pets!A0:B2").is_err());
        assert!(RangeSpec::try_from("Pets!C1:A1").is_err());
        assert!(RangeSpec::try_from("Pets!A5:B2").is_err());
    }
}
