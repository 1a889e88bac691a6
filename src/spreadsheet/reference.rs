//! Spreadsheet-style column letters and row numbers.

/// Converts a 0-based column index to spreadsheet column letters:
/// 0 = A, 25 = Z, 26 = AA, 27 = AB, ..., 701 = ZZ, 702 = AAA.
pub fn index_to_col(index: usize) -> String {
    let mut column = index + 1;
    let mut letters = String::new();
    while column > 0 {
        column -= 1;
        let digit = char::from_u32(65 + (column % 26) as u32).expect("Hardcode letters");
        column /= 26;
        letters.insert(0, digit);
    }
    letters
}

/// Parses column letters (case-insensitive) to a 0-based column index.
/// Returns None for an empty string or anything that is not A-Z.
pub fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    letters
        .to_ascii_uppercase()
        .chars()
        .map(|letter| letter as usize - 'A' as usize + 1)
        .try_fold(0usize, |index, digit| index.checked_mul(26)?.checked_add(digit))
        .map(|column| column - 1)
}

/// Parses a 1-based row number. Zero and non-numeric input yield None.
pub fn row_to_number(number: &str) -> Option<usize> {
    number.parse().ok().filter(|row: &usize| *row > 0)
}
