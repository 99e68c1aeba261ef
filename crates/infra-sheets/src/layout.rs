// Sheet layout: header row, one column per subject, labels from row 2 down

/// Row holding the subject codes
pub const HEADER_ROW: usize = 1;

/// First row holding a label
pub const FIRST_LABEL_ROW: usize = 2;

/// Bijective base-26 column name for a 1-based column index (1 -> A, 27 -> AA)
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// `"Queue!A:ZZ"` -> `"Queue!"`, `"A:ZZ"` -> `""`
pub fn sheet_prefix(range: &str) -> &str {
    match range.find('!') {
        Some(bang) => &range[..=bang],
        None => "",
    }
}

/// 0-based index of the first column whose header contains `code`
pub fn find_column(columns: &[Vec<String>], code: &str) -> Option<usize> {
    columns.iter().position(|column| {
        column
            .first()
            .is_some_and(|header| header.contains(code))
    })
}

/// Non-blank labels below the header, top to bottom
pub fn labels(column: &[String]) -> Vec<String> {
    column
        .iter()
        .skip(1)
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// 1-based row of the first empty cell below the header
pub fn first_empty_row(column: &[String]) -> usize {
    column
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, cell)| cell.trim().is_empty())
        .map_or(column.len().max(1) + 1, |(index, _)| index + 1)
}

/// Column content (rows 2..) after removing the first `label`, compacted
/// upwards and padded with blanks so every previously used row is rewritten.
/// `None` if the label is not in the column.
pub fn without_label(column: &[String], label: &str) -> Option<Vec<String>> {
    let mut remaining = labels(column);
    let index = remaining.iter().position(|cell| cell == label.trim())?;
    remaining.remove(index);

    let used_rows = column.len().saturating_sub(1);
    remaining.resize(used_rows, String::new());
    Some(remaining)
}

/// 0-based index of the first column with a blank or missing header,
/// skipping indices already handed out
pub fn free_header_slot(columns: &[Vec<String>], taken: &[usize]) -> usize {
    (0..)
        .find(|index| {
            !taken.contains(index)
                && columns
                    .get(*index)
                    .and_then(|column| column.first())
                    .map_or(true, |header| header.trim().is_empty())
        })
        .unwrap_or(columns.len())
}
