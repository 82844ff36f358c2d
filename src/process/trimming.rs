use crate::process::utils::truncate_chars;
use crate::schema::CanonicalRow;

/// Cap every text cell of `row` at `max_chars` characters. Returns how many
/// cells were shortened.
pub fn apply_trimming(row: &mut CanonicalRow, max_chars: usize) -> usize {
    let mut trimmed = 0;
    let cells = row.text.iter_mut().chain(std::iter::once(&mut row.order_month));
    for cell in cells.flatten() {
        let keep = truncate_chars(cell, max_chars).len();
        if keep < cell.len() {
            cell.truncate(keep);
            trimmed += 1;
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_text_is_cut() {
        let mut row = CanonicalRow {
            text: vec![Some("x".repeat(600)), Some("short".into()), None],
            ..Default::default()
        };
        assert_eq!(apply_trimming(&mut row, 500), 1);
        assert_eq!(row.text[0].as_ref().map(|s| s.chars().count()), Some(500));
        assert_eq!(row.text[1].as_deref(), Some("short"));
        assert_eq!(row.text[2], None);
    }

    #[test]
    fn multibyte_text_cut_on_char_boundary() {
        let mut row = CanonicalRow {
            text: vec![Some("ñ".repeat(501))],
            ..Default::default()
        };
        apply_trimming(&mut row, 500);
        assert_eq!(row.text[0].as_deref(), Some("ñ".repeat(500).as_str()));
    }
}
