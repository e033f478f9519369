use thiserror::Error;

/// Number of rows (A–H) on a standard 96-well plate.
pub const ROWS: u8 = 8;
/// Number of columns (1–12) on a standard 96-well plate.
pub const COLUMNS: u8 = 12;
/// Total addressable positions per labware.
pub const WELL_COUNT: usize = (ROWS as usize) * (COLUMNS as usize);

/// A well identifier that does not name a position on a 96-well plate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid well address '{well}': {reason}")]
pub struct AddressingError {
    pub well: String,
    pub reason: &'static str,
}

impl AddressingError {
    fn new(well: &str, reason: &'static str) -> Self {
        Self {
            well: well.to_string(),
            reason,
        }
    }
}

/// Convert an alphanumeric well id (e.g. `"A1"`) to its numeric position (1–96).
///
/// Positions run column-major: A1 → 1, B1 → 2, …, H1 → 8, A2 → 9, …, H12 → 96.
/// The row letter is case-insensitive; the column is one or two digits.
pub fn well_to_position(well: &str) -> Result<u8, AddressingError> {
    let mut chars = well.chars();
    let row = chars
        .next()
        .ok_or_else(|| AddressingError::new(well, "empty well id"))?
        .to_ascii_uppercase();
    if !('A'..='H').contains(&row) {
        return Err(AddressingError::new(well, "row must be a letter A-H"));
    }

    let digits = chars.as_str();
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AddressingError::new(well, "column must be one or two digits"));
    }
    let column: u8 = digits
        .parse()
        .map_err(|_| AddressingError::new(well, "column must be one or two digits"))?;
    if !(1..=COLUMNS).contains(&column) {
        return Err(AddressingError::new(well, "column must be between 1 and 12"));
    }

    let row_offset = row as u8 - b'A';
    Ok((column - 1) * ROWS + row_offset + 1)
}

/// Inverse of [`well_to_position`]. Returns `None` outside 1–96.
pub fn position_to_well(position: u8) -> Option<String> {
    if position == 0 || usize::from(position) > WELL_COUNT {
        return None;
    }
    let index = position - 1;
    let row = (b'A' + index % ROWS) as char;
    let column = index / ROWS + 1;
    Some(format!("{row}{column}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_positions() {
        assert_eq!(well_to_position("A1").unwrap(), 1);
        assert_eq!(well_to_position("B1").unwrap(), 2);
        assert_eq!(well_to_position("H1").unwrap(), 8);
        assert_eq!(well_to_position("A2").unwrap(), 9);
        assert_eq!(well_to_position("H12").unwrap(), 96);
    }

    #[test]
    fn row_letter_is_case_insensitive() {
        assert_eq!(well_to_position("c5").unwrap(), well_to_position("C5").unwrap());
    }

    #[test]
    fn leading_zero_column_is_accepted() {
        assert_eq!(well_to_position("A01").unwrap(), 1);
    }

    #[test]
    fn addressing_is_a_bijection() {
        let mut seen = [false; WELL_COUNT];
        for row in 'A'..='H' {
            for column in 1..=12 {
                let well = format!("{row}{column}");
                let pos = well_to_position(&well).unwrap();
                assert!((1..=96).contains(&pos));
                assert!(!seen[usize::from(pos - 1)], "{well} collides");
                seen[usize::from(pos - 1)] = true;
                assert_eq!(position_to_well(pos).unwrap(), well);
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn rejects_bad_rows() {
        let err = well_to_position("I1").unwrap_err();
        assert_eq!(err.well, "I1");
        assert!(well_to_position("11").is_err());
    }

    #[test]
    fn rejects_bad_columns() {
        for well in ["A0", "A13", "A", "A123", "Ax", "A-1", ""] {
            let err = well_to_position(well).unwrap_err();
            assert_eq!(err.well, well);
        }
    }

    #[test]
    fn error_names_offending_well() {
        let err = well_to_position("Z9").unwrap_err();
        assert!(err.to_string().contains("'Z9'"));
    }

    #[test]
    fn position_to_well_out_of_range() {
        assert_eq!(position_to_well(0), None);
        assert_eq!(position_to_well(97), None);
    }
}
