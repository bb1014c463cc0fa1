//! Subplot grid shapes.

use crate::error::{IsobarError, Result};

/// `(rows, columns)` for small subplot counts.
const PRESET_SHAPES: [(usize, usize); 21] = [
    (0, 0),
    (1, 1),
    (1, 2),
    (1, 3),
    (2, 2),
    (2, 3),
    (2, 3),
    (2, 4),
    (2, 4),
    (2, 5),
    (2, 5),
    (3, 4),
    (3, 4),
    (3, 5),
    (3, 5),
    (3, 5),
    (3, 6),
    (3, 6),
    (3, 6),
    (4, 5),
    (4, 5),
];

/// Default cap on columns for counts beyond the presets.
pub const MAX_COLUMNS: usize = 8;

/// The `(rows, columns)` grid for `num_subplots` subplots.
///
/// With neither dimension given, small counts use preset shapes and larger
/// ones fill rows of at most `max_columns`. Giving one dimension derives the
/// other; giving both checks that the grid is large enough.
pub fn rows_cols(
    num_subplots: usize,
    rows: Option<usize>,
    columns: Option<usize>,
    max_columns: usize,
) -> Result<(usize, usize)> {
    let shape = match (rows, columns) {
        (None, None) => match PRESET_SHAPES.get(num_subplots) {
            Some(shape) => *shape,
            None => {
                let columns = max_columns.max(1).min(num_subplots);
                (num_subplots.div_ceil(columns), columns)
            }
        },
        (Some(rows), None) => {
            let rows = non_zero("rows", rows)?;
            (rows, num_subplots.div_ceil(rows))
        }
        (None, Some(columns)) => {
            let columns = non_zero("columns", columns)?;
            (num_subplots.div_ceil(columns), columns)
        }
        (Some(rows), Some(columns)) => {
            if rows * columns < num_subplots {
                return Err(IsobarError::Layout {
                    message: format!(
                        "{} subplots is too many for a {}x{} grid; it can hold at most {}",
                        num_subplots,
                        rows,
                        columns,
                        rows * columns
                    ),
                });
            }
            (rows, columns)
        }
    };
    Ok(shape)
}

fn non_zero(name: &str, value: usize) -> Result<usize> {
    if value == 0 {
        return Err(IsobarError::Layout {
            message: format!("a figure needs at least one {}", name.trim_end_matches('s')),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_shapes() {
        assert_eq!(rows_cols(0, None, None, MAX_COLUMNS).unwrap(), (0, 0));
        assert_eq!(rows_cols(1, None, None, MAX_COLUMNS).unwrap(), (1, 1));
        assert_eq!(rows_cols(5, None, None, MAX_COLUMNS).unwrap(), (2, 3));
        assert_eq!(rows_cols(20, None, None, MAX_COLUMNS).unwrap(), (4, 5));
    }

    #[test]
    fn test_beyond_presets() {
        assert_eq!(rows_cols(21, None, None, MAX_COLUMNS).unwrap(), (3, 8));
        assert_eq!(rows_cols(30, None, None, 10).unwrap(), (3, 10));
    }

    #[test]
    fn test_one_dimension_given() {
        assert_eq!(rows_cols(5, Some(1), None, MAX_COLUMNS).unwrap(), (1, 5));
        assert_eq!(rows_cols(5, Some(2), None, MAX_COLUMNS).unwrap(), (2, 3));
        assert_eq!(rows_cols(5, None, Some(1), MAX_COLUMNS).unwrap(), (5, 1));
        assert_eq!(rows_cols(7, None, Some(3), MAX_COLUMNS).unwrap(), (3, 3));
        assert!(rows_cols(3, Some(0), None, MAX_COLUMNS).is_err());
    }

    #[test]
    fn test_grid_too_small() {
        let err = rows_cols(6, Some(2), Some(2), MAX_COLUMNS).unwrap_err();
        assert!(matches!(err, IsobarError::Layout { .. }));
        assert!(err.to_string().contains("6 subplots is too many for a 2x2 grid"));
        assert_eq!(rows_cols(4, Some(2), Some(2), MAX_COLUMNS).unwrap(), (2, 2));
    }
}
