//! Position CSV import and export.
//!
//! The schema is two columns, no header, one `x,y` pair per row. Rows hold
//! either integer native-pixel coordinates or float geographic coordinates;
//! the two are distinguished by the form of the first value.

use crate::error::{CoreError, Result};

/// Coordinate system of a parsed position file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionKind {
    /// Integer native-pixel coordinates.
    Pixel,
    /// Float geographic coordinates, converted through the geotransform.
    Geographic,
}

/// The rows of one position file, with the detected coordinate system.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPositions {
    pub kind: PositionKind,
    pub rows: Vec<(f64, f64)>,
}

/// Parse a headerless two-column CSV of positions.
///
/// The first row's first value decides the coordinate system: an integer
/// means pixel coordinates, anything with a fractional form means
/// geographic. Blank lines are skipped.
pub fn parse_positions(text: &str) -> Result<ParsedPositions> {
    let mut kind = None;
    let mut rows = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lineno = idx + 1;

        let mut fields = line.split(',');
        let (Some(xs), Some(ys), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(CoreError::invalid_position(
                lineno,
                format!("expected two comma-separated values, got '{line}'"),
            ));
        };
        let xs = xs.trim();
        let ys = ys.trim();

        if kind.is_none() {
            kind = Some(if xs.parse::<i64>().is_ok() {
                PositionKind::Pixel
            } else {
                PositionKind::Geographic
            });
        }

        let x: f64 = xs
            .parse()
            .map_err(|_| CoreError::invalid_position(lineno, format!("bad x value '{xs}'")))?;
        let y: f64 = ys
            .parse()
            .map_err(|_| CoreError::invalid_position(lineno, format!("bad y value '{ys}'")))?;
        rows.push((x, y));
    }

    let Some(kind) = kind else {
        return Err(CoreError::empty_input("position file has no rows"));
    };
    Ok(ParsedPositions { kind, rows })
}

/// Format integer pixel positions as two-column CSV.
pub fn format_pixel_positions(rows: &[(i64, i64)]) -> String {
    rows.iter()
        .map(|(x, y)| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format geographic positions as two-column CSV.
pub fn format_geo_positions(rows: &[(f64, f64)]) -> String {
    rows.iter()
        .map(|(x, y)| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pixel_positions() {
        let parsed = parse_positions("120,340\n55,60\n").unwrap();
        assert_eq!(parsed.kind, PositionKind::Pixel);
        assert_eq!(parsed.rows, vec![(120.0, 340.0), (55.0, 60.0)]);
    }

    #[test]
    fn test_parse_geographic_positions() {
        let parsed = parse_positions("250001.5,2650002.25\n250010.0,2650020.5").unwrap();
        assert_eq!(parsed.kind, PositionKind::Geographic);
        assert_eq!(parsed.rows[0], (250001.5, 2650002.25));
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let parsed = parse_positions("1,2\n\n3,4\n").unwrap();
        assert_eq!(parsed.rows.len(), 2);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse_positions("1,2\nnot-a-number,4").unwrap_err();
        assert!(matches!(err, CoreError::InvalidPosition { line: 2, .. }));

        let err = parse_positions("1,2,3").unwrap_err();
        assert!(matches!(err, CoreError::InvalidPosition { line: 1, .. }));
    }

    #[test]
    fn test_parse_empty_is_empty_input() {
        assert!(matches!(
            parse_positions("\n\n"),
            Err(CoreError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_format_round_trip() {
        let csv = format_pixel_positions(&[(12, 34), (56, 78)]);
        assert_eq!(csv, "12,34\n56,78");
        let parsed = parse_positions(&csv).unwrap();
        assert_eq!(parsed.kind, PositionKind::Pixel);
        assert_eq!(parsed.rows, vec![(12.0, 34.0), (56.0, 78.0)]);
    }
}
