use core::fmt::Write;

use ember_params::Dim;

use crate::PackerError;

/// Append the textual form of `dim` followed by a line break.
pub fn write_dim(out: &mut String, dim: &Dim) {
    // Writing into a String can't fail.
    let _ = writeln!(out, "{dim}");
}

/// Parse a dimension line.
pub fn parse_dim(line: &str) -> Result<Dim, PackerError> {
    line.parse::<Dim>()
        .map_err(|err| PackerError::InvalidFormat(err.to_string()))
}

/// Append `values` separated by single spaces, followed by a line break.
///
/// Without a precision, each value is written with the shortest representation that parses
/// back to the same bits. With a precision, values are written in scientific notation with
/// that many fractional digits.
pub fn write_values(out: &mut String, values: &[f32], precision: Option<usize>) {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = match precision {
            Some(precision) => write!(out, "{value:.precision$e}"),
            None => write!(out, "{value}"),
        };
    }
    out.push('\n');
}

/// Parse a line of whitespace separated values, which must hold exactly `expected` values.
pub fn parse_values(line: &str, expected: usize) -> Result<Vec<f32>, PackerError> {
    // Grows with the tokens read, never with the count declared in the file.
    let mut values = Vec::new();

    for token in line.split_whitespace() {
        let value = token.parse::<f32>().map_err(|_| {
            PackerError::InvalidFormat(format!("'{token}' is not a number"))
        })?;
        if values.len() == expected {
            return Err(PackerError::InvalidFormat(format!(
                "Expected {expected} values, found more"
            )));
        }
        values.push(value);
    }

    if values.len() != expected {
        return Err(PackerError::InvalidFormat(format!(
            "Expected {expected} values, found {}",
            values.len()
        )));
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn should_write_values_on_one_line() {
        let mut out = String::new();

        write_values(&mut out, &[1.0, -0.5, 3.25], None);

        assert_eq!(out, "1 -0.5 3.25\n");
    }

    #[test]
    fn should_write_empty_values_as_empty_line() {
        let mut out = String::new();

        write_values(&mut out, &[], None);

        assert_eq!(out, "\n");
        assert_eq!(parse_values("", 0).unwrap(), Vec::<f32>::new());
    }

    #[test]
    fn should_keep_exact_bits_without_precision() {
        let values = [0.1f32, 1.0 / 3.0, f32::MIN_POSITIVE, f32::MAX, -7.5e-12];
        let mut out = String::new();

        write_values(&mut out, &values, None);
        let parsed = parse_values(out.trim_end(), values.len()).unwrap();

        for (before, after) in values.iter().zip(parsed.iter()) {
            assert_eq!(before.to_bits(), after.to_bits());
        }
    }

    #[test]
    fn should_write_values_with_precision() {
        let mut out = String::new();

        write_values(&mut out, &[1234.5678, 0.0], Some(3));

        assert_eq!(out, "1.235e3 0.000e0\n");
        assert_eq!(parse_values(&out, 2).unwrap(), vec![1235.0, 0.0]);
    }

    #[rstest]
    #[case("1 2 x", 3)]
    #[case("1 2", 3)]
    #[case("1 2 3 4", 3)]
    fn should_reject_invalid_values(#[case] line: &str, #[case] expected: usize) {
        let result = parse_values(line, expected);

        assert!(matches!(result, Err(PackerError::InvalidFormat(_))));
    }

    #[test]
    fn should_round_trip_dim_line() {
        let dim = Dim::new([3, 4]).with_batch(2);
        let mut out = String::new();

        write_dim(&mut out, &dim);

        assert_eq!(out, "{3,4X2}\n");
        assert_eq!(parse_dim(out.trim_end()).unwrap(), dim);
        assert!(matches!(
            parse_dim("3x4"),
            Err(PackerError::InvalidFormat(_))
        ));
    }
}
