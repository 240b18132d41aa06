// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all RSN kernel failures.
#[derive(Error, Debug)]
pub enum RsnError {
    /// Invalid configuration parameter.
    #[error("config error: {0}")]
    Config(String),

    /// Vector or matrix dimension does not match the configured shape.
    #[error("shape mismatch: expected {expected}, got {got}")]
    Shape { expected: usize, got: usize },

    /// Φ has no usable pivot in this column; decoding is undefined.
    #[error("singular matrix: no usable pivot in column {column}")]
    SingularMatrix { column: usize },

    /// Numerical error (NaN/Inf in computation).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Malformed or inconsistent dataset.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Reading a config or dataset file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RsnResult<T> = Result<T, RsnError>;

impl RsnError {
    /// Shape check helper: `Ok(())` when `got == expected`.
    pub fn check_len(expected: usize, got: usize) -> RsnResult<()> {
        if expected == got {
            Ok(())
        } else {
            Err(RsnError::Shape { expected, got })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len() {
        assert!(RsnError::check_len(4, 4).is_ok());
        match RsnError::check_len(4, 3) {
            Err(RsnError::Shape { expected, got }) => {
                assert_eq!(expected, 4);
                assert_eq!(got, 3);
            }
            other => panic!("expected shape error, got {other:?}"),
        }
    }

    #[test]
    fn test_display_singular() {
        let e = RsnError::SingularMatrix { column: 2 };
        assert_eq!(e.to_string(), "singular matrix: no usable pivot in column 2");
    }
}
