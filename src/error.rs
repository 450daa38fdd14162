use thiserror::Error;

/// Errors reported while encoding puzzles, driving the oracle or reading models.
///
/// Sort mismatches, ill-sorted term construction and unbalanced scopes are
/// programming errors and panic instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A pinned cell or value lies outside the grid.
    #[error("{what} {value} is out of bounds [{min}, {max}]")]
    OutOfBounds {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// An integer cannot be represented as a signed `bits`-bit value.
    #[error("value {value} does not fit into {bits}-bit signed range")]
    Range { value: i64, bits: u32 },

    /// Invalid puzzle parameters.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Malformed puzzle text (`line` is 1-based).
    #[error("line {line}: {message}")]
    Input { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A model was requested while the last check was not satisfiable.
    #[error("no model available: last check was not satisfiable")]
    NoModel,

    /// The model has no value for a term the caller asked about.
    #[error("model has no interpretation for `{0}`")]
    MissingInterpretation(String),

    /// More than one trigger of an exactly-one group is true in a model.
    #[error("exactly-one violated at step {step}: {first} and {second} are both true")]
    ExactlyOneViolated {
        step: usize,
        first: String,
        second: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = Error::OutOfBounds {
            what: "row",
            value: 9,
            min: 0,
            max: 8,
        };
        assert_eq!(e.to_string(), "row 9 is out of bounds [0, 8]");
        let e = Error::Range { value: 300, bits: 8 };
        assert_eq!(e.to_string(), "value 300 does not fit into 8-bit signed range");
        let e = Error::Input {
            line: 3,
            message: "bad field `x`".to_string(),
        };
        assert_eq!(e.to_string(), "line 3: bad field `x`");
    }
}
