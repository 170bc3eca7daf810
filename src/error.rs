use thiserror::Error;

/// Broad grouping of parse diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Syntax,
    Structural,
    Chemical,
}

/// A diagnostic produced while reading or perceiving a molecule.
///
/// Diagnostics are collected rather than returned early, so a single parse can
/// report several of them alongside a best-effort molecule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    #[error("Unsupported character '{ch}' at position {position}")]
    UnsupportedCharacter { ch: char, position: usize },
    #[error("Unclosed bracket '[' at position {position}")]
    UnclosedBracket { position: usize },
    #[error("Invalid bracket atom '[{content}]' at position {position}")]
    InvalidBracketAtom { content: String, position: usize },
    #[error("Invalid ring-closure label at position {position}")]
    InvalidRingLabel { position: usize },
    #[error("Ring closure {label} at position {position} without a current atom")]
    RingClosureNoCurrentAtom { label: u8, position: usize },
    #[error("Bond symbol at position {position} is not followed by an atom")]
    DanglingBond { position: usize },
    #[error("Branch end ')' at position {position} without a matching '('")]
    UnmatchedBranchEnd { position: usize },
    #[error("{count} branch(es) opened with '(' were never closed")]
    UnclosedBranch { count: usize },
    #[error("Ring closure {label} is never closed")]
    UnclosedRing { label: u8 },
    #[error("Ring closure {label} closes atom {atom} onto itself")]
    SelfClosingRing { label: u8, atom: usize },
    #[error("Ring closure {label} has {endpoints} distinct endpoints")]
    TooManyRingEndpoints { label: u8, endpoints: usize },
    #[error("Ring closure {label} specifies conflicting bond types")]
    RingBondConflict { label: u8 },
    #[error("Ring closure {label} duplicates the existing bond {first}-{second}")]
    DuplicateBond { label: u8, first: usize, second: usize },
    #[error("Atom {atom} ({element}) has valence {valence}, exceeding its maximum of {max}")]
    ValenceExceeded {
        atom: usize,
        element: String,
        valence: u32,
        max: u32,
    },
    #[error("Ring {ring:?} has {pi_electrons} pi electrons and violates Hückel's rule")]
    HuckelViolation { ring: Vec<usize>, pi_electrons: u32 },
    #[error("Aromatic atom {atom} is not part of any ring")]
    AromaticAtomNotInRing { atom: usize },
    #[error("Ring analysis too complex: cycle search exceeded {budget} steps")]
    RingAnalysisTooComplex { budget: usize },
}

impl SmilesError {
    /// Character index into the whole input, when the diagnostic has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            SmilesError::UnsupportedCharacter { position, .. }
            | SmilesError::UnclosedBracket { position }
            | SmilesError::InvalidBracketAtom { position, .. }
            | SmilesError::InvalidRingLabel { position }
            | SmilesError::RingClosureNoCurrentAtom { position, .. }
            | SmilesError::DanglingBond { position }
            | SmilesError::UnmatchedBranchEnd { position } => Some(*position),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SmilesError::UnsupportedCharacter { .. }
            | SmilesError::UnclosedBracket { .. }
            | SmilesError::InvalidBracketAtom { .. }
            | SmilesError::InvalidRingLabel { .. }
            | SmilesError::RingClosureNoCurrentAtom { .. }
            | SmilesError::DanglingBond { .. }
            | SmilesError::UnmatchedBranchEnd { .. }
            | SmilesError::UnclosedBranch { .. } => ErrorCategory::Syntax,
            SmilesError::UnclosedRing { .. }
            | SmilesError::SelfClosingRing { .. }
            | SmilesError::TooManyRingEndpoints { .. }
            | SmilesError::RingBondConflict { .. }
            | SmilesError::DuplicateBond { .. } => ErrorCategory::Structural,
            SmilesError::ValenceExceeded { .. }
            | SmilesError::HuckelViolation { .. }
            | SmilesError::AromaticAtomNotInRing { .. }
            | SmilesError::RingAnalysisTooComplex { .. } => ErrorCategory::Chemical,
        }
    }
}

/// A rejected graph mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node {0} does not exist")]
    MissingNode(usize),
    #[error("Edge {0}-{0} would be a self loop")]
    SelfLoop(usize),
    #[error("Edge {0}-{1} already exists")]
    DuplicateEdge(usize, usize),
}

/// Cycle enumeration gave up before finishing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error("Cycle search exceeded its budget of {0} steps")]
    TooComplex(usize),
}

/// A molecule that cannot be written as SMILES.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("Ring closure {label} is beyond the largest writable label %99")]
    RingLabelsExhausted { label: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("Molecule has not been enriched")]
    NotEnriched,
    #[error("No naming rule applies: {0}")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_and_categories() {
        let err = SmilesError::UnclosedBracket { position: 3 };
        assert_eq!(err.position(), Some(3));
        assert_eq!(err.category(), ErrorCategory::Syntax);
        assert_eq!(err.to_string(), "Unclosed bracket '[' at position 3");

        let err = SmilesError::UnclosedBranch { count: 2 };
        assert_eq!(err.position(), None);

        let err = SmilesError::RingBondConflict { label: 1 };
        assert_eq!(err.category(), ErrorCategory::Structural);

        let err = SmilesError::RingAnalysisTooComplex { budget: 10 };
        assert_eq!(err.category(), ErrorCategory::Chemical);
    }
}
