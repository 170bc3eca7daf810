//! Molecular graphs from SMILES: parsing, hydrogen inference, ring perception,
//! aromaticity, enrichment and canonical output.

pub mod aromaticity;
pub mod atom;
pub mod bond;
pub mod canon;
pub mod config;
pub mod element;
pub mod enrich;
pub mod error;
pub mod generate;
pub mod graph;
pub mod molecule;
pub mod naming;
pub mod parse;
pub mod pipeline;
pub mod rings;
pub mod valence;

pub use atom::{Atom, ChiralClass, Chirality, Hybridization, StereoRef};
pub use bond::{Bond, BondOrder, BondStereo};
pub use config::Config;
pub use element::Element;
pub use enrich::enrich;
pub use error::{ErrorCategory, GenerateError, GraphError, NamingError, RingError, SmilesError};
pub use generate::{generate_smiles, generate_smiles_with, write_smiles};
pub use molecule::{AtomId, BondId, BondKey, Molecule, Ring, RingInfo};
pub use naming::{NameResult, NamingEngine, ParentHydrideNamer};
pub use parse::{parse_smiles, parse_smiles_strict, parse_smiles_with, ParseOutput};
pub use pipeline::Pipeline;

use anyhow::{Context, Result};
use tracing::Level;

/// Installs a formatting subscriber at the given level (`"trace"`, `"debug"`,
/// `"info"`, ...). Unknown levels mean `info`. Later calls do nothing.
pub fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .try_init();
}

/// Canonical form of a whole SMILES input: every fragment canonicalized on
/// its own, then sorted and joined with `.`.
pub fn canonicalize(input: &str) -> Result<String> {
    let molecules = parse_smiles_strict(input)
        .with_context(|| format!("Failed to canonicalize {input:?}"))?;
    let mut fragments = molecules
        .iter()
        .map(generate_smiles)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to write {input:?}"))?;
    fragments.sort();
    Ok(fragments.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize() -> Result<()> {
        init_logging("debug");
        assert_eq!(canonicalize("OCC")?, "CCO");
        assert_eq!(canonicalize("O.CC")?, canonicalize("CC.O")?);
        assert_eq!(canonicalize("[O-]C=O")?, "O=C[O-]");
        Ok(())
    }

    #[test]
    fn test_canonicalize_reports_input() {
        let err = canonicalize("C1CC").unwrap_err();
        assert!(format!("{err:#}").contains("C1CC"));
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging("trace");
        init_logging("not-a-level");
    }
}
