pub mod bracket;
pub mod smiles;

use crate::config::Config;
use crate::error::SmilesError;
use crate::molecule::Molecule;
use crate::pipeline::Pipeline;
use anyhow::{anyhow, Context, Result};
use tracing::{debug, instrument, warn};

/// Molecules parsed from one input plus every diagnostic raised on the way.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub molecules: Vec<Molecule>,
    pub errors: Vec<SmilesError>,
}

impl ParseOutput {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The molecules, or the first diagnostic as an error.
    pub fn into_result(self) -> Result<Vec<Molecule>> {
        match self.errors.into_iter().next() {
            None => Ok(self.molecules),
            Some(err) => Err(anyhow!(err)),
        }
    }
}

/// Parses a dot-separated SMILES string with the default configuration.
pub fn parse_smiles(input: &str) -> ParseOutput {
    parse_smiles_with(input, &Config::default())
}

/// Parses each dot-separated fragment on its own and runs it through the full
/// pipeline. Empty fragments are skipped. Error positions are character
/// indices into the whole input.
#[instrument(skip_all, fields(len = input.len()))]
pub fn parse_smiles_with(input: &str, config: &Config) -> ParseOutput {
    let mut output = ParseOutput::default();
    let mut offset = 0;
    for fragment in input.split('.') {
        let start = offset;
        offset += fragment.chars().count() + 1;
        if fragment.is_empty() {
            continue;
        }

        let (molecule, errors) = smiles::parse_fragment(fragment, start);
        let (molecule, errors) = Pipeline::new(molecule, errors, config).run().finish();
        for err in &errors {
            warn!(%err, fragment, "smiles diagnostic");
        }
        output.errors.extend(errors);
        if molecule.atom_count() > 0 {
            output.molecules.push(molecule);
        }
    }
    debug!(
        molecules = output.molecules.len(),
        errors = output.errors.len(),
        "parsed input"
    );
    output
}

/// Parses input that is expected to be clean, failing on the first diagnostic.
pub fn parse_smiles_strict(input: &str) -> Result<Vec<Molecule>> {
    parse_smiles(input)
        .into_result()
        .with_context(|| format!("Failed to parse SMILES {input:?}"))
}
