//! The fixed sequence of stages a parsed fragment goes through.
//!
//! Each stage consumes the pipeline and returns it in the next state, so the
//! order parse, hydrogens, aromaticity, enrichment is checked by the compiler.
//! Diagnostics accumulate along the way and never stop the sequence.

use crate::aromaticity::perceive_aromaticity;
use crate::config::Config;
use crate::enrich::enrich;
use crate::error::SmilesError;
use crate::molecule::Molecule;
use crate::valence::{check_valences, resolve_hydrogens};
use std::marker::PhantomData;
use tracing::debug;

/// Marker for the states a [`Pipeline`] can be in.
pub trait Stage {
    const NAME: &'static str;
}

/// Structure built, hydrogens not yet known.
#[derive(Debug, Clone, Copy)]
pub struct Parsed;

/// Every atom has a hydrogen count and valences have been checked.
#[derive(Debug, Clone, Copy)]
pub struct HydrogensResolved;

/// Aromatic flags reflect perception rather than the input case.
#[derive(Debug, Clone, Copy)]
pub struct AromaticityPerceived;

/// Ring, degree, hybridization and rotatable-bond caches are filled in.
#[derive(Debug, Clone, Copy)]
pub struct Enriched;

impl Stage for Parsed {
    const NAME: &'static str = "parsed";
}
impl Stage for HydrogensResolved {
    const NAME: &'static str = "hydrogens";
}
impl Stage for AromaticityPerceived {
    const NAME: &'static str = "aromaticity";
}
impl Stage for Enriched {
    const NAME: &'static str = "enriched";
}

#[derive(Debug, Clone)]
pub struct Pipeline<S: Stage> {
    molecule: Molecule,
    diagnostics: Vec<SmilesError>,
    config: Config,
    _stage: PhantomData<S>,
}

impl<S: Stage> Pipeline<S> {
    fn advance<T: Stage>(self) -> Pipeline<T> {
        debug!(
            stage = T::NAME,
            atoms = self.molecule.atom_count(),
            bonds = self.molecule.bond_count(),
            diagnostics = self.diagnostics.len(),
            "pipeline stage complete"
        );
        Pipeline {
            molecule: self.molecule,
            diagnostics: self.diagnostics,
            config: self.config,
            _stage: PhantomData,
        }
    }

    pub fn molecule(&self) -> &Molecule {
        &self.molecule
    }

    pub fn diagnostics(&self) -> &[SmilesError] {
        &self.diagnostics
    }

    pub fn into_parts(self) -> (Molecule, Vec<SmilesError>) {
        (self.molecule, self.diagnostics)
    }
}

impl Pipeline<Parsed> {
    /// Starts from a freshly parsed fragment and the errors its parse reported.
    pub fn new(molecule: Molecule, diagnostics: Vec<SmilesError>, config: &Config) -> Self {
        Pipeline {
            molecule,
            diagnostics,
            config: config.clone(),
            _stage: PhantomData,
        }
    }

    pub fn resolve_hydrogens(mut self) -> Pipeline<HydrogensResolved> {
        resolve_hydrogens(&mut self.molecule);
        let errors = check_valences(&self.molecule);
        self.diagnostics.extend(errors);
        self.advance()
    }

    /// Runs every remaining stage.
    pub fn run(self) -> Pipeline<Enriched> {
        self.resolve_hydrogens().perceive_aromaticity().enrich()
    }
}

impl Pipeline<HydrogensResolved> {
    pub fn perceive_aromaticity(mut self) -> Pipeline<AromaticityPerceived> {
        let errors = perceive_aromaticity(&mut self.molecule, &self.config);
        self.diagnostics.extend(errors);
        self.advance()
    }
}

impl Pipeline<AromaticityPerceived> {
    pub fn enrich(mut self) -> Pipeline<Enriched> {
        enrich(&mut self.molecule);
        self.advance()
    }
}

impl Pipeline<Enriched> {
    pub fn finish(self) -> (Molecule, Vec<SmilesError>) {
        self.into_parts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::smiles::parse_fragment;

    fn start(smiles: &str) -> Pipeline<Parsed> {
        let (molecule, errors) = parse_fragment(smiles, 0);
        Pipeline::new(molecule, errors, &Config::default())
    }

    #[test]
    fn test_stages_in_order() {
        let resolved = start("c1ccccc1O").resolve_hydrogens();
        assert_eq!(resolved.molecule().atom(6).hydrogens, Some(1));

        let perceived = resolved.perceive_aromaticity();
        assert!(perceived.molecule().atom(0).aromatic);
        assert!(perceived.molecule().rings().is_empty());

        let (mol, diagnostics) = perceived.enrich().finish();
        assert!(diagnostics.is_empty());
        assert_eq!(mol.rings().len(), 1);
        assert!(mol.atom(0).in_ring);
    }

    #[test]
    fn test_diagnostics_accumulate() {
        let (mol, diagnostics) = start("C(C)(C)(C)(C)Cc1cccc1").run().finish();
        assert_eq!(mol.atom_count(), 11);
        assert!(matches!(
            diagnostics[0],
            SmilesError::ValenceExceeded { atom: 0, .. }
        ));
        assert!(diagnostics
            .iter()
            .any(|e| matches!(e, SmilesError::HuckelViolation { .. })));
    }
}
