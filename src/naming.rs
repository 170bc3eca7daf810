use crate::bond::BondOrder;
use crate::element::Element;
use crate::error::NamingError;
use crate::molecule::Molecule;
use tracing::debug;

/// A name together with how sure the engine is and which rules produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct NameResult {
    pub name: String,
    pub confidence: f32,
    pub trace: Vec<String>,
}

/// Anything that can turn an enriched molecule into a systematic name.
///
/// Engines read the cached ring, hybridization and aromaticity fields rather
/// than recomputing them, so they should only be handed enriched molecules.
pub trait NamingEngine {
    fn name(&self, mol: &Molecule) -> Result<NameResult, NamingError>;
}

const ALKANE_STEMS: [&str; 20] = [
    "meth", "eth", "prop", "but", "pent", "hex", "hept", "oct", "non", "dec", "undec", "dodec",
    "tridec", "tetradec", "pentadec", "hexadec", "heptadec", "octadec", "nonadec", "icos",
];

fn alkane_stem(carbons: usize) -> Option<&'static str> {
    carbons
        .checked_sub(1)
        .and_then(|i| ALKANE_STEMS.get(i))
        .copied()
}

/// Names the parent hydrides: unbranched alkanes, monocyclic cycloalkanes and
/// benzene. Anything else is reported as unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentHydrideNamer;

impl ParentHydrideNamer {
    fn check_enriched(mol: &Molecule) -> Result<(), NamingError> {
        if mol.atoms().any(|a| mol.atom(a).hybridization.is_none()) {
            return Err(NamingError::NotEnriched);
        }
        Ok(())
    }

    fn is_plain_carbon(mol: &Molecule, atom: usize) -> bool {
        let a = mol.atom(atom);
        a.element == Element::C && a.charge == 0 && a.isotope.is_none() && a.chirality.is_none()
    }

    fn is_benzene(mol: &Molecule) -> bool {
        mol.atom_count() == 6
            && mol.rings().len() == 1
            && mol.atoms().all(|a| {
                let atom = mol.atom(a);
                atom.aromatic && atom.hydrogen_count() == 1 && atom.in_ring
            })
    }
}

impl NamingEngine for ParentHydrideNamer {
    fn name(&self, mol: &Molecule) -> Result<NameResult, NamingError> {
        if mol.atom_count() == 0 {
            return Err(NamingError::Unsupported("empty molecule".to_string()));
        }
        Self::check_enriched(mol)?;
        let mut trace = vec!["enriched".to_string()];

        if !mol.atoms().all(|a| Self::is_plain_carbon(mol, a)) {
            return Err(NamingError::Unsupported("not a hydrocarbon".to_string()));
        }
        trace.push("hydrocarbon".to_string());

        if Self::is_benzene(mol) {
            trace.push("benzene".to_string());
            debug!(?trace, "named benzene");
            return Ok(NameResult {
                name: "benzene".to_string(),
                confidence: 1.0,
                trace,
            });
        }

        let saturated = mol
            .bonds()
            .all(|b| mol.bond(b).order == BondOrder::Single)
            && mol
                .atoms()
                .all(|a| mol.bond_order_sum(a) + mol.atom(a).hydrogen_count() as u32 == 4);
        if !saturated {
            return Err(NamingError::Unsupported("unsaturated hydrocarbon".to_string()));
        }
        trace.push("saturated".to_string());

        let carbons = mol.atom_count();
        let stem = alkane_stem(carbons)
            .ok_or_else(|| NamingError::Unsupported(format!("{carbons} carbon parent")))?;

        let name = match mol.rings().len() {
            0 if mol.atoms().all(|a| mol.atom(a).heavy_degree <= 2) => {
                trace.push("unbranched chain".to_string());
                format!("{stem}ane")
            }
            1 if carbons >= 3 && mol.atoms().all(|a| mol.atom(a).in_ring) => {
                trace.push("monocycle".to_string());
                format!("cyclo{stem}ane")
            }
            _ => return Err(NamingError::Unsupported("substituted parent".to_string())),
        };
        debug!(%name, ?trace, "named parent hydride");
        Ok(NameResult {
            name,
            confidence: 1.0,
            trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_smiles;
    use crate::parse::smiles::parse_fragment;

    fn name_of(smiles: &str) -> Result<String, NamingError> {
        let output = parse_smiles(smiles);
        assert!(output.errors.is_empty(), "{smiles}: {:?}", output.errors);
        ParentHydrideNamer
            .name(&output.molecules[0])
            .map(|result| result.name)
    }

    #[test]
    fn test_alkanes() {
        assert_eq!(name_of("C").unwrap(), "methane");
        assert_eq!(name_of("CC").unwrap(), "ethane");
        assert_eq!(name_of("CCCCCC").unwrap(), "hexane");
        assert_eq!(name_of("CCCCCCCCCCCCCCCCCCCC").unwrap(), "icosane");
    }

    #[test]
    fn test_rings() {
        assert_eq!(name_of("C1CC1").unwrap(), "cyclopropane");
        assert_eq!(name_of("C1CCCCC1").unwrap(), "cyclohexane");
        assert_eq!(name_of("c1ccccc1").unwrap(), "benzene");
        assert_eq!(name_of("C1=CC=CC=C1").unwrap(), "benzene");
    }

    #[test]
    fn test_unsupported() {
        assert!(matches!(name_of("CC(C)C"), Err(NamingError::Unsupported(_))));
        assert!(matches!(name_of("CCO"), Err(NamingError::Unsupported(_))));
        assert!(matches!(name_of("C=C"), Err(NamingError::Unsupported(_))));
        assert!(matches!(name_of("C1CCCCC1C"), Err(NamingError::Unsupported(_))));
        assert!(matches!(name_of("c1ccncc1"), Err(NamingError::Unsupported(_))));
    }

    #[test]
    fn test_refuses_unenriched() {
        let (mol, _) = parse_fragment("CC", 0);
        assert_eq!(ParentHydrideNamer.name(&mol), Err(NamingError::NotEnriched));
    }

    #[test]
    fn test_trace_records_rules() {
        let output = parse_smiles("CCC");
        let result = ParentHydrideNamer.name(&output.molecules[0]).unwrap();
        assert_eq!(result.confidence, 1.0);
        assert_eq!(
            result.trace,
            vec!["enriched", "hydrocarbon", "saturated", "unbranched chain"]
        );
    }
}
