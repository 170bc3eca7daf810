use crate::atom::Hybridization;
use crate::bond::BondOrder;
use crate::element::Element;
use crate::molecule::{AtomId, BondId, Molecule};
use crate::rings::sssr;
use tracing::{debug, instrument};

/// Fills in the cached per-atom and per-bond fields downstream consumers read.
///
/// Rings come from the SSSR. Running it twice gives the same result.
#[instrument(skip_all, fields(atoms = mol.atom_count()))]
pub fn enrich(mol: &mut Molecule) {
    let rings = sssr(mol.graph());
    mol.set_rings(rings);

    let atoms: Vec<AtomId> = mol.atoms().collect();
    for &atom in &atoms {
        let heavy_degree = mol.heavy_degree(atom);
        let rings = mol.ring_info().atom_rings(atom);
        let hybridization = hybridization(mol, atom);
        let a = mol.atom_mut(atom);
        a.heavy_degree = heavy_degree;
        a.in_ring = !rings.is_empty();
        a.rings = rings;
        a.hybridization = Some(hybridization);
    }

    let bonds: Vec<BondId> = mol.bonds().collect();
    for &bond in &bonds {
        let (a, b) = mol.bond_endpoints(bond);
        let rings = mol.ring_info().bond_rings(a, b);
        let b = mol.bond_mut(bond);
        b.in_ring = !rings.is_empty();
        b.rings = rings;
    }
    // Rotatability reads the ring flags set above.
    for &bond in &bonds {
        let rotatable = is_rotatable(mol, bond);
        mol.bond_mut(bond).rotatable = rotatable;
    }

    debug!(
        rings = mol.rings().len(),
        rotatable = bonds.iter().filter(|&&b| mol.bond(b).rotatable).count(),
        "enriched molecule"
    );
}

/// Aromatic atoms are sp2; otherwise a triple bond means sp, a double bond
/// sp2, and up to three heavy neighbours sp3.
pub fn hybridization(mol: &Molecule, atom: AtomId) -> Hybridization {
    if mol.atom(atom).aromatic {
        Hybridization::Sp2
    } else if mol.has_bond_order(atom, BondOrder::Triple) {
        Hybridization::Sp
    } else if mol.has_bond_order(atom, BondOrder::Double) {
        Hybridization::Sp2
    } else if mol.heavy_degree(atom) <= 3 {
        Hybridization::Sp3
    } else {
        Hybridization::Other
    }
}

fn is_carbonyl_carbon(mol: &Molecule, atom: AtomId) -> bool {
    mol.atom(atom).element == Element::C
        && mol.bonds_of(atom).into_iter().any(|(b, n)| {
            mol.bond(b).order == BondOrder::Double && mol.atom(n).element == Element::O
        })
}

fn is_heteroatom(mol: &Molecule, atom: AtomId) -> bool {
    !matches!(mol.atom(atom).element, Element::C | Element::H)
}

/// A single, acyclic bond between two non-terminal heavy atoms that is not
/// held rigid by a triple bond, a saturated four-connected atom, or an amide
/// style carbonyl link.
fn is_rotatable(mol: &Molecule, bond: BondId) -> bool {
    let b = mol.bond(bond);
    if b.order != BondOrder::Single || b.in_ring {
        return false;
    }
    let (first, second) = mol.bond_endpoints(bond);
    let ends = [first, second];
    if ends.iter().any(|&a| mol.atom(a).is_plain_hydrogen()) {
        return false;
    }
    if ends.iter().any(|&a| mol.heavy_degree(a) < 2) {
        return false;
    }
    if ends.iter().any(|&a| mol.has_bond_order(a, BondOrder::Triple)) {
        return false;
    }
    for (atom, other) in [(first, second), (second, first)] {
        // A ring atom bonded to a terminal partner does not count.
        if mol.atom(atom).in_ring && mol.heavy_degree(other) == 1 {
            return false;
        }
        if mol.heavy_degree(atom) >= 4
            && !mol.atom(atom).in_ring
            && !mol.has_bond_order(atom, BondOrder::Double)
        {
            return false;
        }
        if is_carbonyl_carbon(mol, atom) && is_heteroatom(mol, other) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aromaticity::perceive_aromaticity;
    use crate::config::Config;
    use crate::parse::smiles::parse_fragment;
    use crate::valence::resolve_hydrogens;

    fn enriched(smiles: &str) -> Molecule {
        let (mut mol, errors) = parse_fragment(smiles, 0);
        assert!(errors.is_empty(), "{smiles}: {errors:?}");
        resolve_hydrogens(&mut mol);
        perceive_aromaticity(&mut mol, &Config::default());
        enrich(&mut mol);
        mol
    }

    fn rotatable(mol: &Molecule) -> usize {
        mol.bonds().filter(|&b| mol.bond(b).rotatable).count()
    }

    #[test]
    fn test_ring_fields() {
        let mol = enriched("C1CCCCC1C");
        assert_eq!(mol.rings().len(), 1);
        assert!(mol.atom(0).in_ring);
        assert_eq!(mol.atom(0).rings, vec![0]);
        assert!(!mol.atom(6).in_ring);
        assert!(mol.atom(6).rings.is_empty());
        let exocyclic = mol.bond_between(5, 6).unwrap();
        assert!(!mol.bond(exocyclic).in_ring);
        assert_eq!(mol.atom(5).heavy_degree, 3);
    }

    #[test]
    fn test_hybridization() {
        let mol = enriched("C#CC=CCc1ccccc1");
        assert_eq!(mol.atom(0).hybridization, Some(Hybridization::Sp));
        assert_eq!(mol.atom(2).hybridization, Some(Hybridization::Sp2));
        assert_eq!(mol.atom(4).hybridization, Some(Hybridization::Sp3));
        assert_eq!(mol.atom(5).hybridization, Some(Hybridization::Sp2));

        let neopentane = enriched("CC(C)(C)C");
        assert_eq!(neopentane.atom(1).hybridization, Some(Hybridization::Other));
    }

    #[test]
    fn test_rotatable_bonds() {
        assert_eq!(rotatable(&enriched("CC")), 0);
        assert_eq!(rotatable(&enriched("CCCC")), 1);
        assert_eq!(rotatable(&enriched("CCCCC")), 2);
        // Amide C-N is rigid.
        assert_eq!(rotatable(&enriched("CCC(=O)NCC")), 2);
        // Methyl on a ring is terminal.
        assert_eq!(rotatable(&enriched("Cc1ccccc1")), 0);
        assert_eq!(rotatable(&enriched("c1ccccc1-c2ccccc2")), 1);
        // Triple bonds pin their neighbours.
        assert_eq!(rotatable(&enriched("CC#CC")), 0);
        // Tert-butyl carbon is saturated and four-connected.
        assert_eq!(rotatable(&enriched("CCCC(C)(C)C")), 1);
    }

    #[test]
    fn test_enrich_is_idempotent() {
        let mut mol = enriched("c1ccc2ccccc2c1CCO");
        let before: Vec<_> = mol.atoms().map(|a| mol.atom(a).clone()).collect();
        enrich(&mut mol);
        let after: Vec<_> = mol.atoms().map(|a| mol.atom(a).clone()).collect();
        assert_eq!(before, after);
    }
}
