use crate::error::SmilesError;
use crate::molecule::{AtomId, Molecule};
use tracing::{debug, trace};

/// Hydrogens an unbracketed atom would carry given its current bonds.
///
/// The smallest allowed valence at or above the bond-order sum (aromatic bonds
/// counting one) is chosen; atoms already at or above their largest valence get
/// none. Wildcards and elements outside the organic subset never get implicit
/// hydrogens, even when written without brackets: a bare `Si` gets none and
/// is written back as `[Si]`.
pub fn implied_hydrogens(mol: &Molecule, atom: AtomId) -> u8 {
    let a = mol.atom(atom);
    if a.element.is_wildcard() || !a.element.is_organic_subset() {
        return 0;
    }
    let sum = mol.bond_order_sum(atom) as i32;
    let allowed = a.element.allowed_valences(a.aromatic);
    let max = allowed.iter().copied().max().unwrap_or(0) as i32;
    if sum >= max {
        return 0;
    }
    let valence = allowed
        .iter()
        .map(|&v| v as i32)
        .find(|&v| v >= sum)
        .unwrap_or(max);
    (valence + a.charge as i32 - sum).max(0) as u8
}

/// Fills in the hydrogen count of every atom. Bracket atoms keep what was
/// written, or zero when nothing was.
pub fn resolve_hydrogens(mol: &mut Molecule) {
    let atoms: Vec<AtomId> = mol.atoms().collect();
    for atom in atoms {
        let hydrogens = if mol.atom(atom).bracket {
            mol.atom(atom).hydrogens.unwrap_or(0)
        } else {
            implied_hydrogens(mol, atom)
        };
        trace!(atom, hydrogens, "resolved hydrogens");
        mol.atom_mut(atom).hydrogens = Some(hydrogens);
    }
}

/// Recomputes implicit hydrogens for the given atoms, skipping bracket atoms.
pub fn re_resolve(mol: &mut Molecule, atoms: &[AtomId]) {
    for &atom in atoms {
        if mol.atom(atom).bracket {
            continue;
        }
        let hydrogens = implied_hydrogens(mol, atom);
        mol.atom_mut(atom).hydrogens = Some(hydrogens);
    }
}

/// Total valence of an atom in whole units: bond orders with aromatic bonds
/// worth one and a half, rounded down, plus attached hydrogens.
pub fn total_valence(mol: &Molecule, atom: AtomId) -> u32 {
    let half: u32 = mol
        .bonds_of(atom)
        .into_iter()
        .map(|(bond, _)| mol.bond(bond).order.half_order())
        .sum();
    half / 2 + mol.atom(atom).hydrogen_count() as u32
}

/// Reports atoms whose total valence exceeds every valence allowed for them.
///
/// The limit is the element's largest normal valence, widened by the size of
/// the formal charge and by one for aromatic atoms. Elements without a table
/// entry are not checked.
pub fn check_valences(mol: &Molecule) -> Vec<SmilesError> {
    let mut errors = Vec::new();
    for atom in mol.atoms() {
        let a = mol.atom(atom);
        if a.element.is_wildcard() || !a.element.has_known_valence() {
            continue;
        }
        let max = a
            .element
            .allowed_valences(false)
            .iter()
            .copied()
            .max()
            .unwrap_or(0) as u32;
        let limit = max + a.charge.unsigned_abs() as u32 + u32::from(a.aromatic);
        let valence = total_valence(mol, atom);
        if valence > limit {
            debug!(atom, valence, limit, "valence exceeded");
            errors.push(SmilesError::ValenceExceeded {
                atom,
                element: a.element.symbol().to_string(),
                valence,
                max: limit,
            });
        }
    }
    errors
}
