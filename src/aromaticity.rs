use crate::bond::BondOrder;
use crate::config::Config;
use crate::element::Element;
use crate::error::{RingError, SmilesError};
use crate::molecule::{AtomId, BondId, Molecule, Ring};
use crate::rings::{elementary_cycles, ring_systems, sssr};
use crate::valence;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, instrument, trace};

/// Hückel's rule: `4n + 2` pi electrons, at least six.
pub fn is_huckel(pi_electrons: u32) -> bool {
    pi_electrons >= 6 && (pi_electrons - 2) % 4 == 0
}

fn is_electronegative(element: Element) -> bool {
    matches!(element, Element::N | Element::O | Element::S | Element::SE)
}

/// State captured before perception clears the input's aromatic flags.
struct Snapshot {
    atoms: Vec<bool>,
    bonds: Vec<BondOrder>,
}

impl Snapshot {
    fn take(mol: &Molecule) -> Self {
        Snapshot {
            atoms: mol.atoms().map(|a| mol.atom(a).aromatic).collect(),
            bonds: mol.bonds().map(|b| mol.bond(b).order).collect(),
        }
    }

    /// The bond type to fall back on when a bond stops being aromatic.
    fn declared(&self, bond: BondId) -> BondOrder {
        match self.bonds[bond] {
            BondOrder::Aromatic => BondOrder::Single,
            order => order,
        }
    }
}

/// Pi electrons an atom contributes to a ring made of `ring_atoms`, or `None`
/// when it cannot take part in a conjugated ring.
fn pi_electrons(
    mol: &Molecule,
    atom: AtomId,
    ring_atoms: &BTreeSet<AtomId>,
    was_aromatic: bool,
) -> Option<u32> {
    let a = mol.atom(atom);
    let bonds = mol.bonds_of(atom);
    let ring_double = bonds
        .iter()
        .any(|&(b, n)| ring_atoms.contains(&n) && mol.bond(b).order == BondOrder::Double);
    let exocyclic_double = |electronegative_only: bool| {
        bonds.iter().any(|&(b, n)| {
            !ring_atoms.contains(&n)
                && mol.bond(b).order == BondOrder::Double
                && (!electronegative_only || is_electronegative(mol.atom(n).element))
        })
    };

    let electrons = match a.element {
        Element::C => {
            if a.charge < 0 {
                2
            } else if a.charge > 0 || exocyclic_double(true) {
                0
            } else {
                1
            }
        }
        Element::N | Element::P | Element::AS => {
            if a.charge > 0 || ring_double {
                1
            } else if a.charge < 0 || a.hydrogen_count() > 0 || bonds.len() >= 3 {
                2
            } else if was_aromatic {
                1
            } else {
                2
            }
        }
        Element::O | Element::S | Element::SE => {
            if a.charge > 0 || ring_double {
                1
            } else if exocyclic_double(false) {
                0
            } else {
                2
            }
        }
        Element::B => {
            if a.charge < 0 || was_aromatic {
                2
            } else {
                0
            }
        }
        _ => return None,
    };
    Some(electrons)
}

/// Total pi electrons of a ring or ring system if it passes the conjugation
/// check: every atom is conjugatable, and every carbon takes part in a double
/// or aromatic bond inside the set or carries no hydrogens.
fn conjugated_pi(mol: &Molecule, ring_atoms: &BTreeSet<AtomId>, snapshot: &Snapshot) -> Option<u32> {
    let mut total = 0;
    for &atom in ring_atoms {
        let a = mol.atom(atom);
        if a.element == Element::C && a.hydrogen_count() > 0 {
            let participates = mol.bonds_of(atom).iter().any(|&(b, n)| {
                ring_atoms.contains(&n)
                    && matches!(mol.bond(b).order, BondOrder::Double | BondOrder::Aromatic)
            });
            if !participates {
                return None;
            }
        }
        total += pi_electrons(mol, atom, ring_atoms, snapshot.atoms[atom])?;
    }
    Some(total)
}

fn ring_bonds(mol: &Molecule, ring: &[AtomId]) -> Vec<BondId> {
    (0..ring.len())
        .filter_map(|i| mol.bond_between(ring[i], ring[(i + 1) % ring.len()]))
        .collect()
}

/// An accepted ring and whether it belongs to a multi-ring system.
struct Accepted {
    ring: Ring,
    fused: bool,
}

/// Perceives aromaticity from scratch.
///
/// Input aromatic flags are cleared and re-derived from the Hückel rule over
/// candidate rings; fused systems are tested as a whole before their rings
/// are tested one by one. Rings written aromatic that fail are reported and,
/// where possible, given alternating single and double bonds. Atoms that lose
/// their aromatic flag get their implicit hydrogens recomputed.
///
/// # Returns
///
/// * Hückel violations, aromatic atoms outside rings, and exhausted cycle
///   budgets.
#[instrument(skip_all, fields(atoms = mol.atom_count()))]
pub fn perceive_aromaticity(mol: &mut Molecule, config: &Config) -> Vec<SmilesError> {
    let mut errors = Vec::new();
    let snapshot = Snapshot::take(mol);

    let max_size = *config.aromatic_ring_sizes.end();
    let cycles = match elementary_cycles(mol.graph(), Some(max_size), config.cycle_search_budget) {
        Ok(cycles) => cycles,
        Err(RingError::TooComplex(budget)) => {
            debug!(budget, "ring analysis too complex, keeping input aromaticity");
            return vec![SmilesError::RingAnalysisTooComplex { budget }];
        }
    };

    for atom in mol.atoms().collect::<Vec<_>>() {
        mol.atom_mut(atom).aromatic = false;
    }

    let candidates: Vec<Ring> = cycles
        .into_iter()
        .filter(|c| config.aromatic_ring_sizes.contains(&c.len()))
        .collect();
    let smallest = sssr(mol.graph());
    let accepted = accept_rings(mol, &candidates, &snapshot);
    // Measured while bonds still carry their input types.
    let rejected = rejected_rings(mol, &candidates, &smallest, &accepted, &snapshot);

    // Flag accepted rings, counting how many rings claim each bond.
    let mut claims: HashMap<BondId, usize> = HashMap::new();
    for Accepted { ring, .. } in &accepted {
        for &atom in ring {
            mol.atom_mut(atom).aromatic = true;
        }
        for bond in ring_bonds(mol, ring) {
            mol.bond_mut(bond).order = BondOrder::Aromatic;
            *claims.entry(bond).or_default() += 1;
        }
    }

    revoke_exocyclic(mol, &accepted, &mut claims, &snapshot);

    // Aromatic bonds left outside every accepted ring fall back to their
    // declared type.
    for bond in mol.bonds().collect::<Vec<_>>() {
        let (a, b) = mol.bond_endpoints(bond);
        let claimed = claims.get(&bond).copied().unwrap_or(0) > 0;
        if mol.bond(bond).order == BondOrder::Aromatic
            && !(claimed && mol.atom(a).aromatic && mol.atom(b).aromatic)
        {
            mol.bond_mut(bond).order = snapshot.declared(bond);
        }
    }

    kekulize_rejected(mol, rejected, &snapshot, &mut errors);

    let ring_atoms: HashSet<AtomId> = smallest.iter().flatten().copied().collect();
    let mut revoked = Vec::new();
    for atom in mol.atoms() {
        if snapshot.atoms[atom] && !mol.atom(atom).aromatic {
            revoked.push(atom);
            if !ring_atoms.contains(&atom) {
                errors.push(SmilesError::AromaticAtomNotInRing { atom });
            }
        }
    }
    valence::re_resolve(mol, &revoked);

    debug!(
        accepted = accepted.len(),
        revoked = revoked.len(),
        errors = errors.len(),
        "perceived aromaticity"
    );
    errors
}

fn accept_rings(mol: &Molecule, candidates: &[Ring], snapshot: &Snapshot) -> Vec<Accepted> {
    let mut accepted = Vec::new();
    for system in ring_systems(candidates) {
        let fused = system.rings.len() > 1;
        if fused {
            let atoms: BTreeSet<AtomId> = system.atoms.iter().copied().collect();
            if let Some(pi) = conjugated_pi(mol, &atoms, snapshot) {
                if is_huckel(pi) {
                    trace!(atoms = ?system.atoms, pi, "aromatic ring system");
                    accepted.extend(system.rings.iter().map(|&r| Accepted {
                        ring: candidates[r].clone(),
                        fused,
                    }));
                    continue;
                }
            }
        }
        for &r in &system.rings {
            let atoms: BTreeSet<AtomId> = candidates[r].iter().copied().collect();
            match conjugated_pi(mol, &atoms, snapshot) {
                Some(pi) if is_huckel(pi) => {
                    trace!(ring = ?candidates[r], pi, "aromatic ring");
                    accepted.push(Accepted {
                        ring: candidates[r].clone(),
                        fused,
                    });
                }
                pi => trace!(ring = ?candidates[r], ?pi, "ring is not aromatic"),
            }
        }
    }
    accepted
}

/// In isolated rings, an atom doubly bonded to an exocyclic electronegative
/// atom is not aromatic; its ring bonds return to their declared type unless
/// another accepted ring still claims them.
fn revoke_exocyclic(
    mol: &mut Molecule,
    accepted: &[Accepted],
    claims: &mut HashMap<BondId, usize>,
    snapshot: &Snapshot,
) {
    for Accepted { ring, fused } in accepted {
        if *fused {
            continue;
        }
        let members: BTreeSet<AtomId> = ring.iter().copied().collect();
        for (i, &atom) in ring.iter().enumerate() {
            let exocyclic = mol.bonds_of(atom).into_iter().any(|(b, n)| {
                !members.contains(&n)
                    && mol.bond(b).order == BondOrder::Double
                    && is_electronegative(mol.atom(n).element)
            });
            if !exocyclic {
                continue;
            }
            trace!(atom, "exocyclic double bond revokes aromaticity");
            mol.atom_mut(atom).aromatic = false;
            let before = ring[(i + ring.len() - 1) % ring.len()];
            let after = ring[(i + 1) % ring.len()];
            for other in [before, after] {
                let Some(bond) = mol.bond_between(atom, other) else {
                    continue;
                };
                let count = claims.entry(bond).or_default();
                *count = count.saturating_sub(1);
                if *count == 0 {
                    mol.bond_mut(bond).order = snapshot.declared(bond);
                }
            }
        }
    }
}

/// Rings written fully aromatic that were not accepted, with their pi
/// electron count.
fn rejected_rings(
    mol: &Molecule,
    candidates: &[Ring],
    smallest: &[Ring],
    accepted: &[Accepted],
    snapshot: &Snapshot,
) -> Vec<(Ring, u32)> {
    let accepted: HashSet<&Ring> = accepted.iter().map(|a| &a.ring).collect();
    let mut rings: Vec<Ring> = candidates.iter().chain(smallest).cloned().collect();
    rings.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    rings.dedup();

    rings
        .into_iter()
        .filter(|ring| !accepted.contains(ring))
        .filter(|ring| {
            let bonds = ring_bonds(mol, ring);
            bonds.len() == ring.len()
                && bonds.iter().all(|&b| snapshot.bonds[b] == BondOrder::Aromatic)
        })
        .map(|ring| {
            let atoms: BTreeSet<AtomId> = ring.iter().copied().collect();
            let pi_electrons = conjugated_pi(mol, &atoms, snapshot).unwrap_or(0);
            (ring, pi_electrons)
        })
        .collect()
}

/// Rejected rings that lost aromatic atoms are reported, and those no longer
/// touching an aromatic bond get a Kekulé structure when one exists.
fn kekulize_rejected(
    mol: &mut Molecule,
    rejected: Vec<(Ring, u32)>,
    snapshot: &Snapshot,
    errors: &mut Vec<SmilesError>,
) {
    let mut assigned: HashSet<BondId> = HashSet::new();
    for (ring, pi_electrons) in rejected {
        if ring.iter().any(|&a| snapshot.atoms[a] && !mol.atom(a).aromatic) {
            debug!(?ring, pi_electrons, "Hückel violation");
            errors.push(SmilesError::HuckelViolation {
                ring: ring.clone(),
                pi_electrons,
            });
        }
        let bonds = ring_bonds(mol, &ring);
        if bonds.iter().any(|&b| mol.bond(b).order == BondOrder::Aromatic) {
            continue;
        }
        match kekule_assignment(mol, &ring, &bonds, &assigned) {
            Some(doubles) => {
                for (&bond, double) in bonds.iter().zip(doubles) {
                    mol.bond_mut(bond).order = if double {
                        BondOrder::Double
                    } else {
                        BondOrder::Single
                    };
                    assigned.insert(bond);
                }
            }
            None => debug!(?ring, "no Kekulé structure"),
        }
    }
}

/// Alternating bond assignment for one ring. Bond `i` joins `ring[i]` and
/// `ring[i + 1]`. Each carbon or hydrogen-free nitrogen without an exocyclic
/// double bond needs exactly one ring double bond; every other atom needs
/// none. Bonds fixed by an earlier ring keep their order.
fn kekule_assignment(
    mol: &Molecule,
    ring: &[AtomId],
    bonds: &[BondId],
    assigned: &HashSet<BondId>,
) -> Option<Vec<bool>> {
    let members: BTreeSet<AtomId> = ring.iter().copied().collect();
    let slots: Vec<u8> = ring
        .iter()
        .map(|&atom| {
            let a = mol.atom(atom);
            let exocyclic = mol.bonds_of(atom).into_iter().any(|(b, n)| {
                !members.contains(&n) && mol.bond(b).order == BondOrder::Double
            });
            let eligible = match a.element {
                Element::C => true,
                Element::N => a.hydrogen_count() == 0,
                _ => false,
            };
            u8::from(eligible && !exocyclic)
        })
        .collect();
    let fixed: Vec<Option<u8>> = bonds
        .iter()
        .map(|&b| assigned.contains(&b).then(|| u8::from(mol.bond(b).order == BondOrder::Double)))
        .collect();

    let len = ring.len();
    // Choosing the first bond determines the rest of the cycle.
    for first in [1u8, 0] {
        if fixed[0].map_or(false, |f| f != first) {
            continue;
        }
        let mut orders = vec![first];
        let mut consistent = true;
        for i in 1..len {
            let need = slots[i] as i16 - orders[i - 1] as i16;
            if !(0..=1).contains(&need) || fixed[i].map_or(false, |f| f as i16 != need) {
                consistent = false;
                break;
            }
            orders.push(need as u8);
        }
        if consistent && orders[len - 1] + orders[0] == slots[0] {
            return Some(orders.into_iter().map(|o| o == 1).collect());
        }
    }
    None
}
