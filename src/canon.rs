use crate::atom::{ChiralClass, Chirality};
use crate::bond::{BondOrder, BondStereo};
use crate::config::Config;
use crate::molecule::{AtomId, BondId, Molecule};
use crate::valence::implied_hydrogens;
use petgraph::unionfind::UnionFind;
use std::collections::BTreeMap;
use tracing::{debug, instrument, trace};

/// Starting label of an atom before any neighbourhood information is mixed in.
///
/// Field order is the comparison order. Degree comes first so that terminal
/// atoms rank lowest and become traversal roots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct AtomInvariant {
    heavy_degree: usize,
    atomic_number: u8,
    aromatic: bool,
    isotope: Option<u16>,
    charge_magnitude: u8,
    negative: bool,
    hydrogens: u8,
    chiral: bool,
    class: u32,
    bracket: bool,
}

impl AtomInvariant {
    fn of(mol: &Molecule, atom: AtomId) -> Self {
        let a = mol.atom(atom);
        AtomInvariant {
            heavy_degree: mol.heavy_degree(atom),
            atomic_number: a.element.atomic_number(),
            aromatic: a.aromatic,
            isotope: a.isotope,
            charge_magnitude: a.charge.unsigned_abs(),
            negative: a.charge < 0,
            hydrogens: a.hydrogen_count(),
            chiral: a.chirality.is_some(),
            class: a.class,
            bracket: a.bracket,
        }
    }
}

/// Bond priority, neighbour rank, and the bond's direction marker as seen
/// from the atom being labelled.
type NeighbourLabel = (u8, usize, BondStereo);

/// Groups equal keys and numbers the groups in sorted key order.
fn dense_ranks<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut groups: BTreeMap<&K, Vec<AtomId>> = BTreeMap::new();
    for (atom, key) in keys.iter().enumerate() {
        groups.entry(key).or_default().push(atom);
    }
    let mut ranks = vec![0; keys.len()];
    for (rank, atoms) in groups.into_values().enumerate() {
        for atom in atoms {
            ranks[atom] = rank;
        }
    }
    ranks
}

fn class_count(ranks: &[usize]) -> usize {
    ranks.iter().max().map_or(0, |&max| max + 1)
}

/// Ranks from the atom invariants alone.
pub fn initial_ranks(mol: &Molecule) -> Vec<usize> {
    let keys: Vec<AtomInvariant> = mol.atoms().map(|a| AtomInvariant::of(mol, a)).collect();
    dense_ranks(&keys)
}

/// Repeatedly splits rank classes by the sorted labels of each atom's
/// neighbours, for at most `rounds` rounds or until the number of classes
/// stops growing. Classes are only ever split, never merged.
pub fn refine(mol: &Molecule, mut ranks: Vec<usize>, rounds: usize) -> Vec<usize> {
    let mut classes = class_count(&ranks);
    for round in 0..rounds {
        let keys: Vec<(usize, Vec<NeighbourLabel>)> = mol
            .atoms()
            .map(|atom| {
                let mut neighbours: Vec<NeighbourLabel> = mol
                    .bonds_of(atom)
                    .into_iter()
                    .map(|(bond, n)| {
                        (
                            mol.bond(bond).order.priority(),
                            ranks[n],
                            mol.stereo_from(bond, atom),
                        )
                    })
                    .collect();
                neighbours.sort_unstable();
                (ranks[atom], neighbours)
            })
            .collect();
        ranks = dense_ranks(&keys);
        let refined = class_count(&ranks);
        trace!(round, classes = refined, "refinement round");
        if refined == classes {
            break;
        }
        classes = refined;
    }
    ranks
}

/// Refined classes. Atoms sharing a class could not be told apart.
pub fn invariant_ranks(mol: &Molecule, config: &Config) -> Vec<usize> {
    refine(mol, initial_ranks(mol), config.refinement_rounds)
}

fn lowest_tied_class(ranks: &[usize]) -> Option<usize> {
    let mut sizes = vec![0usize; class_count(ranks)];
    for &rank in ranks {
        sizes[rank] += 1;
    }
    sizes.iter().position(|&size| size > 1)
}

/// A unique rank for every atom.
///
/// Remaining ties are broken by promoting the lowest atom id of the lowest
/// tied class and refining again. For atoms that are truly symmetric the
/// choice does not change the emitted text.
#[instrument(skip_all, fields(atoms = mol.atom_count()))]
pub fn canonical_ranks(mol: &Molecule, config: &Config) -> Vec<usize> {
    let mut ranks = invariant_ranks(mol, config);
    debug!(classes = class_count(&ranks), "refined invariants");
    while let Some(tied) = lowest_tied_class(&ranks) {
        let Some(chosen) = mol.atoms().find(|&a| ranks[a] == tied) else {
            break;
        };
        trace!(atom = chosen, rank = tied, "breaking tie");
        let keys: Vec<(usize, bool)> = mol.atoms().map(|a| (ranks[a], a != chosen)).collect();
        ranks = refine(mol, dense_ranks(&keys), config.refinement_rounds);
    }
    ranks
}

fn is_tetrahedral(chirality: Option<Chirality>) -> bool {
    matches!(
        chirality,
        Some(Chirality::CounterClockwise)
            | Some(Chirality::Clockwise)
            | Some(Chirality::Extended(ChiralClass::Tetrahedral, _))
    )
}

/// Drops tetrahedral chirality from centres with two neighbours of the same
/// class, counting implicit hydrogens as neighbours. An atom left with nothing
/// that needs brackets loses its bracket flag too.
///
/// Returns the atoms that were changed.
pub fn strip_symmetric_chirality(mol: &mut Molecule, classes: &[usize]) -> Vec<AtomId> {
    let centres: Vec<AtomId> = mol
        .atoms()
        .filter(|&a| is_tetrahedral(mol.atom(a).chirality))
        .collect();

    let mut stripped = Vec::new();
    for atom in centres {
        // `None` stands for a hydrogen, implicit or explicit.
        let mut fingerprints: Vec<Option<usize>> = mol
            .neighbors(atom)
            .into_iter()
            .map(|n| (!mol.atom(n).is_plain_hydrogen()).then(|| classes[n]))
            .collect();
        fingerprints.extend((0..mol.atom(atom).hydrogen_count()).map(|_| None));
        let total = fingerprints.len();
        fingerprints.sort_unstable();
        fingerprints.dedup();
        if fingerprints.len() == total {
            continue;
        }

        let implied = implied_hydrogens(mol, atom);
        let a = mol.atom_mut(atom);
        a.chirality = None;
        a.written_order.clear();
        if a.isotope.is_none()
            && a.charge == 0
            && a.class == 0
            && a.element.is_organic_subset()
            && a.hydrogens == Some(implied)
        {
            a.bracket = false;
        }
        debug!(atom, "dropped chirality on a symmetric centre");
        stripped.push(atom);
    }
    stripped
}

/// Puts every group of `/` and `\` markers into one of its two equivalent
/// orientations.
///
/// Markers around the same double bond belong to one group, and reversing
/// every marker of a group describes the same geometry. The marker bond with
/// the lowest endpoint ranks, computed without any markers, is made to point
/// up from its lower-ranked end.
///
/// Returns the number of groups that were reversed.
pub fn normalize_bond_directions(mol: &mut Molecule, config: &Config) -> usize {
    let marked: Vec<BondId> = mol
        .bonds()
        .filter(|&b| mol.bond(b).stereo != BondStereo::None)
        .collect();
    if marked.is_empty() {
        return 0;
    }

    let mut groups = UnionFind::<usize>::new(mol.bond_count());
    for double in mol.bonds().filter(|&b| mol.bond(b).order == BondOrder::Double) {
        let (a, b) = mol.bond_endpoints(double);
        let around: Vec<BondId> = [a, b]
            .into_iter()
            .flat_map(|end| mol.bonds_of(end))
            .map(|(bond, _)| bond)
            .filter(|&bond| mol.bond(bond).stereo != BondStereo::None)
            .collect();
        for pair in around.windows(2) {
            groups.union(pair[0], pair[1]);
        }
    }

    let mut plain = mol.clone();
    for &bond in &marked {
        plain.bond_mut(bond).stereo = BondStereo::None;
    }
    let ranks = canonical_ranks(&plain, config);

    // Lowest-ranked marker bond of each group, keyed by its endpoint ranks.
    let mut leaders: BTreeMap<usize, ((usize, usize), BondId, AtomId)> = BTreeMap::new();
    for &bond in &marked {
        let (a, b) = mol.bond_endpoints(bond);
        let (low, high) = if ranks[a] < ranks[b] { (a, b) } else { (b, a) };
        let key = (ranks[low], ranks[high]);
        let group = groups.find(bond);
        let candidate = (key, bond, low);
        leaders
            .entry(group)
            .and_modify(|best| {
                if candidate.0 < best.0 {
                    *best = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut reversed = 0;
    for (group, (_, bond, low)) in leaders {
        if mol.stereo_from(bond, low) == BondStereo::Up {
            continue;
        }
        for &member in marked.iter().filter(|&&m| groups.find(m) == group) {
            let stereo = mol.bond(member).stereo.flipped();
            mol.bond_mut(member).stereo = stereo;
        }
        trace!(bond, "reversed direction markers");
        reversed += 1;
    }
    reversed
}
