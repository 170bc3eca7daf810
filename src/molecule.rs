use crate::atom::Atom;
use crate::bond::{Bond, BondOrder, BondStereo};
use crate::error::GraphError;
use crate::element::Element;
use crate::graph::MolGraph;
use std::collections::{BTreeMap, BTreeSet};

pub type AtomId = usize;
pub type BondId = usize;

/// Ordered atom pair identifying a bond independent of direction.
pub type BondKey = (AtomId, AtomId);

pub fn bond_key(a: AtomId, b: AtomId) -> BondKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A ring as an ordered cycle of atom ids.
pub type Ring = Vec<AtomId>;

/// Ring membership lookup built from the smallest set of smallest rings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingInfo {
    atom_rings: BTreeMap<AtomId, BTreeSet<usize>>,
    bond_rings: BTreeMap<BondKey, BTreeSet<usize>>,
}

impl RingInfo {
    pub fn from_rings(rings: &[Ring]) -> Self {
        let mut info = RingInfo::default();
        for (index, ring) in rings.iter().enumerate() {
            for (i, &atom) in ring.iter().enumerate() {
                let next = ring[(i + 1) % ring.len()];
                info.atom_rings.entry(atom).or_default().insert(index);
                info.bond_rings
                    .entry(bond_key(atom, next))
                    .or_default()
                    .insert(index);
            }
        }
        info
    }

    pub fn atom_rings(&self, atom: AtomId) -> Vec<usize> {
        self.atom_rings
            .get(&atom)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn bond_rings(&self, a: AtomId, b: AtomId) -> Vec<usize> {
        self.bond_rings
            .get(&bond_key(a, b))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_ring_atom(&self, atom: AtomId) -> bool {
        self.atom_rings.contains_key(&atom)
    }

    pub fn is_ring_bond(&self, a: AtomId, b: AtomId) -> bool {
        self.bond_rings.contains_key(&bond_key(a, b))
    }
}

/// A molecular graph of [`Atom`]s and [`Bond`]s with cached ring data.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    graph: MolGraph<Atom, Bond>,
    rings: Vec<Ring>,
    ring_info: RingInfo,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        self.graph.add_node(atom)
    }

    pub fn add_bond(&mut self, a: AtomId, b: AtomId, bond: Bond) -> Result<BondId, GraphError> {
        self.graph.add_edge(a, b, bond)
    }

    pub fn graph(&self) -> &MolGraph<Atom, Bond> {
        &self.graph
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn atoms(&self) -> impl Iterator<Item = AtomId> {
        self.graph.nodes()
    }

    pub fn bonds(&self) -> impl Iterator<Item = BondId> {
        self.graph.edges()
    }

    /// # Panics
    ///
    /// Panics if `id` is not an atom of this molecule.
    pub fn atom(&self, id: AtomId) -> &Atom {
        self.graph.node(id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> &mut Atom {
        self.graph.node_mut(id)
    }

    pub fn bond(&self, id: BondId) -> &Bond {
        self.graph.edge(id)
    }

    pub fn bond_mut(&mut self, id: BondId) -> &mut Bond {
        self.graph.edge_mut(id)
    }

    pub fn bond_between(&self, a: AtomId, b: AtomId) -> Option<BondId> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_endpoints(&self, id: BondId) -> (AtomId, AtomId) {
        self.graph.endpoints(id).unwrap_or((id, id))
    }

    /// The atom at the far end of a bond.
    pub fn other_end(&self, bond: BondId, atom: AtomId) -> AtomId {
        let (first, second) = self.bond_endpoints(bond);
        if first == atom {
            second
        } else {
            first
        }
    }

    /// Directional marker of a bond as read when leaving `atom`.
    pub fn stereo_from(&self, bond: BondId, atom: AtomId) -> BondStereo {
        let stereo = self.bond(bond).stereo;
        if self.bond_endpoints(bond).0 == atom {
            stereo
        } else {
            stereo.flipped()
        }
    }

    pub fn neighbors(&self, atom: AtomId) -> Vec<AtomId> {
        self.graph.neighbors(atom)
    }

    /// `(bond, neighbour)` pairs around an atom, sorted by neighbour.
    pub fn bonds_of(&self, atom: AtomId) -> Vec<(BondId, AtomId)> {
        self.graph.incident(atom)
    }

    /// Number of neighbours that are not plain hydrogen atoms.
    pub fn heavy_degree(&self, atom: AtomId) -> usize {
        self.neighbors(atom)
            .into_iter()
            .filter(|&n| !self.atom(n).is_plain_hydrogen())
            .count()
    }

    /// Bond-order sum with aromatic bonds counted as one.
    pub fn bond_order_sum(&self, atom: AtomId) -> u32 {
        self.bonds_of(atom)
            .into_iter()
            .map(|(bond, _)| self.bond(bond).order.valence_contribution())
            .sum()
    }

    pub fn has_bond_order(&self, atom: AtomId, order: BondOrder) -> bool {
        self.bonds_of(atom)
            .into_iter()
            .any(|(bond, _)| self.bond(bond).order == order)
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn ring_info(&self) -> &RingInfo {
        &self.ring_info
    }

    pub(crate) fn set_rings(&mut self, rings: Vec<Ring>) {
        self.ring_info = RingInfo::from_rings(&rings);
        self.rings = rings;
    }

    /// Total number of hydrogens, implicit and explicit atoms alike.
    pub fn total_hydrogens(&self) -> usize {
        self.atoms()
            .map(|a| {
                let atom = self.atom(a);
                atom.hydrogen_count() as usize + usize::from(atom.element == Element::H)
            })
            .sum()
    }
}
