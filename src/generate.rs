use crate::atom::{Chirality, StereoRef};
use crate::bond::BondOrder;
use crate::canon::{
    canonical_ranks, invariant_ranks, normalize_bond_directions, strip_symmetric_chirality,
};
use crate::config::Config;
use crate::error::GenerateError;
use crate::molecule::{AtomId, BondId, Molecule};
use crate::valence::implied_hydrogens;
use std::fmt::Write;
use tracing::{debug, instrument};

/// Canonical SMILES for one molecule with the default configuration.
pub fn generate_smiles(mol: &Molecule) -> Result<String, GenerateError> {
    generate_smiles_with(mol, &Config::default())
}

/// Canonical SMILES for one molecule.
///
/// Disconnected pieces of a single molecule are written in rank order of
/// their roots and joined with `.`. Ring labels are never reused, so a
/// molecule needing more than 99 ring closures cannot be written.
#[instrument(skip_all, fields(atoms = mol.atom_count(), bonds = mol.bond_count()))]
pub fn generate_smiles_with(mol: &Molecule, config: &Config) -> Result<String, GenerateError> {
    let mut mol = mol.clone();
    normalize_bond_directions(&mut mol, config);
    let classes = invariant_ranks(&mol, config);
    strip_symmetric_chirality(&mut mol, &classes);
    let ranks = canonical_ranks(&mol, config);

    let mut tree = SpanningTree::new(&mol);
    let mut roots = Vec::new();
    loop {
        let next = mol
            .atoms()
            .filter(|&a| !tree.visited[a])
            .min_by_key(|&a| (ranks[a], mol.heavy_degree(a), a));
        let Some(root) = next else {
            break;
        };
        tree.grow(&mol, &ranks, root);
        roots.push(root);
    }
    tree.sort_closures(&ranks);

    let mut writer = Writer {
        mol: &mol,
        tree: &tree,
        out: String::new(),
        labels: vec![None; mol.bond_count()],
        next_label: 1,
    };
    for (i, &root) in roots.iter().enumerate() {
        if i > 0 {
            writer.out.push('.');
        }
        writer.write_from(root)?;
    }
    debug!(smiles = %writer.out, "generated smiles");
    Ok(writer.out)
}

/// Writes several molecules as one dot-separated string.
pub fn write_smiles(molecules: &[Molecule]) -> Result<String, GenerateError> {
    let fragments = molecules
        .iter()
        .map(generate_smiles)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fragments.join("."))
}

/// Ring-closure label text: a digit below ten, `%NN` from ten to 99, and
/// `None` past that.
pub fn ring_label(label: u32) -> Option<String> {
    match label {
        0..=9 => Some(label.to_string()),
        10..=99 => Some(format!("%{label}")),
        _ => None,
    }
}

struct Frame {
    atom: AtomId,
    neighbours: Vec<(BondId, AtomId)>,
    next: usize,
}

/// Depth-first spanning forest plus the ring-closure bonds left out of it.
struct SpanningTree {
    visited: Vec<bool>,
    used: Vec<bool>,
    parent: Vec<Option<(AtomId, BondId)>>,
    children: Vec<Vec<AtomId>>,
    closures: Vec<Vec<(AtomId, BondId)>>,
}

impl SpanningTree {
    fn new(mol: &Molecule) -> Self {
        let n = mol.atom_count();
        SpanningTree {
            visited: vec![false; n],
            used: vec![false; mol.bond_count()],
            parent: vec![None; n],
            children: vec![Vec::new(); n],
            closures: vec![Vec::new(); n],
        }
    }

    /// Neighbours by rank, then bond priority, then id.
    fn ordered_neighbours(mol: &Molecule, ranks: &[usize], atom: AtomId) -> Vec<(BondId, AtomId)> {
        let mut neighbours = mol.bonds_of(atom);
        neighbours.sort_by_key(|&(bond, n)| (ranks[n], mol.bond(bond).order.priority(), n));
        neighbours
    }

    fn grow(&mut self, mol: &Molecule, ranks: &[usize], root: AtomId) {
        self.visited[root] = true;
        let mut stack = vec![Frame {
            atom: root,
            neighbours: Self::ordered_neighbours(mol, ranks, root),
            next: 0,
        }];
        while let Some(frame) = stack.last_mut() {
            let atom = frame.atom;
            let Some(&(bond, neighbour)) = frame.neighbours.get(frame.next) else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            if self.used[bond] {
                continue;
            }
            self.used[bond] = true;

            if self.visited[neighbour] {
                self.closures[atom].push((neighbour, bond));
                self.closures[neighbour].push((atom, bond));
            } else {
                self.visited[neighbour] = true;
                self.parent[neighbour] = Some((atom, bond));
                self.children[atom].push(neighbour);
                stack.push(Frame {
                    atom: neighbour,
                    neighbours: Self::ordered_neighbours(mol, ranks, neighbour),
                    next: 0,
                });
            }
        }
    }

    fn sort_closures(&mut self, ranks: &[usize]) {
        for closures in &mut self.closures {
            closures.sort_by_key(|&(partner, _)| ranks[partner]);
        }
    }

    /// Children in the order they are written: the branches first, then the
    /// best-ranked child continuing the chain.
    fn emission_order(&self, atom: AtomId) -> Vec<AtomId> {
        match self.children[atom].split_first() {
            Some((&main, branches)) => {
                let mut order = branches.to_vec();
                order.push(main);
                order
            }
            None => Vec::new(),
        }
    }
}

enum Step {
    Atom(AtomId),
    OpenBranch,
    CloseBranch,
}

struct Writer<'a> {
    mol: &'a Molecule,
    tree: &'a SpanningTree,
    out: String,
    labels: Vec<Option<u32>>,
    next_label: u32,
}

impl Writer<'_> {
    fn write_from(&mut self, root: AtomId) -> Result<(), GenerateError> {
        let mut steps = vec![Step::Atom(root)];
        while let Some(step) = steps.pop() {
            match step {
                Step::OpenBranch => self.out.push('('),
                Step::CloseBranch => self.out.push(')'),
                Step::Atom(atom) => {
                    self.write_atom(atom)?;
                    let order = self.tree.emission_order(atom);
                    if let Some((&main, branches)) = order.split_last() {
                        steps.push(Step::Atom(main));
                        for &child in branches.iter().rev() {
                            steps.push(Step::CloseBranch);
                            steps.push(Step::Atom(child));
                            steps.push(Step::OpenBranch);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn write_atom(&mut self, atom: AtomId) -> Result<(), GenerateError> {
        let mol = self.mol;
        if let Some((parent, bond)) = self.tree.parent[atom] {
            if let Some(symbol) = bond_symbol(mol, bond, parent) {
                self.out.push(symbol);
            }
        }

        let chirality = mol
            .atom(atom)
            .chirality
            .map(|c| self.output_chirality(atom, c));
        self.out.push_str(&atom_text(mol, atom, chirality));

        let tree = self.tree;
        for &(_, bond) in &tree.closures[atom] {
            let label = match self.labels[bond] {
                Some(label) => label,
                None => {
                    let label = self.next_label;
                    self.next_label += 1;
                    self.labels[bond] = Some(label);
                    if let Some(symbol) = bond_symbol(mol, bond, atom) {
                        self.out.push(symbol);
                    }
                    label
                }
            };
            let text = ring_label(label).ok_or(GenerateError::RingLabelsExhausted { label })?;
            self.out.push_str(&text);
        }
        Ok(())
    }

    /// Neighbours in the order this writer puts them around `atom`.
    fn output_order(&self, atom: AtomId) -> Vec<StereoRef> {
        let mut order = Vec::new();
        if let Some((parent, _)) = self.tree.parent[atom] {
            order.push(StereoRef::Atom(parent));
        }
        if self.mol.atom(atom).hydrogen_count() > 0 {
            order.push(StereoRef::ImplicitHydrogen);
        }
        order.extend(
            self.tree.closures[atom]
                .iter()
                .map(|&(partner, _)| StereoRef::Atom(partner)),
        );
        order.extend(
            self.tree
                .emission_order(atom)
                .into_iter()
                .map(StereoRef::Atom),
        );
        order
    }

    /// Flips `@`/`@@` (and their `@TH1`/`@TH2` spellings) when the output
    /// neighbour order is an odd permutation of the written one. Other
    /// extended tags and incomplete records pass through; `@AL1`/`@AL2` refer
    /// to the neighbours of the allene ends, which this order does not track.
    fn output_chirality(&self, atom: AtomId, chirality: Chirality) -> Chirality {
        let chirality = chirality.normalized();
        if matches!(chirality, Chirality::Extended(..)) {
            return chirality;
        }
        let written = &self.mol.atom(atom).written_order;
        let output = self.output_order(atom);
        if written.len() != output.len() {
            return chirality;
        }
        let positions: Option<Vec<usize>> = output
            .iter()
            .map(|r| written.iter().position(|w| w == r))
            .collect();
        let Some(positions) = positions else {
            return chirality;
        };
        if permutation_is_odd(&positions) {
            chirality.inverted()
        } else {
            chirality
        }
    }
}

fn permutation_is_odd(positions: &[usize]) -> bool {
    let mut inversions = 0;
    for i in 0..positions.len() {
        for j in i + 1..positions.len() {
            if positions[i] > positions[j] {
                inversions += 1;
            }
        }
    }
    inversions % 2 == 1
}

/// The symbol written between `from` and the other end of `bond`, if any.
fn bond_symbol(mol: &Molecule, bond: BondId, from: AtomId) -> Option<char> {
    let to = mol.other_end(bond, from);
    let both_aromatic = mol.atom(from).aromatic && mol.atom(to).aromatic;
    match mol.bond(bond).order {
        BondOrder::Single => mol
            .stereo_from(bond, from)
            .symbol()
            .or_else(|| both_aromatic.then_some('-')),
        BondOrder::Aromatic if both_aromatic => None,
        order => Some(order.symbol()),
    }
}

/// Whether an atom has to be written inside brackets.
pub fn needs_brackets(mol: &Molecule, atom: AtomId) -> bool {
    let a = mol.atom(atom);
    let bare_element = if a.aromatic {
        a.element.is_bare_aromatic()
    } else {
        a.element.is_wildcard() || a.element.is_organic_subset()
    };
    a.bracket
        || a.isotope.is_some()
        || a.charge != 0
        || a.chirality.is_some()
        || a.class != 0
        || !bare_element
        || a.hydrogen_count() != implied_hydrogens(mol, atom)
}

fn atom_text(mol: &Molecule, atom: AtomId, chirality: Option<Chirality>) -> String {
    let a = mol.atom(atom);
    let symbol = if a.element.is_wildcard() {
        "*".to_string()
    } else {
        a.written_symbol()
    };
    if !needs_brackets(mol, atom) {
        return symbol;
    }

    let mut text = String::from("[");
    if let Some(isotope) = a.isotope {
        let _ = write!(text, "{isotope}");
    }
    text.push_str(&symbol);
    if let Some(chirality) = chirality {
        let _ = write!(text, "{chirality}");
    }
    match a.hydrogen_count() {
        0 => {}
        1 => text.push('H'),
        n => {
            let _ = write!(text, "H{n}");
        }
    }
    match a.charge {
        0 => {}
        1 => text.push('+'),
        -1 => text.push('-'),
        c if c > 0 => {
            let _ = write!(text, "+{c}");
        }
        c => {
            let _ = write!(text, "{c}");
        }
    }
    if a.class != 0 {
        let _ = write!(text, ":{}", a.class);
    }
    text.push(']');
    text
}
