use super::bracket::parse_bracket_atom;
use crate::atom::{Atom, StereoRef};
use crate::bond::{Bond, BondOrder, BondStereo};
use crate::element::Element;
use crate::error::{GraphError, SmilesError};
use crate::molecule::{AtomId, Molecule};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// A bond symbol waiting for the next atom or ring-closure digit.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingBond {
    order: Option<BondOrder>,
    stereo: BondStereo,
    /// Where the bond symbol was written.
    position: Option<usize>,
}

impl Default for PendingBond {
    fn default() -> Self {
        PendingBond {
            order: None,
            stereo: BondStereo::None,
            position: None,
        }
    }
}

impl PendingBond {
    fn is_explicit(&self) -> bool {
        self.order.is_some() || self.stereo != BondStereo::None
    }
}

/// One occurrence of a ring-closure label.
#[derive(Debug, Clone, Copy)]
struct RingBookmark {
    atom: AtomId,
    bond: PendingBond,
}

/// Neighbour order as written. Ring closures stay unresolved until the end of
/// the fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Atom(AtomId),
    ImplicitHydrogen,
    Ring(u8, usize),
}

struct Scanner {
    chars: Vec<char>,
    offset: usize,
    pos: usize,
    molecule: Molecule,
    errors: Vec<SmilesError>,
    current: Option<AtomId>,
    branches: Vec<Option<AtomId>>,
    pending: PendingBond,
    bookmarks: BTreeMap<u8, Vec<RingBookmark>>,
    written: Vec<Vec<Slot>>,
}

/// Parses one dot-free fragment into a molecule without hydrogens resolved.
///
/// # Arguments
///
/// * `fragment` - The fragment text.
/// * `offset` - Character index of the fragment within the whole input, used
///   for error positions.
///
/// # Returns
///
/// * The best-effort molecule and every diagnostic found while reading it.
pub fn parse_fragment(fragment: &str, offset: usize) -> (Molecule, Vec<SmilesError>) {
    let mut scanner = Scanner {
        chars: fragment.chars().collect(),
        offset,
        pos: 0,
        molecule: Molecule::new(),
        errors: Vec::new(),
        current: None,
        branches: Vec::new(),
        pending: PendingBond::default(),
        bookmarks: BTreeMap::new(),
        written: Vec::new(),
    };
    scanner.scan();
    scanner.finish()
}

fn is_bond_symbol(c: char) -> bool {
    matches!(c, '-' | '=' | '#' | '$' | ':' | '/' | '\\')
}

fn is_aromatic_letter(c: char) -> bool {
    matches!(c, 'b' | 'c' | 'n' | 'o' | 's' | 'p')
}

impl Scanner {
    fn position(&self) -> usize {
        self.offset + self.pos
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn scan(&mut self) {
        while let Some(c) = self.peek(0) {
            match c {
                '(' => {
                    self.branches.push(self.current);
                    self.pos += 1;
                }
                ')' => {
                    match self.branches.pop() {
                        Some(atom) => self.current = atom,
                        None => self.errors.push(SmilesError::UnmatchedBranchEnd {
                            position: self.position(),
                        }),
                    }
                    self.drop_pending();
                    self.pos += 1;
                }
                '-' | '=' | '#' | '$' | ':' => {
                    self.pending.order = Some(match c {
                        '-' => BondOrder::Single,
                        '=' => BondOrder::Double,
                        '#' => BondOrder::Triple,
                        '$' => BondOrder::Quadruple,
                        _ => BondOrder::Aromatic,
                    });
                    self.pending.position = Some(self.position());
                    self.pos += 1;
                }
                '/' | '\\' => {
                    self.pending.order = Some(BondOrder::Single);
                    self.pending.stereo = if c == '/' {
                        BondStereo::Up
                    } else {
                        BondStereo::Down
                    };
                    self.pending.position = Some(self.position());
                    self.pos += 1;
                }
                '0'..='9' => {
                    let label = c as u8 - b'0';
                    self.ring_closure(label);
                    self.pos += 1;
                }
                '%' => match (self.peek(1), self.peek(2)) {
                    (Some(tens), Some(ones)) if tens.is_ascii_digit() && ones.is_ascii_digit() => {
                        let label = (tens as u8 - b'0') * 10 + (ones as u8 - b'0');
                        self.ring_closure(label);
                        self.pos += 3;
                    }
                    _ => {
                        self.errors.push(SmilesError::InvalidRingLabel {
                            position: self.position(),
                        });
                        self.pos += 1;
                    }
                },
                '[' => {
                    if !self.bracket_atom() {
                        // Nothing after an unclosed bracket can be read reliably.
                        break;
                    }
                }
                '*' => {
                    self.add_atom(Atom::new(Element::WILDCARD));
                    self.pos += 1;
                }
                c if c.is_ascii_uppercase() => self.organic_atom(c),
                c if is_aromatic_letter(c) => {
                    let element = Element::from_aromatic_symbol(&c.to_string())
                        .unwrap_or(Element::WILDCARD);
                    self.add_atom(Atom::aromatic(element));
                    self.pos += 1;
                }
                other => {
                    self.errors.push(SmilesError::UnsupportedCharacter {
                        ch: other,
                        position: self.position(),
                    });
                    self.pos += 1;
                }
            }
        }
    }

    /// Reads an unbracketed uppercase symbol. A valid two-letter symbol is
    /// split into a one-letter atom followed by an aromatic one only when the
    /// second letter is an aromatic atom, the first is one of `CNOSPB`, and
    /// the pair is followed by a digit, a bond symbol, `@` or `(`.
    fn organic_atom(&mut self, first: char) {
        let two_letter = self.peek(1).filter(|c| c.is_ascii_lowercase()).and_then(|second| {
            let symbol: String = [first, second].iter().collect();
            Element::from_symbol(&symbol).map(|element| (second, element))
        });

        if let Some((second, element)) = two_letter {
            let splits = is_aromatic_letter(second)
                && matches!(first, 'C' | 'N' | 'O' | 'S' | 'P' | 'B')
                && self
                    .peek(2)
                    .map_or(false, |c| c.is_ascii_digit() || is_bond_symbol(c) || c == '@' || c == '(');
            if !splits {
                trace!(symbol = element.symbol(), "two-letter element");
                self.add_atom(Atom::new(element));
                self.pos += 2;
                return;
            }
        }

        match Element::from_symbol(&first.to_string()) {
            Some(element) => self.add_atom(Atom::new(element)),
            None => self.errors.push(SmilesError::UnsupportedCharacter {
                ch: first,
                position: self.position(),
            }),
        }
        self.pos += 1;
    }

    /// Returns false when the bracket is never closed.
    fn bracket_atom(&mut self) -> bool {
        let start = self.pos;
        let close = match self.chars[start + 1..].iter().position(|&c| c == ']') {
            Some(len) => start + 1 + len,
            None => {
                self.errors.push(SmilesError::UnclosedBracket {
                    position: self.position(),
                });
                return false;
            }
        };
        let content: String = self.chars[start + 1..close].iter().collect();

        match parse_bracket_atom(&content) {
            Some(parsed) => {
                let atom = Atom {
                    aromatic: parsed.aromatic,
                    charge: parsed.charge,
                    hydrogens: parsed.hydrogens,
                    isotope: parsed.isotope,
                    chirality: parsed.chirality,
                    bracket: true,
                    class: parsed.class,
                    ..Atom::new(parsed.element)
                };
                self.add_atom(atom);
            }
            None => {
                self.errors.push(SmilesError::InvalidBracketAtom {
                    content,
                    position: self.position(),
                });
                self.pending = PendingBond::default();
            }
        }
        self.pos = close + 1;
        true
    }

    fn add_atom(&mut self, atom: Atom) {
        let has_hydrogens = atom.hydrogens.map_or(false, |h| h > 0);
        let id = self.molecule.add_atom(atom);
        self.written.push(Vec::new());

        if let Some(previous) = self.current {
            let order = self.pending.order.unwrap_or_else(|| self.default_order(previous, id));
            let bond = Bond {
                stereo: self.pending.stereo,
                explicit: self.pending.is_explicit(),
                ..Bond::new(order)
            };
            if self.molecule.add_bond(previous, id, bond).is_ok() {
                self.written[previous].push(Slot::Atom(id));
                self.written[id].push(Slot::Atom(previous));
            }
        } else {
            self.drop_pending();
        }
        if has_hydrogens {
            self.written[id].push(Slot::ImplicitHydrogen);
        }
        self.pending = PendingBond::default();
        self.current = Some(id);
    }

    /// Discards the pending bond, reporting it if a symbol was written.
    fn drop_pending(&mut self) {
        if let Some(position) = self.pending.position {
            self.errors.push(SmilesError::DanglingBond { position });
        }
        self.pending = PendingBond::default();
    }

    fn default_order(&self, a: AtomId, b: AtomId) -> BondOrder {
        if self.molecule.atom(a).aromatic && self.molecule.atom(b).aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn ring_closure(&mut self, label: u8) {
        let Some(atom) = self.current else {
            self.errors.push(SmilesError::RingClosureNoCurrentAtom {
                label,
                position: self.position(),
            });
            return;
        };
        let entries = self.bookmarks.entry(label).or_default();
        entries.push(RingBookmark {
            atom,
            bond: self.pending,
        });
        self.written[atom].push(Slot::Ring(label, entries.len() - 1));
        self.pending = PendingBond::default();
    }

    fn finish(mut self) -> (Molecule, Vec<SmilesError>) {
        self.drop_pending();
        if !self.branches.is_empty() {
            self.errors.push(SmilesError::UnclosedBranch {
                count: self.branches.len(),
            });
        }

        let bookmarks = std::mem::take(&mut self.bookmarks);
        for (label, entries) in bookmarks {
            self.close_ring(label, &entries);
        }

        for (id, slots) in self.written.iter().enumerate() {
            if self.molecule.atom(id).chirality.is_none() {
                continue;
            }
            let order = slots
                .iter()
                .filter_map(|slot| match slot {
                    Slot::Atom(other) => Some(StereoRef::Atom(*other)),
                    Slot::ImplicitHydrogen => Some(StereoRef::ImplicitHydrogen),
                    Slot::Ring(..) => None,
                })
                .collect();
            self.molecule.atom_mut(id).written_order = order;
        }

        debug!(
            atoms = self.molecule.atom_count(),
            bonds = self.molecule.bond_count(),
            errors = self.errors.len(),
            "parsed fragment"
        );
        (self.molecule, self.errors)
    }

    /// Pairs the first two entries of a label that sit on distinct atoms.
    fn close_ring(&mut self, label: u8, entries: &[RingBookmark]) {
        let Some(first) = entries.first().copied() else {
            return;
        };
        if entries.len() < 2 {
            self.errors.push(SmilesError::UnclosedRing { label });
            return;
        }
        let Some(second_index) = entries.iter().position(|e| e.atom != first.atom) else {
            self.errors.push(SmilesError::SelfClosingRing {
                label,
                atom: first.atom,
            });
            return;
        };
        let second = entries[second_index];

        let mut endpoints: Vec<AtomId> = entries.iter().map(|e| e.atom).collect();
        endpoints.sort_unstable();
        endpoints.dedup();
        if endpoints.len() > 2 {
            self.errors.push(SmilesError::TooManyRingEndpoints {
                label,
                endpoints: endpoints.len(),
            });
        }

        let order = match (first.bond.order, second.bond.order) {
            (Some(a), Some(b)) if a != b => {
                self.errors.push(SmilesError::RingBondConflict { label });
                a
            }
            (Some(a), _) => a,
            (None, Some(b)) => b,
            (None, None) => self.default_order(first.atom, second.atom),
        };

        // The stereo marker is relative to the atom it was written on.
        let (from, to, stereo) = match (first.bond.stereo, second.bond.stereo) {
            (BondStereo::None, BondStereo::None) => (first.atom, second.atom, BondStereo::None),
            (BondStereo::None, stereo) => (second.atom, first.atom, stereo),
            (stereo, _) => (first.atom, second.atom, stereo),
        };
        let bond = Bond {
            stereo,
            explicit: first.bond.is_explicit() || second.bond.is_explicit(),
            ..Bond::new(order)
        };

        match self.molecule.add_bond(from, to, bond) {
            Ok(_) => {
                self.resolve_slot(first.atom, label, 0, second.atom);
                self.resolve_slot(second.atom, label, second_index, first.atom);
            }
            Err(GraphError::DuplicateEdge(..)) => self.errors.push(SmilesError::DuplicateBond {
                label,
                first: first.atom,
                second: second.atom,
            }),
            Err(err) => debug!(%err, label, "ring closure rejected"),
        }
    }

    fn resolve_slot(&mut self, atom: AtomId, label: u8, entry: usize, partner: AtomId) {
        for slot in self.written[atom].iter_mut() {
            if *slot == Slot::Ring(label, entry) {
                *slot = Slot::Atom(partner);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Chirality;

    #[test]
    fn test_chain_and_branches() {
        let (mol, errors) = parse_fragment("CC(C)C", 0);
        assert!(errors.is_empty());
        assert_eq!(mol.atom_count(), 4);
        assert_eq!(mol.bond_count(), 3);
        assert_eq!(mol.neighbors(1), vec![0, 2, 3]);
        assert!(mol.atoms().all(|a| mol.atom(a).hydrogens.is_none()));
    }

    #[test]
    fn test_ring_closure_and_bond_types() {
        let (mol, errors) = parse_fragment("C1=CC=CC=C1", 0);
        assert!(errors.is_empty());
        assert_eq!(mol.bond_count(), 6);
        let closure = mol.bond_between(0, 5).unwrap();
        assert_eq!(mol.bond(closure).order, BondOrder::Single);
        assert_eq!(mol.bond(mol.bond_between(0, 1).unwrap()).order, BondOrder::Double);
        assert!(mol.bond(mol.bond_between(0, 1).unwrap()).explicit);

        let (mol, _) = parse_fragment("c1ccccc1", 0);
        assert!(mol
            .bonds()
            .all(|b| mol.bond(b).order == BondOrder::Aromatic && !mol.bond(b).explicit));

        let (mol, _) = parse_fragment("C=1CCCC1", 0);
        assert_eq!(mol.bond(mol.bond_between(0, 4).unwrap()).order, BondOrder::Double);
    }

    #[test]
    fn test_two_letter_disambiguation() {
        let (mol, _) = parse_fragment("CCl", 0);
        assert_eq!(mol.atom(1).element, Element::CL);

        // Thioanisole: `Sc` followed by a digit splits.
        let (mol, errors) = parse_fragment("CSc1ccccc1", 0);
        assert!(errors.is_empty());
        assert_eq!(mol.atom(1).element, Element::S);
        assert!(mol.atom(2).aromatic);
        assert_eq!(mol.atom_count(), 8);

        // At the end of input the two-letter reading wins.
        let (mol, _) = parse_fragment("CSc", 0);
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.atom(1).element.symbol(), "Sc");

        let (mol, _) = parse_fragment("Cn1cccc1", 0);
        assert_eq!(mol.atom(0).element, Element::C);
        assert_eq!(mol.atom(1).element, Element::N);
        assert!(mol.atom(1).aromatic);
    }

    #[test]
    fn test_bracket_atoms() {
        let (mol, errors) = parse_fragment("[NH4+]", 0);
        assert!(errors.is_empty());
        let atom = mol.atom(0);
        assert_eq!(atom.hydrogens, Some(4));
        assert_eq!(atom.charge, 1);
        assert!(atom.bracket);

        let (mol, _) = parse_fragment("[C]", 0);
        assert_eq!(mol.atom(0).hydrogens, None);
    }

    #[test]
    fn test_syntax_errors() {
        let (_, errors) = parse_fragment("CC)C", 0);
        assert_eq!(errors, vec![SmilesError::UnmatchedBranchEnd { position: 2 }]);

        let (_, errors) = parse_fragment("C(C(C", 0);
        assert_eq!(errors, vec![SmilesError::UnclosedBranch { count: 2 }]);

        let (mol, errors) = parse_fragment("CC[CH3", 5);
        assert_eq!(errors, vec![SmilesError::UnclosedBracket { position: 7 }]);
        assert_eq!(mol.atom_count(), 2);

        let (_, errors) = parse_fragment("C[Xy]C", 0);
        assert_eq!(
            errors,
            vec![SmilesError::InvalidBracketAtom {
                content: "Xy".to_string(),
                position: 1
            }]
        );

        let (_, errors) = parse_fragment("1CC", 0);
        assert_eq!(
            errors,
            vec![SmilesError::RingClosureNoCurrentAtom {
                label: 1,
                position: 0
            }]
        );

        let (mol, errors) = parse_fragment("=C", 3);
        assert_eq!(errors, vec![SmilesError::DanglingBond { position: 3 }]);
        assert_eq!(mol.atom_count(), 1);

        let (mol, errors) = parse_fragment("C1CCC1=", 0);
        assert_eq!(errors, vec![SmilesError::DanglingBond { position: 6 }]);
        assert_eq!(mol.bond_count(), 4);

        let (mol, errors) = parse_fragment("CC(#)C", 0);
        assert_eq!(errors, vec![SmilesError::DanglingBond { position: 3 }]);
        assert!(mol.bonds().all(|b| mol.bond(b).order == BondOrder::Single));

        let (_, errors) = parse_fragment("C?C", 0);
        assert_eq!(
            errors,
            vec![SmilesError::UnsupportedCharacter {
                ch: '?',
                position: 1
            }]
        );
    }

    #[test]
    fn test_ring_errors() {
        let (mol, errors) = parse_fragment("C1CC", 0);
        assert_eq!(errors, vec![SmilesError::UnclosedRing { label: 1 }]);
        assert_eq!(mol.bond_count(), 2);

        let (_, errors) = parse_fragment("C11", 0);
        assert_eq!(errors, vec![SmilesError::SelfClosingRing { label: 1, atom: 0 }]);

        let (mol, errors) = parse_fragment("C1CC1C1", 0);
        assert_eq!(
            errors,
            vec![SmilesError::TooManyRingEndpoints {
                label: 1,
                endpoints: 3
            }]
        );
        assert!(mol.bond_between(0, 2).is_some());
        assert!(mol.bond_between(0, 3).is_none());

        let (_, errors) = parse_fragment("C=1CCC#1", 0);
        assert_eq!(errors, vec![SmilesError::RingBondConflict { label: 1 }]);

        let (_, errors) = parse_fragment("C1C1", 0);
        assert_eq!(
            errors,
            vec![SmilesError::DuplicateBond {
                label: 1,
                first: 0,
                second: 1
            }]
        );
    }

    #[test]
    fn test_percent_labels() {
        let (mol, errors) = parse_fragment("C%12CCC%12", 0);
        assert!(errors.is_empty());
        assert!(mol.bond_between(0, 3).is_some());

        let (_, errors) = parse_fragment("C%1C", 0);
        assert_eq!(errors[0], SmilesError::InvalidRingLabel { position: 1 });
    }

    #[test]
    fn test_stereo_markers() {
        let (mol, errors) = parse_fragment("F/C=C/F", 0);
        assert!(errors.is_empty());
        let first = mol.bond(mol.bond_between(0, 1).unwrap());
        assert_eq!(first.stereo, BondStereo::Up);
        assert!(first.explicit);
        assert_eq!(first.order, BondOrder::Single);
        assert_eq!(mol.bond(mol.bond_between(2, 3).unwrap()).stereo, BondStereo::Up);
    }

    #[test]
    fn test_written_order() {
        let (mol, _) = parse_fragment("N[C@@H](C)C(=O)O", 0);
        let center = mol.atom(1);
        assert_eq!(center.chirality, Some(Chirality::Clockwise));
        assert_eq!(
            center.written_order,
            vec![
                StereoRef::Atom(0),
                StereoRef::ImplicitHydrogen,
                StereoRef::Atom(2),
                StereoRef::Atom(3)
            ]
        );

        let (mol, _) = parse_fragment("[C@]1(F)(Cl)CC1", 0);
        assert_eq!(
            mol.atom(0).written_order,
            vec![
                StereoRef::Atom(4),
                StereoRef::Atom(1),
                StereoRef::Atom(2),
                StereoRef::Atom(3)
            ]
        );
    }
}
