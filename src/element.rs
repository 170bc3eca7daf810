use lazy_static::lazy_static;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Element symbols indexed by atomic number. Index 0 is the wildcard `*`.
const SYMBOLS: [&str; 119] = [
    "*", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn",
    "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

lazy_static! {
    static ref SYMBOL_TABLE: HashMap<&'static str, Element> = SYMBOLS
        .iter()
        .enumerate()
        .map(|(number, symbol)| (*symbol, Element(number as u8)))
        .collect();
}

/// A chemical element, identified by its atomic number. Atomic number 0 is the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Element(u8);

impl Element {
    pub const WILDCARD: Element = Element(0);
    pub const H: Element = Element(1);
    pub const B: Element = Element(5);
    pub const C: Element = Element(6);
    pub const N: Element = Element(7);
    pub const O: Element = Element(8);
    pub const F: Element = Element(9);
    pub const SI: Element = Element(14);
    pub const P: Element = Element(15);
    pub const S: Element = Element(16);
    pub const CL: Element = Element(17);
    pub const AS: Element = Element(33);
    pub const SE: Element = Element(34);
    pub const BR: Element = Element(35);
    pub const I: Element = Element(53);

    pub fn from_atomic_number(number: u8) -> Option<Element> {
        if (number as usize) < SYMBOLS.len() {
            Some(Element(number))
        } else {
            None
        }
    }

    /// Looks up a symbol with exact capitalization (`"Cl"`, not `"CL"`).
    pub fn from_symbol(symbol: &str) -> Option<Element> {
        SYMBOL_TABLE.get(symbol).copied()
    }

    /// Looks up an aromatic (lowercase) symbol such as `c`, `n` or `se`.
    pub fn from_aromatic_symbol(symbol: &str) -> Option<Element> {
        match symbol {
            "b" => Some(Element::B),
            "c" => Some(Element::C),
            "n" => Some(Element::N),
            "o" => Some(Element::O),
            "p" => Some(Element::P),
            "s" => Some(Element::S),
            "se" => Some(Element::SE),
            "as" => Some(Element::AS),
            _ => None,
        }
    }

    pub fn atomic_number(self) -> u8 {
        self.0
    }

    pub fn symbol(self) -> &'static str {
        SYMBOLS[self.0 as usize]
    }

    pub fn is_wildcard(self) -> bool {
        self.0 == 0
    }

    /// Elements that may be written without brackets.
    pub fn is_organic_subset(self) -> bool {
        matches!(
            self,
            Element::B
                | Element::C
                | Element::N
                | Element::O
                | Element::P
                | Element::S
                | Element::F
                | Element::CL
                | Element::BR
                | Element::I
        )
    }

    /// Elements that may carry the aromatic flag.
    pub fn can_be_aromatic(self) -> bool {
        matches!(
            self,
            Element::B
                | Element::C
                | Element::N
                | Element::O
                | Element::P
                | Element::S
                | Element::SE
                | Element::AS
        )
    }

    /// Lowercase letters that may appear bare in an aromatic position.
    pub fn is_bare_aromatic(self) -> bool {
        matches!(
            self,
            Element::B | Element::C | Element::N | Element::O | Element::P | Element::S
        )
    }

    /// Normal valences used to infer implicit hydrogens. Elements missing from
    /// the table fall back to their atomic number.
    pub fn allowed_valences(self, aromatic: bool) -> Cow<'static, [u8]> {
        if aromatic {
            if let Some(valences) = aromatic_valences(self) {
                return Cow::Borrowed(valences);
            }
        }
        match default_valences(self) {
            Some(valences) => Cow::Borrowed(valences),
            None => Cow::Owned(vec![self.0]),
        }
    }

    /// Whether the element has an entry in the valence tables.
    pub fn has_known_valence(self) -> bool {
        default_valences(self).is_some()
    }
}

fn default_valences(element: Element) -> Option<&'static [u8]> {
    let valences: &'static [u8] = match element.0 {
        1 => &[1],
        5 => &[3],
        6 => &[4],
        7 => &[3, 5],
        8 => &[2],
        9 | 17 | 35 | 85 => &[1],
        14 | 32 => &[4],
        15 | 33 => &[3, 5],
        16 | 34 | 52 => &[2, 4, 6],
        53 => &[1, 3, 5, 7],
        _ => return None,
    };
    Some(valences)
}

fn aromatic_valences(element: Element) -> Option<&'static [u8]> {
    let valences: &'static [u8] = match element.0 {
        5 => &[2, 3],
        6 => &[3],
        7 => &[2, 3],
        8 => &[2],
        15 => &[2, 3],
        16 => &[2],
        33 => &[2, 3],
        34 => &[2],
        _ => return None,
    };
    Some(valences)
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_lookup() {
        assert_eq!(Element::from_symbol("C"), Some(Element::C));
        assert_eq!(Element::from_symbol("Cl"), Some(Element::CL));
        assert_eq!(Element::from_symbol("Og").map(Element::atomic_number), Some(118));
        assert_eq!(Element::from_symbol("CL"), None);
        assert_eq!(Element::from_symbol("*"), Some(Element::WILDCARD));
        assert_eq!(Element::SE.symbol(), "Se");
    }

    #[test]
    fn test_valence_tables() {
        assert_eq!(&*Element::C.allowed_valences(false), &[4]);
        assert_eq!(&*Element::C.allowed_valences(true), &[3]);
        assert_eq!(&*Element::S.allowed_valences(false), &[2, 4, 6]);
        // Fluorine has no aromatic table and falls back to the general one.
        assert_eq!(&*Element::F.allowed_valences(true), &[1]);
        // Iron is unknown to the tables.
        let iron = Element::from_symbol("Fe").unwrap();
        assert_eq!(&*iron.allowed_valences(false), &[26]);
        assert!(!iron.has_known_valence());
    }

    #[test]
    fn test_subsets() {
        assert!(Element::BR.is_organic_subset());
        assert!(!Element::SE.is_organic_subset());
        assert!(Element::SE.can_be_aromatic());
        assert!(!Element::SE.is_bare_aromatic());
        assert_eq!(Element::from_aromatic_symbol("se"), Some(Element::SE));
        assert_eq!(Element::from_aromatic_symbol("f"), None);
    }
}
