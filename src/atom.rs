use crate::element::Element;
use std::fmt;

/// Extended chirality classes written as `@TH1`, `@SP2`, `@OH15`, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChiralClass {
    Tetrahedral,
    Allenal,
    SquarePlanar,
    TrigonalBipyramidal,
    Octahedral,
}

impl ChiralClass {
    pub fn prefix(self) -> &'static str {
        match self {
            ChiralClass::Tetrahedral => "TH",
            ChiralClass::Allenal => "AL",
            ChiralClass::SquarePlanar => "SP",
            ChiralClass::TrigonalBipyramidal => "TB",
            ChiralClass::Octahedral => "OH",
        }
    }

    /// Highest permitted numeric suffix for the class.
    pub fn max_number(self) -> u8 {
        match self {
            ChiralClass::Tetrahedral | ChiralClass::Allenal => 2,
            ChiralClass::SquarePlanar => 3,
            ChiralClass::TrigonalBipyramidal => 20,
            ChiralClass::Octahedral => 30,
        }
    }
}

/// A chirality tag as written in a bracket atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chirality {
    /// `@`
    CounterClockwise,
    /// `@@`
    Clockwise,
    /// `@TH1`, `@TB12`, ...
    Extended(ChiralClass, u8),
}

impl Chirality {
    /// The tag with the opposite handedness. Extended tags are returned unchanged.
    pub fn inverted(self) -> Chirality {
        match self {
            Chirality::CounterClockwise => Chirality::Clockwise,
            Chirality::Clockwise => Chirality::CounterClockwise,
            other => other,
        }
    }

    /// `@TH1` and `@TH2` spelled as `@` and `@@`. Other tags are kept.
    pub fn normalized(self) -> Chirality {
        match self {
            Chirality::Extended(ChiralClass::Tetrahedral, 1) => Chirality::CounterClockwise,
            Chirality::Extended(ChiralClass::Tetrahedral, 2) => Chirality::Clockwise,
            other => other,
        }
    }
}

impl fmt::Display for Chirality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chirality::CounterClockwise => write!(f, "@"),
            Chirality::Clockwise => write!(f, "@@"),
            Chirality::Extended(class, number) => write!(f, "@{}{}", class.prefix(), number),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hybridization {
    Sp,
    Sp2,
    Sp3,
    Other,
}

/// One entry in the order an atom's neighbours were written in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StereoRef {
    Atom(usize),
    ImplicitHydrogen,
}

/// An atom node.
///
/// The fields below `class` are caches filled in by enrichment and are
/// meaningless before it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: Element,
    pub aromatic: bool,
    pub charge: i8,
    /// `None` until resolved, unless given explicitly in brackets.
    pub hydrogens: Option<u8>,
    pub isotope: Option<u16>,
    pub chirality: Option<Chirality>,
    /// Whether the atom was written in brackets.
    pub bracket: bool,
    pub class: u32,
    /// Neighbour order as written, used to keep tetrahedral parity on output.
    pub written_order: Vec<StereoRef>,

    pub heavy_degree: usize,
    pub in_ring: bool,
    pub rings: Vec<usize>,
    pub hybridization: Option<Hybridization>,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Atom {
            element,
            aromatic: false,
            charge: 0,
            hydrogens: None,
            isotope: None,
            chirality: None,
            bracket: false,
            class: 0,
            written_order: Vec::new(),
            heavy_degree: 0,
            in_ring: false,
            rings: Vec::new(),
            hybridization: None,
        }
    }

    pub fn aromatic(element: Element) -> Self {
        Atom {
            aromatic: true,
            ..Atom::new(element)
        }
    }

    /// Resolved hydrogen count, treating "unspecified" as zero.
    pub fn hydrogen_count(&self) -> u8 {
        self.hydrogens.unwrap_or(0)
    }

    /// A plain hydrogen atom, not counted among heavy neighbours.
    pub fn is_plain_hydrogen(&self) -> bool {
        self.element == Element::H && self.isotope.is_none()
    }

    /// The symbol as written: lowercase for aromatic atoms.
    pub fn written_symbol(&self) -> String {
        if self.aromatic {
            self.element.symbol().to_lowercase()
        } else {
            self.element.symbol().to_string()
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.written_symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chirality_display() {
        assert_eq!(Chirality::CounterClockwise.to_string(), "@");
        assert_eq!(Chirality::Clockwise.to_string(), "@@");
        assert_eq!(
            Chirality::Extended(ChiralClass::TrigonalBipyramidal, 12).to_string(),
            "@TB12"
        );
        assert_eq!(Chirality::Clockwise.inverted(), Chirality::CounterClockwise);
        let oh = Chirality::Extended(ChiralClass::Octahedral, 3);
        assert_eq!(oh.inverted(), oh);
    }

    #[test]
    fn test_atom_symbols() {
        assert_eq!(Atom::aromatic(Element::C).written_symbol(), "c");
        assert_eq!(Atom::aromatic(Element::SE).written_symbol(), "se");
        assert_eq!(Atom::new(Element::CL).to_string(), "Cl");
        assert_eq!(Atom::new(Element::N).hydrogen_count(), 0);
    }
}
