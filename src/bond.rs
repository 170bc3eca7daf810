use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Contribution to an atom's bond-order sum during hydrogen inference.
    /// Aromatic bonds count as one.
    pub fn valence_contribution(self) -> u32 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }

    /// Bond order in half units, with aromatic bonds worth one and a half.
    pub fn half_order(self) -> u32 {
        match self {
            BondOrder::Single => 2,
            BondOrder::Aromatic => 3,
            BondOrder::Double => 4,
            BondOrder::Triple => 6,
            BondOrder::Quadruple => 8,
        }
    }

    /// Traversal preference when ordering neighbours on output.
    pub fn priority(self) -> u8 {
        match self {
            BondOrder::Aromatic => 0,
            BondOrder::Triple => 1,
            BondOrder::Double => 2,
            BondOrder::Quadruple => 3,
            BondOrder::Single => 4,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BondOrder::Single => '-',
            BondOrder::Double => '=',
            BondOrder::Triple => '#',
            BondOrder::Quadruple => '$',
            BondOrder::Aromatic => ':',
        }
    }
}

/// Directional marker from `/` or `\`, relative to the bond's stored
/// endpoint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BondStereo {
    None,
    Up,
    Down,
}

impl BondStereo {
    pub fn flipped(self) -> BondStereo {
        match self {
            BondStereo::Up => BondStereo::Down,
            BondStereo::Down => BondStereo::Up,
            BondStereo::None => BondStereo::None,
        }
    }

    pub fn symbol(self) -> Option<char> {
        match self {
            BondStereo::Up => Some('/'),
            BondStereo::Down => Some('\\'),
            BondStereo::None => None,
        }
    }
}

/// A bond edge. `in_ring`, `rings` and `rotatable` are caches filled in by
/// enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub order: BondOrder,
    pub stereo: BondStereo,
    /// Whether a bond symbol was written in the input.
    pub explicit: bool,

    pub in_ring: bool,
    pub rings: Vec<usize>,
    pub rotatable: bool,
}

impl Bond {
    pub fn new(order: BondOrder) -> Self {
        Bond {
            order,
            stereo: BondStereo::None,
            explicit: false,
            in_ring: false,
            rings: Vec::new(),
            rotatable: false,
        }
    }

    pub fn single() -> Self {
        Bond::new(BondOrder::Single)
    }

    pub fn double() -> Self {
        Bond::new(BondOrder::Double)
    }

    pub fn aromatic() -> Self {
        Bond::new(BondOrder::Aromatic)
    }
}

impl fmt::Display for Bond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stereo.symbol() {
            Some(symbol) => write!(f, "{}", symbol),
            None => write!(f, "{}", self.order.symbol()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders() {
        assert_eq!(BondOrder::Aromatic.valence_contribution(), 1);
        assert_eq!(BondOrder::Aromatic.half_order(), 3);
        assert!(BondOrder::Aromatic.priority() < BondOrder::Triple.priority());
        assert!(BondOrder::Triple.priority() < BondOrder::Double.priority());
        assert!(BondOrder::Double.priority() < BondOrder::Single.priority());
    }

    #[test]
    fn test_stereo_display() {
        let mut bond = Bond::single();
        bond.stereo = BondStereo::Down;
        assert_eq!(bond.to_string(), "\\");
        assert_eq!(BondStereo::Down.flipped(), BondStereo::Up);
        assert_eq!(Bond::double().to_string(), "=");
    }
}
