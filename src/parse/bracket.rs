use crate::atom::{ChiralClass, Chirality};
use crate::element::Element;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, one_of, satisfy};
use nom::combinator::{map, map_res, opt, value, verify};
use nom::error::{ErrorKind, ParseError, VerboseError};
use nom::multi::fold_many0;
use nom::sequence::{pair, preceded, tuple};
use nom::IResult;

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// The fields of a bracket atom such as `[13CH3+:2]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketAtom {
    pub isotope: Option<u16>,
    pub element: Element,
    pub aromatic: bool,
    pub chirality: Option<Chirality>,
    /// `None` when no `H` was written.
    pub hydrogens: Option<u8>,
    pub charge: i8,
    pub class: u32,
}

/// Parses the text between `[` and `]`. Returns `None` when no element symbol
/// can be read; unrecognized trailing characters are ignored.
pub fn parse_bracket_atom(content: &str) -> Option<BracketAtom> {
    bracket_atom(content).ok().map(|(_, atom)| atom)
}

fn bracket_atom(input: &str) -> Res<BracketAtom> {
    let (rest, (isotope, (element, aromatic), chirality, hydrogens, charge, class)) = tuple((
        isotope,
        element_symbol,
        chirality,
        hydrogen_count,
        charge,
        atom_class,
    ))(input)?;
    Ok((
        rest,
        BracketAtom {
            isotope,
            element,
            aromatic,
            chirality,
            hydrogens,
            charge,
            class,
        },
    ))
}

fn isotope(input: &str) -> Res<Option<u16>> {
    opt(map_res(digit1, |s: &str| s.parse::<u16>()))(input)
}

/// Two-letter symbols win over one-letter ones inside brackets.
fn element_symbol(input: &str) -> Res<(Element, bool)> {
    if let Some(rest) = input.strip_prefix('*') {
        return Ok((rest, (Element::WILDCARD, false)));
    }
    for len in [2, 1] {
        if let Some(symbol) = input.get(..len) {
            if let Some(element) = Element::from_symbol(symbol) {
                return Ok((&input[len..], (element, false)));
            }
            if let Some(element) = Element::from_aromatic_symbol(symbol) {
                return Ok((&input[len..], (element, true)));
            }
        }
    }
    Err(nom::Err::Error(VerboseError::from_error_kind(
        input,
        ErrorKind::Alpha,
    )))
}

fn chiral_class(input: &str) -> Res<ChiralClass> {
    alt((
        value(ChiralClass::Tetrahedral, tag("TH")),
        value(ChiralClass::Allenal, tag("AL")),
        value(ChiralClass::SquarePlanar, tag("SP")),
        value(ChiralClass::TrigonalBipyramidal, tag("TB")),
        value(ChiralClass::Octahedral, tag("OH")),
    ))(input)
}

fn extended_chirality(input: &str) -> Res<Chirality> {
    map(
        verify(
            preceded(
                char('@'),
                pair(chiral_class, map_res(digit1, |s: &str| s.parse::<u8>())),
            ),
            |(class, number): &(ChiralClass, u8)| *number >= 1 && *number <= class.max_number(),
        ),
        |(class, number)| Chirality::Extended(class, number).normalized(),
    )(input)
}

/// An out-of-range extended tag falls back to a plain `@` and leaves the
/// rest as ignored trailing text.
fn chirality(input: &str) -> Res<Option<Chirality>> {
    opt(alt((
        extended_chirality,
        value(Chirality::Clockwise, tag("@@")),
        value(Chirality::CounterClockwise, tag("@")),
    )))(input)
}

fn hydrogen_count(input: &str) -> Res<Option<u8>> {
    opt(preceded(
        char('H'),
        map(opt(satisfy(|c| c.is_ascii_digit())), |digit: Option<char>| {
            digit
                .and_then(|d| d.to_digit(10))
                .map_or(1, |d| d as u8)
        }),
    ))(input)
}

fn charge_term(input: &str) -> Res<i32> {
    let (input, sign) = one_of("+-")(input)?;
    let (input, magnitude) = opt(map_res(digit1, |s: &str| s.parse::<i32>()))(input)?;
    let sign = if sign == '+' { 1 } else { -1 };
    Ok((input, sign * magnitude.unwrap_or(1)))
}

/// `+`, `-`, `+2`, `--`, ... accumulated into one signed charge.
fn charge(input: &str) -> Res<i8> {
    map(
        fold_many0(charge_term, || 0i32, |total, term| total + term),
        |total| total.clamp(i8::MIN as i32, i8::MAX as i32) as i8,
    )(input)
}

fn atom_class(input: &str) -> Res<u32> {
    map(
        opt(preceded(
            char(':'),
            map_res(digit1, |s: &str| s.parse::<u32>()),
        )),
        |class| class.unwrap_or(0),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_bracket_atom() {
        let atom = parse_bracket_atom("13CH3+:7").unwrap();
        assert_eq!(atom.isotope, Some(13));
        assert_eq!(atom.element, Element::C);
        assert!(!atom.aromatic);
        assert_eq!(atom.hydrogens, Some(3));
        assert_eq!(atom.charge, 1);
        assert_eq!(atom.class, 7);
    }

    #[test]
    fn test_hydrogens_and_charges() {
        let ammonium = parse_bracket_atom("NH4+").unwrap();
        assert_eq!(ammonium.hydrogens, Some(4));
        assert_eq!(ammonium.charge, 1);

        let hydroxide = parse_bracket_atom("OH-").unwrap();
        assert_eq!(hydroxide.hydrogens, Some(1));
        assert_eq!(hydroxide.charge, -1);

        let iron = parse_bracket_atom("Fe+++").unwrap();
        assert_eq!(iron.charge, 3);
        assert_eq!(iron.hydrogens, None);

        let oxide = parse_bracket_atom("O-2").unwrap();
        assert_eq!(oxide.charge, -2);
        assert_eq!(parse_bracket_atom("O--").unwrap().charge, -2);
    }

    #[test]
    fn test_symbols() {
        assert_eq!(parse_bracket_atom("Cl-").unwrap().element, Element::CL);
        let pyrrole_n = parse_bracket_atom("nH").unwrap();
        assert_eq!(pyrrole_n.element, Element::N);
        assert!(pyrrole_n.aromatic);
        assert_eq!(pyrrole_n.hydrogens, Some(1));
        let selenium = parse_bracket_atom("se").unwrap();
        assert_eq!(selenium.element, Element::SE);
        assert!(selenium.aromatic);
        assert_eq!(parse_bracket_atom("*").unwrap().element, Element::WILDCARD);
        assert_eq!(parse_bracket_atom("2H").unwrap().isotope, Some(2));
        assert!(parse_bracket_atom("Xy").is_none());
        assert!(parse_bracket_atom("").is_none());
        assert!(parse_bracket_atom("+").is_none());
    }

    #[test]
    fn test_chirality() {
        assert_eq!(
            parse_bracket_atom("C@@H").unwrap().chirality,
            Some(Chirality::Clockwise)
        );
        let atom = parse_bracket_atom("C@H").unwrap();
        assert_eq!(atom.chirality, Some(Chirality::CounterClockwise));
        assert_eq!(atom.hydrogens, Some(1));
        assert_eq!(
            parse_bracket_atom("Fe@OH15").unwrap().chirality,
            Some(Chirality::Extended(ChiralClass::Octahedral, 15))
        );
        assert_eq!(
            parse_bracket_atom("C@TH1").unwrap().chirality,
            Some(Chirality::CounterClockwise)
        );
        assert_eq!(
            parse_bracket_atom("C@TH2H").unwrap().chirality,
            Some(Chirality::Clockwise)
        );
        assert_eq!(
            parse_bracket_atom("C@AL1").unwrap().chirality,
            Some(Chirality::Extended(ChiralClass::Allenal, 1))
        );
        assert_eq!(
            parse_bracket_atom("C@TB20").unwrap().chirality,
            Some(Chirality::Extended(ChiralClass::TrigonalBipyramidal, 20))
        );
        // Out of range: the extended tag is not recognized.
        assert_eq!(
            parse_bracket_atom("C@TH3").unwrap().chirality,
            Some(Chirality::CounterClockwise)
        );
    }
}
