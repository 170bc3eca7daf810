use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use molgraph::{canonicalize, generate_smiles, parse_smiles};

struct Reference {
    smiles: String,
    atoms: usize,
    bonds: usize,
    rings: usize,
    aromatic_atoms: usize,
    hydrogens: usize,
    canonical: Option<String>,
}

fn field(record: &StringRecord, index: usize) -> Result<&str> {
    record
        .get(index)
        .with_context(|| format!("Missing column {index} in {record:?}"))
}

fn count(record: &StringRecord, index: usize) -> Result<usize> {
    let text = field(record, index)?;
    text.parse()
        .with_context(|| format!("Column {index} is not a count: {text:?}"))
}

fn read_references() -> Result<Vec<Reference>> {
    let csv_data = include_str!("data/reference.csv");
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let mut references = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let canonical = field(&record, 6)?;
        references.push(Reference {
            smiles: field(&record, 0)?.to_string(),
            atoms: count(&record, 1)?,
            bonds: count(&record, 2)?,
            rings: count(&record, 3)?,
            aromatic_atoms: count(&record, 4)?,
            hydrogens: count(&record, 5)?,
            canonical: (!canonical.is_empty()).then(|| canonical.to_string()),
        });
    }
    Ok(references)
}

#[test]
fn reference_counts() -> Result<()> {
    let references = read_references()?;
    assert!(!references.is_empty());
    for reference in references {
        let output = parse_smiles(&reference.smiles);
        assert!(
            output.errors.is_empty(),
            "{}: {:?}",
            reference.smiles,
            output.errors
        );
        let mol = &output.molecules[0];
        let aromatic = mol.atoms().filter(|&a| mol.atom(a).aromatic).count();

        assert_eq!(mol.atom_count(), reference.atoms, "{} atoms", reference.smiles);
        assert_eq!(mol.bond_count(), reference.bonds, "{} bonds", reference.smiles);
        assert_eq!(mol.rings().len(), reference.rings, "{} rings", reference.smiles);
        assert_eq!(aromatic, reference.aromatic_atoms, "{} aromatic", reference.smiles);
        assert_eq!(
            mol.total_hydrogens(),
            reference.hydrogens,
            "{} hydrogens",
            reference.smiles
        );
    }
    Ok(())
}

#[test]
fn reference_canonical_forms() -> Result<()> {
    for reference in read_references()? {
        let canonical = canonicalize(&reference.smiles)?;
        if let Some(expected) = &reference.canonical {
            assert_eq!(&canonical, expected, "{}", reference.smiles);
        }
        let output = parse_smiles(&canonical);
        assert_eq!(generate_smiles(&output.molecules[0])?, canonical);
    }
    Ok(())
}
