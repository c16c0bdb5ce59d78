use crate::core::elements::table;
use crate::core::io::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::structure::{Cell, Structure};
use itertools::Itertools;
use nalgebra::{Matrix3, Point3};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum XyzParseErrorKind {
    #[error("Invalid atom count '{0}'")]
    InvalidAtomCount(String),
    #[error("File ended after {found} of {expected} atom lines")]
    UnexpectedEof { expected: usize, found: usize },
    #[error("Atom line needs a species and three coordinates")]
    MissingField,
    #[error("Invalid coordinate '{0}'")]
    InvalidFloat(String),
    #[error("Unknown element '{0}'")]
    UnknownElement(String),
    #[error("Lattice must hold nine numbers, got '{0}'")]
    InvalidLattice(String),
    #[error("pbc must hold three T/F flags, got '{0}'")]
    InvalidPbc(String),
    #[error("Unterminated quote in comment line")]
    UnterminatedQuote,
}

/// Extended XYZ reader and writer.
///
/// The comment line may carry `Lattice="ax ay az bx by bz cx cy cz"` and
/// `pbc="T T T"`. A lattice without `pbc` is periodic in all directions.
/// The species column accepts element symbols or atomic numbers.
pub struct XyzFile;

impl StructureFile for XyzFile {
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Structure>, Self::Error> {
        let mut lines = reader.lines().enumerate().map(|(n, l)| (n + 1, l));
        let mut structures = Vec::new();

        while let Some((line_num, line)) = lines.next() {
            let line = line?;
            let count_str = line.trim();
            if count_str.is_empty() {
                continue;
            }
            let parse_err = |kind| XyzError::Parse {
                line: line_num,
                kind,
            };
            let n_atoms: usize = count_str
                .parse()
                .map_err(|_| parse_err(XyzParseErrorKind::InvalidAtomCount(count_str.to_string())))?;

            let (comment_num, comment) = match lines.next() {
                Some((n, l)) => (n, l?),
                None => {
                    return Err(parse_err(XyzParseErrorKind::UnexpectedEof {
                        expected: n_atoms,
                        found: 0,
                    }));
                }
            };
            let cell = parse_comment(&comment).map_err(|kind| XyzError::Parse {
                line: comment_num,
                kind,
            })?;

            let mut atoms = Vec::with_capacity(n_atoms);
            for found in 0..n_atoms {
                let (atom_num, atom_line) = match lines.next() {
                    Some((n, l)) => (n, l?),
                    None => {
                        return Err(XyzError::Parse {
                            line: comment_num + found,
                            kind: XyzParseErrorKind::UnexpectedEof {
                                expected: n_atoms,
                                found,
                            },
                        });
                    }
                };
                atoms.push(parse_atom(&atom_line).map_err(|kind| XyzError::Parse {
                    line: atom_num,
                    kind,
                })?);
            }

            structures.push(Structure::new(atoms, cell));
        }

        Ok(structures)
    }

    fn write_to(structures: &[Structure], writer: &mut impl Write) -> Result<(), Self::Error> {
        for structure in structures {
            writeln!(writer, "{}", structure.len())?;
            match &structure.cell {
                Some(cell) => {
                    let lattice = (0..3)
                        .cartesian_product(0..3)
                        .map(|(r, c)| cell.lattice[(r, c)])
                        .join(" ");
                    let pbc = cell.pbc.iter().map(|&p| if p { "T" } else { "F" }).join(" ");
                    writeln!(writer, "Lattice=\"{}\" pbc=\"{}\"", lattice, pbc)?;
                }
                None => writeln!(writer)?,
            }
            for atom in &structure.atoms {
                let species = atom
                    .symbol()
                    .map_or_else(|| atom.atomic_number.to_string(), str::to_string);
                writeln!(
                    writer,
                    "{:<2} {:>16.8} {:>16.8} {:>16.8}",
                    species, atom.position.x, atom.position.y, atom.position.z
                )?;
            }
        }
        Ok(())
    }
}

fn parse_atom(line: &str) -> Result<Atom, XyzParseErrorKind> {
    let mut fields = line.split_whitespace();
    let species = fields.next().ok_or(XyzParseErrorKind::MissingField)?;
    let mut coords = [0.0f64; 3];
    for c in coords.iter_mut() {
        let token = fields.next().ok_or(XyzParseErrorKind::MissingField)?;
        *c = token
            .parse()
            .map_err(|_| XyzParseErrorKind::InvalidFloat(token.to_string()))?;
    }

    let atomic_number = match species.parse::<u8>() {
        Ok(z) if z > 0 && (z as usize) <= table::MAX_ATOMIC_NUMBER => z,
        Ok(_) => return Err(XyzParseErrorKind::UnknownElement(species.to_string())),
        Err(_) => table::atomic_number(species)
            .ok_or_else(|| XyzParseErrorKind::UnknownElement(species.to_string()))?,
    };

    Ok(Atom::new(atomic_number, Point3::new(coords[0], coords[1], coords[2])))
}

fn parse_comment(comment: &str) -> Result<Option<Cell>, XyzParseErrorKind> {
    let mut lattice = None;
    let mut pbc = None;

    for (key, value) in key_value_pairs(comment)? {
        match key.to_ascii_lowercase().as_str() {
            "lattice" => {
                let numbers: Vec<f64> = value
                    .split_whitespace()
                    .map(str::parse)
                    .collect::<Result<_, _>>()
                    .map_err(|_| XyzParseErrorKind::InvalidLattice(value.clone()))?;
                if numbers.len() != 9 {
                    return Err(XyzParseErrorKind::InvalidLattice(value));
                }
                lattice = Some(Matrix3::from_row_slice(&numbers));
            }
            "pbc" => {
                let flags: Vec<bool> = value
                    .split_whitespace()
                    .map(|f| match f.to_ascii_uppercase().as_str() {
                        "T" | "TRUE" | "1" => Some(true),
                        "F" | "FALSE" | "0" => Some(false),
                        _ => None,
                    })
                    .collect::<Option<_>>()
                    .ok_or_else(|| XyzParseErrorKind::InvalidPbc(value.clone()))?;
                if flags.len() != 3 {
                    return Err(XyzParseErrorKind::InvalidPbc(value));
                }
                pbc = Some([flags[0], flags[1], flags[2]]);
            }
            _ => {}
        }
    }

    Ok(lattice.map(|l| Cell::new(l, pbc.unwrap_or([true; 3]))))
}

/// Splits `key=value key2="quoted value"` pairs. Bare words without `=` are
/// ignored.
fn key_value_pairs(s: &str) -> Result<Vec<(String, String)>, XyzParseErrorKind> {
    let mut pairs = Vec::new();
    let mut chars = s.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }
        if chars.peek() != Some(&'=') {
            continue;
        }
        chars.next();

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(c) => value.push(c),
                    None => return Err(XyzParseErrorKind::UnterminatedQuote),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                value.push(c);
                chars.next();
            }
        }
        pairs.push((key, value));
    }

    Ok(pairs)
}
