//! `.geese` atom files.
//!
//! One occurrence per line: `genome atom_nr class strand start end`, tab
//! separated, optionally followed by extra columns. Lines starting with `#`
//! are headers and are written back unchanged. The `class` column is the
//! atom identifier.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{Atom, AtomCollection, AtomId, Occurrence, Strand};

use super::{open_reader, write_file, SequenceCatalog};

/// Read a `.geese` file. Sequences are attached when a catalog is given.
pub fn read_atoms(path: &Path, catalog: Option<&SequenceCatalog>) -> Result<AtomCollection> {
    let atoms = parse_atoms(open_reader(path)?, path, catalog)?;
    info!(
        path = %path.display(),
        atoms = atoms.len(),
        occurrences = atoms.num_occurrences(),
        "Read atoms"
    );
    Ok(atoms)
}

/// Parse `.geese` records from a reader. `path` is only used in error messages.
///
/// The record index of each occurrence is its 1-based line number.
pub fn parse_atoms<R: BufRead>(
    reader: R,
    path: &Path,
    catalog: Option<&SequenceCatalog>,
) -> Result<AtomCollection> {
    let mut header = Vec::new();
    let mut occurrences: BTreeMap<AtomId, Vec<Occurrence>> = BTreeMap::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(e, path))?;
        let line_no = line_num + 1;
        if line.starts_with('#') {
            header.push(line);
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let (id, occ) = parse_record(&line, line_no).map_err(|reason| Error::malformed(path, line_no, reason))?;
        occurrences.entry(id).or_default().push(occ);
    }

    let mut atoms = AtomCollection::with_header(header);
    for (id, occs) in occurrences {
        // Occurrences were pushed in line order, so the first one is the earliest record.
        let first = &occs[0];
        let sequence = match catalog {
            Some(c) => c
                .fragment(&first.genome, first.start, first.end, first.strand)
                .map_err(|reason| Error::malformed(path, first.record, reason))?,
            None => None,
        };
        if catalog.is_some() && sequence.is_none() {
            debug!(atom = %id, genome = %first.genome, "Genome missing from FASTA");
        }
        atoms.insert(Atom {
            length: first.span(),
            id,
            sequence,
            occurrences: occs,
        });
    }
    Ok(atoms)
}

fn parse_record(line: &str, record: usize) -> std::result::Result<(AtomId, Occurrence), String> {
    let mut fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 6 {
        fields = line.split_whitespace().collect();
    }
    if fields.len() < 6 {
        return Err(format!("expected at least 6 columns, found {}", fields.len()));
    }

    let atom_nr = parse_atom_nr(fields[1])?;
    let strand = Strand::parse(fields[3]).ok_or_else(|| format!("invalid strand '{}'", fields[3]))?;
    let start: u64 = fields[4]
        .parse()
        .map_err(|_| format!("invalid start '{}'", fields[4]))?;
    let end: u64 = fields[5].parse().map_err(|_| format!("invalid end '{}'", fields[5]))?;
    if end < start {
        return Err(format!("end {end} before start {start}"));
    }

    let occ = Occurrence {
        genome: fields[0].to_string(),
        atom_nr,
        strand,
        start,
        end,
        extra: fields[6..].iter().map(|s| s.to_string()).collect(),
        record,
    };
    Ok((AtomId::from(fields[2]), occ))
}

/// Atom numbers are integers, occasionally written as `12.0`.
fn parse_atom_nr(field: &str) -> std::result::Result<u64, String> {
    field
        .parse::<u64>()
        .ok()
        .or_else(|| {
            field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
                .map(|v| v as u64)
        })
        .ok_or_else(|| format!("invalid atom number '{field}'"))
}

/// Write atoms to a `.geese` file.
pub fn write_atoms(atoms: &AtomCollection, path: &Path) -> Result<()> {
    write_file(path, |w| write_atoms_to(atoms, w))?;
    info!(path = %path.display(), atoms = atoms.len(), "Wrote atoms");
    Ok(())
}

/// Write header lines, then surviving occurrences in their input order.
pub fn write_atoms_to<W: Write>(atoms: &AtomCollection, writer: &mut W) -> std::io::Result<()> {
    for line in atoms.header() {
        writeln!(writer, "{line}")?;
    }
    for (id, occ) in atoms.occurrences_in_record_order() {
        write!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            occ.genome, occ.atom_nr, id, occ.strand, occ.start, occ.end
        )?;
        for extra in &occ.extra {
            write!(writer, "\t{extra}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}
