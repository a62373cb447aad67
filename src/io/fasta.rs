//! Companion FASTA reader.
//!
//! Header markers `chromosome=true` and `plasmid=true` classify each
//! sequence; they drive segment colouring and the shared-atom report.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Strand;

use super::open_reader;

/// A single FASTA sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// Sequence name (header up to the first whitespace).
    pub name: String,
    /// Bases as read.
    pub sequence: Vec<u8>,
    /// Header carries `chromosome=true`.
    pub chromosome: bool,
    /// Header carries `plasmid=true`.
    pub plasmid: bool,
}

/// All sequences of a FASTA file, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceCatalog {
    records: BTreeMap<String, FastaRecord>,
}

impl SequenceCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, replacing any record with the same name.
    pub fn insert(&mut self, record: FastaRecord) {
        self.records.insert(record.name.clone(), record);
    }

    /// Read a FASTA file.
    pub fn read(path: &Path) -> Result<Self> {
        Self::parse(open_reader(path)?, path)
    }

    /// Parse FASTA from a reader. `path` is only used in error messages.
    pub fn parse<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let mut catalog = Self::new();
        let mut current: Option<FastaRecord> = None;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::io(e, path))?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = line.strip_prefix('>') {
                if let Some(record) = current.take() {
                    catalog.insert(record);
                }
                let name = header
                    .split_whitespace()
                    .next()
                    .ok_or_else(|| Error::malformed(path, line_num + 1, "empty sequence name"))?;
                current = Some(FastaRecord {
                    name: name.to_string(),
                    sequence: Vec::new(),
                    chromosome: header.contains("chromosome=true"),
                    plasmid: header.contains("plasmid=true"),
                });
            } else {
                let record = current.as_mut().ok_or_else(|| {
                    Error::malformed(path, line_num + 1, "sequence data before first header")
                })?;
                record.sequence.extend_from_slice(line.trim().as_bytes());
            }
        }

        if let Some(record) = current.take() {
            catalog.insert(record);
        }
        Ok(catalog)
    }

    /// Get a record by name.
    pub fn get(&self, name: &str) -> Option<&FastaRecord> {
        self.records.get(name)
    }

    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the named sequence is marked as a chromosome.
    pub fn is_chromosome(&self, name: &str) -> bool {
        self.records.get(name).map_or(false, |r| r.chromosome)
    }

    /// Whether the named sequence is marked as a plasmid.
    pub fn is_plasmid(&self, name: &str) -> bool {
        self.records.get(name).map_or(false, |r| r.plasmid)
    }

    /// Extract `[start, end)` of a sequence, reverse-complemented on the reverse strand.
    ///
    /// Returns `Ok(None)` when the sequence is not in the catalog and an
    /// error message when the range does not fit the sequence.
    pub fn fragment(
        &self,
        name: &str,
        start: u64,
        end: u64,
        strand: Strand,
    ) -> std::result::Result<Option<Vec<u8>>, String> {
        let Some(record) = self.records.get(name) else {
            return Ok(None);
        };
        let (s, e) = (start as usize, end as usize);
        if s > e || e > record.sequence.len() {
            return Err(format!(
                "range {start}..{end} outside sequence '{name}' of length {}",
                record.sequence.len()
            ));
        }
        let fragment = &record.sequence[s..e];
        Ok(Some(match strand {
            Strand::Forward => fragment.to_vec(),
            Strand::Reverse => reverse_complement(fragment),
        }))
    }
}

/// Reverse complement of a DNA sequence. Output is upper case; unknown bases become `N`.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|b| match b.to_ascii_uppercase() {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            _ => b'N',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FASTA: &str = ">g1 chromosome=true\nACGT\nTTGA\n>g2 plasmid=true desc\nGGCC\n>g3\nAAAA\n";

    fn catalog() -> SequenceCatalog {
        SequenceCatalog::parse(Cursor::new(FASTA), Path::new("test.fa")).unwrap()
    }

    #[test]
    fn test_parse_multiline_records() {
        let c = catalog();
        assert_eq!(c.len(), 3);
        assert_eq!(c.get("g1").unwrap().sequence, b"ACGTTTGA".to_vec());
    }

    #[test]
    fn test_header_markers() {
        let c = catalog();
        assert!(c.is_chromosome("g1"));
        assert!(!c.is_plasmid("g1"));
        assert!(c.is_plasmid("g2"));
        assert!(!c.is_chromosome("g3"));
        assert!(!c.is_chromosome("missing"));
    }

    #[test]
    fn test_fragment_reverse_strand() {
        let c = catalog();
        assert_eq!(c.fragment("g1", 0, 4, Strand::Forward).unwrap(), Some(b"ACGT".to_vec()));
        assert_eq!(c.fragment("g1", 0, 3, Strand::Reverse).unwrap(), Some(b"CGT".to_vec()));
        assert_eq!(c.fragment("nope", 0, 3, Strand::Forward).unwrap(), None);
        assert!(c.fragment("g2", 2, 10, Strand::Forward).is_err());
    }

    #[test]
    fn test_sequence_before_header_is_malformed() {
        let err = SequenceCatalog::parse(Cursor::new("ACGT\n>g1\nA\n"), Path::new("bad.fa")).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { line: 1, .. }));
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"AACGTn"), b"NACGTT".to_vec());
    }
}
