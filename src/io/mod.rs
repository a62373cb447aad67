//! File formats: `.geese` atoms, FASTA, GFA 1, removal logs and the
//! visualization payload.
//!
//! Every reader parses the whole file before returning and aborts on the
//! first malformed record. Writers take ownership of nothing and flush
//! before returning.

pub mod fasta;
pub mod geese;
pub mod gfa;
pub mod payload;
pub mod removal_log;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

pub use fasta::{reverse_complement, FastaRecord, SequenceCatalog};
pub use geese::{parse_atoms, read_atoms, write_atoms, write_atoms_to};
pub use gfa::{parse_gfa, read_gfa, write_gfa, write_gfa_to};
pub use payload::{VizLink, VizNode, VizPayload};
pub use removal_log::{write_filter_removals, write_removal_details, write_removal_names};

/// Open a file for buffered reading.
pub(crate) fn open_reader(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|e| Error::io(e, path))?;
    Ok(BufReader::new(file))
}

/// Create `path` and hand a buffered writer to `body`, flushing afterwards.
pub(crate) fn write_file<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path).map_err(|e| Error::io(e, path))?;
    let mut writer = BufWriter::new(file);
    body(&mut writer).map_err(|e| Error::io(e, path))?;
    writer.flush().map_err(|e| Error::io(e, path))
}

/// Read a list of identifiers, one per line. Blank lines are skipped.
pub fn read_id_list(path: &Path) -> Result<Vec<String>> {
    use std::io::BufRead;

    let mut ids = Vec::new();
    for line in open_reader(path)?.lines() {
        let line = line.map_err(|e| Error::io(e, path))?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            ids.push(trimmed.to_string());
        }
    }
    Ok(ids)
}
