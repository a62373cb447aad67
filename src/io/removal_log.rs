//! Removal log outputs: a detailed TSV and a plain list of names for
//! untangling, and an `Atom Reason` TSV for the atom filter.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::filter::FilterReport;
use crate::types::RemovalLog;

use super::write_file;

/// Write `Iteration Node Degree BetweennessCentrality Reason` rows.
pub fn write_removal_details_to<W: Write>(log: &RemovalLog, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "Iteration\tNode\tDegree\tBetweennessCentrality\tReason")?;
    for r in log.records() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            r.iteration, r.segment, r.degree, r.centrality, r.reason
        )?;
    }
    Ok(())
}

/// Write one removed segment name per line.
pub fn write_removal_names_to<W: Write>(log: &RemovalLog, writer: &mut W) -> std::io::Result<()> {
    for name in log.names() {
        writeln!(writer, "{name}")?;
    }
    Ok(())
}

/// Write the detailed removal log.
pub fn write_removal_details(log: &RemovalLog, path: &Path) -> Result<()> {
    write_file(path, |w| write_removal_details_to(log, w))?;
    info!(path = %path.display(), removed = log.len(), "Wrote removal details");
    Ok(())
}

/// Write the plain list of removed names.
pub fn write_removal_names(log: &RemovalLog, path: &Path) -> Result<()> {
    write_file(path, |w| write_removal_names_to(log, w))
}

/// Write `Atom Reason` rows for every atom the filter dropped.
pub fn write_filter_removals_to<W: Write>(report: &FilterReport, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "Atom\tReason")?;
    for removed in &report.removed_atoms {
        writeln!(writer, "{}\t{}", removed.atom, removed.reason)?;
    }
    Ok(())
}

/// Write the filter removal log.
pub fn write_filter_removals(report: &FilterReport, path: &Path) -> Result<()> {
    write_file(path, |w| write_filter_removals_to(report, w))?;
    info!(path = %path.display(), removed = report.removed_atoms.len(), "Wrote filter removals");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::RemovedAtom;
    use crate::types::{AtomId, RemovalReason, RemovalRecord, SegmentId};

    fn log() -> RemovalLog {
        let mut log = RemovalLog::new();
        log.push(RemovalRecord {
            segment: SegmentId::from("7"),
            iteration: 1,
            reason: RemovalReason::Degree,
            degree: 12,
            centrality: 0.25,
        });
        log.push(RemovalRecord {
            segment: SegmentId::from("3"),
            iteration: 2,
            reason: RemovalReason::Forced,
            degree: 2,
            centrality: 0.0,
        });
        log
    }

    #[test]
    fn test_details() {
        let mut out = Vec::new();
        write_removal_details_to(&log(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Iteration\tNode\tDegree\tBetweennessCentrality\tReason");
        assert_eq!(lines[1], "1\t7\t12\t0.25\tdegree");
        assert_eq!(lines[2], "2\t3\t2\t0\tforced");
    }

    #[test]
    fn test_names_in_removal_order() {
        let mut out = Vec::new();
        write_removal_names_to(&log(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "7\n3\n");
    }

    #[test]
    fn test_filter_removals() {
        let report = FilterReport {
            removed_atoms: vec![
                RemovedAtom { atom: AtomId::from("4"), reason: "depth".to_string() },
                RemovedAtom { atom: AtomId::from("9"), reason: "private".to_string() },
            ],
            ..FilterReport::default()
        };
        let mut out = Vec::new();
        write_filter_removals_to(&report, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Atom\tReason\n4\tdepth\n9\tprivate\n");
    }
}
