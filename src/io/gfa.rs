//! GFA 1 reader and writer.
//!
//! `S` and `L` records become segments and links; every other record type
//! (`H`, `P`, `W`, comments) is kept verbatim and written back first.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::graph::AssemblyGraph;
use crate::types::{Link, Orientation, Segment, SegmentId, Strand};

use super::{open_reader, write_file};

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]:[AifZzJHB]:.*$").expect("valid tag pattern"))
}

/// Whether `tag` is a well-formed optional field (`XX:T:value`).
///
/// Lower-case `z` is accepted as a string type alongside `Z`.
pub fn is_valid_tag(tag: &str) -> bool {
    tag_pattern().is_match(tag)
}

/// Read a GFA file.
pub fn read_gfa(path: &Path) -> Result<AssemblyGraph> {
    let graph = parse_gfa(open_reader(path)?, path)?;
    info!(
        path = %path.display(),
        segments = graph.num_segments(),
        links = graph.num_edges(),
        "Read GFA"
    );
    Ok(graph)
}

/// Parse GFA from a reader. `path` is only used in error messages.
///
/// Links may precede the segments they reference; endpoints are resolved
/// after the whole input is read and a dangling endpoint is an error.
pub fn parse_gfa<R: BufRead>(reader: R, path: &Path) -> Result<AssemblyGraph> {
    let mut graph = AssemblyGraph::new();
    let mut pending: Vec<(usize, Link)> = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(e, path))?;
        let line_no = line_num + 1;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        match fields[0] {
            "S" => {
                let segment = parse_segment(&fields).map_err(|r| Error::malformed(path, line_no, r))?;
                if graph.contains(&segment.id) {
                    return Err(Error::malformed(
                        path,
                        line_no,
                        format!("duplicate segment '{}'", segment.id),
                    ));
                }
                graph.add_segment(segment);
            }
            "L" => {
                let link = parse_link(&fields).map_err(|r| Error::malformed(path, line_no, r))?;
                pending.push((line_no, link));
            }
            _ => graph.push_other_line(line.to_string()),
        }
    }

    for (line_no, link) in pending {
        for endpoint in [&link.from, &link.to] {
            if !graph.contains(endpoint) {
                return Err(Error::malformed(
                    path,
                    line_no,
                    format!("link references unknown segment '{endpoint}'"),
                ));
            }
        }
        if link.key().is_self_loop() {
            debug!(segment = %link.from, line = line_no, "Ignoring self-link");
            continue;
        }
        graph.add_link(link);
    }

    Ok(graph)
}

fn parse_segment(fields: &[&str]) -> std::result::Result<Segment, String> {
    if fields.len() < 3 {
        return Err(format!("S record needs 3 fields, found {}", fields.len()));
    }
    if fields[1].is_empty() {
        return Err("empty segment name".to_string());
    }
    let tags = parse_tags(&fields[3..])?;
    Ok(Segment::new(SegmentId::from(fields[1]), fields[2]).with_tags(tags))
}

fn parse_link(fields: &[&str]) -> std::result::Result<Link, String> {
    if fields.len() < 6 {
        return Err(format!("L record needs 6 fields, found {}", fields.len()));
    }
    parse_tags(&fields[6..])?;
    let orient = |s: &str| -> std::result::Result<Orientation, String> {
        Strand::parse(s).ok_or_else(|| format!("invalid orientation '{s}'"))
    };

    let mut link = Link::new(
        SegmentId::from(fields[1]),
        orient(fields[2])?,
        SegmentId::from(fields[3]),
        orient(fields[4])?,
    );
    link.overlap = fields[5].to_string();
    Ok(link)
}

fn parse_tags(fields: &[&str]) -> std::result::Result<Vec<String>, String> {
    fields
        .iter()
        .map(|tag| {
            if is_valid_tag(tag) {
                Ok(tag.to_string())
            } else {
                Err(format!("malformed tag '{tag}'"))
            }
        })
        .collect()
}

/// Write a graph to a GFA file.
pub fn write_gfa(graph: &AssemblyGraph, path: &Path) -> Result<()> {
    write_file(path, |w| write_gfa_to(graph, w))?;
    info!(
        path = %path.display(),
        segments = graph.num_segments(),
        links = graph.num_edges(),
        "Wrote GFA"
    );
    Ok(())
}

/// Write other records, then segments in id order, then links in canonical order.
pub fn write_gfa_to<W: Write>(graph: &AssemblyGraph, writer: &mut W) -> std::io::Result<()> {
    for line in graph.other_lines() {
        writeln!(writer, "{line}")?;
    }
    for segment in graph.segments() {
        write!(writer, "S\t{}\t{}", segment.id, segment.sequence)?;
        for tag in &segment.tags {
            write!(writer, "\t{tag}")?;
        }
        writeln!(writer)?;
    }
    for link in graph.links() {
        writeln!(
            writer,
            "L\t{}\t{}\t{}\t{}\t{}",
            link.from, link.from_orient, link.to, link.to_orient, link.overlap
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<AssemblyGraph> {
        parse_gfa(Cursor::new(text), Path::new("test.gfa"))
    }

    fn id(s: &str) -> SegmentId {
        SegmentId::from(s)
    }

    #[test]
    fn test_round_trip_text() {
        let text = "H\tVN:Z:1.0\n\
                    S\t1\tACGT\tCL:z:#00aa00\tC2:z:#00aa00\n\
                    S\t2\t*\n\
                    L\t1\t+\t2\t-\t0M\n";
        let graph = parse(text).unwrap();
        assert_eq!(graph.segment(&id("1")).unwrap().color(), Some("#00aa00"));

        let mut out = Vec::new();
        write_gfa_to(&graph, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }

    #[test]
    fn test_link_before_segment() {
        let graph = parse("L\ta\t+\tb\t+\t0M\nS\ta\t*\nS\tb\t*\n").unwrap();
        assert!(graph.has_edge(&id("a"), &id("b")));
    }

    #[test]
    fn test_parallel_and_self_links_collapse() {
        let graph = parse(
            "S\ta\t*\nS\tb\t*\nL\ta\t+\tb\t+\t0M\nL\tb\t-\ta\t-\t0M\nL\ta\t+\ta\t-\t0M\n",
        )
        .unwrap();
        assert_eq!(graph.num_edges(), 1);
        assert_eq!(graph.degree(&id("a")), 1);
    }

    #[test]
    fn test_dangling_link_is_malformed() {
        let err = parse("S\ta\t*\nL\ta\t+\tz\t+\t0M\n").unwrap_err();
        assert!(matches!(err, Error::MalformedInput { line: 2, .. }));
    }

    #[test]
    fn test_short_records_are_malformed() {
        assert!(matches!(parse("S\ta\n"), Err(Error::MalformedInput { line: 1, .. })));
        assert!(matches!(
            parse("S\ta\t*\nS\tb\t*\nL\ta\t+\tb\n"),
            Err(Error::MalformedInput { line: 3, .. })
        ));
        assert!(parse("S\ta\t*\nS\tb\t*\nL\ta\t?\tb\t+\t0M\n").is_err());
    }

    #[test]
    fn test_bad_tag_is_malformed() {
        assert!(parse("S\ta\t*\tnot-a-tag\n").is_err());
        assert!(parse("S\ta\t*\tLN:i:4\n").is_ok());
    }

    #[test]
    fn test_duplicate_segment_is_malformed() {
        assert!(parse("S\ta\t*\nS\ta\tAC\n").is_err());
    }

    #[test]
    fn test_tag_validation() {
        assert!(is_valid_tag("CL:z:#aa0000"));
        assert!(is_valid_tag("RC:i:12"));
        assert!(!is_valid_tag("C:Z:x"));
        assert!(!is_valid_tag("CL:Q:x"));
    }
}
