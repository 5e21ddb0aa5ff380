//! Text catalog persistence for `ReferenceIndex`
//!
//! One tab-separated file per reference:
//!
//! ```text
//! #ferrous-seedmap-reference	9
//! contig	index	name	decoy	path	byte_offset	byte_size	genomic_position	total_bases	acgt_bases	as	ur	m5
//! mask	seed_length	mask_width	mask	kmers	path
//! annotation	kuniqueness|krepeatness	k	path
//! ```
//!
//! Empty strings are written as `*`. Relative paths are resolved against the
//! directory holding the catalog when it is loaded.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::IndexError;
use super::contig::Contig;
use super::reference_index::{AnnotationType, ReferenceIndex, check_format_version};

const HEADER_TAG: &str = "#ferrous-seedmap-reference";
const EMPTY_FIELD: &str = "*";

/// Write `index` to `path`
pub fn save(index: &ReferenceIndex, path: &Path) -> Result<(), IndexError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_catalog(index, &mut writer)?;
    writer.flush()?;
    log::debug!(
        "Saved reference catalog {} ({} contigs)",
        path.display(),
        index.contig_count()
    );
    Ok(())
}

/// Read the catalog at `path`, resolving relative paths against its directory
pub fn load(path: &Path) -> Result<ReferenceIndex, IndexError> {
    let reader = BufReader::new(File::open(path)?);
    let mut index = read_catalog(reader)?;
    if let Some(dir) = path.parent() {
        index.make_absolute_paths(dir);
    }
    log::debug!(
        "Loaded reference catalog {} (version {}, {} contigs, {} seed lengths)",
        path.display(),
        index.format_version(),
        index.contig_count(),
        index.seed_lengths().count()
    );
    Ok(index)
}

pub fn write_catalog<W: Write>(index: &ReferenceIndex, out: &mut W) -> Result<(), IndexError> {
    writeln!(out, "{}\t{}", HEADER_TAG, index.format_version())?;

    for c in index.contigs() {
        writeln!(
            out,
            "contig\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            c.index,
            field(&c.name),
            u8::from(c.decoy),
            path_field(&c.file_path),
            c.byte_offset,
            c.byte_size,
            c.genomic_position,
            c.total_bases,
            c.acgt_bases,
            field(&c.bam_sq_as),
            field(&c.bam_sq_ur),
            field(&c.bam_m5),
        )?;
    }

    for seed_length in index.seed_lengths() {
        for shard in index.mask_files(seed_length)? {
            writeln!(
                out,
                "mask\t{}\t{}\t{}\t{}\t{}",
                seed_length,
                shard.mask_width,
                shard.mask,
                shard.kmers,
                path_field(&shard.path)
            )?;
        }
    }

    for annotation in index.annotations() {
        writeln!(
            out,
            "annotation\t{}\t{}\t{}",
            annotation.annotation_type,
            annotation.k,
            path_field(&annotation.path)
        )?;
    }
    Ok(())
}

/// Parse a catalog. Paths are returned as written.
pub fn read_catalog<R: BufRead>(reader: R) -> Result<ReferenceIndex, IndexError> {
    let mut lines = reader.lines();

    let header = lines.next().ok_or_else(|| IndexError::Parse {
        line: 1,
        message: "empty catalog".to_string(),
    })??;
    let version = parse_header(&header)?;
    let mut index = ReferenceIndex::with_format_version(version)?;

    for (i, line) in lines.enumerate() {
        let line_no = i + 2;
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let record = Record {
            fields: &fields,
            line: line_no,
        };

        match fields[0] {
            "contig" => {
                record.expect_len(13)?;
                let mut contig = Contig::new(
                    record.number(1)?,
                    record.text(2),
                    record.number(7)?,
                    record.number(8)?,
                );
                contig.decoy = record.number::<u8>(3)? != 0;
                contig.file_path = PathBuf::from(record.text(4));
                contig.byte_offset = record.number(5)?;
                contig.byte_size = record.number(6)?;
                contig.acgt_bases = record.number(9)?;
                contig.bam_sq_as = record.text(10);
                contig.bam_sq_ur = record.text(11);
                contig.bam_m5 = record.text(12);
                index.put_contig(contig).map_err(|e| record.error(e.to_string()))?;
            }
            "mask" => {
                record.expect_len(6)?;
                index
                    .add_mask_file(
                        record.number(1)?,
                        record.number(2)?,
                        record.number(3)?,
                        record.text(5),
                        record.number(4)?,
                    )
                    .map_err(|e| record.error(e.to_string()))?;
            }
            "annotation" => {
                record.expect_len(4)?;
                let annotation_type = AnnotationType::parse(fields[1])
                    .ok_or_else(|| record.error(format!("unknown annotation type '{}'", fields[1])))?;
                index.set_annotation(annotation_type, record.text(3), record.number(2)?);
            }
            other => return Err(record.error(format!("unknown record type '{other}'"))),
        }
    }

    Ok(index)
}

fn parse_header(header: &str) -> Result<u32, IndexError> {
    let bad_header = || IndexError::Parse {
        line: 1,
        message: format!("expected '{HEADER_TAG}<TAB><version>' header, got '{header}'"),
    };
    let (tag, version) = header.split_once('\t').ok_or_else(bad_header)?;
    if tag != HEADER_TAG {
        return Err(bad_header());
    }
    let version = version.trim().parse::<u32>().map_err(|_| bad_header())?;
    check_format_version(version)?;
    Ok(version)
}

fn field(s: &str) -> &str {
    if s.is_empty() { EMPTY_FIELD } else { s }
}

fn path_field(p: &Path) -> String {
    field(&p.to_string_lossy()).to_string()
}

struct Record<'a> {
    fields: &'a [&'a str],
    line: usize,
}

impl Record<'_> {
    fn error(&self, message: String) -> IndexError {
        IndexError::Parse {
            line: self.line,
            message,
        }
    }

    fn expect_len(&self, len: usize) -> Result<(), IndexError> {
        if self.fields.len() == len {
            Ok(())
        } else {
            Err(self.error(format!(
                "{} record has {} fields, expected {}",
                self.fields[0],
                self.fields.len(),
                len
            )))
        }
    }

    fn text(&self, i: usize) -> String {
        match self.fields[i] {
            EMPTY_FIELD => String::new(),
            s => s.to_string(),
        }
    }

    fn number<T: FromStr>(&self, i: usize) -> Result<T, IndexError> {
        self.fields[i]
            .parse()
            .map_err(|_| self.error(format!("invalid number '{}' in column {}", self.fields[i], i + 1)))
    }
}
