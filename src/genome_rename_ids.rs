
use crate::common::{parse_args, PathArgs, FileReader};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use itertools::Itertools;
use regex::Regex;

const USAGE: &str = "
Usage:
  genome rename ids ngdc [options] <fasta> <out_fasta>
  genome rename ids custom [options] <fasta> <out_fasta> <id_map>

Options:
  --gff=PATH          GFF annotation file to rename as well
  --output-gff=PATH   Where to write the renamed GFF file

The ngdc mode renames sequences after the OriSeqID=... tag found in NGDC
FASTA headers. The custom mode reads the new names from a tab-separated
file with lines of the form old_id<TAB>new_id.
";

pub fn main() {
	let args = parse_args(USAGE);
	let fasta_path = args.get_path("<fasta>");
	let out_fasta_path = args.get_path("<out_fasta>");

	let gff_path = args.get_path("--gff");
	let out_gff_path = args.get_path("--output-gff");
	let gff_paths = match (gff_path.as_os_str().is_empty(), out_gff_path.as_os_str().is_empty()) {
		(true, true) => None,
		(false, false) => Some((gff_path, out_gff_path)),
		(false, true) => error!("--output-gff is required when --gff is specified."),
		(true, false) => error!("--gff is required when --output-gff is specified.")
	};

	let id_map = if args.get_bool("ngdc") {
		eprintln!("INFO: Building ID mapping from OriSeqID tags in {}...",
			fasta_path.display());
		build_ngdc_id_map(&fasta_path).unwrap_or_else(|e| error!(
			"Cannot read FASTA file {}: {}", fasta_path.display(), e))
	} else {
		let map_path = args.get_path("<id_map>");
		eprintln!("INFO: Loading ID mapping from {}...", map_path.display());
		load_id_map(&map_path).unwrap_or_else(|e| error!(
			"Cannot read ID mapping file {}: {}", map_path.display(), e))
	};

	eprintln!("INFO: Found {} chromosome mappings:", id_map.len());
	for (old_id, new_id) in id_map.iter().sorted() {
		eprintln!("  {} -> {}", old_id, new_id);
	}

	eprintln!("INFO: Writing renamed FASTA file to {}...", out_fasta_path.display());
	let renamed = rename_fasta(&fasta_path, &out_fasta_path, &id_map).unwrap_or_else(
		|e| error!("Could not rename FASTA file {}: {}", fasta_path.display(), e));
	eprintln!("INFO: Renamed {} FASTA headers.", renamed);

	if let Some((gff_path, out_gff_path)) = gff_paths {
		eprintln!("INFO: Writing renamed GFF file to {}...", out_gff_path.display());
		let renamed = rename_gff(&gff_path, &out_gff_path, &id_map).unwrap_or_else(
			|e| error!("Could not rename GFF file {}: {}", gff_path.display(), e));
		eprintln!("INFO: Renamed {} GFF features.", renamed);
	}
}

pub fn ori_seq_id_regex() -> Regex {
	Regex::new(r"OriSeqID=(\S+)").unwrap()
}

/// Extracts the sequence ID and the original sequence name from an NGDC
/// FASTA header such as
/// `>GWHGECT00000001.1  Chromosome 1A  Complete=T  OriSeqID=Chr1A  Len=600907804`.
/// Returns None if the header has no OriSeqID tag.
pub fn parse_ngdc_header(header: &str, ori_seq_id: &Regex) -> Option<(String, String)> {
	let old_id = header.split_whitespace().next()?.trim_start_matches('>');
	if old_id.is_empty() { return None; }
	let new_id = ori_seq_id.captures(header)?.get(1)?.as_str();
	Some((old_id.to_string(), new_id.to_string()))
}

pub fn build_ngdc_id_map(fasta_path: &Path) -> io::Result<HashMap<String, String>> {
	let ori_seq_id = ori_seq_id_regex();
	let mut fasta = FileReader::open(fasta_path)?;
	let mut id_map = HashMap::new();
	let mut line = String::new();
	while fasta.read_line(&mut line)? {
		if !line.starts_with('>') { continue; }
		if let Some((old_id, new_id)) = parse_ngdc_header(&line, &ori_seq_id) {
			id_map.insert(old_id, new_id);
		}
	}
	Ok(id_map)
}

// Empty lines and lines starting with '#' are skipped. Malformed lines are
// reported and skipped.
pub fn load_id_map(map_path: &Path) -> io::Result<HashMap<String, String>> {
	let mut map_file = FileReader::open(map_path)?;
	let mut id_map = HashMap::new();
	let mut line = String::new();
	let mut line_num = 0;
	while map_file.read_line(&mut line)? {
		line_num += 1;
		let entry = line.trim();
		if entry.is_empty() || entry.starts_with('#') { continue; }

		let cols: Vec<&str> = entry.split('\t').collect();
		if cols.len() != 2 {
			eprintln!("WARNING: Skipping invalid line {} in mapping file: {}",
				line_num, entry);
			continue;
		}
		let (old_id, new_id) = (cols[0].trim(), cols[1].trim());
		if !old_id.is_empty() && !new_id.is_empty() {
			id_map.insert(old_id.to_string(), new_id.to_string());
		}
	}
	Ok(id_map)
}

// Header lines whose sequence ID is in the map are replaced by the new ID
// alone. Everything else is copied as is. Returns the number of renamed
// headers.
pub fn rename_fasta(input: &Path, output: &Path, id_map: &HashMap<String, String>)
	-> io::Result<usize> {

	let mut fasta = FileReader::open(input)?;
	let mut out = BufWriter::new(File::create(output)?);
	let mut renamed = 0;
	let mut line = String::new();
	while fasta.read_line(&mut line)? {
		if line.starts_with('>') {
			let seq_id = line.split_whitespace().next()
				.map(|id| id.trim_start_matches('>'));
			if let Some(new_id) = seq_id.and_then(|id| id_map.get(id)) {
				writeln!(out, ">{}", new_id)?;
				renamed += 1;
				continue;
			}
		}
		out.write_all(line.as_bytes())?;
	}
	out.flush()?;
	Ok(renamed)
}

// Renames the seqid column of GFF feature lines. Comments and blank lines
// are copied as is. Returns the number of renamed features.
pub fn rename_gff(input: &Path, output: &Path, id_map: &HashMap<String, String>)
	-> io::Result<usize> {

	let mut gff = FileReader::open(input)?;
	let mut out = BufWriter::new(File::create(output)?);
	let mut renamed = 0;
	let mut line = String::new();
	while gff.read_line(&mut line)? {
		if line.starts_with('#') || line.trim().is_empty() {
			out.write_all(line.as_bytes())?;
			continue;
		}

		let seqid_end = line.find('\t').unwrap_or_else(
			|| line.trim_end_matches(&['\n', '\r'][..]).len());
		let (seqid, rest) = line.split_at(seqid_end);
		match id_map.get(seqid) {
			Some(new_id) => {
				write!(out, "{}{}", new_id, rest)?;
				renamed += 1;
			},
			None => out.write_all(line.as_bytes())?
		}
	}
	out.flush()?;
	Ok(renamed)
}
