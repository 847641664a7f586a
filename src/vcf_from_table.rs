
use crate::common::{parse_args, PathArgs, FileReader};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const USAGE: &str = "
Usage:
  vcf from table [options] <table.tsv> <out.vcf>

Options:
  --chunk-size=N    Number of table rows processed at a time [default: 100000]

Reads a tab-delimited table with the columns chrom, pos, refer and
optionally alt (case-insensitive, other columns are ignored) and writes
one VCF record per row. Rows whose position is not an integer are skipped.
";

const VCF_PREAMBLE: [&str; 6] = [
	"##fileformat=VCFv4.2",
	"##source=genokit vcf from table",
	"##FILTER=<ID=PASS,Description=\"All filters passed\">",
	"##comment=ID, QUAL, FILTER and INFO are not populated and are written as '.'",
	"##comment=REF and ALT are copied from the refer and alt table columns",
	"#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO",
];

#[derive(Debug, Error)]
pub enum ConversionError {
	#[error("table is missing required column(s) {missing} (found: {found})")]
	MissingColumns { missing: String, found: String },
	#[error("chunk size must be a positive integer")]
	InvalidChunkSize,
	#[error("cannot read table '{}': {source}", .path.display())]
	Input { path: PathBuf, #[source] source: io::Error },
	#[error("cannot write VCF file '{}': {source}", .path.display())]
	Output { path: PathBuf, #[source] source: io::Error },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConversionSummary {
	pub rows: usize,
	pub variants: usize,
	pub dropped: usize,
}

pub fn main() {
	let args = parse_args(USAGE);
	let table_path = args.get_path("<table.tsv>");
	let vcf_path = args.get_path("<out.vcf>");
	let chunk_size: usize = args.get_str("--chunk-size").parse().unwrap_or_else(
		|_| error!("--chunk-size must be a positive integer."));

	let summary = parse_and_convert(&table_path, &vcf_path, chunk_size)
		.unwrap_or_else(|e| error!("{}", e));
	if summary.dropped > 0 {
		eprintln!("WARNING: Skipped {} rows with a non-integer position.",
			summary.dropped);
	}
	eprintln!("INFO: Wrote {} variants from {} table rows to {}.",
		summary.variants, summary.rows, vcf_path.display());
}

// Positions of the recognized columns within a table row.
#[derive(Debug, PartialEq)]
struct ColumnMap {
	chrom: usize,
	pos: usize,
	refer: usize,
	alt: Option<usize>,
}

impl ColumnMap {
	fn from_header(columns: &[String]) -> Result<ColumnMap, ConversionError> {
		let find = |name: &str| columns.iter()
			.position(|c| c.trim().to_lowercase() == name);

		let (chrom, pos, refer) = (find("chrom"), find("pos"), find("refer"));
		match (chrom, pos, refer) {
			(Some(chrom), Some(pos), Some(refer)) =>
				Ok(ColumnMap { chrom, pos, refer, alt: find("alt") }),
			_ => {
				let missing: Vec<&str> = [("chrom", chrom), ("pos", pos), ("refer", refer)]
					.iter().filter(|(_, c)| c.is_none()).map(|(n, _)| *n).collect();
				Err(ConversionError::MissingColumns {
					missing: missing.join(", "),
					found: columns.iter().map(|c| c.trim()).collect::<Vec<_>>().join(", ")
				})
			}
		}
	}

	// Returns None for rows that cannot become a VCF record.
	fn variant<'a>(&self, fields: &'a [String]) -> Option<Variant<'a>> {
		let field = move |col: usize| fields.get(col).map(|f| f.trim());
		let pos = parse_position(field(self.pos)?)?;
		let alt = match self.alt.and_then(field) {
			Some(alt) if !alt.is_empty() => alt,
			_ => "."
		};
		Some(Variant {
			chrom: field(self.chrom)?, pos, reference: field(self.refer)?, alt
		})
	}
}

#[derive(Debug, PartialEq)]
struct Variant<'a> {
	chrom: &'a str,
	pos: &'a str,
	reference: &'a str,
	alt: &'a str,
}

// Only plain base-10 digits are accepted. No sign, decimal point or
// digit separators. There is no upper bound; leading zeros are removed.
fn parse_position(text: &str) -> Option<&str> {
	if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	match text.trim_start_matches('0') {
		"" => Some("0"),
		digits => Some(digits)
	}
}

fn split_fields(line: &str) -> Vec<String> {
	line.trim_end_matches(&['\n', '\r'][..])
		.split('\t').map(|f| f.to_string()).collect()
}

// Iterator over batches of at most chunk_size data rows, in file order.
struct TableChunks {
	table: FileReader,
	chunk_size: usize,
	line: String,
	finished: bool,
}

impl TableChunks {
	// Reads the header line and positions the reader at the first data row.
	fn open(path: &Path, chunk_size: usize) -> io::Result<(Vec<String>, TableChunks)> {
		let mut table = FileReader::open(path)?;
		let mut line = String::new();
		let mut header = Vec::new();
		while table.read_line(&mut line)? {
			if !line.trim().is_empty() {
				header = split_fields(&line);
				break;
			}
		}
		Ok((header, TableChunks { table, chunk_size, line, finished: false }))
	}
}

impl Iterator for TableChunks {
	type Item = io::Result<Vec<Vec<String>>>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.finished { return None; }
		let mut chunk = Vec::with_capacity(self.chunk_size.min(4096));
		while chunk.len() < self.chunk_size {
			match self.table.read_line(&mut self.line) {
				Ok(true) => {
					if self.line.trim().is_empty() { continue; }
					chunk.push(split_fields(&self.line));
				},
				Ok(false) => { self.finished = true; break; },
				Err(e) => { self.finished = true; return Some(Err(e)); }
			}
		}
		if chunk.is_empty() { None } else { Some(Ok(chunk)) }
	}
}

fn write_preamble(out: &mut impl Write) -> io::Result<()> {
	for line in VCF_PREAMBLE.iter() {
		writeln!(out, "{}", line)?;
	}
	Ok(())
}

fn write_variant(out: &mut impl Write, v: &Variant) -> io::Result<()> {
	writeln!(out, "{}\t{}\t.\t{}\t{}\t.\t.\t.", v.chrom, v.pos, v.reference, v.alt)
}

// Converts a tab-delimited variant table into a minimal VCF file. The
// header is validated before the output file is created, and a partially
// written output file is removed if the conversion fails.
pub fn parse_and_convert(input: &Path, output: &Path, chunk_size: usize)
	-> Result<ConversionSummary, ConversionError> {

	if chunk_size == 0 { return Err(ConversionError::InvalidChunkSize); }

	let input_error = |source: io::Error| ConversionError::Input { path: input.to_path_buf(), source };
	let (header, chunks) = TableChunks::open(input, chunk_size).map_err(input_error)?;
	let columns = ColumnMap::from_header(&header)?;

	let file = File::create(output).map_err(|source| ConversionError::Output {
		path: output.to_path_buf(), source })?;
	let result = write_vcf(&columns, chunks, BufWriter::new(file), input, output);
	if result.is_err() {
		let _ = fs::remove_file(output);
	}
	result
}

fn write_vcf(columns: &ColumnMap, chunks: TableChunks, mut out: BufWriter<File>,
	input: &Path, output: &Path) -> Result<ConversionSummary, ConversionError> {

	let output_error = |source: io::Error| ConversionError::Output { path: output.to_path_buf(), source };
	write_preamble(&mut out).map_err(output_error)?;

	let mut summary = ConversionSummary::default();
	for chunk in chunks {
		let chunk = chunk.map_err(|source| ConversionError::Input {
			path: input.to_path_buf(), source })?;
		for fields in &chunk {
			summary.rows += 1;
			match columns.variant(fields) {
				Some(variant) => {
					write_variant(&mut out, &variant).map_err(output_error)?;
					summary.variants += 1;
				},
				None => summary.dropped += 1
			}
		}
	}
	out.flush().map_err(output_error)?;
	Ok(summary)
}
