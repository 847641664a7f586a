
use crate::common::{parse_args, PathArgs};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

const USAGE: &str = "
Usage:
  genome download assembly report [options] <genomic_file>

Options:
  --out-dir=PATH    Directory where the report is saved [default: .]

Derives the NCBI FTP location of the assembly report from a genome file
name such as GCF_016699485.2_bGalGal1.mat.broiler.GRCg7b_genomic.fna.gz
and downloads it with curl.
";

const NCBI_GENOMES_URL: &str = "https://ftp.ncbi.nlm.nih.gov/genomes/all";

#[derive(Debug, Error)]
pub enum DownloadError {
	#[error("'{0}' does not contain '_genomic', cannot derive the assembly name")]
	NotGenomicFile(String),
	#[error("'{0}' is not of the form <GCF|GCA>_<accession>_<assembly name>")]
	MissingAssemblyParts(String),
	#[error("accession '{0}' must have nine digits before the version")]
	InvalidAccession(String),
	#[error("could not run curl: {0}")]
	Curl(#[from] io::Error),
	#[error("download of {url} failed (curl exit status {status})")]
	Failed { url: String, status: String },
}

// Fields are only set by from_genomic_filename, which guarantees a nine
// digit accession.
#[derive(Debug, PartialEq)]
pub struct AssemblyReport {
	database: String,
	accession: String,
	assembly_name: String,
	prefix: String,
}

impl AssemblyReport {
	/// Parses a genome file name of the form
	/// `{GCF|GCA}_{accession}.{version}_{assembly name}_genomic...`.
	pub fn from_genomic_filename(path: &str) -> Result<AssemblyReport, DownloadError> {
		let filename = Path::new(path).file_name()
			.map(|f| f.to_string_lossy().into_owned())
			.unwrap_or_else(|| path.to_string());
		let prefix = match filename.find("_genomic") {
			Some(end) => &filename[..end],
			None => return Err(DownloadError::NotGenomicFile(filename.clone()))
		};

		let parts: Vec<&str> = prefix.splitn(3, '_').collect();
		if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
			return Err(DownloadError::MissingAssemblyParts(prefix.to_string()));
		}
		let digits = parts[1].split('.').next().unwrap_or("");
		if digits.len() != 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
			return Err(DownloadError::InvalidAccession(parts[1].to_string()));
		}

		Ok(AssemblyReport {
			database: parts[0].to_string(),
			accession: parts[1].to_string(),
			assembly_name: parts[2].to_string(),
			prefix: prefix.to_string(),
		})
	}

	pub fn database(&self) -> &str { &self.database }

	pub fn accession(&self) -> &str { &self.accession }

	pub fn assembly_name(&self) -> &str { &self.assembly_name }

	pub fn filename(&self) -> String {
		format!("{}_assembly_report.txt", self.prefix)
	}

	// NCBI splits the nine accession digits into three directory levels,
	// e.g. GCF/016/699/485/.
	pub fn directory(&self) -> String {
		let digits = self.accession.split('.').next().unwrap_or("");
		format!("{}/{}/{}/{}/{}", self.database, &digits[0..3], &digits[3..6],
			&digits[6..9], self.prefix)
	}

	pub fn url(&self) -> String {
		format!("{}/{}/{}", NCBI_GENOMES_URL, self.directory(), self.filename())
	}
}

pub fn main() {
	let args = parse_args(USAGE);
	let genomic_file = args.get_str("<genomic_file>");
	let out_dir = args.get_path("--out-dir");

	let report = AssemblyReport::from_genomic_filename(genomic_file)
		.unwrap_or_else(|e| error!("{}", e));
	eprintln!("INFO: Assembly database: {}", report.database());
	eprintln!("INFO: Assembly accession: {}", report.accession());
	eprintln!("INFO: Assembly name: {}", report.assembly_name());
	eprintln!("INFO: Downloading {}", report.url());

	let saved = download(&report, &out_dir).unwrap_or_else(|e| error!("{}", e));
	let size = fs::metadata(&saved).map(|m| m.len()).unwrap_or(0);
	eprintln!("INFO: Saved {} ({:.2} KB).", saved.display(), size as f64 / 1024.0);
}

pub fn download(report: &AssemblyReport, out_dir: &Path) -> Result<PathBuf, DownloadError> {
	let url = report.url();
	let target = out_dir.join(report.filename());
	let status = Command::new("curl")
		.args(&["--fail", "--silent", "--show-error", "--location", "--max-time", "30"])
		.arg("--output").arg(&target).arg(&url)
		.status()?;
	if !status.success() {
		let _ = fs::remove_file(&target);
		let status = status.code().map_or("none".to_string(), |c| c.to_string());
		return Err(DownloadError::Failed { url, status });
	}
	Ok(target)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn refseq_filename_gives_report_url() {
		let report = AssemblyReport::from_genomic_filename(
			"downloads/GCF_016699485.2_bGalGal1.mat.broiler.GRCg7b_genomic.fna.gz").unwrap();
		assert_eq!(report, AssemblyReport {
			database: "GCF".to_string(),
			accession: "016699485.2".to_string(),
			assembly_name: "bGalGal1.mat.broiler.GRCg7b".to_string(),
			prefix: "GCF_016699485.2_bGalGal1.mat.broiler.GRCg7b".to_string(),
		});
		assert_eq!(report.url(), "https://ftp.ncbi.nlm.nih.gov/genomes/all/GCF/016/699/485/\
			GCF_016699485.2_bGalGal1.mat.broiler.GRCg7b/\
			GCF_016699485.2_bGalGal1.mat.broiler.GRCg7b_assembly_report.txt");
	}

	#[test]
	fn assembly_name_may_contain_underscores() {
		let report = AssemblyReport::from_genomic_filename(
			"GCA_000001405.29_GRCh38.p14_genomic.gff.gz").unwrap();
		assert_eq!(report.database(), "GCA");
		assert_eq!(report.accession(), "000001405.29");
		assert_eq!(report.assembly_name(), "GRCh38.p14");
		assert_eq!(report.directory(), "GCA/000/001/405/GCA_000001405.29_GRCh38.p14");

		let report = AssemblyReport::from_genomic_filename(
			"GCF_000005845.2_ASM584v2_extra_genomic.fna").unwrap();
		assert_eq!(report.assembly_name(), "ASM584v2_extra");
	}

	#[test]
	fn malformed_filenames_are_rejected() {
		assert!(matches!(AssemblyReport::from_genomic_filename("GCF_016699485.2_x_rna.fna.gz"),
			Err(DownloadError::NotGenomicFile(_))));
		assert!(matches!(AssemblyReport::from_genomic_filename("GCF_016699485.2_genomic.fna.gz"),
			Err(DownloadError::MissingAssemblyParts(_))));
		assert!(matches!(AssemblyReport::from_genomic_filename("GCF_1234.1_name_genomic.fna.gz"),
			Err(DownloadError::InvalidAccession(_))));
	}
}
