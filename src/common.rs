
use docopt::{Docopt, ArgvMap};
use std::process::{Child, Command, Stdio};
use std::io::{self, stdin, BufRead, BufReader};
use std::fs::File;
use std::path::{Path, PathBuf};

macro_rules! error {
	($($arg:tt)+) => ({
		use std::process::exit;
		eprint!("ERROR: "); eprintln!($($arg)+); exit(-1);
	})
}

pub fn parse_args(usage: &str) -> ArgvMap {
	Docopt::new(usage).and_then(|d| d.parse()).unwrap_or_else(|_| {
		error!("Invalid arguments.\n{}", usage);
	})
}

pub trait PathArgs {
	fn get_path(&self, arg: &str) -> PathBuf;
}

impl PathArgs for ArgvMap {
	#[allow(deprecated)]
	fn get_path(&self, arg: &str) -> PathBuf {
		let path = self.get_str(arg);
		if let Some(rest) = path.strip_prefix('~') {
			if let Some(home) = std::env::home_dir() {
				return PathBuf::from(format!("{}{}", home.display(), rest));
			}
		}
		PathBuf::from(path)
	}
}

// Line reader over a plain file, a gzipped file (decompressed by an external
// gunzip process) or standard input when the path is "-".
pub struct FileReader {
	bufread: Box<dyn BufRead>,
	gunzip: Option<Child>
}

impl FileReader {
	pub fn open(path: &Path) -> io::Result<FileReader> {
		if path == Path::new("-") {
			return Ok(FileReader { bufread: Box::new(BufReader::new(stdin())), gunzip: None });
		}
		let file = File::open(path)?;
		if path.extension().map_or(false, |ext| ext == "gz") {
			let mut gunzip = Command::new("gunzip").arg("-c")
				.stdout(Stdio::piped()).stdin(file).spawn()?;
			let stdout = gunzip.stdout.take().ok_or_else(|| io::Error::new(
				io::ErrorKind::BrokenPipe, "gunzip has no output stream"))?;
			Ok(FileReader { bufread: Box::new(BufReader::new(stdout)), gunzip: Some(gunzip) })
		} else {
			Ok(FileReader { bufread: Box::new(BufReader::new(file)), gunzip: None })
		}
	}

	// Returns false at end of file. The line keeps its terminator. A gunzip
	// process that fails turns end of file into an error.
	pub fn read_line(&mut self, line: &mut String) -> io::Result<bool> {
		line.clear();
		if self.bufread.read_line(line)? > 0 { return Ok(true); }
		if let Some(mut gunzip) = self.gunzip.take() {
			let status = gunzip.wait()?;
			if !status.success() {
				return Err(io::Error::new(io::ErrorKind::InvalidData,
					format!("gunzip failed ({}), input is truncated or corrupt", status)));
			}
		}
		Ok(false)
	}
}

impl Drop for FileReader {
	fn drop(&mut self) {
		if let Some(mut gunzip) = self.gunzip.take() {
			let _ = gunzip.kill();
			let _ = gunzip.wait();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn read_line_keeps_terminator_and_reports_eof() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("lines.txt");
		fs::write(&path, "first\nsecond").unwrap();

		let mut reader = FileReader::open(&path).unwrap();
		let mut line = String::new();
		assert!(reader.read_line(&mut line).unwrap());
		assert_eq!(line, "first\n");
		assert!(reader.read_line(&mut line).unwrap());
		assert_eq!(line, "second");
		assert!(!reader.read_line(&mut line).unwrap());
		assert!(line.is_empty());
	}

	#[test]
	fn gzipped_input_is_decompressed() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("lines.txt");
		fs::write(&path, "first\nsecond\n").unwrap();
		assert!(Command::new("gzip").arg(&path).status().unwrap().success());

		let mut reader = FileReader::open(&dir.path().join("lines.txt.gz")).unwrap();
		let mut line = String::new();
		assert!(reader.read_line(&mut line).unwrap());
		assert_eq!(line, "first\n");
		assert!(reader.read_line(&mut line).unwrap());
		assert!(!reader.read_line(&mut line).unwrap());
		assert!(!reader.read_line(&mut line).unwrap());
	}

	#[test]
	fn truncated_gzip_input_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("table.txt");
		let text: String = (0..5000).map(|n| format!("row {} of a long table\n", n)).collect();
		fs::write(&path, text).unwrap();
		assert!(Command::new("gzip").arg(&path).status().unwrap().success());
		let path = dir.path().join("table.txt.gz");
		let compressed = fs::read(&path).unwrap();
		fs::write(&path, &compressed[..compressed.len() / 2]).unwrap();

		let mut reader = FileReader::open(&path).unwrap();
		let mut line = String::new();
		let result = loop {
			match reader.read_line(&mut line) {
				Ok(true) => continue,
				other => break other
			}
		};
		assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
	}

	#[test]
	fn open_missing_file_fails() {
		let dir = tempfile::tempdir().unwrap();
		assert!(FileReader::open(&dir.path().join("absent.tsv")).is_err());
	}
}
