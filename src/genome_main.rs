
extern crate docopt;
extern crate regex;
extern crate itertools;
extern crate thiserror;

use std::env;

#[macro_use] mod common;
mod genome_rename_ids;
mod genome_download_assembly_report;

const USAGE: &str = "
Usage:
  genome rename ids ngdc [options] <fasta> <out_fasta>
  genome rename ids custom [options] <fasta> <out_fasta> <id_map>
  genome download assembly report [options] <genomic_file>
";

fn main() {
	let args: Vec<String> = env::args().collect();

	if args.len() >= 3 && args[1..3] == ["rename", "ids"] {
		genome_rename_ids::main();
	} else if args.len() >= 4 && args[1..4] == ["download", "assembly", "report"] {
		genome_download_assembly_report::main();
	} else {
		error!("Unknown subcommand.\n{}", USAGE);
	}
}
