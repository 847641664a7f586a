
extern crate docopt;
extern crate thiserror;

use std::env;

#[macro_use] mod common;
mod vcf_from_table;

const USAGE: &str = "
Usage:
  vcf from table [options] <table.tsv> <out.vcf>
";

fn main() {
	let args: Vec<String> = env::args().collect();

	if args.len() >= 3 && args[1..3] == ["from", "table"] {
		vcf_from_table::main();
	} else {
		error!("Unknown subcommand.\n{}", USAGE);
	}
}
