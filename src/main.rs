//! Command-line adverb extraction over CoNLL-U corpora.

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use itertools::Itertools;
use mimalloc::MiMalloc;

use advextract::adverbs::{Collection, Extractor};
use advextract::conllu::{CoNLLUReader, ReaderOptions};
use advextract::reports;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Extract adverbs from CoNLL-U treebanks and report their distribution,
/// dependents, morphology, coordination groups and lemma divergences.
#[derive(Parser, Debug)]
#[command(name = "advextract", version)]
struct Args {
    /// CoNLL-U files or directories to analyse (searched recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory for the reports [default: ADV_<input stems>]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Decimal separator of fractional token ids (not '.' or '-')
    #[arg(long, default_value_t = ',')]
    decsep: char,

    /// Do not expect head annotation
    #[arg(long)]
    no_syntax: bool,

    /// Documents declare their own columns (CoNLL-U plus)
    #[arg(long)]
    plus: bool,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("advextract: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let files = discover(&args.inputs)?;
    if files.is_empty() {
        return Err("no .conllu files among the inputs".into());
    }

    let out_dir = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&files));
    std::fs::create_dir_all(&out_dir)?;

    let extractor = Extractor::new();
    let mut collection = Collection::default();

    for file in &files {
        println!("{}", file.display());
        let options = ReaderOptions {
            decsep: args.decsep,
            syntax: !args.no_syntax,
            plus: args.plus,
            ..ReaderOptions::default()
        };
        let reader = match CoNLLUReader::from_file(file, options) {
            Ok(reader) => reader,
            Err(e) => {
                eprintln!("warning: cannot read {}: {e}", file.display());
                continue;
            }
        };
        for sentence in reader {
            match sentence {
                Ok((_, tree)) => extractor.scan_tree(&tree, &mut collection),
                Err(e) => eprintln!("warning: {}: {e}", file.display()),
            }
        }
    }

    reports::write_reports(&collection, &out_dir)?;
    println!("reports written to {}", out_dir.display());
    Ok(())
}

/// Collect the CoNLL-U files among the inputs, walking directories
/// recursively. The list is sorted for deterministic output.
fn discover(inputs: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            walk(input, &mut files)?;
        } else if is_conllu(input) {
            files.push(input.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else if is_conllu(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_conllu(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".conllu") || name.ends_with(".conllu.gz"))
}

fn default_output(files: &[PathBuf]) -> PathBuf {
    let stems = files
        .iter()
        .filter_map(|file| file.file_name().and_then(|name| name.to_str()))
        .map(|name| name.trim_end_matches(".gz").trim_end_matches(".conllu"))
        .join("_");
    PathBuf::from(format!("ADV_{stems}"))
}
