//! maf-compare CLI entry point
//!
//! Comparison, pair counting, transitive closure and trio classification
//! of multiple alignments in MAF format.

use anyhow::Context;
use clap::{Parser, Subcommand};
use maf_compare::core::{
    compare_mafs, count_pairs_in_maf, transitive_closure, tree_from_maf, write_report,
    CompareOptions, TrioDecoder,
};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "maf-compare")]
#[command(about = "Compare, sample and transitively close MAF multiple alignments")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate how much of one alignment's homology is recovered by another
    Compare {
        /// First MAF file
        maf1: PathBuf,
        /// Second MAF file
        maf2: PathBuf,
        /// Output XML file (stdout if not specified)
        output: Option<PathBuf>,
        /// Number of pairs to sample per direction
        #[arg(short = 's', long, default_value = "1000000")]
        samples: u64,
        /// Positional slack allowed on one pair member at a time
        #[arg(short = 'n', long, default_value = "0")]
        near: u64,
        /// Seed for the random number generator (drawn from entropy if unset)
        #[arg(long)]
        seed: Option<u64>,
        /// Bed files masking the results, comma separated
        #[arg(long = "bed-files", value_delimiter = ',')]
        bed_files: Vec<PathBuf>,
        /// Wiggle reference,partner patterns, comma separated (even count)
        #[arg(long = "wiggle-pairs", value_delimiter = ',')]
        wiggle_pairs: Vec<String>,
        /// Bin length of the wiggle arrays
        #[arg(long = "wiggle-bin-length", default_value = "100000")]
        wiggle_bin_length: u64,
        /// Explicit legitimate sequence names, comma separated
        /// (default: names present in both files)
        #[arg(long = "sequences", value_delimiter = ',')]
        sequences: Vec<String>,
        /// Pre-computed pair totals "N1,N2", skipping the counting passes
        #[arg(long = "number-of-pairs")]
        number_of_pairs: Option<String>,
    },
    /// Transitively close an alignment and emit the closed MAF
    Closure {
        /// Input MAF file
        maf: PathBuf,
        /// Output MAF file (stdout if not specified)
        output: Option<PathBuf>,
    },
    /// Count the exact number of homology pairs in a MAF
    Pairs {
        /// Input MAF file
        maf: PathBuf,
        /// Restrict counting to these sequence names, comma separated
        #[arg(long = "sequences", value_delimiter = ',')]
        sequences: Vec<String>,
    },
    /// Classify species trios against a tree
    Trio {
        /// File of triples, three labels per line
        triples: PathBuf,
        /// Newick tree string
        #[arg(long, conflicts_with = "maf")]
        tree: Option<String>,
        /// MAF file carrying the tree on its first `a` line
        #[arg(long)]
        maf: Option<PathBuf>,
    },
}

fn output_writer(output: &Option<PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(std::io::stdout()))),
    }
}

fn parse_pair_totals(value: &str) -> anyhow::Result<(u64, u64)> {
    let parts: Vec<&str> = value.split(',').collect();
    if parts.len() != 2 {
        anyhow::bail!("--number-of-pairs must contain two comma separated values");
    }
    Ok((parts[0].parse()?, parts[1].parse()?))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Compare {
            maf1,
            maf2,
            output,
            samples,
            near,
            seed,
            bed_files,
            wiggle_pairs,
            wiggle_bin_length,
            sequences,
            number_of_pairs,
        } => {
            if wiggle_pairs.len() % 2 != 0 {
                eprintln!("error: --wiggle-pairs must come in comma separated pairs");
                std::process::exit(2);
            }
            let options = CompareOptions {
                samples,
                near,
                seed,
                bed_files,
                wiggle_pairs: wiggle_pairs
                    .chunks(2)
                    .map(|c| (c[0].clone(), c[1].clone()))
                    .collect(),
                wiggle_bin_length,
                legit_sequences: if sequences.is_empty() {
                    None
                } else {
                    Some(sequences)
                },
                number_of_pairs: number_of_pairs
                    .as_deref()
                    .map(parse_pair_totals)
                    .transpose()?,
            };

            eprintln!("Comparing {:?} with {:?}", maf1, maf2);
            let report = compare_mafs(&maf1, &maf2, &options)?;
            let mut out = output_writer(&output)?;
            write_report(&report, &maf1, &maf2, &options, &mut out)?;
            out.flush()?;

            eprintln!("\n=== Comparison Statistics ===");
            eprintln!("Pairs in maf1:   {}", report.number_of_pairs_in_maf1);
            eprintln!("Pairs in maf2:   {}", report.number_of_pairs_in_maf2);
            eprintln!(
                "A->B recovered:  {} / {}",
                report.aggregate_ab.in_all, report.aggregate_ab.total
            );
            eprintln!(
                "B->A recovered:  {} / {}",
                report.aggregate_ba.in_all, report.aggregate_ba.total
            );
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Closure { maf, output } => {
            eprintln!("Transitively closing {:?}", maf);
            let mut out = output_writer(&output)?;
            transitive_closure(&maf, &mut out)?;
            out.flush()?;
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Pairs { maf, sequences } => {
            let legit: HashSet<String> = if sequences.is_empty() {
                let mut names = HashSet::new();
                let mut lengths = std::collections::HashMap::new();
                maf_compare::core::pairs::collect_names(&maf, &mut names, &mut lengths)?;
                names
            } else {
                sequences.into_iter().collect()
            };
            let count = count_pairs_in_maf(&maf, &legit)?;
            println!("{}", count);
        }

        Commands::Trio { triples, tree, maf } => {
            let newick = match (tree, maf) {
                (Some(tree), _) => tree,
                (None, Some(maf)) => tree_from_maf(&maf)?.ok_or_else(|| {
                    anyhow::anyhow!("no tree= key on the first a line of {:?}", maf)
                })?,
                (None, None) => {
                    eprintln!("error: specify --tree or --maf");
                    std::process::exit(2);
                }
            };
            let decoder = TrioDecoder::from_newick(&newick)?;
            let reader = BufReader::new(
                File::open(&triples)
                    .with_context(|| format!("cannot open {}", triples.display()))?,
            );
            for line in reader.lines() {
                let line = line?;
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.is_empty() {
                    continue;
                }
                if fields.len() != 3 {
                    anyhow::bail!("invalid triple line '{}'", line);
                }
                let topology = decoder.classify_labels(fields[0], fields[1], fields[2])?;
                println!(
                    "{}\t{}\t{}\t{}",
                    fields[0],
                    fields[1],
                    fields[2],
                    topology.code()
                );
            }
        }
    }

    Ok(())
}
