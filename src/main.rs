// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use clap::crate_authors;
use structopt::StructOpt;

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    process,
    time::{SystemTime, UNIX_EPOCH},
};

use xgen::{
    build_tables, codegen, parse, sentence, Error, LookaheadPolicy, MessageLog,
};

fn with_changed_extension(path: &Path, new_extension: &str) -> PathBuf {
    let mut new_path = PathBuf::new();
    if let Some(dir) = path.parent() {
        new_path.push(dir);
    };
    new_path.push(path.file_stem().expect("the input path names a file"));
    new_path.set_extension(new_extension);
    new_path
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "xgen",
    about = "SLR(1)/LALR(1) parser generator emitting jump-threaded C parsers",
    author = crate_authors!(),
)]
struct CLOptions {
    /// Overwrite the output file (if it exists)
    #[structopt(short, long)]
    force: bool,
    /// Total number of default-resolved conflicts that are expected.
    #[structopt(short, long)]
    expect: Option<usize>,
    /// Attach SLR(1) lookaheads instead of LALR(1).
    #[structopt(long)]
    slr: bool,
    /// Also write a description of the grammar and its automaton.
    #[structopt(short, long)]
    report: bool,
    /// Generate a random sentence with the given recursion budget instead
    /// of a parser.
    #[structopt(long)]
    sentence: Option<u32>,
    /// Seed for the sentence generator (default: wall clock time).
    #[structopt(long)]
    seed: Option<u64>,
    /// Write the sentence as numeric codes rather than symbol names.
    #[structopt(long)]
    codes: bool,
    /// The path of the file containing the grammar description.
    #[structopt(parse(from_os_str))]
    specification: PathBuf,
}

fn main() {
    let cl_options = CLOptions::from_args();
    let mut log = MessageLog::new("xgen");
    let status = run(&cl_options, &mut log);
    let _ = log.write(&mut std::io::stderr());
    process::exit(status);
}

fn run(cl_options: &CLOptions, log: &mut MessageLog) -> i32 {
    let label = cl_options.specification.to_string_lossy().to_string();
    let text = match fs::read_to_string(&cl_options.specification) {
        Ok(text) => text,
        Err(error) => {
            log.record(format!("ERROR: cannot open input file \"{}\": {}", label, error));
            return -1;
        }
    };
    let grammar = match parse::parse_grammar_text(&text, &label) {
        Ok(grammar) => grammar,
        Err(error) => {
            log.record(format!("ERROR: {}", error));
            return -1;
        }
    };

    if let Some(budget) = cl_options.sentence {
        return make_sentence(cl_options, grammar, budget, log);
    }

    let output_path = with_changed_extension(&cl_options.specification, "c");
    if output_path.exists() && !cl_options.force {
        log.record(format!(
            "ERROR: output file \"{}\" already exists",
            output_path.to_string_lossy()
        ));
        return -1;
    }

    let policy = if cl_options.slr {
        LookaheadPolicy::Slr
    } else {
        LookaheadPolicy::Lalr
    };
    let (grammar, dfa, counts) = match build_tables(grammar, policy, log) {
        Ok(tables) => tables,
        Err(error) => {
            log.record(format!("ERROR: {}", error));
            return -1;
        }
    };

    let expected = cl_options.expect.unwrap_or(0);
    if counts.total() != expected {
        log.record(format!(
            "ERROR: {} conflicts where {} were expected",
            counts.total(),
            expected
        ));
        return -1;
    }

    if cl_options.report {
        let report_path = with_changed_extension(&cl_options.specification, "report");
        if let Err(error) = write_report(&report_path, &grammar, &dfa) {
            log.record(format!(
                "ERROR: cannot write report file \"{}\": {}",
                report_path.to_string_lossy(),
                error
            ));
            return -1;
        }
    }

    let mut file = match fs::File::create(&output_path) {
        Ok(file) => file,
        Err(error) => {
            log.record(format!(
                "ERROR: cannot create output file \"{}\": {}",
                output_path.to_string_lossy(),
                error
            ));
            return -1;
        }
    };
    if let Err(error) = codegen::generate_c_parser(&mut file, &grammar, &dfa) {
        log.record(format!("ERROR: writing the parser failed: {}", error));
        drop(file);
        // Leave no partial output behind.
        let _ = fs::remove_file(&output_path);
        return -1;
    }
    0
}

fn write_report(path: &Path, grammar: &xgen::Grammar, dfa: &xgen::Lr0Dfa) -> Result<(), Error> {
    let mut file = fs::File::create(path)?;
    file.write_all(grammar.description().as_bytes())?;
    file.write_all(dfa.description(grammar).as_bytes())?;
    Ok(())
}

fn make_sentence(
    cl_options: &CLOptions,
    mut grammar: xgen::Grammar,
    budget: u32,
    log: &mut MessageLog,
) -> i32 {
    if let Err(error) = grammar.finalize() {
        log.record(format!("ERROR: {}", error));
        return -1;
    }
    let seed = cl_options.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    });
    match sentence::random_sentence(&grammar, budget, seed) {
        Some(derived) => {
            let stdout = std::io::stdout();
            if sentence::write_sentence(&mut stdout.lock(), &grammar, &derived, !cl_options.codes)
                .is_err()
            {
                return -1;
            }
            0
        }
        None => {
            log.record(format!(
                "ERROR: no sentence derivable within a recursion budget of {}",
                budget
            ));
            -1
        }
    }
}
