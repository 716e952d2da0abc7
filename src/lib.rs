// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use thiserror::Error;

pub mod codegen;
pub mod conflicts;
pub mod grammar;
pub mod lalr;
pub mod log;
pub mod lr0;
pub mod parse;
pub mod production;
pub mod sentence;
pub mod symbol;
pub mod symset;

pub use crate::conflicts::ConflictCounts;
pub use crate::grammar::{Grammar, GrammarError};
pub use crate::log::MessageLog;
pub use crate::lr0::Lr0Dfa;
pub use crate::parse::ParseError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Which lookahead policy to attach to the LR(0) automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookaheadPolicy {
    Slr,
    Lalr,
}

/// Run the table construction pipeline over a parsed grammar: finalize,
/// FIRST/FOLLOW, LR(0) automaton, lookaheads, conflict resolution.  Conflict
/// resolutions are recorded in `log`.
pub fn build_tables(
    mut grammar: Grammar,
    policy: LookaheadPolicy,
    log: &mut MessageLog,
) -> Result<(Grammar, Lr0Dfa, ConflictCounts), Error> {
    grammar.finalize()?;
    grammar.compute_first();
    grammar.compute_follow();
    let mut dfa = Lr0Dfa::new(&grammar);
    match policy {
        LookaheadPolicy::Slr => lr0::make_slr_reductions(&grammar, &mut dfa),
        LookaheadPolicy::Lalr => lalr::make_lalr_reductions(&grammar, &mut dfa),
    }
    let counts = conflicts::resolve_conflicts(&grammar, &mut dfa, log);
    Ok((grammar, dfa, counts))
}
