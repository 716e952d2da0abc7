// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use std::io::{self, Write};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::grammar::Grammar;
use crate::symbol::{Sym, TOKEN_LITERAL_MAX};

/// Produce a derivation from `sym` with recursion budget `budget`, appending
/// derived terminals to `sentence`.  The alternatives of a non-terminal are
/// tried in a fresh random order; the first one that derives a terminal
/// string within the budget wins.
fn expand(
    sentence: &mut Vec<Sym>,
    grammar: &Grammar,
    rng: &mut StdRng,
    sym: Sym,
    budget: u32,
) -> bool {
    if grammar.is_terminal(sym) {
        sentence.push(sym);
        return true;
    }
    if budget == 0 {
        return false;
    }
    let saved = sentence.len();
    let mut order: Vec<usize> = grammar.def(sym).productions().to_vec();
    order.shuffle(rng);
    for prod in order {
        sentence.truncate(saved);
        let derived = grammar
            .production(prod)
            .rhs()
            .iter()
            .all(|&rhs_sym| expand(sentence, grammar, rng, rhs_sym, budget - 1));
        if derived {
            return true;
        }
    }
    false
}

/// A random sentence of the language, derived from the user's start symbol.
/// Returns `None` when the recursion budget cannot cover any derivation.
/// The grammar must be finalized.
pub fn random_sentence(grammar: &Grammar, budget: u32, seed: u64) -> Option<Vec<Sym>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sentence = vec![];
    if expand(&mut sentence, grammar, &mut rng, grammar.user_start(), budget) {
        Some(sentence)
    } else {
        None
    }
}

/// Write a sentence as terminal names or as numeric codes.
pub fn write_sentence<W: Write>(
    out: &mut W,
    grammar: &Grammar,
    sentence: &[Sym],
    names: bool,
) -> io::Result<()> {
    for &sym in sentence.iter() {
        if !names {
            write!(out, "{} ", sym)?;
        } else if sym <= TOKEN_LITERAL_MAX {
            write!(out, "{} ", sym as u8 as char)?;
        } else {
            let def = grammar.symbol(sym).expect("named symbols are defined");
            write!(out, "{} ", def.name().expect("named symbols have names"))?;
        }
    }
    writeln!(out)
}
