// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use crate::grammar::Grammar;
use crate::log::MessageLog;
use crate::lr0::Lr0Dfa;
use crate::symbol::{Associativity, Sym};

/// Conflicts the resolver fell back on a default for: shift/reduce conflicts
/// decided by the longest-match rule because precedence information was
/// missing, and every reduce/reduce conflict.  Precedence-directed
/// resolutions and deliberate `%nonassoc` error actions do not count; the
/// user asked for those.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConflictCounts {
    pub shift_reduce: usize,
    pub reduce_reduce: usize,
}

impl ConflictCounts {
    pub fn total(&self) -> usize {
        self.shift_reduce + self.reduce_reduce
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Shift,
    ShiftDefault,
    Reduce,
    Error,
}

impl Resolution {
    fn as_str(&self) -> &'static str {
        match self {
            Resolution::Shift | Resolution::ShiftDefault => "shift",
            Resolution::Reduce => "reduce",
            Resolution::Error => "error",
        }
    }
}

/// Precedence and associativity of a symbol; an undefined literal is
/// equivalent to an unnamed implicit terminal.
fn assoc_prec(grammar: &Grammar, sym: Sym) -> (Associativity, u16) {
    match grammar.symbol(sym) {
        Some(def) => (def.assoc, def.prec),
        None => (Associativity::Unknown, 0),
    }
}

/// Decide a conflict between shifting `lookahead` and reducing by a
/// production whose precedence token is `prec_token`.  Missing precedence on
/// either side resolves as shift, the longest-match default.
fn resolve_shift_reduce(grammar: &Grammar, lookahead: Sym, prec_token: Sym) -> Resolution {
    let (la_assoc, la_prec) = assoc_prec(grammar, lookahead);
    let (rm_assoc, rm_prec) = assoc_prec(grammar, prec_token);
    if rm_assoc == Associativity::Unknown || la_assoc == Associativity::Unknown {
        return Resolution::ShiftDefault;
    }
    if rm_prec > la_prec {
        Resolution::Reduce
    } else if rm_prec < la_prec {
        Resolution::Shift
    } else {
        match rm_assoc {
            Associativity::Left => Resolution::Reduce,
            Associativity::Right => Resolution::Shift,
            Associativity::NonAssoc | Associativity::Unknown => Resolution::Error,
        }
    }
}

fn resolve_shift_reduce_conflicts(
    grammar: &Grammar,
    dfa: &mut Lr0Dfa,
    stateno: usize,
    log: &mut MessageLog,
    counts: &mut ConflictCounts,
) {
    let mut trno = 0;
    while trno < dfa.states[stateno].transitions.len() {
        let id = dfa.states[stateno].transitions[trno];
        let sym = dfa.transitions[id].sym;
        if !grammar.is_terminal(sym) {
            trno += 1;
            continue;
        }
        let mut transition_removed = false;
        for rdno in 0..dfa.states[stateno].reductions.len() {
            if !dfa.states[stateno].reductions[rdno].la.contains(sym) {
                continue;
            }
            let prod = dfa.states[stateno].reductions[rdno].prod;
            let resolution = resolve_shift_reduce(grammar, sym, grammar.production(prod).prec);
            log.record(format!(
                "State {}: shift/reduce conflict between symbol \"{}\" and production {} resolved as {}",
                stateno,
                grammar.symbol_name(sym),
                prod,
                resolution.as_str()
            ));
            match resolution {
                Resolution::Shift => {
                    dfa.states[stateno].reductions[rdno].la.remove(sym);
                }
                Resolution::ShiftDefault => {
                    dfa.states[stateno].reductions[rdno].la.remove(sym);
                    counts.shift_reduce += 1;
                }
                Resolution::Reduce => {
                    dfa.states[stateno].transitions.remove(trno);
                    transition_removed = true;
                    break;
                }
                Resolution::Error => {
                    dfa.states[stateno].reductions[rdno].la.remove(sym);
                    dfa.states[stateno].transitions.remove(trno);
                    transition_removed = true;
                    break;
                }
            }
        }
        if !transition_removed {
            trno += 1;
        }
    }
}

fn resolve_reduce_reduce_conflicts(
    grammar: &Grammar,
    dfa: &mut Lr0Dfa,
    stateno: usize,
    log: &mut MessageLog,
    counts: &mut ConflictCounts,
) {
    let count = dfa.states[stateno].reductions.len();
    for i in 0..count {
        for j in i + 1..count {
            let (prod_i, prod_j, shared) = {
                let reductions = &dfa.states[stateno].reductions;
                let shared: Vec<Sym> = reductions[i]
                    .la
                    .iter()
                    .filter(|&sym| reductions[j].la.contains(sym))
                    .collect();
                (reductions[i].prod, reductions[j].prod, shared)
            };
            for sym in shared {
                let (winner, loser) = if prod_i < prod_j { (prod_i, j) } else { (prod_j, i) };
                dfa.states[stateno].reductions[loser].la.remove(sym);
                log.record(format!(
                    "State {}: reduce/reduce conflict between productions {} and {} on lookahead \"{}\" resolved in favor of production {}",
                    stateno,
                    prod_i,
                    prod_j,
                    grammar.symbol_name(sym),
                    winner
                ));
                counts.reduce_reduce += 1;
            }
        }
    }
}

/// Resolve parsing action conflicts in every state, then drop reductions
/// whose lookahead sets became empty.  Running the resolver again is a
/// no-op: afterwards no lookahead appears both on a transition and in a
/// reduction, and no two reductions share a lookahead.
pub fn resolve_conflicts(
    grammar: &Grammar,
    dfa: &mut Lr0Dfa,
    log: &mut MessageLog,
) -> ConflictCounts {
    let mut counts = ConflictCounts::default();
    for stateno in 0..dfa.states.len() {
        if dfa.states[stateno].reductions.is_empty() {
            continue;
        }
        resolve_shift_reduce_conflicts(grammar, dfa, stateno, log, &mut counts);
        resolve_reduce_reduce_conflicts(grammar, dfa, stateno, log, &mut counts);
        dfa.states[stateno]
            .reductions
            .retain(|reduction| !reduction.la.is_empty());
    }
    counts
}
