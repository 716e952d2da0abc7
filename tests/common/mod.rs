// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

//! A table interpreter for the integration tests.  It drives a finished
//! automaton exactly the way the emitted parser's switches would: explicit
//! cases first (terminal transitions, then reduction lookaheads), then the
//! synthesized default (the most frequent reduction, else accept or parse
//! error), so acceptance observed here is acceptance of the generated code.

use xgen::grammar::Grammar;
use xgen::lr0::Lr0Dfa;
use xgen::symbol::{Sym, EOF};
use xgen::{build_tables, parse::parse_grammar_text, ConflictCounts, LookaheadPolicy, MessageLog};

pub struct ParseOutcome {
    pub accepted: bool,
    /// Productions reduced, in order.
    pub reductions: Vec<usize>,
    /// Deepest parser stack observed.
    pub max_depth: usize,
}

fn default_reduction(dfa: &Lr0Dfa, state: usize) -> Option<usize> {
    let reductions = &dfa.states[state].reductions;
    match reductions.len() {
        0 => None,
        1 => Some(reductions[0].prod),
        _ => {
            // Most frequent by lookahead count, first encountered wins ties.
            let mut best = (0, 0);
            for reduction in reductions.iter() {
                let count = reduction.la.len();
                if count > best.1 {
                    best = (reduction.prod, count);
                }
            }
            Some(best.0)
        }
    }
}

pub fn run(g: &Grammar, dfa: &Lr0Dfa, input: &str) -> ParseOutcome {
    let tokens: Vec<Sym> = input.bytes().map(|byte| byte as Sym).collect();
    let mut stack: Vec<usize> = vec![0];
    let mut pos = 0;
    let mut reductions = vec![];
    let mut max_depth = 1;
    let mut steps = 0;
    loop {
        steps += 1;
        if steps > 100_000 {
            // A malformed table would cycle; treat it as a rejection.
            return ParseOutcome {
                accepted: false,
                reductions,
                max_depth,
            };
        }
        let state = *stack.last().expect("the start state is never popped");
        let token = tokens.get(pos).copied().unwrap_or(EOF);

        if let Some(id) = dfa.find_transition(state, token) {
            stack.push(dfa.transitions[id].dst);
            max_depth = max_depth.max(stack.len());
            pos += 1;
            continue;
        }

        let explicit = dfa.states[state]
            .reductions
            .iter()
            .find(|reduction| reduction.la.contains(token))
            .map(|reduction| reduction.prod);
        let chosen = match explicit {
            Some(prod) => Some(prod),
            None => default_reduction(dfa, state),
        };
        match chosen {
            None => {
                return ParseOutcome {
                    accepted: dfa.states[state].accept,
                    reductions,
                    max_depth,
                };
            }
            Some(prod) => {
                let len = g.production(prod).len();
                if stack.len() <= len {
                    return ParseOutcome {
                        accepted: false,
                        reductions,
                        max_depth,
                    };
                }
                stack.truncate(stack.len() - len);
                let exposed = *stack.last().expect("the start state is never popped");
                let lhs = g.production(prod).lhs;
                match dfa.find_transition(exposed, lhs) {
                    Some(id) => {
                        stack.push(dfa.transitions[id].dst);
                        max_depth = max_depth.max(stack.len());
                    }
                    None => {
                        return ParseOutcome {
                            accepted: false,
                            reductions,
                            max_depth,
                        };
                    }
                }
                reductions.push(prod);
            }
        }
    }
}

pub fn accepts(g: &Grammar, dfa: &Lr0Dfa, input: &str) -> bool {
    run(g, dfa, input).accepted
}

/// Front end + pipeline in one step for test grammars.
pub fn tables(
    text: &str,
    policy: LookaheadPolicy,
) -> (Grammar, Lr0Dfa, ConflictCounts, MessageLog) {
    let mut log = MessageLog::new("test");
    let grammar = parse_grammar_text(text, "test.xg").expect("the test grammar parses");
    let (grammar, dfa, counts) =
        build_tables(grammar, policy, &mut log).expect("the test grammar builds");
    (grammar, dfa, counts, log)
}
