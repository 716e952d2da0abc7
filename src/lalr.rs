// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

//! LALR(1) lookahead computation per DeRemer and Pennello, "Efficient
//! Computation of LALR(1) Look-Ahead Sets", ACM TOPLAS 4(4), 1982.

use crate::grammar::Grammar;
use crate::lr0::{Item, Lr0Dfa};
use crate::symset::SymbolSet;

/// Marker for transitions already popped off the digraph stack.
const POPPED: usize = usize::MAX;

/// Per LR(0) transition working data: the edges of the current relation
/// (`reads`, then `includes`) and the current function value (DR, then Read,
/// ultimately Follow).  Indexed by transition id; only non-terminal
/// transitions participate.
#[derive(Debug)]
struct TransValues {
    rel: Vec<Vec<usize>>,
    value: Vec<SymbolSet>,
    non_terminal: Vec<bool>,
}

impl TransValues {
    fn new(grammar: &Grammar, dfa: &Lr0Dfa) -> Self {
        let count = dfa.transitions.len();
        Self {
            rel: vec![vec![]; count],
            value: vec![SymbolSet::new(); count],
            non_terminal: dfa
                .transitions
                .iter()
                .map(|transition| !grammar.is_terminal(transition.sym))
                .collect(),
        }
    }

    /// `value[dst] |= value[src]`.
    fn or_value(&mut self, dst: usize, src: usize) {
        if dst == src {
            return;
        }
        let (d, s) = if dst < src {
            let (head, tail) = self.value.split_at_mut(src);
            (&mut head[dst], &tail[0])
        } else {
            let (head, tail) = self.value.split_at_mut(dst);
            (&mut tail[0], &head[src])
        };
        d.or_with(s);
    }
}

/// Initialize the values with the direct read sets:
/// DR (p, A) = { t in T | p -A-> r -t-> }.
fn compute_direct_read_sets(grammar: &Grammar, dfa: &Lr0Dfa, values: &mut TransValues) {
    for id in 0..dfa.transitions.len() {
        if !values.non_terminal[id] {
            continue;
        }
        let dst = dfa.transitions[id].dst;
        for &out in dfa.states[dst].transitions.iter() {
            let sym = dfa.transitions[out].sym;
            if grammar.is_terminal(sym) {
                values.value[id].insert(sym);
            }
        }
    }
}

/// Record the `reads` relation:
/// (p, A) reads (r, C) iff p -A-> r -C-> and C =>* eps.
fn compute_reads_relation(grammar: &Grammar, dfa: &Lr0Dfa, values: &mut TransValues) {
    for id in 0..dfa.transitions.len() {
        if !values.non_terminal[id] {
            continue;
        }
        let dst = dfa.transitions[id].dst;
        for &out in dfa.states[dst].transitions.iter() {
            let sym = dfa.transitions[out].sym;
            if !grammar.is_terminal(sym) && grammar.nullable(sym) {
                values.rel[id].push(out);
            }
        }
    }
}

/// Record the `includes` relation:
/// (p, A) includes (p', B) iff B -> b A y, y =>* eps and p' -..b..-> p.
/// Enumerated by walking each production of each non-terminal transition's
/// symbol through the automaton from the transition's source state.
fn compute_includes_relation(grammar: &Grammar, dfa: &Lr0Dfa, values: &mut TransValues) {
    for id in 0..dfa.transitions.len() {
        if !values.non_terminal[id] {
            continue;
        }
        let sym = dfa.transitions[id].sym;
        let src = dfa.transitions[id].src;
        for &prod in grammar.def(sym).productions() {
            let rhs = grammar.production(prod).rhs();
            let mut state = src;
            for (position, &rhs_sym) in rhs.iter().enumerate() {
                let step = dfa
                    .find_transition(state, rhs_sym)
                    .expect("the production's path exists in the automaton");
                if !grammar.is_terminal(rhs_sym) && grammar.nullable_form(&rhs[position + 1..]) {
                    values.rel[step].push(id);
                }
                state = dfa.transitions[step].dst;
            }
        }
    }
}

/// Compute F x = F' x U U{ F' y | x R* y } over the relation recorded in
/// `rel`, collapsing strongly connected components so every member of an SCC
/// ends up with the component's value.
struct Digraph<'a> {
    values: &'a mut TransValues,
    depth: Vec<usize>,
    stack: Vec<usize>,
}

impl<'a> Digraph<'a> {
    fn run(values: &'a mut TransValues) {
        let count = values.rel.len();
        let mut digraph = Self {
            values,
            depth: vec![0; count],
            stack: vec![],
        };
        for id in 0..count {
            if digraph.depth[id] == 0 && digraph.values.non_terminal[id] {
                digraph.visit(id);
            }
        }
    }

    fn visit(&mut self, id: usize) {
        self.stack.push(id);
        let depth = self.stack.len();
        self.depth[id] = depth;

        for edge in 0..self.values.rel[id].len() {
            let next = self.values.rel[id][edge];
            if self.depth[next] == 0 {
                self.visit(next);
            }
            if self.depth[next] < self.depth[id] {
                // Part of an SCC rooted deeper in the stack.
                self.depth[id] = self.depth[next];
            }
            self.values.or_value(id, next);
        }

        if self.depth[id] == depth {
            // This transition roots an SCC whose members sit above it on the
            // stack; every member takes the root's value.
            loop {
                let member = self.stack.pop().expect("the root is still on the stack");
                self.depth[member] = POPPED;
                if member == id {
                    break;
                }
                self.values.value[member] = self.values.value[id].clone();
            }
        }
    }
}

/// Attach LALR(1) reductions:
/// LA (q, A -> w) = U{ Follow (p, A) | p -..w..-> q }.
///
/// For every dot-0 item, walk the production's right hand side from the
/// item's state to the state holding the final item and bind that state's
/// reduction to the Follow set of the lhs transition.  The augmented
/// production has no lhs transition; its reduction registers with an empty
/// lookahead set in the accept state.
fn compute_lookaheads(grammar: &Grammar, dfa: &mut Lr0Dfa, values: &TransValues) {
    for stateno in 0..dfa.states.len() {
        let items: Vec<Item> = dfa.states[stateno].items().to_vec();
        for item in items {
            if item.dot != 0 {
                continue;
            }
            let production = grammar.production(item.prod);
            let mut end = stateno;
            for &sym in production.rhs() {
                let step = dfa
                    .find_transition(end, sym)
                    .expect("the production's path exists in the automaton");
                end = dfa.transitions[step].dst;
            }
            debug_assert!(dfa.states[end].items().contains(&Item {
                prod: item.prod,
                dot: production.len(),
            }));
            match dfa.find_transition(stateno, production.lhs) {
                None => {
                    // Accepting state.
                    dfa.add_reduction(end, item.prod);
                }
                Some(lhs_transition) => {
                    let reduction = dfa.add_reduction(end, item.prod);
                    reduction.la.or_with(&values.value[lhs_transition]);
                }
            }
        }
    }
}

/// Create reductions for an LALR(1) parser.
pub fn make_lalr_reductions(grammar: &Grammar, dfa: &mut Lr0Dfa) {
    let mut values = TransValues::new(grammar, dfa);

    // Read sets.
    compute_direct_read_sets(grammar, dfa, &mut values);
    compute_reads_relation(grammar, dfa, &mut values);
    Digraph::run(&mut values);

    // Follow sets: re-run the digraph over `includes`, starting from the
    // Read-completed values.
    for edges in values.rel.iter_mut() {
        edges.clear();
    }
    compute_includes_relation(grammar, dfa, &mut values);
    Digraph::run(&mut values);

    compute_lookaheads(grammar, dfa, &values);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Sym, SymbolDef, SymbolKind, EOF};

    fn non_terminal(grammar: &mut Grammar, name: &str) -> Sym {
        let mut def = SymbolDef::new(Some(name.to_string()));
        def.kind = SymbolKind::NonTerminal;
        grammar.add_symbol(def)
    }

    fn analyzed(mut grammar: Grammar) -> (Grammar, Lr0Dfa) {
        grammar.finalize().expect("grammar is not empty");
        grammar.compute_first();
        grammar.compute_follow();
        let mut dfa = Lr0Dfa::new(&grammar);
        make_lalr_reductions(&grammar, &mut dfa);
        (grammar, dfa)
    }

    // S -> L '=' R | R ; L -> '*' R | 'i' ; R -> L
    // The classic grammar that is LALR(1) but not SLR(1).
    fn assignment_grammar() -> Grammar {
        let mut grammar = Grammar::new();
        let s = non_terminal(&mut grammar, "S");
        let l = non_terminal(&mut grammar, "L");
        let r = non_terminal(&mut grammar, "R");
        let prod = grammar.add_production(s);
        for sym in [l, b'=' as Sym, r] {
            grammar.append_rhs_symbol(prod, sym);
        }
        let prod = grammar.add_production(s);
        grammar.append_rhs_symbol(prod, r);
        let prod = grammar.add_production(l);
        grammar.append_rhs_symbol(prod, b'*' as Sym);
        grammar.append_rhs_symbol(prod, r);
        let prod = grammar.add_production(l);
        grammar.append_rhs_symbol(prod, b'i' as Sym);
        let prod = grammar.add_production(r);
        grammar.append_rhs_symbol(prod, l);
        grammar
    }

    #[test]
    fn every_final_item_gets_exactly_one_reduction() {
        let (grammar, dfa) = analyzed(assignment_grammar());
        for state in dfa.states.iter() {
            let finals: Vec<&Item> = state
                .items()
                .iter()
                .filter(|item| item.dot >= grammar.production(item.prod).len())
                .collect();
            assert_eq!(state.reductions.len(), finals.len(), "state {}", state.id);
            for item in finals {
                assert!(state.reductions.iter().any(|rd| rd.prod == item.prod));
            }
        }
    }

    #[test]
    fn lookaheads_are_bounded_by_follow() {
        let (grammar, dfa) = analyzed(assignment_grammar());
        for state in dfa.states.iter() {
            for reduction in state.reductions.iter() {
                if reduction.prod == 0 {
                    continue;
                }
                let lhs = grammar.production(reduction.prod).lhs;
                let follow = &grammar.def(lhs).follow;
                for sym in reduction.la.iter() {
                    assert!(
                        follow.contains(sym),
                        "state {}: lookahead {} outside FOLLOW",
                        state.id,
                        grammar.symbol_name(sym)
                    );
                }
            }
        }
    }

    #[test]
    fn lalr_lookaheads_are_sharper_than_slr() {
        // In the state holding both S -> L . '=' R and R -> L ., SLR gives
        // the reduction FOLLOW(R), which contains '='; LALR must not.
        let (grammar, dfa) = analyzed(assignment_grammar());
        let r_to_l = 5;
        assert!(grammar.def(258).follow.contains(b'=' as Sym));
        let state = dfa
            .states
            .iter()
            .find(|state| {
                state.reductions.iter().any(|rd| rd.prod == r_to_l)
                    && state
                        .transitions
                        .iter()
                        .any(|&t| dfa.transitions[t].sym == b'=' as Sym)
            })
            .expect("the conflicted state exists");
        let reduction = state
            .reductions
            .iter()
            .find(|rd| rd.prod == r_to_l)
            .expect("reduction by R -> L");
        assert!(!reduction.la.contains(b'=' as Sym));
        assert!(reduction.la.contains(EOF));
    }

    #[test]
    fn augmented_reduction_registers_only_in_the_accept_state() {
        let (_, dfa) = analyzed(assignment_grammar());
        for state in dfa.states.iter() {
            for reduction in state.reductions.iter() {
                if reduction.prod == 0 {
                    assert!(state.accept);
                    assert!(reduction.la.is_empty());
                }
            }
        }
        assert_eq!(dfa.states.iter().filter(|state| state.accept).count(), 1);
    }

    #[test]
    fn reads_relation_carries_lookaheads_through_nullable_symbols() {
        // S -> A 'x' ; A -> B ; B -> (empty) | 'b'
        // The transition on A reads the transition on B, so Follow(A)
        // contains 'x' via Read, and B's empty reduction fires on 'x'.
        let mut grammar = Grammar::new();
        let s = non_terminal(&mut grammar, "S");
        let a = non_terminal(&mut grammar, "A");
        let b = non_terminal(&mut grammar, "B");
        let prod = grammar.add_production(s);
        grammar.append_rhs_symbol(prod, a);
        grammar.append_rhs_symbol(prod, b'x' as Sym);
        let prod = grammar.add_production(a);
        grammar.append_rhs_symbol(prod, b);
        grammar.add_production(b);
        let prod = grammar.add_production(b);
        grammar.append_rhs_symbol(prod, b'b' as Sym);
        let (_, dfa) = analyzed(grammar);
        let empty_b = 3;
        let start_state = &dfa.states[0];
        let reduction = start_state
            .reductions
            .iter()
            .find(|rd| rd.prod == empty_b)
            .expect("B -> <empty> is reducible in the start state");
        assert!(reduction.la.contains(b'x' as Sym));
        assert!(!reduction.la.contains(EOF));
    }
}
