// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use std::cmp::Ordering;

use crate::grammar::Grammar;
use crate::symbol::{Sym, EOF, EPSILON};
use crate::symset::SymbolSet;

/// An LR(0) item: a production with a dot position in 0..=len(rhs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub prod: usize,
    pub dot: usize,
}

/// Items order by (dot ascending, production descending).  States are
/// deduplicated by element-wise comparison of their sorted item lists, so
/// this order is the canonical form.
impl Ord for Item {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dot.cmp(&other.dot).then(other.prod.cmp(&self.prod))
    }
}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A reduction: fires on the lookaheads in `la`.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub prod: usize,
    pub la: SymbolSet,
}

#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub id: usize,
    pub sym: Sym,
    pub src: usize,
    pub dst: usize,
}

/// A state of the DFA for viable prefixes.
#[derive(Debug, Clone)]
pub struct State {
    pub id: usize,
    items: Vec<Item>,
    /// Outgoing transition ids, in creation order.  Conflict resolution may
    /// remove entries; the transition records themselves stay in the DFA.
    pub transitions: Vec<usize>,
    pub reductions: Vec<Reduction>,
    /// The symbol labelling the transitions that enter this state (EPSILON
    /// for the start state).  The emitter uses it to decide whether the
    /// state needs a shift label.
    pub accessing_sym: Sym,
    /// Set iff the state is entered through a transition on EOF.
    pub accept: bool,
}

impl State {
    pub fn items(&self) -> &[Item] {
        &self.items
    }
}

/// Compute the closure of an item list in place and put it into canonical
/// order.  Each non-terminal is expanded at most once, tracked by a bitset.
pub fn closure(grammar: &Grammar, items: &mut Vec<Item>) {
    let mut done = SymbolSet::new();
    let mut i = 0;
    while i < items.len() {
        let item = items[i];
        i += 1;
        let production = grammar.production(item.prod);
        let sym = match production.rhs().get(item.dot) {
            Some(&sym) => sym,
            None => continue,
        };
        if grammar.is_terminal(sym) || !done.insert(sym) {
            continue;
        }
        for &prod in grammar.def(sym).productions() {
            let candidate = Item { prod, dot: 0 };
            if !items.contains(&candidate) {
                items.push(candidate);
            }
        }
    }
    items.sort();
}

/// The LR(0) automaton: states in worklist order from the start state,
/// transitions in creation order, both addressed by dense ids.
#[derive(Debug)]
pub struct Lr0Dfa {
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
}

impl Lr0Dfa {
    /// Build the automaton.  The start state is the closure of the item
    /// `<0, 0>`; new states are discovered through goto and deduplicated by
    /// canonical item list equality.
    pub fn new(grammar: &Grammar) -> Self {
        let mut dfa = Self {
            states: vec![],
            transitions: vec![],
        };
        let mut items = vec![Item { prod: 0, dot: 0 }];
        closure(grammar, &mut items);
        dfa.add_state(items, EPSILON);

        let mut stateno = 0;
        while stateno < dfa.states.len() {
            let items = dfa.states[stateno].items.clone();
            let mut done = SymbolSet::new();
            for item in &items {
                let sym = match grammar.production(item.prod).rhs().get(item.dot) {
                    Some(&sym) => sym,
                    None => continue,
                };
                if !done.insert(sym) {
                    continue;
                }
                let mut goto_items: Vec<Item> = items
                    .iter()
                    .filter(|it| grammar.production(it.prod).rhs().get(it.dot) == Some(&sym))
                    .map(|it| Item {
                        prod: it.prod,
                        dot: it.dot + 1,
                    })
                    .collect();
                closure(grammar, &mut goto_items);
                let dst = match dfa.find_state(&goto_items) {
                    Some(id) => id,
                    None => dfa.add_state(goto_items, sym),
                };
                let id = dfa.transitions.len();
                dfa.transitions.push(Transition {
                    id,
                    sym,
                    src: stateno,
                    dst,
                });
                dfa.states[stateno].transitions.push(id);
                if sym == EOF {
                    dfa.states[dst].accept = true;
                }
            }
            stateno += 1;
        }
        dfa
    }

    fn add_state(&mut self, items: Vec<Item>, accessing_sym: Sym) -> usize {
        let id = self.states.len();
        self.states.push(State {
            id,
            items,
            transitions: vec![],
            reductions: vec![],
            accessing_sym,
            accept: false,
        });
        id
    }

    fn find_state(&self, items: &[Item]) -> Option<usize> {
        self.states
            .iter()
            .find(|state| state.items == items)
            .map(|state| state.id)
    }

    /// The id of the transition out of `state` labelled `sym`, if any.
    pub fn find_transition(&self, state: usize, sym: Sym) -> Option<usize> {
        self.states[state]
            .transitions
            .iter()
            .copied()
            .find(|&id| self.transitions[id].sym == sym)
    }

    /// The reduction by `prod` in `state`, created on first use with an
    /// empty lookahead set.
    pub fn add_reduction(&mut self, state: usize, prod: usize) -> &mut Reduction {
        let reductions = &mut self.states[state].reductions;
        if let Some(pos) = reductions.iter().position(|rd| rd.prod == prod) {
            &mut reductions[pos]
        } else {
            reductions.push(Reduction {
                prod,
                la: SymbolSet::new(),
            });
            reductions.last_mut().expect("just pushed")
        }
    }

    pub fn format_item(&self, grammar: &Grammar, item: &Item) -> String {
        let production = grammar.production(item.prod);
        let mut string = format!("{} ->", grammar.symbol_name(production.lhs));
        for (index, &sym) in production.rhs().iter().enumerate() {
            if index == item.dot {
                string += " .";
            }
            string.push(' ');
            string += &grammar.symbol_name(sym);
        }
        if item.dot >= production.len() {
            string += " .";
        }
        string
    }

    /// A human readable dump of the automaton, written into the report file.
    pub fn description(&self, grammar: &Grammar) -> String {
        let mut string = "\nStates:\n=======\n\n".to_string();
        for state in self.states.iter() {
            string += &format!(
                "State {} (accessed by {}){}:\n",
                state.id,
                grammar.symbol_name(state.accessing_sym),
                if state.accept { " (accept)" } else { "" }
            );
            for item in state.items.iter() {
                string += &format!("    {}\n", self.format_item(grammar, item));
            }
            if !state.transitions.is_empty() {
                string += "  Transitions:\n";
                for &id in state.transitions.iter() {
                    let transition = &self.transitions[id];
                    string += &format!(
                        "    {} -> State {}\n",
                        grammar.symbol_name(transition.sym),
                        transition.dst
                    );
                }
            }
            if !state.reductions.is_empty() {
                string += "  Reductions:\n";
                for reduction in state.reductions.iter() {
                    string += &format!(
                        "    {{{}}}: reduce {}\n",
                        grammar.format_symbol_set(&reduction.la),
                        grammar.format_production(reduction.prod)
                    );
                }
            }
            string.push('\n');
        }
        string
    }
}

/// Attach SLR(1) reductions: every final item `A -> w .` fires on FOLLOW(A).
/// Final items of production 0 register no reduction; reaching the accept
/// state on EOF is an accept, not a reduce.
pub fn make_slr_reductions(grammar: &Grammar, dfa: &mut Lr0Dfa) {
    for stateno in 0..dfa.states.len() {
        let finals: Vec<Item> = dfa.states[stateno]
            .items
            .iter()
            .copied()
            .filter(|item| item.dot >= grammar.production(item.prod).len())
            .collect();
        for item in finals {
            if item.prod == 0 {
                continue;
            }
            let lhs = grammar.production(item.prod).lhs;
            let follow = grammar.def(lhs).follow.clone();
            let reduction = dfa.add_reduction(stateno, item.prod);
            reduction.la.or_with(&follow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{SymbolDef, SymbolKind};

    fn non_terminal(grammar: &mut Grammar, name: &str) -> Sym {
        let mut def = SymbolDef::new(Some(name.to_string()));
        def.kind = SymbolKind::NonTerminal;
        grammar.add_symbol(def)
    }

    // L -> L 'x' | 'x'
    fn left_recursive() -> Grammar {
        let mut grammar = Grammar::new();
        let l = non_terminal(&mut grammar, "L");
        let prod = grammar.add_production(l);
        grammar.append_rhs_symbol(prod, l);
        grammar.append_rhs_symbol(prod, b'x' as Sym);
        let prod = grammar.add_production(l);
        grammar.append_rhs_symbol(prod, b'x' as Sym);
        grammar.finalize().expect("grammar is not empty");
        grammar.compute_first();
        grammar.compute_follow();
        grammar
    }

    // R -> 'x' R | 'x'
    fn right_recursive() -> Grammar {
        let mut grammar = Grammar::new();
        let r = non_terminal(&mut grammar, "R");
        let prod = grammar.add_production(r);
        grammar.append_rhs_symbol(prod, b'x' as Sym);
        grammar.append_rhs_symbol(prod, r);
        let prod = grammar.add_production(r);
        grammar.append_rhs_symbol(prod, b'x' as Sym);
        grammar.finalize().expect("grammar is not empty");
        grammar.compute_first();
        grammar.compute_follow();
        grammar
    }

    #[test]
    fn canonical_item_order_is_dot_ascending_production_descending() {
        let mut items = vec![
            Item { prod: 0, dot: 1 },
            Item { prod: 2, dot: 0 },
            Item { prod: 0, dot: 0 },
            Item { prod: 1, dot: 1 },
        ];
        items.sort();
        assert_eq!(
            items,
            vec![
                Item { prod: 2, dot: 0 },
                Item { prod: 0, dot: 0 },
                Item { prod: 1, dot: 1 },
                Item { prod: 0, dot: 1 },
            ]
        );
    }

    #[test]
    fn closure_expands_each_non_terminal_once() {
        let grammar = left_recursive();
        let mut items = vec![Item { prod: 0, dot: 0 }];
        closure(&grammar, &mut items);
        // <start> -> . L <eof> plus both L productions at dot 0.
        assert_eq!(items.len(), 3);
        assert!(items.contains(&Item { prod: 1, dot: 0 }));
        assert!(items.contains(&Item { prod: 2, dot: 0 }));
    }

    #[test]
    fn states_are_deduplicated_by_canonical_equality() {
        let grammar = left_recursive();
        let dfa = Lr0Dfa::new(&grammar);
        for (i, a) in dfa.states.iter().enumerate() {
            for b in dfa.states[i + 1..].iter() {
                assert_ne!(a.items(), b.items());
            }
        }
    }

    #[test]
    fn transitions_are_dense_and_consistent() {
        let grammar = left_recursive();
        let dfa = Lr0Dfa::new(&grammar);
        for (i, transition) in dfa.transitions.iter().enumerate() {
            assert_eq!(transition.id, i);
            assert!(transition.src < dfa.states.len());
            assert!(transition.dst < dfa.states.len());
            assert!(dfa.states[transition.src].transitions.contains(&i));
        }
    }

    #[test]
    fn accept_state_is_entered_through_eof() {
        let grammar = left_recursive();
        let dfa = Lr0Dfa::new(&grammar);
        let accepting: Vec<&State> = dfa.states.iter().filter(|state| state.accept).collect();
        assert_eq!(accepting.len(), 1);
        assert_eq!(accepting[0].accessing_sym, EOF);
    }

    #[test]
    fn left_recursion_needs_no_more_states_than_right_recursion() {
        let left = Lr0Dfa::new(&left_recursive());
        let right = Lr0Dfa::new(&right_recursive());
        assert!(left.states.len() <= right.states.len());
    }

    #[test]
    fn slr_reductions_use_follow_of_the_left_hand_side() {
        let grammar = left_recursive();
        let mut dfa = Lr0Dfa::new(&grammar);
        make_slr_reductions(&grammar, &mut dfa);
        let expected: SymbolSet = [EOF, b'x' as Sym].iter().copied().collect();
        let mut seen = 0;
        for state in dfa.states.iter() {
            for reduction in state.reductions.iter() {
                assert_ne!(reduction.prod, 0);
                assert_eq!(reduction.la, expected);
                seen += 1;
            }
        }
        // One state reduces L -> L 'x', another reduces L -> 'x'.
        assert_eq!(seen, 2);
    }
}
