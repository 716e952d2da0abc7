// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use std::mem;

use lazy_static::lazy_static;
use thiserror::Error;

use crate::production::Production;
use crate::symbol::{Associativity, Sym, SymbolDef, SymbolKind, EOF, EPSILON, TOKEN_LITERAL_MAX};
use crate::symset::SymbolSet;

lazy_static! {
    /// A terminal set containing only the empty string symbol.
    static ref EPSILON_SET: SymbolSet = [EPSILON].iter().copied().collect();
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("grammar has no productions")]
    GrammarEmpty,
}

/// The grammar store: a symbol table indexed by code and a production table
/// indexed by production id.  Production 0 is reserved for the augmentation
/// `S' -> S <eof>`, filled in by `finalize`.
#[derive(Debug, Clone)]
pub struct Grammar {
    start: Sym,
    syms: Vec<Option<SymbolDef>>,
    prods: Vec<Production>,
    augmented: bool,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar {
    pub fn new() -> Self {
        let mut grammar = Self {
            start: EOF,
            syms: (0..=TOKEN_LITERAL_MAX).map(|_| None).collect(),
            prods: vec![Production::new(EOF)],
            augmented: false,
        };
        let mut eof = SymbolDef::new(Some("<eof>".to_string()));
        eof.kind = SymbolKind::ExplicitTerminal;
        grammar.set_symbol_at(EOF, eof);
        let mut epsilon = SymbolDef::new(Some("<eps>".to_string()));
        epsilon.kind = SymbolKind::ExplicitTerminal;
        grammar.set_symbol_at(EPSILON, epsilon);
        grammar
    }

    /// Append a named symbol definition.  Returns the assigned code.
    pub fn add_symbol(&mut self, mut def: SymbolDef) -> Sym {
        let code = self.syms.len();
        def.code = code;
        self.syms.push(Some(def));
        code
    }

    /// Install a definition in one of the reserved slots (codes 0..=255).
    pub fn set_symbol_at(&mut self, code: Sym, mut def: SymbolDef) {
        debug_assert!(code <= TOKEN_LITERAL_MAX);
        debug_assert!(self.syms[code].is_none());
        def.code = code;
        self.syms[code] = Some(def);
    }

    pub fn symbol(&self, code: Sym) -> Option<&SymbolDef> {
        self.syms.get(code).and_then(|slot| slot.as_ref())
    }

    pub(crate) fn def(&self, code: Sym) -> &SymbolDef {
        self.syms[code].as_ref().expect("symbol has a definition")
    }

    pub(crate) fn def_mut(&mut self, code: Sym) -> &mut SymbolDef {
        self.syms[code].as_mut().expect("symbol has a definition")
    }

    /// Always greater than `TOKEN_LITERAL_MAX`.
    pub fn symbol_count(&self) -> usize {
        self.syms.len()
    }

    pub fn start(&self) -> Sym {
        self.start
    }

    pub fn set_start(&mut self, sym: Sym) {
        self.start = sym;
    }

    /// The left hand side of the user's start production (the symbol the
    /// augmentation wraps).  Only valid after `finalize`.
    pub fn user_start(&self) -> Sym {
        debug_assert!(self.augmented);
        self.prods[0].rhs()[0]
    }

    pub fn add_production(&mut self, lhs: Sym) -> usize {
        let ident = self.prods.len();
        self.prods.push(Production::new(lhs));
        self.def_mut(lhs).add_production(ident);
        ident
    }

    pub fn append_rhs_symbol(&mut self, prod: usize, sym: Sym) {
        self.prods[prod].push_symbol(sym);
    }

    pub fn set_production_precedence_token(&mut self, prod: usize, sym: Sym) {
        self.prods[prod].prec = sym;
    }

    pub fn production(&self, ident: usize) -> &Production {
        &self.prods[ident]
    }

    pub fn production_count(&self) -> usize {
        self.prods.len()
    }

    pub fn is_terminal(&self, sym: Sym) -> bool {
        if sym <= TOKEN_LITERAL_MAX {
            return true;
        }
        self.def(sym).kind != SymbolKind::NonTerminal
    }

    /// Complete the grammar before analysis: default the start symbol to the
    /// lhs of the first user production, rewrite production 0 to the
    /// augmentation `S' -> S <eof>` for a fresh `S'`, and give productions
    /// without an explicit `%prec` the precedence token of their rightmost
    /// terminal.  Must be invoked exactly once.
    pub fn finalize(&mut self) -> Result<(), GrammarError> {
        debug_assert!(!self.augmented);
        if self.prods.len() < 2 {
            return Err(GrammarError::GrammarEmpty);
        }
        if self.start == EOF {
            self.start = self.prods[1].lhs;
        }
        let mut def = SymbolDef::new(Some("<start>".to_string()));
        def.kind = SymbolKind::NonTerminal;
        let augmented_start = self.add_symbol(def);
        let user_start = self.start;
        self.prods[0].lhs = augmented_start;
        self.prods[0].set_rhs(vec![user_start, EOF]);
        self.def_mut(augmented_start).add_production(0);
        self.start = augmented_start;
        self.augmented = true;

        for i in 1..self.prods.len() {
            if self.prods[i].prec != EPSILON || self.prods[i].is_empty() {
                continue;
            }
            let rightmost = self.prods[i]
                .rhs()
                .iter()
                .rev()
                .copied()
                .find(|&sym| self.is_terminal(sym));
            if let Some(sym) = rightmost {
                self.prods[i].prec = sym;
            }
        }
        Ok(())
    }

    pub fn nullable(&self, sym: Sym) -> bool {
        if sym == EPSILON {
            return true;
        }
        if self.is_terminal(sym) {
            return false;
        }
        self.def(sym).first.contains(EPSILON)
    }

    /// True iff the sentenial form can derive the empty string.  The FIRST
    /// sets are a prerequisite.
    pub fn nullable_form(&self, form: &[Sym]) -> bool {
        form.iter().all(|&sym| self.nullable(sym))
    }

    /// Compute the FIRST set of each non-terminal to a fixpoint.
    pub fn compute_first(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..self.prods.len() {
                let lhs = self.prods[i].lhs;
                let mut first = mem::take(&mut self.def_mut(lhs).first);
                let len = self.prods[i].len();
                if len == 0 {
                    changed |= first.insert(EPSILON);
                } else {
                    let mut j = 0;
                    while j < len {
                        let sym = self.prods[i].rhs()[j];
                        if self.is_terminal(sym) {
                            changed |= first.insert(sym);
                            break;
                        }
                        if sym == lhs {
                            // Self reference: the live FIRST set is the one
                            // taken out above.
                            if !first.contains(EPSILON) {
                                break;
                            }
                        } else {
                            let sym_first = &self.def(sym).first;
                            changed |= first.or_with_masked(sym_first, &EPSILON_SET);
                            if !sym_first.contains(EPSILON) {
                                break;
                            }
                        }
                        j += 1;
                    }
                    if j == len {
                        changed |= first.insert(EPSILON);
                    }
                }
                self.def_mut(lhs).first = first;
            }
        }
    }

    /// Compute the FOLLOW set of each non-terminal to a fixpoint.  The FIRST
    /// sets are a prerequisite.
    pub fn compute_follow(&mut self) {
        let start = self.start;
        self.def_mut(start).follow.insert(EOF);
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..self.prods.len() {
                let lhs = self.prods[i].lhs;
                let len = self.prods[i].len();
                for j in 0..len {
                    let sym = self.prods[i].rhs()[j];
                    if self.is_terminal(sym) {
                        continue;
                    }
                    let mut follow = mem::take(&mut self.def_mut(sym).follow);
                    let mut k = j + 1;
                    while k < len {
                        let next = self.prods[i].rhs()[k];
                        if self.is_terminal(next) {
                            changed |= follow.insert(next);
                            break;
                        }
                        let next_first = &self.def(next).first;
                        changed |= follow.or_with_masked(next_first, &EPSILON_SET);
                        if !next_first.contains(EPSILON) {
                            break;
                        }
                        k += 1;
                    }
                    if k >= len && lhs != sym {
                        changed |= follow.or_with(&self.def(lhs).follow);
                    }
                    self.def_mut(sym).follow = follow;
                }
            }
        }
    }

    /// Display name of a symbol: literals render as `'x'`, reserved codes as
    /// `<eof>`/`<eps>`, named symbols by name.
    pub fn symbol_name(&self, sym: Sym) -> String {
        match sym {
            EOF => "<eof>".to_string(),
            EPSILON => "<eps>".to_string(),
            _ if sym <= TOKEN_LITERAL_MAX => format!("'{}'", sym as u8 as char),
            _ => self.def(sym).name().expect("named symbol").to_string(),
        }
    }

    pub fn format_symbol_set(&self, set: &SymbolSet) -> String {
        let mut string = String::new();
        for (index, sym) in set.iter().enumerate() {
            if index > 0 {
                string.push(' ');
            }
            string += &self.symbol_name(sym);
        }
        string
    }

    pub fn format_production(&self, ident: usize) -> String {
        let production = &self.prods[ident];
        let mut string = format!("{} ->", self.symbol_name(production.lhs));
        if production.is_empty() {
            string += " <empty>";
        } else {
            for &sym in production.rhs() {
                string.push(' ');
                string += &self.symbol_name(sym);
            }
        }
        string
    }

    /// A human readable dump of the productions and symbols, written into
    /// the report file.
    pub fn description(&self) -> String {
        let mut string = "Productions:\n============\n\n".to_string();
        for ident in 0..self.prods.len() {
            let production = &self.prods[ident];
            let (assoc, prec) = match self.symbol(production.prec) {
                Some(def) => (def.assoc, def.prec),
                None => (Associativity::Unknown, 0),
            };
            string += &format!(
                "{:4}: [{:7}, {}] {}\n",
                ident,
                assoc.to_string(),
                prec,
                self.format_production(ident)
            );
        }
        string += "\nSymbols:\n========\n\n";
        for code in 0..self.syms.len() {
            let def = match &self.syms[code] {
                Some(def) => def,
                None => continue,
            };
            if def.is_non_terminal() {
                string += &format!("Symbol {} [non-terminal]:\n", code);
                string += &format!("    name: {}\n", self.symbol_name(code));
                if !def.productions().is_empty() {
                    string += "    productions:";
                    for ident in def.productions() {
                        string += &format!(" {}", ident);
                    }
                    string.push('\n');
                }
                string += &format!("    FIRST: {}\n", self.format_symbol_set(&def.first));
                string += &format!("    FOLLOW: {}\n", self.format_symbol_set(&def.follow));
            } else {
                string += &format!("Symbol {} [terminal, {}, {}]:\n", code, def.assoc, def.prec);
                string += &format!("    name: {}\n", self.symbol_name(code));
            }
        }
        string
    }
}
