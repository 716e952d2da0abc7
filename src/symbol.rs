// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use std::fmt;

use crate::symset::SymbolSet;

/// A symbol code.  Codes 0 and 1 are reserved for the end of input marker
/// and the empty string; codes 2..=255 are literal single character
/// terminals (a literal `'x'` has the code of the character); codes above
/// 255 are handed out sequentially as named symbols are introduced.
pub type Sym = usize;

/// End of input marker code.
pub const EOF: Sym = 0;

/// Empty string code.
pub const EPSILON: Sym = 1;

/// Largest literal token code.
pub const TOKEN_LITERAL_MAX: Sym = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Unknown,
    NonAssoc,
    Left,
    Right,
}

impl Default for Associativity {
    fn default() -> Self {
        Associativity::Unknown
    }
}

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Associativity::Unknown => write!(f, "unknown"),
            Associativity::NonAssoc => write!(f, "none"),
            Associativity::Left => write!(f, "left"),
            Associativity::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A terminal introduced by being referenced in a right hand side.
    ImplicitTerminal,
    /// A terminal declared by a `%token`/`%left`/`%right`/`%nonassoc`
    /// directive or written as a character literal.
    ExplicitTerminal,
    NonTerminal,
}

/// A symbol definition.  FIRST, FOLLOW and the production list are only
/// meaningful for non-terminals.
#[derive(Debug, Clone)]
pub struct SymbolDef {
    pub code: Sym,
    name: Option<String>,
    pub kind: SymbolKind,
    pub prec: u16,
    pub assoc: Associativity,
    pub first: SymbolSet,
    pub follow: SymbolSet,
    prods: Vec<usize>,
}

impl SymbolDef {
    pub fn new(name: Option<String>) -> Self {
        Self {
            code: 0,
            name,
            kind: SymbolKind::ImplicitTerminal,
            prec: 0,
            assoc: Associativity::Unknown,
            first: SymbolSet::new(),
            follow: SymbolSet::new(),
            prods: vec![],
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_non_terminal(&self) -> bool {
        self.kind == SymbolKind::NonTerminal
    }

    /// Productions with this symbol as their left hand side, in input order.
    pub fn productions(&self) -> &[usize] {
        &self.prods
    }

    pub(crate) fn add_production(&mut self, prod: usize) {
        self.prods.push(prod);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_definitions_are_implicit_terminals() {
        let def = SymbolDef::new(Some("NUMBER".to_string()));
        assert_eq!(def.kind, SymbolKind::ImplicitTerminal);
        assert_eq!(def.assoc, Associativity::Unknown);
        assert_eq!(def.prec, 0);
        assert_eq!(def.name(), Some("NUMBER"));
        assert!(def.productions().is_empty());
    }
}
