// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use crate::symbol::{Sym, EPSILON};

/// A grammar production.  The precedence token defaults to the rightmost
/// terminal of the right hand side (EPSILON when there is none) and may be
/// overridden with `%prec`; conflict resolution consults its definition.
#[derive(Debug, Clone)]
pub struct Production {
    pub lhs: Sym,
    rhs: Vec<Sym>,
    pub prec: Sym,
}

impl Production {
    pub(crate) fn new(lhs: Sym) -> Self {
        Self {
            lhs,
            rhs: vec![],
            prec: EPSILON,
        }
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    pub fn rhs(&self) -> &[Sym] {
        &self.rhs
    }

    pub(crate) fn push_symbol(&mut self, sym: Sym) {
        self.rhs.push(sym);
    }

    pub(crate) fn set_rhs(&mut self, rhs: Vec<Sym>) {
        self.rhs = rhs;
    }
}
