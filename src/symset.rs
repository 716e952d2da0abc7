// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use std::iter::FromIterator;
use std::ops::BitOrAssign;

use crate::symbol::Sym;

const BLOCK_BITS: usize = 64;

/// A growable set of symbol codes backed by a bit array.
///
/// FIRST and FOLLOW sets, reduction lookahead sets and the various per pass
/// "done" sets are all sets over the terminal code space, so membership,
/// union and union-minus-mask dominate.  The union operations report whether
/// they changed the receiver, which is what drives the fixpoint loops to
/// termination.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymbolSet {
    blocks: Vec<u64>,
}

impl SymbolSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn grow_for(&mut self, sym: Sym) {
        let needed = sym / BLOCK_BITS + 1;
        if self.blocks.len() < needed {
            self.blocks.resize(needed, 0);
        }
    }

    /// Add `sym` to the set.  Returns `true` if the set changed.
    pub fn insert(&mut self, sym: Sym) -> bool {
        self.grow_for(sym);
        let block = &mut self.blocks[sym / BLOCK_BITS];
        let bit = 1u64 << (sym % BLOCK_BITS);
        let changed = *block & bit == 0;
        *block |= bit;
        changed
    }

    /// Remove `sym` from the set.  Returns `true` if the set changed.
    pub fn remove(&mut self, sym: Sym) -> bool {
        if let Some(block) = self.blocks.get_mut(sym / BLOCK_BITS) {
            let bit = 1u64 << (sym % BLOCK_BITS);
            let changed = *block & bit != 0;
            *block &= !bit;
            changed
        } else {
            false
        }
    }

    pub fn contains(&self, sym: Sym) -> bool {
        match self.blocks.get(sym / BLOCK_BITS) {
            Some(block) => block >> (sym % BLOCK_BITS) & 1 == 1,
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|&block| block == 0)
    }

    pub fn len(&self) -> usize {
        self.blocks.iter().map(|block| block.count_ones() as usize).sum()
    }

    pub fn clear_all(&mut self) {
        for block in self.blocks.iter_mut() {
            *block = 0;
        }
    }

    /// `self |= other`.  Returns `true` if the receiver changed.
    pub fn or_with(&mut self, other: &SymbolSet) -> bool {
        if self.blocks.len() < other.blocks.len() {
            self.blocks.resize(other.blocks.len(), 0);
        }
        let mut changed = false;
        for (block, &other_block) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            let merged = *block | other_block;
            changed = changed || merged != *block;
            *block = merged;
        }
        changed
    }

    /// `self |= other \ mask`.  Returns `true` if the receiver changed.
    pub fn or_with_masked(&mut self, other: &SymbolSet, mask: &SymbolSet) -> bool {
        if self.blocks.len() < other.blocks.len() {
            self.blocks.resize(other.blocks.len(), 0);
        }
        let mut changed = false;
        for (i, (block, &other_block)) in
            self.blocks.iter_mut().zip(other.blocks.iter()).enumerate()
        {
            let mask_block = mask.blocks.get(i).copied().unwrap_or(0);
            let merged = *block | (other_block & !mask_block);
            changed = changed || merged != *block;
            *block = merged;
        }
        changed
    }

    /// Member codes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Sym> + '_ {
        self.blocks.iter().enumerate().flat_map(|(i, &block)| {
            (0..BLOCK_BITS).filter_map(move |bit| {
                if block >> bit & 1 == 1 {
                    Some(i * BLOCK_BITS + bit)
                } else {
                    None
                }
            })
        })
    }
}

impl BitOrAssign<&SymbolSet> for SymbolSet {
    fn bitor_assign(&mut self, other: &SymbolSet) {
        self.or_with(other);
    }
}

impl FromIterator<Sym> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = Sym>>(iter: I) -> Self {
        let mut set = SymbolSet::new();
        for sym in iter {
            set.insert(sym);
        }
        set
    }
}
