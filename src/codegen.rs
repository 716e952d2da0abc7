// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

//! Emission of the generated parser: a single C function made of one
//! labelled block per state with a nested token switch, one labelled block
//! per reduction, and a frequency optimized goto switch per non-terminal.
//! The output targets the runtime helper interface of `xg-c-parser.h`.

use std::io::{self, Write};

use crate::grammar::Grammar;
use crate::lr0::Lr0Dfa;
use crate::symbol::{EPSILON, TOKEN_LITERAL_MAX};

/// Destination frequency record for default case synthesis.
struct Freq {
    dst: usize,
    count: usize,
}

fn bump(freqs: &mut Vec<Freq>, dst: usize) {
    for freq in freqs.iter_mut() {
        if freq.dst == dst {
            freq.count += 1;
            return;
        }
    }
    freqs.push(Freq { dst, count: 1 });
}

/// The destination with the highest frequency; ties break toward the first
/// encountered.
fn most_frequent(freqs: &[Freq]) -> usize {
    let mut best: Option<&Freq> = None;
    for freq in freqs.iter() {
        match best {
            Some(b) if freq.count <= b.count => (),
            _ => best = Some(freq),
        }
    }
    best.expect("at least one destination").dst
}

fn c_escape(string: &str) -> String {
    let mut escaped = String::with_capacity(string.len());
    for ch in string.chars() {
        match ch {
            '"' => escaped += "\\\"",
            '\\' => escaped += "\\\\",
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// A `#define`-able spelling of a named terminal.
fn token_constant_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn write_preamble<W: Write>(out: &mut W, grammar: &Grammar) -> io::Result<()> {
    writeln!(out, "#include <xg-c-parser.h>")?;
    writeln!(out)?;

    // Named terminals get compile time constants for the user's lexer.
    let mut any = false;
    for code in TOKEN_LITERAL_MAX + 1..grammar.symbol_count() {
        if !grammar.is_terminal(code) {
            continue;
        }
        let def = grammar.symbol(code).expect("named symbols are defined");
        let name = def.name().expect("named symbols have names");
        writeln!(out, "#define XG_TK_{} {}", token_constant_name(name), code)?;
        any = true;
    }
    if any {
        writeln!(out)?;
    }

    writeln!(out, "#ifndef NDEBUG")?;
    writeln!(out, "static const char *xg__symbol_name [] =")?;
    writeln!(out, "{{")?;
    for code in TOKEN_LITERAL_MAX + 1..grammar.symbol_count() {
        writeln!(out, "  \"{}\",", c_escape(&grammar.symbol_name(code)))?;
    }
    writeln!(out, "  0")?;
    writeln!(out, "}};")?;
    writeln!(out)?;
    writeln!(out, "static const char *xg__prod [] =")?;
    writeln!(out, "{{")?;
    for ident in 0..grammar.production_count() {
        writeln!(out, "  \"{}\",", c_escape(&grammar.format_production(ident)))?;
    }
    writeln!(out, "  0")?;
    writeln!(out, "}};")?;
    writeln!(out, "#endif /* NDEBUG */")?;
    writeln!(out)
}

fn write_state<W: Write>(
    out: &mut W,
    grammar: &Grammar,
    dfa: &Lr0Dfa,
    stateno: usize,
) -> io::Result<()> {
    let state = &dfa.states[stateno];

    // Only states entered by a terminal perform a shift; states entered by
    // non-terminals just need a label the goto switches can jump to.
    if state.accessing_sym != EPSILON && grammar.is_terminal(state.accessing_sym) {
        writeln!(out, "shift_{}:", stateno)?;
        writeln!(out, "  XG__SHIFT;")?;
    } else {
        writeln!(out, "push_{}:", stateno)?;
    }
    writeln!(out, "  XG__PUSH ({});", stateno)?;
    writeln!(out)?;

    writeln!(out, "  switch (token)")?;
    writeln!(out, "    {{")?;

    for &id in state.transitions.iter() {
        let transition = &dfa.transitions[id];
        if grammar.is_terminal(transition.sym) {
            writeln!(out, "    case {}:", transition.sym)?;
            writeln!(out, "      goto shift_{};", transition.dst)?;
        }
    }

    if state.reductions.len() > 1 {
        // The most frequent reduction becomes the default; the others get
        // an explicit case per lookahead.
        let mut freqs = vec![];
        for reduction in state.reductions.iter() {
            for _ in reduction.la.iter() {
                bump(&mut freqs, reduction.prod);
            }
        }
        let default_prod = most_frequent(&freqs);
        writeln!(out, "    default:")?;
        writeln!(out, "      goto reduce_{};", default_prod)?;
        for reduction in state.reductions.iter() {
            if reduction.prod == default_prod {
                continue;
            }
            for sym in reduction.la.iter() {
                writeln!(out, "    case {}:", sym)?;
                writeln!(out, "      goto reduce_{};", reduction.prod)?;
            }
        }
    } else if state.reductions.len() == 1 {
        // A single reduction fires without checking lookaheads; an invalid
        // token is caught later, when it fails to shift.
        writeln!(out, "    default:")?;
        writeln!(out, "      goto reduce_{};", state.reductions[0].prod)?;
    } else if state.accept {
        writeln!(out, "    default:")?;
        writeln!(out, "      goto accept;")?;
    } else {
        writeln!(out, "    default:")?;
        writeln!(out, "      goto parse_error;")?;
    }

    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out)
}

fn write_reductions<W: Write>(out: &mut W, grammar: &Grammar) -> io::Result<()> {
    // Reduction by production 0 is an accept and is handled elsewhere.
    for ident in 1..grammar.production_count() {
        let production = grammar.production(ident);
        writeln!(out, "reduce_{}:", ident)?;
        writeln!(out, "  XG__REDUCE ({}, {});", ident, production.len())?;
        writeln!(out, "  goto symbol_{};", production.lhs)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_goto_switches<W: Write>(out: &mut W, grammar: &Grammar, dfa: &Lr0Dfa) -> io::Result<()> {
    for sym in TOKEN_LITERAL_MAX + 1..grammar.symbol_count() {
        if grammar.is_terminal(sym) || sym == grammar.start() {
            continue;
        }
        writeln!(out, "symbol_{}:", sym)?;
        writeln!(out, "  switch (state)")?;
        writeln!(out, "    {{")?;

        let mut freqs = vec![];
        for transition in dfa.transitions.iter() {
            if transition.sym == sym {
                bump(&mut freqs, transition.dst);
            }
        }
        if !freqs.is_empty() {
            let default_dst = most_frequent(&freqs);
            for transition in dfa.transitions.iter() {
                if transition.sym == sym && transition.dst != default_dst {
                    writeln!(out, "    case {}:", transition.src)?;
                    writeln!(out, "      goto push_{};", transition.dst)?;
                }
            }
            writeln!(out, "    default:")?;
            writeln!(out, "      goto push_{};", default_dst)?;
        }
        writeln!(out, "    }}")?;
        writeln!(out)?;
    }
    Ok(())
}

/// Write the complete parser source.  For a fixed grammar the output is a
/// pure function of the tables, so repeated runs are byte identical.
pub fn generate_c_parser<W: Write>(
    out: &mut W,
    grammar: &Grammar,
    dfa: &Lr0Dfa,
) -> io::Result<()> {
    write_preamble(out, grammar)?;

    writeln!(out, "int")?;
    writeln!(out, "xg_parse (xg_parse_ctx *ctx)")?;
    writeln!(out, "{{")?;
    writeln!(out, "  XG__PARSER_FUNCTION_START;")?;
    writeln!(out)?;

    for stateno in 0..dfa.states.len() {
        write_state(out, grammar, dfa, stateno)?;
    }
    write_reductions(out, grammar)?;
    write_goto_switches(out, grammar, dfa)?;

    writeln!(out, "internal_error:")?;
    writeln!(out, "  XG__PARSER_FUNCTION_END (-1);")?;
    writeln!(out)?;
    writeln!(out, "parse_error:")?;
    writeln!(out, "  XG__PARSER_FUNCTION_END (-1);")?;
    writeln!(out)?;
    writeln!(out, "accept:")?;
    writeln!(out, "  XG__PARSER_FUNCTION_END (0);")?;
    writeln!(out, "}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflicts::resolve_conflicts;
    use crate::lalr::make_lalr_reductions;
    use crate::log::MessageLog;
    use crate::symbol::{Sym, SymbolDef, SymbolKind};

    fn generated(text_free_grammar: fn() -> Grammar) -> (Grammar, Lr0Dfa, String) {
        let mut grammar = text_free_grammar();
        grammar.finalize().expect("grammar is not empty");
        grammar.compute_first();
        grammar.compute_follow();
        let mut dfa = Lr0Dfa::new(&grammar);
        make_lalr_reductions(&grammar, &mut dfa);
        let mut log = MessageLog::new("test");
        resolve_conflicts(&grammar, &mut dfa, &mut log);
        let mut out = vec![];
        generate_c_parser(&mut out, &grammar, &dfa).expect("writing to a vec cannot fail");
        let source = String::from_utf8(out).expect("generated source is UTF-8");
        (grammar, dfa, source)
    }

    // L -> L 'x' | 'x'
    fn left_recursive() -> Grammar {
        let mut grammar = Grammar::new();
        let mut def = SymbolDef::new(Some("L".to_string()));
        def.kind = SymbolKind::NonTerminal;
        let l = grammar.add_symbol(def);
        let prod = grammar.add_production(l);
        grammar.append_rhs_symbol(prod, l);
        grammar.append_rhs_symbol(prod, b'x' as Sym);
        let prod = grammar.add_production(l);
        grammar.append_rhs_symbol(prod, b'x' as Sym);
        grammar
    }

    #[test]
    fn frequency_ties_break_toward_the_first_destination() {
        let mut freqs = vec![];
        bump(&mut freqs, 7);
        bump(&mut freqs, 3);
        bump(&mut freqs, 3);
        bump(&mut freqs, 7);
        assert_eq!(most_frequent(&freqs), 7);
    }

    #[test]
    fn output_is_deterministic() {
        let (grammar, dfa, first) = generated(left_recursive);
        let mut again = vec![];
        generate_c_parser(&mut again, &grammar, &dfa).expect("writing to a vec cannot fail");
        assert_eq!(first.as_bytes(), again.as_slice());
    }

    #[test]
    fn emitted_labels_follow_the_accessing_symbol() {
        let (_, dfa, source) = generated(left_recursive);
        // The start state is pushed, never shifted into.
        assert!(source.contains("push_0:"));
        assert!(!source.contains("shift_0:"));
        for state in dfa.states.iter() {
            if state.accessing_sym != EPSILON && state.accessing_sym <= TOKEN_LITERAL_MAX {
                assert!(source.contains(&format!("shift_{}:", state.id)));
            }
        }
    }

    #[test]
    fn no_reduce_label_for_the_augmented_production() {
        let (_, _, source) = generated(left_recursive);
        assert!(!source.contains("reduce_0:"));
        assert!(source.contains("reduce_1:"));
        assert!(source.contains("reduce_2:"));
        assert!(source.contains("goto accept;"));
    }

    #[test]
    fn goto_switches_skip_the_augmented_start() {
        let (grammar, _, source) = generated(left_recursive);
        // L has a goto switch; <start> does not.
        assert!(source.contains("symbol_256:"));
        assert!(!source.contains(&format!("symbol_{}:", grammar.start())));
    }

    #[test]
    fn single_reductions_fire_as_the_default_case() {
        let (_, dfa, source) = generated(left_recursive);
        let reducing = dfa
            .states
            .iter()
            .find(|state| state.reductions.len() == 1)
            .expect("some state reduces");
        let label = format!("shift_{}:", reducing.id);
        let block_start = source.find(&label).expect("the state block exists");
        let block = &source[block_start..];
        let block_end = block.find("\n\n\n").expect("state blocks are separated");
        let block = &block[..block_end];
        assert!(block.contains(&format!(
            "    default:\n      goto reduce_{};",
            reducing.reductions[0].prod
        )));
    }

    #[test]
    fn debug_tables_are_guarded() {
        let (_, _, source) = generated(left_recursive);
        assert!(source.contains("#ifndef NDEBUG"));
        assert!(source.contains("xg__symbol_name"));
        assert!(source.contains("\"L -> L 'x'\""));
        assert!(source.contains("\"<start> -> L <eof>\""));
    }
}
