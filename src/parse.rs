// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

//! The grammar description front end: a hand written scanner and recursive
//! descent parser over the `name : alternative | ... ;` format, building the
//! grammar through the grammar store operations.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::grammar::Grammar;
use crate::symbol::{Associativity, Sym, SymbolDef, SymbolKind, EOF};

lazy_static! {
    static ref ALPHABETIC: Regex = Regex::new("[[:alpha:]]").expect("the pattern is well formed");
}

#[derive(Debug, Error)]
#[error("{file}:{line}: {kind}")]
pub struct ParseError {
    pub file: String,
    pub line: u32,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("end of file within a comment")]
    UnterminatedComment,
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("invalid token literal")]
    InvalidLiteral,
    #[error("invalid token \"{0}\"")]
    InvalidWord(String),
    #[error("invalid production definition -- expected {0}")]
    MalformedProduction(&'static str),
    #[error("invalid {0} directive")]
    MalformedDirective(&'static str),
    #[error("duplicate start symbol")]
    DuplicateStart,
    #[error("symbol \"{0}\" already declared as a terminal")]
    TerminalLeftHandSide(String),
    #[error("unknown precedence and associativity of {0}")]
    UnknownPrecedence(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Literal(Sym),
    Colon,
    Bar,
    Semicolon,
    Start,
    TokenDecl,
    Left,
    Right,
    NonAssoc,
    Prec,
    End,
}

struct Parser<'a> {
    file: String,
    text: &'a [u8],
    pos: usize,
    line: u32,
    token: Token,
    grammar: Grammar,
    names: BTreeMap<String, Sym>,
    /// Precedence level of the next `%left`/`%right`/`%nonassoc` directive;
    /// each one opens a strictly higher level.
    next_prec: u16,
}

/// Parse a grammar description.  The returned grammar is not finalized;
/// the pipeline augments it before analysis.
pub fn parse_grammar_text(text: &str, file: &str) -> Result<Grammar, ParseError> {
    let mut parser = Parser {
        file: file.to_string(),
        text: text.as_bytes(),
        pos: 0,
        line: 1,
        token: Token::End,
        grammar: Grammar::new(),
        names: BTreeMap::new(),
        next_prec: 1,
    };
    parser.next_token()?;
    while parser.token != Token::End {
        match parser.token {
            Token::Start => parser.parse_start_directive()?,
            Token::TokenDecl | Token::Left | Token::Right | Token::NonAssoc => {
                parser.parse_token_directive()?
            }
            _ => parser.parse_production()?,
        }
    }
    Ok(parser.grammar)
}

impl<'a> Parser<'a> {
    fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            file: self.file.clone(),
            line: self.line,
            kind,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek();
        if ch == Some(b'\n') {
            self.line += 1;
        }
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_comment(&mut self) -> Result<(), ParseError> {
        while let Some(ch) = self.advance() {
            if ch == b'*' && self.peek() == Some(b'/') {
                self.advance();
                return Ok(());
            }
        }
        Err(self.err(ParseErrorKind::UnterminatedComment))
    }

    fn scan_escape(&mut self) -> Result<u8, ParseError> {
        match self.advance() {
            Some(b'n') => Ok(b'\n'),
            Some(b'r') => Ok(b'\r'),
            Some(b't') => Ok(b'\t'),
            Some(b'\\') => Ok(b'\\'),
            _ => Err(self.err(ParseErrorKind::InvalidEscape)),
        }
    }

    /// A token literal: '<char>'.
    fn scan_literal(&mut self) -> Result<(), ParseError> {
        let ch = match self.advance() {
            Some(ch) => ch,
            None => return Err(self.err(ParseErrorKind::InvalidLiteral)),
        };
        let code = if ch == b'\\' { self.scan_escape()? } else { ch };
        if self.advance() != Some(b'\'') {
            return Err(self.err(ParseErrorKind::InvalidLiteral));
        }
        self.token = Token::Literal(code as Sym);
        Ok(())
    }

    /// A word: a whitespace delimited run that must contain at least one
    /// alphabetic character.  Words beginning with '%' may be directives.
    fn scan_word(&mut self, first: u8) -> Result<(), ParseError> {
        let mut bytes = vec![first];
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                break;
            }
            bytes.push(ch);
            self.advance();
        }
        let word = String::from_utf8_lossy(&bytes).into_owned();
        if word.starts_with('%') {
            let keyword = match word.as_str() {
                "%start" => Some(Token::Start),
                "%token" => Some(Token::TokenDecl),
                "%left" => Some(Token::Left),
                "%right" => Some(Token::Right),
                "%nonassoc" => Some(Token::NonAssoc),
                "%prec" => Some(Token::Prec),
                _ => None,
            };
            if let Some(token) = keyword {
                self.token = token;
                return Ok(());
            }
        }
        if !ALPHABETIC.is_match(&word) {
            return Err(self.err(ParseErrorKind::InvalidWord(word)));
        }
        self.token = Token::Word(word);
        Ok(())
    }

    fn next_token(&mut self) -> Result<(), ParseError> {
        loop {
            let ch = match self.advance() {
                None => {
                    self.token = Token::End;
                    return Ok(());
                }
                Some(ch) => ch,
            };
            if ch == b'/' && self.peek() == Some(b'*') {
                self.advance();
                self.skip_comment()?;
                continue;
            }
            if ch.is_ascii_whitespace() {
                continue;
            }
            return match ch {
                b':' => {
                    self.token = Token::Colon;
                    Ok(())
                }
                b'|' => {
                    self.token = Token::Bar;
                    Ok(())
                }
                b';' => {
                    self.token = Token::Semicolon;
                    Ok(())
                }
                b'\'' => self.scan_literal(),
                _ => self.scan_word(ch),
            };
        }
    }

    /// Find or create the named symbol.
    fn symbol_named(&mut self, name: &str) -> Sym {
        if let Some(&code) = self.names.get(name) {
            return code;
        }
        let code = self.grammar.add_symbol(SymbolDef::new(Some(name.to_string())));
        self.names.insert(name.to_string(), code);
        code
    }

    /// Find or create the definition of a literal token; its code is the
    /// character itself.
    fn symbol_literal(&mut self, code: Sym) -> Sym {
        if self.grammar.symbol(code).is_none() {
            let mut def = SymbolDef::new(None);
            def.kind = SymbolKind::ExplicitTerminal;
            self.grammar.set_symbol_at(code, def);
        }
        code
    }

    fn parse_start_directive(&mut self) -> Result<(), ParseError> {
        self.next_token()?;
        let name = match &self.token {
            Token::Word(word) => word.clone(),
            _ => return Err(self.err(ParseErrorKind::MalformedDirective("%start"))),
        };
        let sym = self.symbol_named(&name);
        if self.grammar.start() != EOF {
            return Err(self.err(ParseErrorKind::DuplicateStart));
        }
        self.grammar.set_start(sym);
        self.next_token()?;
        if self.token != Token::Semicolon {
            return Err(self.err(ParseErrorKind::MalformedDirective("%start")));
        }
        self.next_token()
    }

    fn parse_token_directive(&mut self) -> Result<(), ParseError> {
        let directive = self.token.clone();
        self.next_token()?;
        loop {
            let sym = match self.token.clone() {
                Token::Word(word) => self.symbol_named(&word),
                Token::Literal(code) => self.symbol_literal(code),
                _ => break,
            };
            let prec = self.next_prec;
            let def = self.grammar.def_mut(sym);
            def.kind = SymbolKind::ExplicitTerminal;
            match directive {
                Token::TokenDecl => {
                    def.prec = 0;
                    def.assoc = Associativity::NonAssoc;
                }
                Token::Left => {
                    def.prec = prec;
                    def.assoc = Associativity::Left;
                }
                Token::Right => {
                    def.prec = prec;
                    def.assoc = Associativity::Right;
                }
                Token::NonAssoc => {
                    def.prec = prec;
                    def.assoc = Associativity::NonAssoc;
                }
                _ => unreachable!("only token directives reach here"),
            }
            self.next_token()?;
        }
        if self.token != Token::Semicolon {
            return Err(self.err(ParseErrorKind::MalformedDirective("token")));
        }
        self.next_token()?;
        if directive != Token::TokenDecl {
            self.next_prec += 1;
        }
        Ok(())
    }

    fn parse_production(&mut self) -> Result<(), ParseError> {
        let name = match &self.token {
            Token::Word(word) => word.clone(),
            _ => return Err(self.err(ParseErrorKind::MalformedProduction("WORD"))),
        };
        let lhs = self.symbol_named(&name);
        if self.grammar.def(lhs).kind == SymbolKind::ExplicitTerminal {
            return Err(self.err(ParseErrorKind::TerminalLeftHandSide(name)));
        }
        self.grammar.def_mut(lhs).kind = SymbolKind::NonTerminal;
        self.next_token()?;
        if self.token != Token::Colon {
            return Err(self.err(ParseErrorKind::MalformedProduction(": (colon)")));
        }
        self.next_token()?;
        self.parse_alternative(lhs)?;
        while self.token == Token::Bar {
            self.next_token()?;
            self.parse_alternative(lhs)?;
        }
        if self.token != Token::Semicolon {
            return Err(self.err(ParseErrorKind::MalformedProduction("; (semicolon)")));
        }
        self.next_token()
    }

    fn parse_alternative(&mut self, lhs: Sym) -> Result<(), ParseError> {
        let prod = self.grammar.add_production(lhs);
        loop {
            let sym = match self.token.clone() {
                Token::Word(word) => self.symbol_named(&word),
                Token::Literal(code) => self.symbol_literal(code),
                _ => break,
            };
            self.grammar.append_rhs_symbol(prod, sym);
            self.next_token()?;
        }
        if self.token == Token::Prec {
            self.next_token()?;
            let (sym, display) = match self.token.clone() {
                Token::Word(word) => {
                    let sym = self.symbol_named(&word);
                    (sym, format!("\"{}\"", word))
                }
                Token::Literal(code) => {
                    let sym = self.symbol_literal(code);
                    (sym, format!("'{}'", code as u8 as char))
                }
                _ => return Err(self.err(ParseErrorKind::MalformedDirective("%prec"))),
            };
            if self.grammar.def(sym).assoc == Associativity::Unknown {
                return Err(self.err(ParseErrorKind::UnknownPrecedence(display)));
            }
            self.grammar.set_production_precedence_token(prod, sym);
            self.next_token()?;
        }
        Ok(())
    }
}
