//! C++ tokenizer.
//!
//! Produces the token stream the scope scanner walks. Only what name
//! resolution needs is distinguished:
//!
//! - Comments and preprocessor lines are dropped entirely
//! - String and character literals (raw, prefixed, user-defined suffixes)
//!   become single [`TokenKind::Literal`] tokens
//! - `::` is its own kind since it glues qualified names together
//! - `>>` is always lexed as two `>` tokens so template argument lists
//!   close correctly; shifts are never interesting for lookup
//!
//! Offsets are byte offsets into the original text and always fall on
//! `char` boundaries.

use nsfix_core::patch::Span;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Keyword,
    /// `::`
    Scope,
    Punct,
    Number,
    Literal,
}

/// One token, borrowing its text from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'s> {
    pub kind: TokenKind,
    pub text: &'s str,
    pub start: usize,
    pub end: usize,
}

impl Token<'_> {
    pub fn span(&self) -> Span {
        Span::new(self.start as u64, self.end as u64)
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == text
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }
}

const KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
    "case", "catch", "char", "char8_t", "char16_t", "char32_t", "class", "compl", "concept",
    "const", "consteval", "constexpr", "constinit", "const_cast", "continue", "co_await",
    "co_return", "co_yield", "decltype", "default", "delete", "do", "double", "dynamic_cast",
    "else", "enum", "explicit", "export", "extern", "false", "final", "float", "for", "friend",
    "goto", "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not",
    "not_eq", "nullptr", "operator", "or", "or_eq", "override", "private", "protected",
    "public", "register", "reinterpret_cast", "requires", "return", "short", "signed",
    "sizeof", "static", "static_assert", "static_cast", "struct", "switch", "template", "this",
    "thread_local", "throw", "true", "try", "typedef", "typeid", "typename", "union",
    "unsigned", "using", "virtual", "void", "volatile", "wchar_t", "while", "xor", "xor_eq",
];

/// Builtin type keywords; a declarator may follow them directly.
pub const TYPE_KEYWORDS: &[&str] = &[
    "auto", "bool", "char", "char8_t", "char16_t", "char32_t", "double", "float", "int", "long",
    "short", "signed", "unsigned", "void", "wchar_t",
];

/// Multi-character punctuators, longest first. `>>` and `>>=` are absent
/// on purpose: see the module docs.
const PUNCTUATORS: &[&str] = &[
    "<=>", "<<=", "...", "->*", "->", "<<", "<=", ">=", "==", "!=", "&&", "||", "++", "--",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", ".*", "##",
];

const RAW_PREFIXES: &[&str] = &["R", "u8R", "uR", "UR", "LR"];
const ENCODING_PREFIXES: &[&str] = &["u8", "u", "U", "L"];

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

/// Tokenize `source`.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    Lexer::new(source).run()
}

struct Lexer<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    /// Only whitespace seen since the last newline.
    at_line_start: bool,
    tokens: Vec<Token<'s>>,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token<'s>> {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b == b'\n' {
                self.at_line_start = true;
                self.pos += 1;
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if self.starts_with("//") {
                self.skip_line_comment();
            } else if self.starts_with("/*") {
                self.skip_block_comment();
            } else if b == b'#' && self.at_line_start {
                self.skip_directive();
            } else {
                self.at_line_start = false;
                self.token();
            }
        }
        self.tokens
    }

    fn starts_with(&self, text: &str) -> bool {
        self.bytes[self.pos..].starts_with(text.as_bytes())
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            text: &self.source[start..self.pos],
            start,
            end: self.pos,
        });
    }

    fn skip_line_comment(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos = self.source[self.pos + 2..]
            .find("*/")
            .map_or(self.bytes.len(), |i| self.pos + 2 + i + 2);
    }

    /// Skip a preprocessor line, following `\` continuations.
    fn skip_directive(&mut self) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\n' => {
                    if self.continued_line() {
                        self.pos += 1;
                    } else {
                        return;
                    }
                }
                b'/' if self.starts_with("/*") => self.skip_block_comment(),
                b'/' if self.starts_with("//") => self.skip_line_comment(),
                _ => self.pos += 1,
            }
        }
    }

    /// True if the newline at `pos` is escaped by a trailing backslash.
    fn continued_line(&self) -> bool {
        let line = &self.bytes[..self.pos];
        let trimmed = line
            .iter()
            .rposition(|b| *b != b'\r' && *b != b' ' && *b != b'\t');
        trimmed.is_some_and(|i| line[i] == b'\\')
    }

    fn token(&mut self) {
        let start = self.pos;
        let b = self.bytes[self.pos];
        if is_ident_start(b) {
            self.identifier(start);
        } else if b.is_ascii_digit() || (b == b'.' && self.peek(1).is_some_and(|c| c.is_ascii_digit())) {
            self.number(start);
        } else if b == b'"' {
            self.quoted(b'"');
            self.suffix();
            self.push(TokenKind::Literal, start);
        } else if b == b'\'' {
            self.quoted(b'\'');
            self.suffix();
            self.push(TokenKind::Literal, start);
        } else if self.starts_with("::") {
            self.pos += 2;
            self.push(TokenKind::Scope, start);
        } else {
            self.punct(start);
        }
    }

    fn identifier(&mut self, start: usize) {
        while self.pos < self.bytes.len() && is_ident_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
        let source = self.source;
        let text = &source[start..self.pos];
        match self.peek(0) {
            Some(b'"') if RAW_PREFIXES.contains(&text) => {
                self.raw_string();
                self.suffix();
                self.push(TokenKind::Literal, start);
            }
            Some(quote @ (b'"' | b'\'')) if ENCODING_PREFIXES.contains(&text) => {
                self.quoted(quote);
                self.suffix();
                self.push(TokenKind::Literal, start);
            }
            _ if is_keyword(text) => self.push(TokenKind::Keyword, start),
            _ => self.push(TokenKind::Ident, start),
        }
    }

    fn number(&mut self, start: usize) {
        while let Some(b) = self.peek(0) {
            let exponent = matches!(b, b'+' | b'-')
                && matches!(self.bytes[self.pos - 1], b'e' | b'E' | b'p' | b'P');
            let separator = b == b'\'' && self.peek(1).is_some_and(|c| c.is_ascii_alphanumeric());
            if is_ident_continue(b) || b == b'.' || exponent || separator {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start);
    }

    /// Consume a quoted literal starting at the opening quote. An
    /// unterminated literal ends at the line end.
    fn quoted(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' => self.pos = (self.pos + 2).min(self.bytes.len()),
                b'\n' => return,
                _ if b == quote => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    /// Consume `"delim( ... )delim"` starting at the opening quote.
    fn raw_string(&mut self) {
        let open = self.pos + 1;
        let Some(paren) = self.source[open..].find('(') else {
            self.quoted(b'"');
            return;
        };
        let delimiter = &self.source[open..open + paren];
        let terminator = format!("){delimiter}\"");
        let body = open + paren + 1;
        self.pos = self.source[body..]
            .find(&terminator)
            .map_or(self.bytes.len(), |i| body + i + terminator.len());
    }

    /// User-defined literal suffix such as `_km` or `s`.
    fn suffix(&mut self) {
        while self.pos < self.bytes.len() && is_ident_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
    }

    fn punct(&mut self, start: usize) {
        let len = PUNCTUATORS
            .iter()
            .find(|p| self.starts_with(p))
            .map_or_else(
                || self.source[start..].chars().next().map_or(1, char::len_utf8),
                |p| p.len(),
            );
        self.pos += len;
        self.push(TokenKind::Punct, start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<&str> {
        tokenize(source).iter().map(|t| t.text).collect()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn qualified_names() {
        assert_eq!(texts("std::chrono::seconds x;"), vec!["std", "::", "chrono", "::", "seconds", "x", ";"]);
        assert_eq!(
            kinds("::std::string"),
            vec![TokenKind::Scope, TokenKind::Ident, TokenKind::Scope, TokenKind::Ident]
        );
    }

    #[test]
    fn keywords_are_distinguished() {
        let toks = tokenize("using namespace std;");
        assert!(toks[0].is_keyword("using"));
        assert!(toks[1].is_keyword("namespace"));
        assert!(toks[2].is_ident());
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(texts("a // b\n/* c\n d */ e"), vec!["a", "e"]);
    }

    #[test]
    fn preprocessor_lines_are_dropped() {
        let src = "#include <string>\n#define X(a) \\\n  a + 1\nint y;\n  # pragma once\nz";
        assert_eq!(texts(src), vec!["int", "y", ";", "z"]);
    }

    #[test]
    fn hash_inside_a_line_is_punctuation() {
        assert_eq!(texts("a # b"), vec!["a", "#", "b"]);
    }

    #[test]
    fn string_literals_are_single_tokens() {
        assert_eq!(texts(r#"f("a \" std::x", 'c');"#), vec!["f", "(", r#""a \" std::x""#, ",", "'c'", ")", ";"]);
        assert_eq!(texts(r#"u8"x" L'y'"#), vec![r#"u8"x""#, "L'y'"]);
    }

    #[test]
    fn raw_strings_and_suffixes() {
        let src = "auto s = R\"d(x)\" y)d\"s; auto t = 10ms;";
        let toks = texts(src);
        assert_eq!(toks[3], "R\"d(x)\" y)d\"s");
        assert!(toks.contains(&"10ms"));
    }

    #[test]
    fn closing_angles_are_split() {
        assert_eq!(texts("a<b<c>> d"), vec!["a", "<", "b", "<", "c", ">", ">", "d"]);
        assert_eq!(texts("x << y"), vec!["x", "<<", "y"]);
    }

    #[test]
    fn numbers_with_separators_and_exponents() {
        assert_eq!(texts("1'000 + 1e-3 + .5f"), vec!["1'000", "+", "1e-3", "+", ".5f"]);
    }

    #[test]
    fn spans_are_byte_offsets() {
        let toks = tokenize("  foo");
        assert_eq!(toks[0].span(), Span::new(2, 5));
    }

    #[test]
    fn non_ascii_identifiers_keep_char_boundaries() {
        let src = "int größe = 1;";
        let toks = tokenize(src);
        assert_eq!(toks[1].text, "größe");
        assert_eq!(&src[toks[1].start..toks[1].end], "größe");
    }
}
