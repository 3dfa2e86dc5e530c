//! CQL query normalization
//!
//! Users and assistants hand us anything from valid CQL to a couple of loose
//! keywords. [`normalize_query`] repairs the common mistakes before the query
//! reaches the search endpoint:
//!
//! 1. `field = <reserved word>` gets the value quoted (`space = IN` → `space="IN"`).
//! 2. Unstructured free text becomes a conjunction of `text~"<term>"` clauses.
//!
//! The rewrite works on tokens rather than raw text, so words inside quoted
//! literals are never touched. Normalization is idempotent and input that
//! matches no rule comes back byte-for-byte.

/// Words CQL treats as keywords; unquoted on the right of `=` they break parsing
pub const RESERVED_WORDS: [&str; 12] = [
    "AND", "OR", "NOT", "IN", "LIKE", "IS", "NULL", "EMPTY", "ORDER", "BY", "ASC", "DESC",
];

const CONNECTIVES: [&str; 3] = ["AND", "OR", "NOT"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Whitespace(&'a str),
    Word(&'a str),
    /// Quoted literal; `inner` is kept exactly as written, escapes included
    Quoted {
        quote: char,
        inner: &'a str,
        closed: bool,
    },
    /// `=`, `!=`, `~` or `!~`
    Operator(&'a str),
    LParen,
    RParen,
}

impl Token<'_> {
    fn render(&self, out: &mut String) {
        match self {
            Token::Whitespace(s) | Token::Word(s) | Token::Operator(s) => out.push_str(s),
            Token::Quoted {
                quote,
                inner,
                closed,
            } => {
                out.push(*quote);
                out.push_str(inner);
                if *closed {
                    out.push(*quote);
                }
            }
            Token::LParen => out.push('('),
            Token::RParen => out.push(')'),
        }
    }
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];
        let Some(c) = rest.chars().next() else { break };

        if c.is_whitespace() {
            let len = rest
                .find(|ch: char| !ch.is_whitespace())
                .unwrap_or(rest.len());
            tokens.push(Token::Whitespace(&rest[..len]));
            pos += len;
        } else if c == '"' || c == '\'' {
            let (inner, closed) = scan_quoted(&rest[1..], c);
            tokens.push(Token::Quoted {
                quote: c,
                inner,
                closed,
            });
            pos += 1 + inner.len() + usize::from(closed);
        } else if c == '(' {
            tokens.push(Token::LParen);
            pos += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            pos += 1;
        } else if c == '=' || c == '~' {
            tokens.push(Token::Operator(&rest[..1]));
            pos += 1;
        } else if c == '!' && matches!(bytes.get(pos + 1), Some(b'=') | Some(b'~')) {
            tokens.push(Token::Operator(&rest[..2]));
            pos += 2;
        } else {
            let len = word_len(rest);
            tokens.push(Token::Word(&rest[..len]));
            pos += len;
        }
    }

    tokens
}

/// Length of the literal body after the opening quote, plus whether it closed
fn scan_quoted(body: &str, quote: char) -> (&str, bool) {
    let mut escaped = false;
    for (i, ch) in body.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return (&body[..i], true);
        }
    }
    (body, false)
}

fn word_len(rest: &str) -> usize {
    let mut chars = rest.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        let ends_word = ch.is_whitespace()
            || matches!(ch, '(' | ')' | '=' | '~')
            || (ch == '!' && matches!(chars.peek(), Some((_, '=')) | Some((_, '~'))));
        if ends_word && i > 0 {
            return i;
        }
    }
    rest.len()
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(word))
}

/// Quote reserved words used as bare values: `<identifier> = <reserved>`
fn quote_reserved_values(tokens: Vec<Token<'_>>) -> (Vec<Token<'_>>, bool) {
    let mut out = Vec::with_capacity(tokens.len());
    let mut rewrote = false;
    let mut i = 0;

    while i < tokens.len() {
        if let Some((ident, value, consumed)) = match_reserved_assignment(&tokens[i..]) {
            out.push(Token::Word(ident));
            out.push(Token::Operator("="));
            out.push(Token::Quoted {
                quote: '"',
                inner: value,
                closed: true,
            });
            rewrote = true;
            i += consumed;
        } else {
            out.push(tokens[i].clone());
            i += 1;
        }
    }

    (out, rewrote)
}

fn match_reserved_assignment<'a>(tokens: &[Token<'a>]) -> Option<(&'a str, &'a str, usize)> {
    let Some(Token::Word(ident)) = tokens.first() else {
        return None;
    };

    let mut iter = tokens
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, t)| !matches!(t, Token::Whitespace(_)));

    let (_, Token::Operator("=")) = iter.next()? else {
        return None;
    };
    let (value_idx, Token::Word(value)) = iter.next()? else {
        return None;
    };

    (is_identifier(ident) && is_reserved(value)).then_some((*ident, *value, value_idx + 1))
}

/// Free text: no connectives, no structure, at least two terms
fn looks_like_free_text(tokens: &[Token<'_>]) -> bool {
    let mut terms = 0;
    for token in tokens {
        match token {
            Token::Word(word) if CONNECTIVES.contains(word) => return false,
            Token::Operator(_) | Token::LParen | Token::RParen => return false,
            Token::Word(_) | Token::Quoted { .. } => terms += 1,
            Token::Whitespace(_) => {}
        }
    }
    terms >= 2
}

fn escape_literal(term: &str) -> String {
    term.replace('\\', "\\\\").replace('"', "\\\"")
}

fn free_text_to_cql(tokens: &[Token<'_>]) -> String {
    tokens
        .iter()
        .filter_map(|token| match token {
            Token::Word(word) => Some(format!("text~\"{}\"", escape_literal(word))),
            Token::Quoted {
                quote,
                inner,
                closed: true,
            } => Some(format!("text~{quote}{inner}{quote}")),
            // An unterminated phrase is re-quoted from scratch
            Token::Quoted {
                inner,
                closed: false,
                ..
            } => Some(format!("text~\"{}\"", escape_literal(inner))),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Normalize a raw search string into valid CQL
///
/// This is a pure function; `normalize_query(&normalize_query(q)) == normalize_query(q)`.
///
/// # Examples
///
/// ```
/// use confluence_mcp_core::cql::normalize_query;
///
/// assert_eq!(normalize_query("space = IN"), r#"space="IN""#);
/// assert_eq!(normalize_query("hello world"), r#"text~"hello" AND text~"world""#);
/// assert_eq!(normalize_query(r#"type=page AND text~"API""#), r#"type=page AND text~"API""#);
/// ```
pub fn normalize_query(raw: &str) -> String {
    let (tokens, rewrote) = quote_reserved_values(tokenize(raw));

    if !rewrote && looks_like_free_text(&tokens) {
        return free_text_to_cql(&tokens);
    }

    let mut out = String::with_capacity(raw.len() + 4);
    for token in &tokens {
        token.render(&mut out);
    }
    out
}

/// Restrict a CQL query to a single space
///
/// An empty query becomes a plain space filter.
pub fn scope_to_space(cql: &str, space_key: &str) -> String {
    let space_clause = format!("space=\"{}\"", escape_literal(space_key.trim()));
    let cql = cql.trim();

    if cql.is_empty() {
        space_clause
    } else {
        format!("{space_clause} AND ({cql})")
    }
}
