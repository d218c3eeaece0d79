// src/data_formats/literal.rs
//
// Restricted parser for the Python literal subset found in `.npy` headers.
// Only literals are accepted; there is no name lookup, call, or operator.

use super::npy::NpyError;

/// One parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
    None,
    Tuple(Vec<Literal>),
    List(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Look up a string key in a dict literal.
    pub fn get(&self, key: &str) -> Option<&Literal> {
        match self {
            Literal::Dict(entries) => entries.iter().find_map(|(k, v)| match k {
                Literal::Str(s) if s == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }
}

/// Parse a complete literal; trailing non-whitespace is an error.
pub fn parse_literal(text: &str) -> Result<Literal, NpyError> {
    let mut parser = Parser {
        src: text.as_bytes(),
        pos: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(parser.error("trailing characters after literal"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, what: &str) -> NpyError {
        NpyError::InvalidFormat(format!("header literal: {what} at byte {}", self.pos))
    }

    fn skip_ws(&mut self) {
        while let Some(b) = self.src.get(self.pos) {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.src.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), NpyError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn value(&mut self) -> Result<Literal, NpyError> {
        match self.peek() {
            Some(b'{') => self.dict(),
            Some(b'(') => self.sequence(b')').map(Literal::Tuple),
            Some(b'[') => self.sequence(b']').map(Literal::List),
            Some(q @ (b'\'' | b'"')) => self.string(q).map(Literal::Str),
            Some(b'-' | b'+' | b'0'..=b'9') => self.int(),
            Some(b) if b.is_ascii_alphabetic() => self.keyword(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn dict(&mut self) -> Result<Literal, NpyError> {
        self.expect(b'{')?;
        let mut entries = Vec::new();
        loop {
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Literal::Dict(entries));
            }
            let key = self.value()?;
            self.expect(b':')?;
            let value = self.value()?;
            entries.push((key, value));
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(self.error("expected ',' or '}' in dict")),
            }
        }
    }

    // Shared by tuples and lists. `(3)` is a parenthesized int in Python,
    // not a tuple, so a single element without a trailing comma unwraps.
    fn sequence(&mut self, close: u8) -> Result<Vec<Literal>, NpyError> {
        self.pos += 1;
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }
            items.push(self.value()?);
            trailing_comma = false;
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    trailing_comma = true;
                }
                Some(b) if b == close => {}
                _ => return Err(self.error("expected ',' or closing bracket")),
            }
        }
        if close == b')' && items.len() == 1 && !trailing_comma {
            return Err(self.error("parenthesized expression is not a tuple"));
        }
        Ok(items)
    }

    fn string(&mut self, quote: u8) -> Result<String, NpyError> {
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            let Some(&b) = self.src.get(self.pos) else {
                return Err(self.error("unterminated string"));
            };
            self.pos += 1;
            match b {
                b'\\' => {
                    let Some(&esc) = self.src.get(self.pos) else {
                        return Err(self.error("unterminated escape"));
                    };
                    self.pos += 1;
                    out.push(match esc {
                        b'n' => b'\n',
                        b't' => b'\t',
                        b'r' => b'\r',
                        b'0' => 0,
                        b'\\' | b'\'' | b'"' => esc,
                        _ => return Err(self.error("unsupported escape")),
                    });
                }
                b'\n' => return Err(self.error("newline in string")),
                _ if b == quote => break,
                _ => out.push(b),
            }
        }
        String::from_utf8(out).map_err(|_| self.error("string is not valid UTF-8"))
    }

    fn int(&mut self) -> Result<Literal, NpyError> {
        let start = self.pos;
        if matches!(self.src.get(self.pos), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let digits = self.pos;
        while matches!(self.src.get(self.pos), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.pos == digits {
            return Err(self.error("expected digits"));
        }
        // Python 2 era headers may carry a long suffix: `(10L, 3L)`
        let end = self.pos;
        if matches!(self.src.get(self.pos), Some(b'L' | b'l')) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.src[start..end])
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Literal::Int)
            .ok_or_else(|| self.error("integer out of range"))
    }

    fn keyword(&mut self) -> Result<Literal, NpyError> {
        let start = self.pos;
        while matches!(self.src.get(self.pos), Some(b) if b.is_ascii_alphanumeric() || *b == b'_')
        {
            self.pos += 1;
        }
        match &self.src[start..self.pos] {
            b"True" => Ok(Literal::Bool(true)),
            b"False" => Ok(Literal::Bool(false)),
            b"None" => Ok(Literal::None),
            _ => {
                self.pos = start;
                Err(self.error("only True, False and None are allowed as names"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numpy_header_dict() {
        let lit = parse_literal("{'descr': '<f8', 'fortran_order': False, 'shape': (3, 4), }    \n")
            .unwrap();
        assert_eq!(lit.get("descr"), Some(&Literal::Str("<f8".into())));
        assert_eq!(lit.get("fortran_order"), Some(&Literal::Bool(false)));
        assert_eq!(
            lit.get("shape"),
            Some(&Literal::Tuple(vec![Literal::Int(3), Literal::Int(4)]))
        );
    }

    #[test]
    fn one_and_zero_element_tuples() {
        assert_eq!(
            parse_literal("(7,)").unwrap(),
            Literal::Tuple(vec![Literal::Int(7)])
        );
        assert_eq!(parse_literal("()").unwrap(), Literal::Tuple(vec![]));
        assert!(parse_literal("(7)").is_err());
    }

    #[test]
    fn structured_descr_is_a_list() {
        let lit = parse_literal("[('x', '<i4'), (\"y\", '<f8')]").unwrap();
        match lit {
            Literal::List(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_expressions() {
        assert!(parse_literal("__import__('os')").is_err());
        assert!(parse_literal("{'shape': (1+2,)}").is_err());
        assert!(parse_literal("{'a': 1} extra").is_err());
        assert!(parse_literal("'unterminated").is_err());
    }

    #[test]
    fn long_suffix_and_signs() {
        assert_eq!(
            parse_literal("(10L, -3)").unwrap(),
            Literal::Tuple(vec![Literal::Int(10), Literal::Int(-3)])
        );
    }
}
