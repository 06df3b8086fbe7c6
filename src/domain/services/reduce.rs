//! Arithmetic reduction of expanded formula text
//!
//! Formula expansion is substitution-only; turning the substituted text
//! into a number is this deliberately separate step. The grammar is the
//! minimum the expansion output needs: numbers, `+ - * /`, unary minus
//! and parentheses.

/// Error types for expression reduction
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ReduceError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("expression ended unexpectedly")]
    UnexpectedEnd,

    #[error("trailing input at position {pos}")]
    TrailingInput { pos: usize },

    #[error("division by zero")]
    DivisionByZero,
}

/// Reduce an arithmetic expression to a single value.
pub fn reduce(text: &str) -> Result<f64, ReduceError> {
    let mut parser = Parser {
        chars: text.char_indices().collect(),
        pos: 0,
    };
    let value = parser.expression()?;
    parser.skip_whitespace();
    match parser.peek() {
        Some((pos, _)) => Err(ReduceError::TrailingInput { pos }),
        None => Ok(value),
    }
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<(usize, char)> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.peek();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some((_, ch)) if ch.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expression(&mut self) -> Result<f64, ReduceError> {
        let mut value = self.term()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some((_, '+')) => {
                    self.bump();
                    value += self.term()?;
                }
                Some((_, '-')) => {
                    self.bump();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, ReduceError> {
        let mut value = self.factor()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some((_, '*')) => {
                    self.bump();
                    value *= self.factor()?;
                }
                Some((_, '/')) => {
                    self.bump();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(ReduceError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, ReduceError> {
        self.skip_whitespace();
        match self.peek() {
            Some((_, '-')) => {
                self.bump();
                Ok(-self.factor()?)
            }
            Some((_, '(')) => {
                self.bump();
                let value = self.expression()?;
                self.skip_whitespace();
                match self.bump() {
                    Some((_, ')')) => Ok(value),
                    Some((pos, ch)) => Err(ReduceError::UnexpectedChar { pos, ch }),
                    None => Err(ReduceError::UnexpectedEnd),
                }
            }
            Some((_, ch)) if ch.is_ascii_digit() => self.number(),
            Some((pos, ch)) => Err(ReduceError::UnexpectedChar { pos, ch }),
            None => Err(ReduceError::UnexpectedEnd),
        }
    }

    fn number(&mut self) -> Result<f64, ReduceError> {
        let start = self.pos;
        while matches!(self.peek(), Some((_, ch)) if ch.is_ascii_digit()) {
            self.pos += 1;
        }
        if matches!(self.peek(), Some((_, '.'))) {
            self.pos += 1;
            while matches!(self.peek(), Some((_, ch)) if ch.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().map(|(_, ch)| ch).collect();
        // only digits and at most one dot can reach here
        Ok(text.parse().expect("scanned a valid number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(reduce("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(reduce("(1 + 2) * 3").unwrap(), 9.0);
    }

    #[test]
    fn test_expanded_formula_shape() {
        // the shape expansion produces: parenthesized substituted values
        assert_eq!(reduce("1 + (4) * 5").unwrap(), 21.0);
        assert_eq!(reduce("(0.6) * 10").unwrap(), 6.0);
        assert_eq!(reduce("((4) + 2) * 2").unwrap(), 12.0);
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(reduce("-3 + 5").unwrap(), 2.0);
        assert_eq!(reduce("2 * -(1 + 1)").unwrap(), -4.0);
    }

    #[test]
    fn test_division() {
        assert_eq!(reduce("10 / 4").unwrap(), 2.5);
        assert_eq!(reduce("1 / 0").unwrap_err(), ReduceError::DivisionByZero);
    }

    #[test]
    fn test_malformed_input_reports_position() {
        assert_eq!(
            reduce("1 + x").unwrap_err(),
            ReduceError::UnexpectedChar { pos: 4, ch: 'x' }
        );
        assert_eq!(reduce("1 +").unwrap_err(), ReduceError::UnexpectedEnd);
        assert_eq!(
            reduce("1 2").unwrap_err(),
            ReduceError::TrailingInput { pos: 2 }
        );
        assert_eq!(reduce("(1").unwrap_err(), ReduceError::UnexpectedEnd);
    }
}
