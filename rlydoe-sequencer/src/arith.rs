//! Integer arithmetic of `$(( ... ))` expansions.
//!
//! Supports `+ - * / %`, unary minus, parentheses, integer literals and
//! variable names with or without a leading `$`.

/// Evaluates `expr`, looking variables up with `lookup`.
pub(crate) fn eval(expr: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<i64, String> {
    let mut parser = Parser {
        chars: expr.chars().collect(),
        pos: 0,
        lookup,
    };
    let value = parser.expr()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(value),
        Some(c) => Err(format!("unexpected `{}`", c)),
    }
}

/// Why a checked division failed: a zero divisor or `i64::MIN / -1`.
fn division_error(rhs: i64) -> &'static str {
    if rhs == 0 {
        "division by zero"
    } else {
        "overflow"
    }
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<i64, String> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value = value.checked_add(self.term()?).ok_or("overflow")?;
            } else if self.eat('-') {
                value = value.checked_sub(self.term()?).ok_or("overflow")?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<i64, String> {
        let mut value = self.factor()?;
        loop {
            if self.eat('*') {
                value = value.checked_mul(self.factor()?).ok_or("overflow")?;
            } else if self.eat('/') {
                let rhs = self.factor()?;
                value = value.checked_div(rhs).ok_or(division_error(rhs))?;
            } else if self.eat('%') {
                let rhs = self.factor()?;
                value = value.checked_rem(rhs).ok_or(division_error(rhs))?;
            } else {
                return Ok(value);
            }
        }
    }

    fn factor(&mut self) -> Result<i64, String> {
        if self.eat('-') {
            return self.factor()?.checked_neg().ok_or_else(|| "overflow".into());
        }
        if self.eat('+') {
            return self.factor();
        }
        if self.eat('(') {
            let value = self.expr()?;
            if !self.eat(')') {
                return Err("missing `)`".into());
            }
            return Ok(value);
        }

        self.skip_ws();
        match self.peek() {
            Some(c) if c.is_ascii_digit() => {
                let digits = self.take_while(|c| c.is_ascii_digit());
                digits
                    .parse()
                    .map_err(|_| format!("number `{}` is too large", digits))
            }
            Some('$') => {
                self.pos += 1;
                let braced = self.eat('{');
                let name = self.name()?;
                if braced && !self.eat('}') {
                    return Err("missing `}`".into());
                }
                self.variable(&name)
            }
            Some(_) => {
                let name = self.name()?;
                self.variable(&name)
            }
            None => Err("unexpected end of expression".into()),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if pred(c)) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn name(&mut self) -> Result<String, String> {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                Ok(self.take_while(|c| c.is_ascii_alphanumeric() || c == '_'))
            }
            Some(c) => Err(format!("unexpected `{}`", c)),
            None => Err("unexpected end of expression".into()),
        }
    }

    fn variable(&self, name: &str) -> Result<i64, String> {
        let value = (self.lookup)(name).ok_or_else(|| format!("undefined variable `{}`", name))?;
        let value = value.trim();
        if value.is_empty() {
            return Ok(0);
        }
        value
            .parse()
            .map_err(|_| format!("`{}` is not an integer: `{}`", name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::eval;

    fn no_vars(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("40 * 1000000", &no_vars), Ok(40_000_000));
        assert_eq!(eval("2 + 3 * 4", &no_vars), Ok(14));
        assert_eq!(eval("(2 + 3) * 4", &no_vars), Ok(20));
        assert_eq!(eval("-3 + 10 % 4", &no_vars), Ok(-1));
        assert_eq!(eval("7 / 2", &no_vars), Ok(3));
    }

    #[test]
    fn test_variables() {
        let vars = |name: &str| match name {
            "STEPS" => Some("1000".to_string()),
            "SCALE" => Some("40".to_string()),
            "ENV" => Some("atari".to_string()),
            _ => None,
        };
        assert_eq!(eval("SCALE * $STEPS", &vars), Ok(40_000));
        assert_eq!(eval("${SCALE} + 1", &vars), Ok(41));
        assert!(eval("MISSING + 1", &vars).is_err());
        assert!(eval("ENV * 2", &vars).is_err());
    }

    #[test]
    fn test_errors() {
        assert!(eval("1 / 0", &no_vars).is_err());
        assert!(eval("(1 + 2", &no_vars).is_err());
        assert!(eval("1 +", &no_vars).is_err());
        assert!(eval("1 2", &no_vars).is_err());
        assert!(eval("9223372036854775807 + 1", &no_vars).is_err());
    }

    #[test]
    fn test_division_overflow() {
        let min = |name: &str| (name == "MIN").then(|| i64::MIN.to_string());
        assert_eq!(eval("MIN / -1", &min), Err("overflow".to_string()));
        assert_eq!(eval("MIN % -1", &min), Err("overflow".to_string()));
        assert_eq!(
            eval("(-9223372036854775807 - 1) / -1", &no_vars),
            Err("overflow".to_string())
        );
        assert_eq!(eval("MIN / 0", &min), Err("division by zero".to_string()));
        assert_eq!(eval("7 % 0", &no_vars), Err("division by zero".to_string()));
    }
}
