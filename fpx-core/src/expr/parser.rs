//! Recursive-descent evaluator for `#if`/`#elif` constant expressions.
//!
//! Grammar (lowest to highest precedence), matching the full C-preprocessor
//! operator set:
//!
//! ```text
//! expression  := conditional
//! conditional := or ('?' expression ':' conditional)?
//! or          := and  ('||' and)*
//! and         := bor  ('&&' bor)*
//! bor         := bxor ('|'  bxor)*
//! bxor        := band ('^'  band)*
//! band        := eq   ('&'  eq)*
//! eq          := rel  (('=='|'!=') rel)*
//! rel         := shift (('<'|'>'|'<='|'>=') shift)*
//! shift       := add  (('<<'|'>>') add)*
//! add         := mul  (('+'|'-') mul)*
//! mul         := pow  (('*'|'/'|'%') pow)*
//! pow         := unary ('**' unary)*         // right-associative
//! unary       := ('!'|'-'|'+'|'~') unary | atom
//! atom        := number | identifier | defined-operand | '(' expression ')'
//! ```

use super::token::{tokenize, Token, TokenKind};
use crate::config::Config;
use crate::diag::Diagnostics;
use crate::expand::{expand_macros, expand_macros_within_continuation};
use crate::macros::MacroTable;

/// Result of evaluating an expression: whether it parsed cleanly, and its
/// final integer value (`0` on any error, per §4.4's error policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalResult {
    pub ok: bool,
    pub value: i64,
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    macros: &'a MacroTable,
    cfg: &'a Config,
    diag: &'a dyn Diagnostics,
    error: bool,
    /// Bounds recursion through [`Parser::eval_identifier`], which expands
    /// an identifier and recursively evaluates the result: a macro whose
    /// expansion textually contains its own name (distinct from F's
    /// cycle-graph case, since E re-enters evaluation rather than
    /// rescanning) would otherwise recurse without end.
    depth: usize,
}

/// Tokenizes and evaluates `expr`. Requires every token to be consumed;
/// extra trailing tokens are a (non-fatal) error that zeroes the result.
pub fn evaluate(expr: &str, macros: &MacroTable, cfg: &Config, diag: &dyn Diagnostics) -> EvalResult {
    evaluate_at_depth(expr, macros, cfg, diag, 0)
}

fn evaluate_at_depth(expr: &str, macros: &MacroTable, cfg: &Config, diag: &dyn Diagnostics, depth: usize) -> EvalResult {
    if depth >= cfg.max_recursion {
        if cfg.verbose {
            diag.warn("expression evaluation recursion limit reached");
        }
        return EvalResult { ok: false, value: 0 };
    }
    let (tokens, overflow) = tokenize(expr);
    if overflow && cfg.verbose {
        diag.warn("expression exceeded the maximum token count");
    }
    let mut parser = Parser { tokens: &tokens, pos: 0, macros, cfg, diag, error: false, depth };
    let value = parser.parse_expression();
    if parser.pos != parser.tokens.len() {
        if cfg.verbose {
            diag.warn(&format!("unexpected trailing tokens in expression: {expr}"));
        }
        parser.error = true;
    }
    if parser.error {
        EvalResult { ok: false, value: 0 }
    } else {
        EvalResult { ok: value != 0, value }
    }
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_value(&self) -> Option<&str> {
        self.peek().map(|t| t.value.as_str())
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn fail(&mut self, msg: &str) -> i64 {
        if self.cfg.verbose {
            self.diag.warn(msg);
        }
        self.error = true;
        0
    }

    fn eat_operator(&mut self, ops: &[&str]) -> Option<String> {
        if let Some(tok) = self.peek() {
            if tok.kind == TokenKind::Operator && ops.contains(&tok.value.as_str()) {
                let v = tok.value.clone();
                self.pos += 1;
                return Some(v);
            }
        }
        None
    }

    fn parse_expression(&mut self) -> i64 {
        self.parse_conditional()
    }

    fn parse_conditional(&mut self) -> i64 {
        let cond = self.parse_or();
        if self.eat_operator(&["?"]).is_some() {
            let then_val = self.parse_expression();
            if self.eat_operator(&[":"]).is_none() {
                return self.fail("expected ':' in conditional expression");
            }
            let else_val = self.parse_conditional();
            if cond != 0 {
                then_val
            } else {
                else_val
            }
        } else {
            cond
        }
    }

    fn parse_or(&mut self) -> i64 {
        let mut left = self.parse_and();
        while self.eat_operator(&["||"]).is_some() {
            let right = self.parse_and();
            left = i64::from(left != 0 || right != 0);
        }
        left
    }

    fn parse_and(&mut self) -> i64 {
        let mut left = self.parse_bor();
        while self.eat_operator(&["&&"]).is_some() {
            let right = self.parse_bor();
            left = i64::from(left != 0 && right != 0);
        }
        left
    }

    fn parse_bor(&mut self) -> i64 {
        let mut left = self.parse_bxor();
        while self.eat_operator(&["|"]).is_some() {
            left |= self.parse_bxor();
        }
        left
    }

    fn parse_bxor(&mut self) -> i64 {
        let mut left = self.parse_band();
        while self.eat_operator(&["^"]).is_some() {
            left ^= self.parse_band();
        }
        left
    }

    fn parse_band(&mut self) -> i64 {
        let mut left = self.parse_eq();
        while self.eat_operator(&["&"]).is_some() {
            left &= self.parse_eq();
        }
        left
    }

    fn parse_eq(&mut self) -> i64 {
        let mut left = self.parse_rel();
        loop {
            if self.eat_operator(&["=="]).is_some() {
                left = i64::from(left == self.parse_rel());
            } else if self.eat_operator(&["!="]).is_some() {
                left = i64::from(left != self.parse_rel());
            } else {
                break;
            }
        }
        left
    }

    fn parse_rel(&mut self) -> i64 {
        let mut left = self.parse_shift();
        loop {
            if self.eat_operator(&["<="]).is_some() {
                left = i64::from(left <= self.parse_shift());
            } else if self.eat_operator(&[">="]).is_some() {
                left = i64::from(left >= self.parse_shift());
            } else if self.eat_operator(&["<"]).is_some() {
                left = i64::from(left < self.parse_shift());
            } else if self.eat_operator(&[">"]).is_some() {
                left = i64::from(left > self.parse_shift());
            } else {
                break;
            }
        }
        left
    }

    fn parse_shift(&mut self) -> i64 {
        let mut left = self.parse_add();
        loop {
            if self.eat_operator(&["<<"]).is_some() {
                let rhs = self.parse_add();
                left = ((left as u64).wrapping_shl((rhs as u64 & 63) as u32)) as i64;
            } else if self.eat_operator(&[">>"]).is_some() {
                let rhs = self.parse_add();
                left = ((left as u64).wrapping_shr((rhs as u64 & 63) as u32)) as i64;
            } else {
                break;
            }
        }
        left
    }

    fn parse_add(&mut self) -> i64 {
        let mut left = self.parse_mul();
        loop {
            if self.eat_operator(&["+"]).is_some() {
                left = left.wrapping_add(self.parse_mul());
            } else if self.eat_operator(&["-"]).is_some() {
                left = left.wrapping_sub(self.parse_mul());
            } else {
                break;
            }
        }
        left
    }

    fn parse_mul(&mut self) -> i64 {
        let mut left = self.parse_pow();
        loop {
            if self.eat_operator(&["*"]).is_some() {
                left = left.wrapping_mul(self.parse_pow());
            } else if self.eat_operator(&["/"]).is_some() {
                let rhs = self.parse_pow();
                left = if rhs == 0 {
                    self.fail("division by zero in expression")
                } else {
                    left.wrapping_div(rhs)
                };
            } else if self.eat_operator(&["%"]).is_some() {
                let rhs = self.parse_pow();
                left = if rhs == 0 {
                    self.fail("modulo by zero in expression")
                } else {
                    left.wrapping_rem(rhs)
                };
            } else {
                break;
            }
        }
        left
    }

    /// Right-associative: recurses on the RHS rather than looping.
    fn parse_pow(&mut self) -> i64 {
        let base = self.parse_unary();
        if self.eat_operator(&["**"]).is_some() {
            let exponent = self.parse_pow();
            wrapping_pow(base, exponent)
        } else {
            base
        }
    }

    fn parse_unary(&mut self) -> i64 {
        if self.eat_operator(&["!"]).is_some() {
            return i64::from(self.parse_unary() == 0);
        }
        if self.eat_operator(&["-"]).is_some() {
            return self.parse_unary().wrapping_neg();
        }
        if self.eat_operator(&["+"]).is_some() {
            return self.parse_unary();
        }
        if self.eat_operator(&["~"]).is_some() {
            return !self.parse_unary();
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> i64 {
        let Some(tok) = self.peek().cloned() else {
            return self.fail("unexpected end of expression");
        };

        match tok.kind {
            TokenKind::Number => {
                self.pos += 1;
                parse_integer_literal(&tok.value)
            }
            TokenKind::DefinedOperand => {
                self.pos += 1;
                i64::from(self.macros.contains(&tok.value))
            }
            TokenKind::Identifier => {
                self.pos += 1;
                self.eval_identifier(&tok.value)
            }
            TokenKind::Parenthesis if tok.value == "(" => {
                self.pos += 1;
                let value = self.parse_expression();
                if self.eat_paren(")") {
                    value
                } else {
                    self.fail("missing closing ')' in expression")
                }
            }
            _ => {
                self.pos += 1;
                self.fail(&format!("unexpected token '{}' in expression", tok.value))
            }
        }
    }

    fn eat_paren(&mut self, value: &str) -> bool {
        if self.peek_value() == Some(value) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Macro-table identifiers are expanded (via F) and the expansion is
    /// re-evaluated as a fresh expression; an unknown identifier is 0, the
    /// C preprocessor convention. `Config::implicit_continuation` selects
    /// which F entry point performs the expansion: set, the identifier is
    /// treated as already inside a continuation (no next physical line to
    /// stitch a trailing `&` with), so F's line-level `&`/comment
    /// normalization is skipped.
    fn eval_identifier(&mut self, name: &str) -> i64 {
        if !self.macros.contains(name) {
            return 0;
        }
        let (expanded, _) = if self.cfg.implicit_continuation {
            expand_macros_within_continuation(name, self.macros, self.cfg, self.diag)
        } else {
            expand_macros(name, self.macros, self.cfg, self.diag)
        };
        if expanded.trim() == name {
            // Expansion made no progress (e.g. a cyclic macro); treat as
            // unknown rather than recursing forever.
            return 0;
        }
        let result = evaluate_at_depth(&expanded, self.macros, self.cfg, self.diag, self.depth + 1);
        if !result.ok && !is_single_literal(&expanded) {
            0
        } else {
            result.value
        }
    }
}

fn is_single_literal(s: &str) -> bool {
    let (tokens, _) = tokenize(s);
    tokens.len() == 1
}

fn parse_integer_literal(s: &str) -> i64 {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).unwrap_or(0)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).unwrap_or(0)
    } else if s.len() > 1 && s.starts_with('0') && s.bytes().all(|b| b.is_ascii_digit()) {
        i64::from_str_radix(s, 8).unwrap_or(0)
    } else {
        s.parse::<i64>().unwrap_or(0)
    }
}

fn wrapping_pow(base: i64, exponent: i64) -> i64 {
    if exponent < 0 {
        return 0;
    }
    let mut result: i64 = 1;
    let mut exp = exponent as u32;
    let mut b = base;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.wrapping_mul(b);
        }
        b = b.wrapping_mul(b);
        exp >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::NullDiagnostics;

    fn eval(expr: &str) -> EvalResult {
        let macros = MacroTable::new();
        evaluate(expr, &macros, &Config::default(), &NullDiagnostics)
    }

    #[test]
    fn single_literal() {
        let r = eval("7");
        assert_eq!(r, EvalResult { ok: true, value: 7 });
        let r0 = eval("0");
        assert_eq!(r0, EvalResult { ok: false, value: 0 });
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("1+2*3").value, 7);
        assert_eq!(eval("(1+2)*3").value, 9);
        assert_eq!(eval("2**3**2").value, 512);
    }

    #[test]
    fn defined_operator() {
        let mut macros = MacroTable::new();
        macros.add_object("X", "1");
        let cfg = Config::default();
        let r = evaluate("defined(X)", &macros, &cfg, &NullDiagnostics);
        assert_eq!(r.value, 1);
        let r2 = evaluate("!defined(X)", &macros, &cfg, &NullDiagnostics);
        assert_eq!(r2.value, 0);
        let r3 = evaluate("defined(Y)", &macros, &cfg, &NullDiagnostics);
        assert_eq!(r3.value, 0);
    }

    #[test]
    fn ternary_and_comparisons() {
        assert_eq!(eval("1 < 2 ? 10 : 20").value, 10);
        assert_eq!(eval("1 > 2 ? 10 : 20").value, 20);
    }

    #[test]
    fn logical_short_circuit_values() {
        assert_eq!(eval("0 && 1").value, 0);
        assert_eq!(eval("1 || 0").value, 1);
    }

    #[test]
    fn missing_paren_is_an_error() {
        let r = eval("(1+2");
        assert_eq!(r, EvalResult { ok: false, value: 0 });
    }

    #[test]
    fn trailing_tokens_are_an_error() {
        let r = eval("1 2");
        assert_eq!(r, EvalResult { ok: false, value: 0 });
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(eval("-7/2").value, -3);
        assert_eq!(eval("-7%2").value, -1);
    }

    #[test]
    fn identifier_expands_through_macro_table() {
        let mut macros = MacroTable::new();
        macros.add_object("FOO", "1+1");
        let r = evaluate("FOO", &macros, &Config::default(), &NullDiagnostics);
        assert_eq!(r.value, 2);
    }

    #[test]
    fn unknown_identifier_is_zero() {
        assert_eq!(eval("UNKNOWN").value, 0);
    }

    #[test]
    fn implicit_continuation_skips_line_level_ampersand_normalization() {
        let mut macros = MacroTable::new();
        macros.add_object("FOO", "5 &!extra");

        let default_cfg = Config::default();
        let r = evaluate("FOO", &macros, &default_cfg, &NullDiagnostics);
        assert_eq!(r.value, 0, "default config truncates at the lone '&'");

        let cfg = Config { implicit_continuation: true, ..Config::default() };
        let r = evaluate("FOO", &macros, &cfg, &NullDiagnostics);
        assert_eq!(r, EvalResult { ok: true, value: 1 });
    }

    #[test]
    fn self_referencing_macro_terminates_instead_of_recursing_forever() {
        let mut macros = MacroTable::new();
        macros.add_object("FOO", "FOO + 1");
        let cfg = Config { max_recursion: 8, ..Config::default() };
        let r = evaluate("FOO", &macros, &cfg, &NullDiagnostics);
        assert_eq!(r, EvalResult { ok: false, value: 0 });
    }
}
