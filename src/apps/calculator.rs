use super::{App, AppFlow, AppIo};
use crate::widgets::{Rect, Widget};

const KEYPAD: [[&str; 4]; 4] = [
    ["7", "8", "9", "/"],
    ["4", "5", "6", "*"],
    ["1", "2", "3", "-"],
    ["C", "0", "=", "+"],
];

const ERROR: &str = "Error";

/// Deepest run of parentheses and unary minus the evaluator accepts
const MAX_NESTING: usize = 64;

/// Four-function calculator with a clickable keypad
#[derive(Debug, Default)]
pub struct Calculator {
    expression: String,
}

impl Calculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn press(&mut self, key: char, io: &mut AppIo<'_>) {
        match key {
            'C' | 'c' => self.expression.clear(),
            '=' => {
                let result = match evaluate(&self.expression) {
                    Some(value) => format_number(value),
                    None => ERROR.to_string(),
                };
                io.log.push(format!("{} = {}", self.expression, result));
                self.expression = result;
            }
            _ => {
                if self.expression == ERROR {
                    self.expression.clear();
                }
                self.expression.push(key);
            }
        }
    }
}

impl App for Calculator {
    fn title(&self) -> &str {
        "Calculator"
    }

    fn on_start(&mut self, io: &mut AppIo<'_>) {
        io.log.push("CALCULATOR");
        io.log.push("Type an expression or click the keypad. 'exit' to close.");
    }

    fn on_input(&mut self, line: &str, io: &mut AppIo<'_>) -> AppFlow {
        if line.trim().eq_ignore_ascii_case("exit") {
            return AppFlow::Close;
        }

        for key in line.chars() {
            if key.is_ascii_digit() || "+-*/.()=Cc".contains(key) {
                self.press(key, io);
            }
        }
        AppFlow::Continue
    }

    fn widgets(&self) -> Vec<Widget> {
        let display = if self.expression.is_empty() {
            "0"
        } else {
            &self.expression
        };

        let mut widgets = vec![Widget::label(Rect::new(0, 0, 23, 1), display)];
        for (row, keys) in KEYPAD.iter().enumerate() {
            for (col, key) in keys.iter().enumerate() {
                let rect = Rect::new(col as u16 * 6, 2 + row as u16 * 2, 5, 1);
                widgets.push(Widget::button(rect, format!("[ {key} ]"), *key));
            }
        }
        widgets
    }
}

/// Evaluate `+ - * /` with precedence, parentheses and unary minus.
pub fn evaluate(expr: &str) -> Option<f64> {
    let tokens: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    if tokens.is_empty() {
        return None;
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    (parser.pos == parser.tokens.len() && value.is_finite()).then_some(value)
}

struct Parser {
    tokens: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.tokens.get(self.pos).copied()
    }

    fn expr(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == '/' && rhs == 0.0 {
                return None;
            }
            value = if op == '*' { value * rhs } else { value / rhs };
        }
        Some(value)
    }

    fn factor(&mut self) -> Option<f64> {
        if self.depth >= MAX_NESTING {
            return None;
        }
        self.depth += 1;
        let value = self.unary();
        self.depth -= 1;
        value
    }

    fn unary(&mut self) -> Option<f64> {
        match self.peek()? {
            '-' => {
                self.pos += 1;
                self.factor().map(|v| -v)
            }
            '(' => {
                self.pos += 1;
                let value = self.expr()?;
                (self.peek() == Some(')')).then(|| {
                    self.pos += 1;
                    value
                })
            }
            _ => self.number(),
        }
    }

    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        self.tokens[start..self.pos]
            .iter()
            .collect::<String>()
            .parse()
            .ok()
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{value:.10}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_buffer::LogBuffer;
    use crate::storage::MemoryStore;
    use crate::widgets::hit_test;

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(evaluate("2+3*4"), Some(14.0));
        assert_eq!(evaluate("(2+3)*4"), Some(20.0));
        assert_eq!(evaluate("-3+10/4"), Some(-0.5));
        assert_eq!(evaluate("1/0"), None);
        assert_eq!(evaluate("2+"), None);
        assert_eq!(evaluate("1.2.3"), None);
        assert_eq!(evaluate(""), None);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let worker = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                (
                    evaluate(&format!("{}1", "(".repeat(200_000))),
                    evaluate(&format!("{}1", "-".repeat(200_000))),
                    evaluate(&format!("{}1{}", "(".repeat(30), ")".repeat(30))),
                )
            })
            .unwrap();

        let (parens, minus, shallow) = worker.join().unwrap();
        assert_eq!(parens, None);
        assert_eq!(minus, None);
        assert_eq!(shallow, Some(1.0));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(14.0), "14");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333");
    }

    #[test]
    fn test_keys_and_equals() {
        let store = MemoryStore::new();
        let mut log = LogBuffer::new(10);
        let mut io = AppIo {
            log: &mut log,
            store: &store,
            user: &mut None,
        };
        let mut calc = Calculator::new();

        assert_eq!(calc.on_input("12*3", &mut io), AppFlow::Continue);
        assert_eq!(calc.on_input("=", &mut io), AppFlow::Continue);
        assert_eq!(calc.expression(), "36");
        assert_eq!(log.last(), Some("12*3 = 36"));
    }

    #[test]
    fn test_error_then_new_input() {
        let store = MemoryStore::new();
        let mut log = LogBuffer::new(10);
        let mut io = AppIo {
            log: &mut log,
            store: &store,
            user: &mut None,
        };
        let mut calc = Calculator::new();

        calc.on_input("5/0=", &mut io);
        assert_eq!(calc.expression(), ERROR);
        calc.on_input("7", &mut io);
        assert_eq!(calc.expression(), "7");
        calc.on_input("C", &mut io);
        assert_eq!(calc.expression(), "");
    }

    #[test]
    fn test_exit_closes() {
        let store = MemoryStore::new();
        let mut log = LogBuffer::new(10);
        let mut io = AppIo {
            log: &mut log,
            store: &store,
            user: &mut None,
        };
        assert_eq!(Calculator::new().on_input(" EXIT ", &mut io), AppFlow::Close);
    }

    #[test]
    fn test_keypad_emits_keys() {
        let calc = Calculator::new();
        let widgets = calc.widgets();

        assert_eq!(widgets[0].text(), "0");
        assert_eq!(hit_test(&widgets, 1, 2).as_deref(), Some("7"));
        assert_eq!(hit_test(&widgets, 16, 8).as_deref(), Some("="));
        assert_eq!(hit_test(&widgets, 5, 2), None);
        assert_eq!(hit_test(&widgets, 1, 3), None);
        assert_eq!(calc.content_start(), 10);
    }
}
