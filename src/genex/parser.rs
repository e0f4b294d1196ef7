//! Parser for `$<...>` expressions.
//!
//! An expression is `$<identifier>` or `$<identifier:param,param,...>`. The
//! identifier and each parameter may themselves contain expressions. An
//! opening `$<` without a matching `>` is kept as literal text.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Expr {
        identifier: Vec<Node>,
        /// `None` when the expression has no `:` part
        params: Option<Vec<Vec<Node>>>,
    },
}

/// Parse a fragment into nodes.
pub fn parse(input: &str) -> Vec<Node> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    parser.sequence(Stop::Eof)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stop {
    Eof,
    Identifier,
    Parameter,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_open(&self) -> bool {
        self.peek() == Some('$') && self.chars.get(self.pos + 1) == Some(&'<')
    }

    fn sequence(&mut self, stop: Stop) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut text = String::new();

        while let Some(c) = self.peek() {
            if self.at_open() {
                let start = self.pos;
                self.pos += 2;
                match self.expression() {
                    Some(expr) => {
                        if !text.is_empty() {
                            nodes.push(Node::Text(std::mem::take(&mut text)));
                        }
                        nodes.push(expr);
                    }
                    None => {
                        self.pos = start + 2;
                        text.push_str("$<");
                    }
                }
                continue;
            }

            let stops = match stop {
                Stop::Eof => false,
                Stop::Identifier => c == '>' || c == ':',
                Stop::Parameter => c == '>' || c == ',',
            };
            if stops {
                break;
            }

            text.push(c);
            self.pos += 1;
        }

        if !text.is_empty() {
            nodes.push(Node::Text(text));
        }
        nodes
    }

    /// Parse after `$<`; `None` if the expression is unterminated.
    fn expression(&mut self) -> Option<Node> {
        let identifier = self.sequence(Stop::Identifier);
        match self.peek()? {
            '>' => {
                self.pos += 1;
                Some(Node::Expr {
                    identifier,
                    params: None,
                })
            }
            ':' => {
                self.pos += 1;
                let mut params = Vec::new();
                loop {
                    let param = self.sequence(Stop::Parameter);
                    let delimiter = self.peek()?;
                    self.pos += 1;
                    params.push(param);
                    if delimiter == '>' {
                        break;
                    }
                }
                Some(Node::Expr {
                    identifier,
                    params: Some(params),
                })
            }
            _ => None,
        }
    }
}
