//! Recursive-descent parser for the parenthesized annotation notation

use super::{Annotation, AnnotationGroup, MAX_NESTING};
use crate::{Error, Result};
use std::iter::Peekable;
use std::str::CharIndices;

pub(super) fn parse(text: &str) -> Result<Annotation> {
    if text.trim().is_empty() {
        return Err(Error::MalformedAnnotation("empty annotation".to_string()));
    }

    let mut parser = Parser {
        text,
        chars: text.char_indices().peekable(),
    };
    let items = parser.sequence(None, 0)?;
    Ok(Annotation::new(items))
}

struct Parser<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    /// Parse comma-separated items up to the end of input, or up to the
    /// `)` matching the `(` at `open` when nested `depth` groups deep
    fn sequence(&mut self, open: Option<usize>, depth: usize) -> Result<Vec<AnnotationGroup>> {
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();

            match self.chars.peek().copied() {
                Some((_, '(')) => {
                    let (pos, _) = self.bump();
                    if depth >= MAX_NESTING {
                        return Err(malformed(format!(
                            "nesting deeper than {} groups at {}",
                            MAX_NESTING, pos
                        )));
                    }
                    let children = self.sequence(Some(pos), depth + 1)?;
                    items.push(AnnotationGroup::Group(children));
                }
                Some((pos, ')')) if items.is_empty() => {
                    return Err(malformed(format!("empty group at {}", pos)));
                }
                Some((pos, ',' | ')')) => {
                    return Err(malformed(format!("empty tag at {}", pos)));
                }
                Some(_) => items.push(self.tag()?),
                None if items.is_empty() => {
                    return Err(malformed("empty annotation".to_string()));
                }
                None => {
                    return Err(malformed("trailing comma".to_string()));
                }
            }

            self.skip_whitespace();

            match self.chars.peek().copied() {
                Some((_, ',')) => {
                    self.bump();
                }
                Some((pos, ')')) => {
                    self.bump();
                    return match open {
                        Some(_) => Ok(items),
                        None => Err(malformed(format!("unmatched ')' at {}", pos))),
                    };
                }
                Some((pos, '(')) => {
                    return Err(malformed(format!("missing comma before '(' at {}", pos)));
                }
                Some((pos, c)) => {
                    return Err(malformed(format!("unexpected '{}' at {}", c, pos)));
                }
                None => {
                    return match open {
                        Some(pos) => Err(malformed(format!("unclosed '(' at {}", pos))),
                        None => Ok(items),
                    };
                }
            }
        }
    }

    /// Read a tag name up to the next grouping character
    fn tag(&mut self) -> Result<AnnotationGroup> {
        let start = match self.chars.peek() {
            Some(&(pos, _)) => pos,
            None => self.text.len(),
        };
        let mut end = self.text.len();

        while let Some(&(pos, c)) = self.chars.peek() {
            if matches!(c, ',' | '(' | ')') {
                end = pos;
                break;
            }
            self.chars.next();
        }

        let name = self.text[start..end].trim();
        if name.is_empty() {
            return Err(malformed(format!("empty tag at {}", start)));
        }
        Ok(AnnotationGroup::Tag(name.to_string()))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn bump(&mut self) -> (usize, char) {
        // Callers only bump after a successful peek
        self.chars.next().unwrap_or((self.text.len(), '\0'))
    }
}

fn malformed(message: String) -> Error {
    Error::MalformedAnnotation(message)
}
