// ABOUTME: Splits template source into text, variable, and block tokens
// ABOUTME: Delimiter-level only; expression structure is the parser's concern

use crate::error::{ErrorKind, Result, TemplateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    Variable,
    Block,
}

/// One lexed span. For Variable and Block tokens `content` is the interior
/// of the delimiters with surrounding whitespace trimmed. Comments are
/// consumed by the lexer and never surface as tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub content: String,
    /// 1-based line of the token start.
    pub line: u32,
    /// 1-based column of the token start.
    pub column: u32,
    /// Smart-trim hint on Text tokens: drop the leading whitespace run and
    /// the newline left behind by a standalone tag on the previous line.
    pub trim_trailing_newline: bool,
}

impl Token {
    fn new(kind: TokenKind, content: String, line: u32, column: u32) -> Self {
        Self {
            kind,
            content,
            line,
            column,
            trim_trailing_newline: false,
        }
    }

    /// First whitespace-separated word of a block token, the tag name.
    pub fn tag_name(&self) -> Option<&str> {
        self.content.split_whitespace().next()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Delimiter {
    Variable,
    Block,
    Comment,
}

impl Delimiter {
    fn closer(self) -> &'static str {
        match self {
            Delimiter::Variable => "}}",
            Delimiter::Block => "%}",
            Delimiter::Comment => "#}",
        }
    }
}

/// Lex a complete source string. With `smart_trim`, block and variable tags
/// standing alone on a line consume that line's indentation and trailing
/// newline.
pub fn tokenize(source: &str, smart_trim: bool) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut line = 1u32;
    let mut column = 1u32;
    let mut pos = 0usize;
    let mut text_start = 0usize;
    let mut text_line = 1u32;
    let mut text_column = 1u32;

    let bytes = source.as_bytes();
    while pos < bytes.len() {
        let delimiter = if bytes[pos] == b'{' && pos + 1 < bytes.len() {
            match bytes[pos + 1] {
                b'{' => Some(Delimiter::Variable),
                b'%' => Some(Delimiter::Block),
                b'#' => Some(Delimiter::Comment),
                _ => None,
            }
        } else {
            None
        };

        if let Some(delim) = delimiter {
            if text_start < pos {
                tokens.push(Token::new(
                    TokenKind::Text,
                    source[text_start..pos].to_string(),
                    text_line,
                    text_column,
                ));
            }

            let open_line = line;
            let open_column = column;
            let interior_start = pos + 2;
            let rel_close = source[interior_start..].find(delim.closer()).ok_or_else(|| {
                TemplateError::new(ErrorKind::TagSyntax, "unterminated tag: end of input reached")
                    .at(open_line, open_column)
            })?;
            let end = interior_start + rel_close + 2;

            for c in source[pos..end].chars() {
                if c == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
            }

            let content = source[interior_start..interior_start + rel_close].trim();
            match delim {
                Delimiter::Variable => tokens.push(Token::new(
                    TokenKind::Variable,
                    content.to_string(),
                    open_line,
                    open_column,
                )),
                Delimiter::Block => tokens.push(Token::new(
                    TokenKind::Block,
                    content.to_string(),
                    open_line,
                    open_column,
                )),
                Delimiter::Comment => {}
            }

            pos = end;
            text_start = pos;
            text_line = line;
            text_column = column;
            continue;
        }

        let c = source[pos..].chars().next().expect("in-bounds char");
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
        pos += c.len_utf8();
    }

    if text_start < source.len() {
        tokens.push(Token::new(
            TokenKind::Text,
            source[text_start..].to_string(),
            text_line,
            text_column,
        ));
    }

    if smart_trim {
        apply_smart_trim(&mut tokens);
    }

    Ok(tokens)
}

/// Whether the text before a tag on the same line is only whitespace.
fn leading_is_blank(tokens: &[Token], index: usize) -> bool {
    if index == 0 {
        return true;
    }
    let prev = &tokens[index - 1];
    if prev.kind != TokenKind::Text {
        return false;
    }
    let tail = match prev.content.rfind('\n') {
        Some(nl) => &prev.content[nl + 1..],
        // No newline in the preceding text: the tag only starts its line when
        // that text is the very beginning of the source.
        None if index == 1 => prev.content.as_str(),
        None => return false,
    };
    tail.chars().all(|c| c == ' ' || c == '\t')
}

/// Whether the rest of the tag's line is only whitespace (then newline or
/// end of input).
fn trailing_is_blank(tokens: &[Token], index: usize) -> bool {
    match tokens.get(index + 1) {
        None => true,
        Some(next) if next.kind == TokenKind::Text => {
            let head = match next.content.find('\n') {
                Some(nl) => &next.content[..nl],
                None if index + 2 == tokens.len() => next.content.as_str(),
                None => return false,
            };
            head.chars().all(|c| c == ' ' || c == '\t')
        }
        Some(_) => false,
    }
}

fn apply_smart_trim(tokens: &mut Vec<Token>) {
    for i in 0..tokens.len() {
        if tokens[i].kind == TokenKind::Text {
            continue;
        }
        if !(leading_is_blank(tokens, i) && trailing_is_blank(tokens, i)) {
            continue;
        }

        if i > 0 {
            let prev = &mut tokens[i - 1];
            if prev.kind == TokenKind::Text {
                let trimmed = prev.content.trim_end_matches([' ', '\t']).len();
                prev.content.truncate(trimmed);
            }
        }
        if let Some(next) = tokens.get_mut(i + 1) {
            if next.kind == TokenKind::Text {
                next.trim_trailing_newline = true;
            }
        }
    }
}

/// Strip a leading whitespace run and the newline it ends with. Applied by
/// the parser when a Text token carries the smart-trim hint.
pub fn strip_leading_newline(content: &str) -> &str {
    let rest = content.trim_start_matches([' ', '\t']);
    rest.strip_prefix('\n').unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_single_token() {
        let tokens = tokenize("hello world", false).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert_eq!(tokens[0].content, "hello world");
    }

    #[test]
    fn test_variable_and_block_tokens() {
        let tokens = tokenize("a{{ name }}b{% if x %}c", false).unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text,
                TokenKind::Variable,
                TokenKind::Text,
                TokenKind::Block,
                TokenKind::Text
            ]
        );
        assert_eq!(tokens[1].content, "name");
        assert_eq!(tokens[3].content, "if x");
    }

    #[test]
    fn test_comment_consumed() {
        let tokens = tokenize("a{# hidden #}b", false).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].content, "a");
        assert_eq!(tokens[1].content, "b");
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens = tokenize("ab\ncd{{ x }}", false).unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[0].column, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 3);
    }

    #[test]
    fn test_multiline_tag_advances_line() {
        let tokens = tokenize("{% if\nx %}end{% endif %}", false).unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].content, "end");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_unterminated_tag_errors_at_opening() {
        let err = tokenize("text\n  {{ broken", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TagSyntax);
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 3);
    }

    #[test]
    fn test_lone_brace_is_text() {
        let tokens = tokenize("a { b } c", false).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].content, "a { b } c");
    }

    #[test]
    fn test_smart_trim_standalone_block() {
        let tokens = tokenize("a\n  {% if x %}\nb", true).unwrap();
        // Indentation before the tag is gone and the following text is
        // flagged to drop the tag line's newline.
        assert_eq!(tokens[0].content, "a\n");
        assert!(tokens[2].trim_trailing_newline);
        assert_eq!(strip_leading_newline(&tokens[2].content), "b");
    }

    #[test]
    fn test_smart_trim_leaves_inline_tags_alone() {
        let tokens = tokenize("a {% if x %} b", true).unwrap();
        assert_eq!(tokens[0].content, "a ");
        assert!(!tokens[2].trim_trailing_newline);
    }

    #[test]
    fn test_smart_trim_off_by_default_path() {
        let tokens = tokenize("  {% if x %}  \nb", false).unwrap();
        assert_eq!(tokens[0].content, "  ");
        assert!(!tokens[2].trim_trailing_newline);
    }
}
