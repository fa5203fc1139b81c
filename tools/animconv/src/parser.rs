//! Block parser (tokens -> node tree)
//!
//! Blocks are written `.tag child child ... tag.`. Any token starting with a
//! dot opens a nested block which runs to its matching `tag.` closer; every
//! other token is a data leaf. Closers are matched with a per-tag depth
//! counter, so a block may contain another block with the same tag.

use crate::error::MalformedBlock;
use crate::lexer::Token;

/// Deepest block nesting accepted before parsing gives up
pub const MAX_NESTING: usize = 256;

/// Parsed node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal leaf (number or identifier)
    Data(String),
    /// Delimited block with its tag name and children in source order
    Block { kind: String, children: Vec<Node> },
}

impl Node {
    pub fn data(value: impl Into<String>) -> Self {
        Node::Data(value.into())
    }

    pub fn block(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Block {
            kind: kind.into(),
            children,
        }
    }

    /// Tag name of a block, `"data"` for leaves
    pub fn kind(&self) -> &str {
        match self {
            Node::Data(_) => "data",
            Node::Block { kind, .. } => kind,
        }
    }

    pub fn as_data(&self) -> Option<&str> {
        match self {
            Node::Data(value) => Some(value),
            Node::Block { .. } => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Data(_) => &[],
            Node::Block { children, .. } => children,
        }
    }

    /// True if this is a block with the given tag
    pub fn is_block(&self, tag: &str) -> bool {
        matches!(self, Node::Block { kind, .. } if kind == tag)
    }

    /// First child block with the given tag
    pub fn find_child(&self, tag: &str) -> Option<&Node> {
        self.children().iter().find(|child| child.is_block(tag))
    }
}

/// Parse a token stream that must consist of exactly one top-level block
pub fn parse(tokens: &[Token<'_>]) -> Result<Node, MalformedBlock> {
    let Some(first) = tokens.first() else {
        return Err(MalformedBlock::new(1, "", "no block found in empty input"));
    };

    let tag = opening_tag(first)?;
    let close = find_closer(tokens, 0, tag)?;
    if close != tokens.len() - 1 {
        let extra = &tokens[close + 1];
        return Err(MalformedBlock::new(
            extra.line,
            extra.text,
            format!("unexpected token after the closing `{}.`", tag),
        ));
    }

    parse_block(tokens, 0)
}

/// Parse `tokens`, which must be exactly `.tag ... tag.`
fn parse_block(tokens: &[Token<'_>], depth: usize) -> Result<Node, MalformedBlock> {
    let first = tokens[0];
    let tag = opening_tag(&first)?;
    if depth >= MAX_NESTING {
        return Err(MalformedBlock::new(
            first.line,
            first.text,
            format!("blocks nested deeper than {} levels", MAX_NESTING),
        ));
    }

    let last = tokens[tokens.len() - 1];
    if tokens.len() < 2 || last.text != closer_for(tag) {
        return Err(MalformedBlock::new(
            last.line,
            last.text,
            format!("expected `{}` to close `{}`", closer_for(tag), first.text),
        ));
    }

    let inner_end = tokens.len() - 1;
    let mut children = Vec::new();
    let mut i = 1;

    while i < inner_end {
        let token = tokens[i];
        if token.text.starts_with('.') {
            let child_tag = opening_tag(&token)?;
            let close = find_closer(&tokens[..inner_end], i, child_tag)?;
            children.push(parse_block(&tokens[i..=close], depth + 1)?);
            i = close + 1;
        } else {
            children.push(Node::data(token.text));
            i += 1;
        }
    }

    Ok(Node::block(tag, children))
}

fn opening_tag<'a>(token: &Token<'a>) -> Result<&'a str, MalformedBlock> {
    match token.text.strip_prefix('.') {
        Some(tag) if !tag.is_empty() && !tag.starts_with('.') => Ok(tag),
        Some(_) => Err(MalformedBlock::new(
            token.line,
            token.text,
            "block opener needs a tag name",
        )),
        None => Err(MalformedBlock::new(
            token.line,
            token.text,
            "expected a `.tag` block opener",
        )),
    }
}

fn closer_for(tag: &str) -> String {
    format!("{}.", tag)
}

/// Index of the token closing the block opened at `open`
fn find_closer(tokens: &[Token<'_>], open: usize, tag: &str) -> Result<usize, MalformedBlock> {
    let opener = tokens[open].text;
    let closer = closer_for(tag);
    let mut depth = 0usize;

    for (offset, token) in tokens[open..].iter().enumerate() {
        if token.text == opener {
            depth += 1;
        } else if token.text == closer {
            depth -= 1;
            if depth == 0 {
                return Ok(open + offset);
            }
        }
    }

    Err(MalformedBlock::new(
        tokens[open].line,
        opener,
        format!("block is never closed with `{}`", closer),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_str(source: &str) -> Result<Node, MalformedBlock> {
        parse(&tokenize(source).unwrap())
    }

    /// Data leaves in depth-first order
    fn leaves(node: &Node) -> Vec<&str> {
        match node {
            Node::Data(value) => vec![value.as_str()],
            Node::Block { children, .. } => children.iter().flat_map(leaves).collect(),
        }
    }

    fn nested(depth: usize) -> String {
        format!("{} 1 {}", ".a ".repeat(depth), "a. ".repeat(depth))
    }

    #[test]
    fn test_flat_block() {
        let node = parse_str(".loopEnd 2 loopEnd.").unwrap();
        assert_eq!(node, Node::block("loopEnd", vec![Node::data("2")]));
    }

    #[test]
    fn test_empty_block() {
        let node = parse_str(".frame frame.").unwrap();
        assert_eq!(node, Node::block("frame", vec![]));
    }

    #[test]
    fn test_nested_blocks() {
        let node = parse_str(".part root .frame .w 1 w. .p 2 p. frame. part.").unwrap();
        assert_eq!(
            node,
            Node::block(
                "part",
                vec![
                    Node::data("root"),
                    Node::block(
                        "frame",
                        vec![
                            Node::block("w", vec![Node::data("1")]),
                            Node::block("p", vec![Node::data("2")]),
                        ]
                    ),
                ]
            )
        );
    }

    #[test]
    fn test_same_tag_nesting() {
        let node = parse_str(".a .a 1 a. 2 a.").unwrap();
        assert_eq!(
            node,
            Node::block(
                "a",
                vec![Node::block("a", vec![Node::data("1")]), Node::data("2")]
            )
        );
    }

    #[test]
    fn test_leaves_match_non_delimiter_tokens() {
        let source = ".object foo .loopStart 0 loopStart. .part bar .frame .w 3 w. frame. part. object.";
        let node = parse_str(source).unwrap();
        assert_eq!(leaves(&node), vec!["foo", "0", "bar", "3"]);
    }

    #[test]
    fn test_nesting_up_to_limit() {
        let mut node = &parse_str(&nested(MAX_NESTING)).unwrap();
        for _ in 1..MAX_NESTING {
            node = &node.children()[0];
        }
        assert_eq!(node.children(), [Node::data("1")]);
    }

    #[test]
    fn test_nesting_past_limit() {
        let err = parse_str(&nested(MAX_NESTING + 1)).unwrap_err();
        assert_eq!(err.token, ".a");
        assert!(err.reason.contains("nested deeper"));

        let err = parse_str(&nested(20_000)).unwrap_err();
        assert!(err.reason.contains("nested deeper"));
    }

    #[test]
    fn test_find_child() {
        let node = parse_str(".frame .x 1 x. .y 2 y. .x 3 x. frame.").unwrap();
        let x = node.find_child("x").unwrap();
        assert_eq!(x.children()[0].as_data(), Some("1"));
        assert!(node.find_child("z").is_none());
    }

    #[test]
    fn test_not_a_block() {
        let err = parse_str("foo .a a.").unwrap_err();
        assert_eq!(err.token, "foo");
    }

    #[test]
    fn test_wrong_closer() {
        let err = parse_str(".object foo frame.").unwrap_err();
        assert_eq!(err.token, ".object");
    }

    #[test]
    fn test_unclosed_child() {
        let err = parse_str(".object .part foo object.").unwrap_err();
        assert_eq!(err.token, ".part");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_trailing_tokens() {
        let err = parse_str(".a 1 a. extra").unwrap_err();
        assert_eq!(err.token, "extra");
    }

    #[test]
    fn test_second_top_level_block() {
        let err = parse_str(".a a.\n.b b.").unwrap_err();
        assert_eq!(err.token, ".b");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn test_bare_dot_opener() {
        let err = parse_str(". .").unwrap_err();
        assert_eq!(err.token, ".");
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        assert!(parse_str(".Frame frame.").is_err());
    }
}
