//! Curly quotes for Markdown text.
//!
//! comrak's `smart` option would also turn `--` and `...` into dashes and
//! ellipses, which bodies must keep verbatim, so quotes are curled on the AST
//! instead. Only text nodes are touched; code, raw HTML and link targets keep
//! their straight quotes.

use comrak::nodes::{AstNode, NodeValue};

/// Characters after which a quote still opens, besides whitespace.
const OPENERS: [char; 7] = ['(', '[', '{', '"', '\'', '\u{201c}', '\u{2018}'];
/// Characters before which a quote closes.
const CLOSERS: [char; 9] = ['.', ',', ';', ':', '!', '?', ')', ']', '}'];

pub(crate) fn curl_quotes<'a>(root: &'a AstNode<'a>) {
    for node in root.descendants() {
        let before = node.previous_sibling().map(edge_char);
        let after = node.next_sibling().map(edge_char);
        let mut data = node.data.borrow_mut();
        if let NodeValue::Text(text) = &mut data.value
            && text.contains(['"', '\''])
        {
            let curled = curl(text, before, after);
            *text = curled.into();
        }
    }
}

/// What a neighbouring inline node looks like from a quote next to it.
fn edge_char<'a>(node: &'a AstNode<'a>) -> char {
    match node.data.borrow().value {
        NodeValue::SoftBreak | NodeValue::LineBreak => ' ',
        _ => 'a',
    }
}

fn curl(text: &str, before: Option<char>, after: Option<char>) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut curled = String::with_capacity(text.len() + 8);
    for (index, &ch) in chars.iter().enumerate() {
        let (open, close) = match ch {
            '"' => ('\u{201c}', '\u{201d}'),
            '\'' => ('\u{2018}', '\u{2019}'),
            _ => {
                curled.push(ch);
                continue;
            }
        };
        let prev = match index.checked_sub(1) {
            Some(prev) => Some(chars[prev]),
            None => before,
        };
        let next = chars.get(index + 1).copied().or(after);
        curled.push(if opens(prev, next) { open } else { close });
    }
    curled
}

fn opens(before: Option<char>, after: Option<char>) -> bool {
    let starts_word = after.is_some_and(|ch| !ch.is_whitespace() && !CLOSERS.contains(&ch));
    let after_space = before.is_none_or(|ch| ch.is_whitespace() || OPENERS.contains(&ch));
    starts_word && after_space
}
