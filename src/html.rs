use std::collections::HashMap;

use crate::dom::{Dom, is_void_element};
use crate::{Error, Result};

pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    Parser::new(html).parse()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(html: &str) -> Self {
        Self {
            chars: html.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Dom> {
        let mut dom = Dom::new();
        let mut stack: Vec<crate::dom::NodeId> = Vec::new();

        while self.pos < self.chars.len() {
            let parent = stack.last().copied().unwrap_or(dom.root);

            if self.starts_with("<!--") {
                self.consume_comment()?;
            } else if self.starts_with("<!") {
                self.consume_until('>')?;
            } else if self.starts_with("</") {
                let tag = self.consume_closing_tag()?;
                let open = stack.pop().ok_or_else(|| {
                    Error::HtmlParse(format!("unexpected closing tag </{tag}>"))
                })?;
                let open_tag = dom.tag_name(open).unwrap_or_default().to_string();
                if !open_tag.eq_ignore_ascii_case(&tag) {
                    return Err(Error::HtmlParse(format!(
                        "mismatched closing tag </{tag}>, open element is <{open_tag}>"
                    )));
                }
            } else if self.peek() == Some('<') {
                let (tag, attrs, self_closed) = self.consume_open_tag()?;
                let node = dom.create_element(parent, tag.clone(), attrs);
                if !self_closed && !is_void_element(&tag) {
                    stack.push(node);
                }
            } else {
                let text = self.consume_text();
                if !text.is_empty() {
                    dom.create_text(parent, decode_entities(&text));
                }
            }
        }

        if let Some(open) = stack.pop() {
            let tag = dom.tag_name(open).unwrap_or_default().to_string();
            return Err(Error::HtmlParse(format!("unclosed element <{tag}>")));
        }
        Ok(dom)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        let mut idx = self.pos;
        for expected in prefix.chars() {
            if self.chars.get(idx) != Some(&expected) {
                return false;
            }
            idx += 1;
        }
        true
    }

    fn consume_comment(&mut self) -> Result<()> {
        self.pos += 4;
        while self.pos < self.chars.len() {
            if self.starts_with("-->") {
                self.pos += 3;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(Error::HtmlParse("unterminated comment".into()))
    }

    fn consume_until(&mut self, end: char) -> Result<()> {
        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];
            self.pos += 1;
            if ch == end {
                return Ok(());
            }
        }
        Err(Error::HtmlParse(format!("expected '{end}' before end of input")))
    }

    fn consume_closing_tag(&mut self) -> Result<String> {
        self.pos += 2;
        let tag = self.consume_name();
        if tag.is_empty() {
            return Err(Error::HtmlParse("empty closing tag name".into()));
        }
        self.skip_whitespace();
        if self.peek() != Some('>') {
            return Err(Error::HtmlParse(format!(
                "malformed closing tag </{tag}>"
            )));
        }
        self.pos += 1;
        Ok(tag.to_ascii_lowercase())
    }

    fn consume_open_tag(&mut self) -> Result<(String, HashMap<String, String>, bool)> {
        self.pos += 1;
        let tag = self.consume_name();
        if tag.is_empty() {
            return Err(Error::HtmlParse("empty tag name".into()));
        }
        let tag = tag.to_ascii_lowercase();

        let mut attrs = HashMap::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(Error::HtmlParse(format!("unterminated tag <{tag}>")));
                }
                Some('>') => {
                    self.pos += 1;
                    return Ok((tag, attrs, false));
                }
                Some('/') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.peek() != Some('>') {
                        return Err(Error::HtmlParse(format!(
                            "malformed self-closing tag <{tag}>"
                        )));
                    }
                    self.pos += 1;
                    return Ok((tag, attrs, true));
                }
                Some(_) => {
                    let (name, value) = self.consume_attr(&tag)?;
                    attrs.insert(name, value);
                }
            }
        }
    }

    fn consume_attr(&mut self, tag: &str) -> Result<(String, String)> {
        let name = self.consume_name();
        if name.is_empty() {
            return Err(Error::HtmlParse(format!(
                "malformed attribute in tag <{tag}>"
            )));
        }
        let name = name.to_ascii_lowercase();
        self.skip_whitespace();
        if self.peek() != Some('=') {
            return Ok((name, String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        None => {
                            return Err(Error::HtmlParse(format!(
                                "unterminated attribute value for '{name}' in tag <{tag}>"
                            )));
                        }
                        Some(ch) if ch == quote => {
                            self.pos += 1;
                            break;
                        }
                        Some(ch) => {
                            value.push(ch);
                            self.pos += 1;
                        }
                    }
                }
                value
            }
            _ => {
                let mut value = String::new();
                while let Some(ch) = self.peek() {
                    if ch.is_whitespace() || ch == '>' || ch == '/' {
                        break;
                    }
                    value.push(ch);
                    self.pos += 1;
                }
                value
            }
        };
        Ok((name, decode_entities(&value)))
    }

    fn consume_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':') {
                name.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        name
    }

    fn consume_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '<' {
                break;
            }
            text.push(ch);
            self.pos += 1;
        }
        text
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }
}

fn decode_entities(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    fn decode_numeric(value: &str) -> Option<char> {
        let codepoint = if let Some(hex) = value.strip_prefix('x').or_else(|| value.strip_prefix('X'))
        {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            value.parse::<u32>().ok()?
        };
        char::from_u32(codepoint)
    }

    fn decode_named(value: &str) -> Option<char> {
        match value {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            _ => None,
        }
    }

    let chars = src.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(src.len());
    let mut i = 0usize;
    while i < chars.len() {
        if chars[i] != '&' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let Some(end) = chars[i + 1..].iter().position(|ch| *ch == ';') else {
            out.push('&');
            i += 1;
            continue;
        };
        let entity = chars[i + 1..i + 1 + end].iter().collect::<String>();
        let decoded = entity
            .strip_prefix('#')
            .map_or_else(|| decode_named(&entity), decode_numeric);
        match decoded {
            Some(ch) => {
                out.push(ch);
                i += end + 2;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }
    out
}
