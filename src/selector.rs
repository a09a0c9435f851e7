use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

/// Supported forms: `#id`, `tag`, `tag[attr='value']`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Selector {
    Id(String),
    Tag(String),
    TagAttr {
        tag: String,
        attr: String,
        value: String,
    },
}

impl Selector {
    pub(crate) fn parse(selector: &str) -> Result<Self> {
        let trimmed = selector.trim();
        if trimmed.is_empty() {
            return Err(Error::UnsupportedSelector(selector.to_string()));
        }

        if let Some(id) = trimmed.strip_prefix('#') {
            if id.is_empty() || !id.chars().all(is_name_char) {
                return Err(Error::UnsupportedSelector(selector.to_string()));
            }
            return Ok(Self::Id(id.to_string()));
        }

        if let Some(open) = trimmed.find('[') {
            let tag = &trimmed[..open];
            let rest = trimmed[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| Error::UnsupportedSelector(selector.to_string()))?;
            let (attr, quoted) = rest
                .split_once('=')
                .ok_or_else(|| Error::UnsupportedSelector(selector.to_string()))?;
            let value = strip_quotes(quoted)
                .ok_or_else(|| Error::UnsupportedSelector(selector.to_string()))?;
            if tag.is_empty()
                || !tag.chars().all(is_name_char)
                || attr.is_empty()
                || !attr.chars().all(is_name_char)
            {
                return Err(Error::UnsupportedSelector(selector.to_string()));
            }
            return Ok(Self::TagAttr {
                tag: tag.to_ascii_lowercase(),
                attr: attr.to_ascii_lowercase(),
                value: value.to_string(),
            });
        }

        if trimmed.chars().all(is_name_char) {
            return Ok(Self::Tag(trimmed.to_ascii_lowercase()));
        }
        Err(Error::UnsupportedSelector(selector.to_string()))
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_')
}

fn strip_quotes(value: &str) -> Option<&str> {
    value
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .or_else(|| {
            value
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
        })
}

impl Dom {
    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        match Selector::parse(selector)? {
            Selector::Id(id) => Ok(self.by_id(&id)),
            Selector::Tag(tag) => Ok(self.find_first(|dom, node| {
                dom.tag_name(node)
                    .is_some_and(|name| name.eq_ignore_ascii_case(&tag))
            })),
            Selector::TagAttr { tag, attr, value } => Ok(self.find_first(|dom, node| {
                dom.tag_name(node)
                    .is_some_and(|name| name.eq_ignore_ascii_case(&tag))
                    && dom.attr(node, &attr).as_deref() == Some(value.as_str())
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;

    #[test]
    fn resolves_id_tag_and_attribute_selectors() -> Result<()> {
        let dom = parse_html(
            "<meta name='csrf-token' content='tok'><form id='f'><input id='city'></form>",
        )?;
        assert_eq!(dom.query_selector("#city")?, dom.by_id("city"));
        assert_eq!(dom.query_selector("form")?, dom.by_id("f"));
        let meta = dom.query_selector("meta[name='csrf-token']")?.expect("meta");
        assert_eq!(dom.attr(meta, "content").as_deref(), Some("tok"));
        assert_eq!(dom.query_selector("#missing")?, None);
        Ok(())
    }

    #[test]
    fn rejects_unsupported_selector_syntax() {
        for selector in ["", "div > p", ".city", "input[list]", "#bad id"] {
            let err = Selector::parse(selector).unwrap_err();
            assert!(
                matches!(err, Error::UnsupportedSelector(_)),
                "selector {selector:?} gave {err:?}"
            );
        }
    }
}
