//! Tolerant, substring based element scanner.
//!
//! This is not an XML parser. It locates `<tag ...>` / `<prefix:tag ...>` openings and the first
//! matching closing tag after them, which is enough to recover payloads from traffic captures
//! that are often truncated or broken into transport chunks.

use log::trace;

/// Returns a lazy iterator over every `tag_name` element found in `text`, in document order.
///
/// With `include_tags` the items span from the opening `<` through the `>` of the closing tag,
/// otherwise only the inner text is returned. An opening tag without a closing tag ends the scan.
pub fn find_all<'a>(tag_name: &'a str, text: &'a str, include_tags: bool) -> TagValues<'a> {
    TagValues {
        tag_name,
        text,
        include_tags,
        position: if tag_name.is_empty() { None } else { Some(0) },
    }
}

pub struct TagValues<'a> {
    tag_name: &'a str,
    text: &'a str,
    include_tags: bool,
    position: Option<usize>,
}

#[derive(Debug, PartialEq)]
struct OpenTag<'a> {
    /// Offset of the `<` starting the tag.
    start: usize,
    /// Offset right after the `>` ending the tag.
    content_start: usize,
    prefix: Option<&'a str>,
}

impl<'a> TagValues<'a> {
    fn find_open_tag(&self, from: usize) -> Option<OpenTag<'a>> {
        let text = self.text;
        let name_len = self.tag_name.len();
        let mut search_from = from;

        while let Some(relative) = text[search_from..].find(self.tag_name) {
            let name_start = search_from + relative;
            let name_end = name_start + name_len;
            search_from = name_end;

            if name_start == 0 {
                continue;
            }

            match text[name_end..].chars().next() {
                Some(c) if c == '>' || c == '/' || c.is_whitespace() => {}
                _ => continue,
            }

            let prefix = match text.as_bytes()[name_start - 1] {
                b'<' => None,
                b':' => match text[..name_start - 1].rfind('<') {
                    Some(lt) if is_valid_prefix(&text[lt + 1..name_start - 1]) => {
                        Some(&text[lt + 1..name_start - 1])
                    }
                    _ => continue,
                },
                _ => continue,
            };

            let start = match prefix {
                Some(p) => name_start - p.len() - 2,
                None => name_start - 1,
            };

            let gt = name_end + text[name_end..].find('>')?;
            if text[..gt].ends_with('/') {
                trace!("skipping self-closing `{}` at {}", self.tag_name, start);
                search_from = gt + 1;
                continue;
            }

            return Some(OpenTag {
                start,
                content_start: gt + 1,
                prefix,
            });
        }

        None
    }

    /// Finds `close_tag` at or after `from`, requiring a `>` or whitespace right after it.
    fn find_close_tag(&self, close_tag: &str, from: usize) -> Option<usize> {
        let text = self.text;
        let mut search_from = from;

        while let Some(relative) = text[search_from..].find(close_tag) {
            let close_start = search_from + relative;
            let after = close_start + close_tag.len();
            match text[after..].chars().next() {
                Some(c) if c == '>' || c.is_whitespace() => return Some(close_start),
                _ => search_from = after,
            }
        }

        None
    }
}

impl<'a> Iterator for TagValues<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let from = self.position?;

        let Some(open) = self.find_open_tag(from) else {
            self.position = None;
            return None;
        };

        let close_tag = match open.prefix {
            Some(prefix) => format!("</{}:{}", prefix, self.tag_name),
            None => format!("</{}", self.tag_name),
        };

        let Some(close_start) = self.find_close_tag(&close_tag, open.content_start) else {
            trace!(
                "no `{}` after offset {}, stopping scan",
                close_tag, open.content_start
            );
            self.position = None;
            return None;
        };

        let close_end = match self.text[close_start..].find('>') {
            Some(gt) => close_start + gt + 1,
            None => self.text.len(),
        };
        self.position = Some(close_end);

        if self.include_tags {
            Some(&self.text[open.start..close_end])
        } else {
            Some(&self.text[open.content_start..close_start])
        }
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty()
        && !prefix
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '/' | '"' | '\'' | '=' | ':'))
}
