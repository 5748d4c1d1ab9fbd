//! Result document model: the tag tree the engine writes after a run,
//! and the traversal that turns it into per-query verdicts.

use crate::error::DocumentError;
use crate::types::QueryVerdict;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub tag: String,
    pub text: String,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: String::new(),
            children: Vec::new(),
        }
    }
}

/// Parse the engine's output bytes into the document tree.
///
/// Accepts the XML subset the engine emits: one root element, nested
/// elements with optional attributes (attributes are dropped), text
/// content with the five named entities, comments, and a declaration.
pub fn parse_document(input: &[u8]) -> Result<Node, DocumentError> {
    let src = std::str::from_utf8(input).map_err(|e| DocumentError::Malformed {
        offset: e.valid_up_to(),
        reason: "not valid UTF-8".to_string(),
    })?;
    let mut reader = Reader { src, pos: 0 };
    reader.skip_misc()?;
    if reader.at_end() {
        return Err(DocumentError::Malformed {
            offset: reader.pos,
            reason: "no root element".to_string(),
        });
    }
    let root = reader.element()?;
    reader.skip_misc()?;
    if !reader.at_end() {
        return Err(DocumentError::Malformed {
            offset: reader.pos,
            reason: "content after the root element".to_string(),
        });
    }
    Ok(root)
}

/// Enumerate query verdicts in document order.
///
/// Depth-first over the whole tree; a node counts as a query node iff its
/// tag is `query`, every other node is traversed transparently. Within a
/// query node the verdict starts as failed and the last `passed`/`failed`
/// child wins, so duplicated verdict nodes still resolve deterministically.
/// A query node without an `id` child is a document-integrity error.
pub fn collect_verdicts(root: &Node) -> Result<Vec<QueryVerdict>, DocumentError> {
    let mut out = Vec::new();
    walk(root, &mut out)?;
    Ok(out)
}

fn walk(node: &Node, out: &mut Vec<QueryVerdict>) -> Result<(), DocumentError> {
    if node.tag == "query" {
        let mut id: Option<&str> = None;
        let mut passed = false;
        for child in &node.children {
            match child.tag.as_str() {
                "id" => id = Some(child.text.trim()),
                "passed" => passed = true,
                "failed" => passed = false,
                _ => {}
            }
        }
        let id = id.ok_or(DocumentError::QueryMissingId)?;
        out.push(QueryVerdict {
            id: id.to_string(),
            passed,
        });
        return Ok(());
    }
    for child in &node.children {
        walk(child, out)?;
    }
    Ok(())
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn bump(&mut self, n: usize) {
        self.pos += n;
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            if !c.is_whitespace() {
                break;
            }
            self.bump(c.len_utf8());
        }
    }

    fn skip_until(&mut self, marker: &str, what: &str) -> Result<(), DocumentError> {
        match self.rest().find(marker) {
            Some(i) => {
                self.bump(i + marker.len());
                Ok(())
            }
            None => Err(DocumentError::Malformed {
                offset: self.pos,
                reason: format!("unterminated {what}"),
            }),
        }
    }

    // Declaration, doctype and comments around the root element.
    fn skip_misc(&mut self) -> Result<(), DocumentError> {
        loop {
            self.skip_ws();
            if self.rest().starts_with("<?") {
                self.skip_until("?>", "declaration")?;
            } else if self.rest().starts_with("<!--") {
                self.skip_until("-->", "comment")?;
            } else if self.rest().starts_with("<!") {
                self.skip_until(">", "doctype")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<&'a str, DocumentError> {
        let start = self.pos;
        while let Some(c) = self.rest().chars().next() {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':') {
                self.bump(c.len_utf8());
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(DocumentError::Malformed {
                offset: start,
                reason: "expected a tag name".to_string(),
            });
        }
        Ok(&self.src[start..self.pos])
    }

    fn element(&mut self) -> Result<Node, DocumentError> {
        if !self.rest().starts_with('<') {
            return Err(DocumentError::Malformed {
                offset: self.pos,
                reason: "expected an element".to_string(),
            });
        }
        self.bump(1);
        let tag = self.name()?.to_string();
        let self_closing = self.finish_open_tag(&tag)?;
        let mut node = Node::new(tag);
        if self_closing {
            return Ok(node);
        }
        loop {
            let Some(i) = self.rest().find('<') else {
                return Err(DocumentError::UnexpectedEof { tag: node.tag });
            };
            if i > 0 {
                let chunk = &self.rest()[..i];
                node.text.push_str(&unescape(chunk));
                self.bump(i);
            }
            if self.rest().starts_with("</") {
                self.bump(2);
                let close = self.name()?.to_string();
                self.skip_ws();
                if !self.rest().starts_with('>') {
                    return Err(DocumentError::Malformed {
                        offset: self.pos,
                        reason: format!("expected '>' after closing tag </{close}"),
                    });
                }
                self.bump(1);
                if close != node.tag {
                    return Err(DocumentError::MismatchedTag {
                        expected: node.tag,
                        found: close,
                    });
                }
                return Ok(node);
            }
            if self.rest().starts_with("<!--") {
                self.skip_until("-->", "comment")?;
                continue;
            }
            node.children.push(self.element()?);
        }
    }

    // Scan past attributes to '>' or '/>', honoring quoted values.
    fn finish_open_tag(&mut self, tag: &str) -> Result<bool, DocumentError> {
        loop {
            match self.rest().chars().next() {
                None => {
                    return Err(DocumentError::UnexpectedEof {
                        tag: tag.to_string(),
                    })
                }
                Some('>') => {
                    self.bump(1);
                    return Ok(false);
                }
                Some('/') if self.rest().starts_with("/>") => {
                    self.bump(2);
                    return Ok(true);
                }
                Some(q @ ('"' | '\'')) => {
                    self.bump(1);
                    match self.rest().find(q) {
                        Some(i) => self.bump(i + 1),
                        None => {
                            return Err(DocumentError::Malformed {
                                offset: self.pos,
                                reason: "unterminated attribute value".to_string(),
                            })
                        }
                    }
                }
                Some(c) => self.bump(c.len_utf8()),
            }
        }
    }
}

fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    const ENTITIES: [(&str, &str); 5] = [
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&amp;", "&"),
        ("&quot;", "\""),
        ("&apos;", "'"),
    ];
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        let tail = &rest[i..];
        match ENTITIES
            .iter()
            .find_map(|(pat, ch)| tail.strip_prefix(pat).map(|r| (*ch, r)))
        {
            Some((ch, r)) => {
                out.push_str(ch);
                rest = r;
            }
            None => {
                // Unknown entity, kept literal.
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
