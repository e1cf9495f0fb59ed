//! Parser for bundle documents.
//!
//! Bundles are XML-shaped but use minimal escaping, so embedded code may
//! carry bare `&` and quotes that strict XML parsers reject. This reader
//! accepts exactly what the writer produces plus the common variants seen in
//! hand-edited bundles: comments, processing instructions, CDATA payloads,
//! self-closing elements and attributes on `<content>`.

use crate::domain::error::{BundleError, Result};
use log::debug;

/// Deepest element nesting accepted in a document, the root included.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Concatenated text; CDATA payloads take precedence over surrounding text.
    pub fn text(&self) -> String {
        let cdata: Vec<&str> = self
            .children
            .iter()
            .filter_map(|node| match node {
                Node::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if !cdata.is_empty() {
            return cdata.concat();
        }

        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Metadata section as a tree of named values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataNode {
    Value(String),
    Group(Vec<(String, MetadataNode)>),
}

impl MetadataNode {
    /// Recursion is bounded by [`MAX_DEPTH`], which the reader enforces.
    fn from_element(element: &Element) -> Self {
        if element.elements().next().is_none() {
            return MetadataNode::Value(element.text().trim().to_string());
        }
        MetadataNode::Group(
            element
                .elements()
                .map(|child| (child.name.clone(), MetadataNode::from_element(child)))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&MetadataNode> {
        match self {
            MetadataNode::Group(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, node)| node),
            MetadataNode::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            MetadataNode::Value(value) => Some(value),
            MetadataNode::Group(_) => None,
        }
    }
}

/// File content as found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryContent {
    Plain(String),
    /// `<content>` carrying attributes; the payload is its text node.
    TextNode {
        attributes: Vec<(String, String)>,
        text: String,
    },
}

impl EntryContent {
    pub fn text(&self) -> &str {
        match self {
            EntryContent::Plain(text) => text,
            EntryContent::TextNode { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub path: Option<String>,
    pub file_type: String,
    pub content: Option<EntryContent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBundle {
    pub metadata: MetadataNode,
    pub entries: Vec<BundleEntry>,
}

impl ParsedBundle {
    pub fn created(&self) -> Option<&str> {
        self.metadata.get("created").and_then(MetadataNode::value)
    }

    pub fn project_path(&self) -> Option<&str> {
        self.metadata.get("projectPath").and_then(MetadataNode::value)
    }
}

/// Reverses [`minimal_escape`](crate::core::bundle_writer::minimal_escape).
pub fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">")
}

/// Parses a bundle document. Fails only when the envelope is unusable.
pub fn parse_bundle(text: &str) -> Result<ParsedBundle> {
    let root = parse_document(text)?;
    if root.name != "bundle" {
        return Err(BundleError::InvalidFormat(format!(
            "expected <bundle> root element, found <{}>",
            root.name
        )));
    }

    let metadata = root
        .child("metadata")
        .map(MetadataNode::from_element)
        .unwrap_or(MetadataNode::Group(Vec::new()));

    let entries: Vec<BundleEntry> = root
        .child("files")
        .map(|files| files.elements().filter(|e| e.name == "file").map(entry).collect())
        .unwrap_or_default();

    debug!("Parsed bundle with {} file entries", entries.len());
    Ok(ParsedBundle { metadata, entries })
}

fn entry(file: &Element) -> BundleEntry {
    let content = file.child("content").map(|content| {
        let text = content.text();
        if content.attributes.is_empty() {
            EntryContent::Plain(text)
        } else {
            EntryContent::TextNode {
                attributes: content.attributes.clone(),
                text,
            }
        }
    });

    BundleEntry {
        path: file.attribute("path").map(str::to_string),
        file_type: file.attribute("type").unwrap_or("text").to_string(),
        content,
    }
}

/// Parses the single root element of a document.
pub fn parse_document(text: &str) -> Result<Element> {
    let mut reader = Reader { input: text, pos: 0 };
    reader.skip_misc()?;
    if reader.at_end() {
        return Err(BundleError::InvalidFormat("document is empty".to_string()));
    }
    reader.parse_element()
}

struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn error(&self, message: &str) -> BundleError {
        BundleError::InvalidFormat(format!("{} at byte {}", message, self.pos))
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Advances past `terminator`, returning the text before it.
    fn take_until(&mut self, terminator: &str, what: &str) -> Result<&'a str> {
        match self.rest().find(terminator) {
            Some(idx) => {
                let taken = &self.rest()[..idx];
                self.pos += idx + terminator.len();
                Ok(taken)
            }
            None => Err(self.error(&format!("unterminated {what}"))),
        }
    }

    /// Skips whitespace, comments, declarations and processing instructions.
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("<?") {
                self.take_until("?>", "processing instruction")?;
            } else if rest.starts_with("<!--") {
                self.take_until("-->", "comment")?;
            } else if rest.starts_with("<!") && !rest.starts_with("<![CDATA[") {
                self.take_until(">", "declaration")?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_name(&mut self) -> Result<String> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '='))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += end;
        Ok(rest[..end].to_string())
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{token}'")))
        }
    }

    /// Parses an opening tag; the flag is true for a self-closing element.
    fn parse_open_tag(&mut self) -> Result<(Element, bool)> {
        self.expect("<")?;
        let name = self.parse_name()?;
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok((Element::new(name, attributes), true));
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                return Ok((Element::new(name, attributes), false));
            }
            if self.at_end() {
                return Err(self.error(&format!("unterminated <{name}> tag")));
            }

            let key = self.parse_name()?;
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let quote = if self.rest().starts_with('"') {
                "\""
            } else if self.rest().starts_with('\'') {
                "'"
            } else {
                return Err(self.error("expected a quoted attribute value"));
            };
            self.pos += 1;
            let value = self.take_until(quote, "attribute value")?;
            attributes.push((key, decode_entities(value)));
        }
    }

    /// Parses one element and everything inside it. Open elements live on an
    /// explicit stack, so nesting depth never grows the call stack.
    fn parse_element(&mut self) -> Result<Element> {
        let (root, self_closed) = self.parse_open_tag()?;
        if self_closed {
            return Ok(root);
        }
        let mut open = vec![root];

        loop {
            let rest = self.rest();
            if rest.is_empty() {
                let name = open.last().map_or("", |e| e.name.as_str());
                return Err(self.error(&format!("missing </{name}>")));
            }

            if rest.starts_with("</") {
                self.pos += 2;
                let closing = self.parse_name()?;
                let element = open
                    .pop()
                    .ok_or_else(|| self.error("unexpected closing tag"))?;
                if closing != element.name {
                    return Err(self.error(&format!(
                        "mismatched closing tag </{closing}> for <{}>",
                        element.name
                    )));
                }
                self.skip_whitespace();
                self.expect(">")?;
                match open.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => return Ok(element),
                }
            } else if rest.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                let payload = self.take_until("]]>", "CDATA section")?;
                push_child(&mut open, Node::CData(payload.to_string()));
            } else if rest.starts_with("<!--") {
                self.take_until("-->", "comment")?;
            } else if rest.starts_with("<?") {
                self.take_until("?>", "processing instruction")?;
            } else if rest.starts_with('<') {
                if open.len() >= MAX_DEPTH {
                    return Err(self.error(&format!(
                        "elements nested deeper than {MAX_DEPTH} levels"
                    )));
                }
                let (element, self_closed) = self.parse_open_tag()?;
                if self_closed {
                    push_child(&mut open, Node::Element(element));
                } else {
                    open.push(element);
                }
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                push_child(&mut open, Node::Text(decode_entities(&rest[..end])));
                self.pos += end;
            }
        }
    }
}

fn push_child(open: &mut [Element], node: Node) {
    if let Some(parent) = open.last_mut() {
        parent.children.push(node);
    }
}
