//! XML tree – an owned, editable element tree for one package part.
//!
//! Parts are read with `quick-xml` into [`XmlNode`]s and written back with
//! the same crate. Anything that is not an element or character data
//! (declaration, comments, processing instructions, CDATA) is carried
//! through untouched as a raw event.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

// ---------------------------------------------------------------------------
// Tree types
// ---------------------------------------------------------------------------

/// A node in a part's tree.
#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(ElementNode),
    /// Unescaped character data.
    Text(String),
    Raw(Event<'static>),
}

/// An element with its qualified name, attributes (unescaped) and children.
#[derive(Debug, Clone, Default)]
pub struct ElementNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl ElementNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(p, _)| p)
    }

    /// Build a qualified name in this element's namespace prefix.
    pub fn qualify(&self, local_name: &str) -> String {
        match self.prefix() {
            Some(p) => format!("{p}:{local_name}"),
            None => local_name.to_string(),
        }
    }

    /// Attribute value by local name, ignoring the prefix.
    pub fn attr(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| local(k) == local_name)
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &ElementNode> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut ElementNode> {
        self.children.iter_mut().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Direct child elements with the given local name.
    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a ElementNode> {
        self.elements().filter(move |e| e.local_name() == local_name)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a mut ElementNode> {
        self.elements_mut().filter(move |e| e.local_name() == local_name)
    }

    pub fn child(&self, local_name: &str) -> Option<&ElementNode> {
        self.elements().find(|e| e.local_name() == local_name)
    }

    /// Concatenated character data of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn local(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, l)| l).unwrap_or(name)
}

/// A parsed part: the top-level node list (declaration, whitespace, root).
#[derive(Debug, Clone, Default)]
pub struct XmlDocument {
    pub nodes: Vec<XmlNode>,
}

impl XmlDocument {
    pub fn root(&self) -> Option<&ElementNode> {
        self.nodes.iter().find_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn root_mut(&mut self) -> Option<&mut ElementNode> {
        self.nodes.iter_mut().find_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse XML bytes into a tree. Errors carry a human-readable message.
pub fn parse_xml(bytes: &[u8]) -> Result<XmlDocument, String> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<ElementNode> = Vec::new();
    let mut doc = XmlDocument::default();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| format!("at byte {}: {e}", reader.buffer_position()))?;

        let node = match event {
            Event::Start(start) => {
                stack.push(element_from(&start)?);
                None
            }
            Event::Empty(start) => Some(XmlNode::Element(element_from(&start)?)),
            Event::End(_) => {
                let elem = stack.pop().ok_or("unbalanced end tag")?;
                Some(XmlNode::Element(elem))
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| e.to_string())?;
                Some(XmlNode::Text(text.into_owned()))
            }
            Event::Eof => break,
            other => Some(XmlNode::Raw(other.into_owned())),
        };

        if let Some(node) = node {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => doc.nodes.push(node),
            }
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    if doc.root().is_none() {
        return Err("no root element".to_string());
    }
    Ok(doc)
}

fn element_from(start: &BytesStart<'_>) -> Result<ElementNode, String> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| e.to_string())?
        .to_string();
    let mut elem = ElementNode::new(name);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| e.to_string())?
            .to_string();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        elem.attributes.push((key, value.into_owned()));
    }
    Ok(elem)
}

// ---------------------------------------------------------------------------
// Serialisation
// ---------------------------------------------------------------------------

/// Serialise a tree back to bytes.
pub fn write_xml(doc: &XmlDocument) -> Result<Vec<u8>, String> {
    let mut writer = Writer::new(Vec::new());
    for node in &doc.nodes {
        write_node(&mut writer, node)?;
    }
    Ok(writer.into_inner())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), String> {
    match node {
        XmlNode::Element(elem) => {
            let start = BytesStart::new(elem.name.as_str()).with_attributes(
                elem.attributes
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            );
            if elem.children.is_empty() {
                emit(writer, Event::Empty(start))?;
            } else {
                emit(writer, Event::Start(start))?;
                for child in &elem.children {
                    write_node(writer, child)?;
                }
                emit(writer, Event::End(BytesEnd::new(elem.name.as_str())))?;
            }
        }
        XmlNode::Text(text) => emit(writer, Event::Text(BytesText::new(text)))?,
        XmlNode::Raw(event) => emit(writer, event.clone())?,
    }
    Ok(())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| e.to_string())
}
