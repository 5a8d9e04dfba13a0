//! Owned XML element tree
//!
//! The catalog feeds are small enough to read completely before any record is
//! extracted. Attributes and child elements are both reachable through
//! [`Element::value`], so extraction code does not care which one the
//! publisher used for a scalar.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, quick_xml::Error> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    /// Parse a complete document and return its root element
    pub fn parse(bytes: &[u8]) -> Result<Element, String> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| format!("at byte {}: {}", reader.buffer_position(), e))?;

            match event {
                Event::Start(start) => {
                    stack.push(Element::from_start(&start).map_err(|e| e.to_string())?);
                }
                Event::Empty(start) => {
                    let element = Element::from_start(&start).map_err(|e| e.to_string())?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| "closing tag without opening tag".to_string())?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&text.unescape().map_err(|e| e.to_string())?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(format!("unclosed element <{}>", open.name));
        }
        root.ok_or_else(|| "document has no root element".to_string())
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Trimmed text content, `None` when empty
    pub fn text(&self) -> Option<String> {
        non_empty(&self.text)
    }

    /// Scalar lookup: attribute `key`, else the text of child `<key>`
    pub fn value(&self, key: &str) -> Option<String> {
        self.attr(key)
            .and_then(non_empty)
            .or_else(|| self.child(key).and_then(Element::text))
    }

    /// Integer scalar; unparsable values count as absent
    pub fn int_value(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(|v| v.parse().ok())
    }

    /// `true` only for the literal attribute/text `"true"`
    pub fn flag(&self, key: &str) -> bool {
        self.value(key).as_deref() == Some("true")
    }

    /// Text of the first `<key lang="...">` child in the preferred language
    pub fn localized(&self, key: &str, lang: &str) -> Option<String> {
        self.children
            .iter()
            .filter(|c| c.name == key)
            .find(|c| c.attr("lang") == Some(lang))
            .and_then(Element::text)
    }

    /// Localized text of `<child><name lang=...>` (the common feed shape)
    pub fn localized_name(&self, child: &str, lang: &str) -> Option<String> {
        self.child(child).and_then(|c| c.localized("name", lang))
    }

    /// All `<item>` elements inside every `<container>` child, in document order.
    ///
    /// A container with a single item and a container with many items yield
    /// the same shape, and a missing container yields an empty sequence. Every
    /// repeated structure of the feeds is read through this function.
    pub fn items<'a>(&'a self, container: &str, item: &str) -> Vec<&'a Element> {
        self.children
            .iter()
            .filter(|c| c.name == container)
            .flat_map(|c| c.children.iter().filter(|i| i.name == item))
            .collect()
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(format!("second root element <{}>", element.name))
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
