//! XML responses as JSON values
//!
//! Elements with child elements become objects, text-only elements become
//! strings and empty elements become null. An element whose children are
//! all `<member>` becomes an array, which is how the AWS query protocol
//! encodes lists. Repeated sibling elements are gathered into an array.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::collections::HashSet;

const LIST_MEMBER: &str = "member";

struct Element {
    name: String,
    children: Vec<(String, Value)>,
    text: String,
}

impl Element {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
            text: String::new(),
        }
    }

    fn into_value(self) -> Value {
        if self.children.is_empty() {
            let text = self.text.trim();
            if text.is_empty() {
                return Value::Null;
            }
            return Value::String(text.to_string());
        }

        if self.children.iter().all(|(name, _)| name == LIST_MEMBER) {
            return Value::Array(self.children.into_iter().map(|(_, v)| v).collect());
        }

        let mut map = Map::new();
        let mut repeated: HashSet<String> = HashSet::new();
        for (name, value) in self.children {
            if repeated.contains(&name) {
                if let Some(Value::Array(items)) = map.get_mut(&name) {
                    items.push(value);
                }
                continue;
            }
            match map.remove(&name) {
                Some(first) => {
                    repeated.insert(name.clone());
                    map.insert(name, Value::Array(vec![first, value]));
                }
                None => {
                    map.insert(name, value);
                }
            }
        }
        Value::Object(map)
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Parse a document into its root element name and value
pub fn parse(xml: &str) -> Result<(String, Value), String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => stack.push(Element::new(local_name(e.local_name().as_ref()))),
            Event::Empty(e) => {
                let name = local_name(e.local_name().as_ref());
                match stack.last_mut() {
                    Some(parent) => parent.children.push((name, Value::Null)),
                    None => return Ok((name, Value::Null)),
                }
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|e| e.to_string())?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err("unbalanced closing tag".to_string());
                };
                let name = element.name.clone();
                let value = element.into_value();
                match stack.last_mut() {
                    Some(parent) => parent.children.push((name, value)),
                    None => return Ok((name, value)),
                }
            }
            Event::Eof => return Err("document has no root element".to_string()),
            _ => {}
        }
    }
}
