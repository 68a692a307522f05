//! Well-formed XML sniffing for property values

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::models::XmlElement;

fn element_from(start: &BytesStart<'_>) -> XmlElement {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut element = XmlElement::new(name);
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = match attr.unescape_value() {
            Ok(v) => v.to_string(),
            Err(_) => String::from_utf8_lossy(&attr.value).to_string(),
        };
        element.attributes.push((key, value));
    }
    element
}

/// Parse `text` as a document with exactly one root element
///
/// Returns `None` for anything that is not well-formed, has text outside the
/// root, or has more than one top-level element.
pub fn parse_single_root(text: &str) -> Option<XmlElement> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let finished = match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if root.is_some() {
                    return None;
                }
                stack.push(element_from(e));
                None
            }
            Ok(Event::Empty(ref e)) => {
                if root.is_some() {
                    return None;
                }
                Some(element_from(e))
            }
            Ok(Event::End(_)) => Some(stack.pop()?),
            Ok(Event::Text(t)) => {
                let text = t.unescape().ok()?;
                stack.last_mut()?.text.push_str(&text);
                None
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).to_string();
                stack.last_mut()?.text.push_str(&text);
                None
            }
            Ok(Event::Eof) => break,
            Ok(_) => None,
            Err(_) => return None,
        };

        if let Some(element) = finished {
            match stack.last_mut() {
                Some(parent) => parent.children.push(element),
                None => root = Some(element),
            }
        }
    }

    if stack.is_empty() { root } else { None }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Option<()> {
    let start = BytesStart::new(element.name.as_str()).with_attributes(
        element
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );
    if element.children.is_empty() && element.text.is_empty() {
        return writer.write_event(Event::Empty(start)).ok();
    }
    writer.write_event(Event::Start(start)).ok()?;
    if !element.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&element.text)))
            .ok()?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .ok()
}

/// Serialize an element tree back to markup
///
/// Direct text is written before child elements, so mixed content does not
/// keep its original interleaving.
pub fn to_xml_string(element: &XmlElement) -> Option<String> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, element)?;
    String::from_utf8(writer.into_inner()).ok()
}
