//! Minimal markup reader for the agent's descriptive blobs.
//!
//! The agent emits a small, regular subset of XML: an optional prolog,
//! elements with double-quoted attributes, self-closing tags, and plain
//! text (only `<size>` carries any). This reader handles exactly that
//! subset plus comments and the five predefined entities.

use crate::error::PayloadError;

/// Nesting limit; agent documents are at most four levels deep.
const MAX_DEPTH: usize = 32;

/// One parsed element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<Element>,
    /// Concatenated, trimmed text content.
    pub text: String,
}

impl Element {
    /// Parses a complete document and returns its root element.
    pub fn parse(input: &str) -> Result<Element, PayloadError> {
        let mut cursor = Cursor { src: input, pos: 0 };
        cursor.skip_misc()?;
        let root = parse_element(&mut cursor, 0)?;
        cursor.skip_misc()?;
        if !cursor.rest().is_empty() {
            return Err(cursor.error("trailing content after root element"));
        }
        Ok(root)
    }

    /// Decodes a wire blob and parses it. Blobs are declared ISO-8859-1;
    /// bytes that are not valid UTF-8 are mapped one-to-one onto Latin-1.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Element, PayloadError> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::parse(text),
            Err(_) => {
                let text: String = bytes.iter().map(|&b| char::from(b)).collect();
                Self::parse(&text)
            }
        }
    }

    /// Value of an attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of an attribute that must be present.
    pub fn required_attr(&self, name: &'static str) -> Result<&str, PayloadError> {
        self.attr(name).ok_or_else(|| PayloadError::MissingAttribute {
            element: self.name.clone(),
            attribute: name,
        })
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child with the given name, which must exist.
    pub fn required_child(&self, name: &'static str) -> Result<&Element, PayloadError> {
        self.child(name).ok_or(PayloadError::MissingElement(name))
    }

    /// Required attribute parsed as a decimal number.
    pub fn number_attr<T: std::str::FromStr>(&self, name: &'static str) -> Result<T, PayloadError> {
        let raw = self.required_attr(name)?;
        raw.trim().parse().map_err(|_| PayloadError::InvalidValue {
            field: name,
            value: raw.to_string(),
        })
    }

    /// Required attribute parsed as a boolean (`true`/`false`/`1`/`0`).
    pub fn bool_attr(&self, name: &'static str) -> Result<bool, PayloadError> {
        let raw = self.required_attr(name)?;
        parse_bool(raw).ok_or_else(|| PayloadError::InvalidValue {
            field: name,
            value: raw.to_string(),
        })
    }

    /// All children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Booleans as the agent writes them.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> PayloadError {
        PayloadError::Markup {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), PayloadError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{token}'")))
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Consumes everything up to and including `token`, returning the text
    /// before it.
    fn take_until(&mut self, token: &str) -> Result<&'a str, PayloadError> {
        let rest = self.rest();
        match rest.find(token) {
            Some(end) => {
                self.pos += end + token.len();
                Ok(&rest[..end])
            }
            None => Err(self.error(format!("unterminated construct, missing '{token}'"))),
        }
    }

    /// Whitespace, processing instructions and comments outside the root.
    fn skip_misc(&mut self) -> Result<(), PayloadError> {
        loop {
            self.skip_whitespace();
            if self.eat("<?") {
                self.take_until("?>")?;
            } else if self.eat("<!--") {
                self.take_until("-->")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<&'a str, PayloadError> {
        let rest = self.rest();
        let len = rest
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | ':' | '.')))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }
}

fn parse_element(cursor: &mut Cursor<'_>, depth: usize) -> Result<Element, PayloadError> {
    if depth > MAX_DEPTH {
        return Err(cursor.error("elements nested too deeply"));
    }
    cursor.expect("<")?;
    let mut element = Element {
        name: cursor.name()?.to_string(),
        ..Element::default()
    };

    loop {
        cursor.skip_whitespace();
        if cursor.eat("/>") {
            return Ok(element);
        }
        if cursor.eat(">") {
            break;
        }
        let key = cursor.name()?.to_string();
        cursor.skip_whitespace();
        cursor.expect("=")?;
        cursor.skip_whitespace();
        let raw = if cursor.eat("\"") {
            cursor.take_until("\"")?
        } else if cursor.eat("'") {
            cursor.take_until("'")?
        } else {
            return Err(cursor.error("expected a quoted attribute value"));
        };
        let value = unescape(raw).map_err(|m| cursor.error(m))?;
        element.attributes.push((key, value));
    }

    let mut text = String::new();
    loop {
        if cursor.eat("</") {
            let close = cursor.name()?;
            if close != element.name {
                return Err(cursor.error(format!(
                    "closing tag </{close}> does not match <{}>",
                    element.name
                )));
            }
            cursor.skip_whitespace();
            cursor.expect(">")?;
            break;
        }
        if cursor.eat("<!--") {
            cursor.take_until("-->")?;
            continue;
        }
        if cursor.rest().starts_with('<') {
            element.children.push(parse_element(cursor, depth + 1)?);
            continue;
        }
        if cursor.rest().is_empty() {
            return Err(cursor.error(format!("unclosed element <{}>", element.name)));
        }
        let rest = cursor.rest();
        let end = rest.find('<').unwrap_or(rest.len());
        text.push_str(&unescape(&rest[..end]).map_err(|m| cursor.error(m))?);
        cursor.pos += end;
    }
    element.text = text.trim().to_string();
    Ok(element)
}

fn unescape(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find(';')
            .ok_or_else(|| format!("unterminated entity in '{raw}'"))?;
        let entity = &after[..end];
        let ch = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(|dec| dec.parse::<u32>()))
                .and_then(|code| code.ok())
                .and_then(char::from_u32)
                .ok_or_else(|| format!("unknown entity '&{entity};'"))?,
        };
        out.push(ch);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
