// Wire helpers for the directory service's SOAP-like protocol: one builder
// for request envelopes and one generic decoder for responses. Every remote
// operation goes through these two halves instead of hand-writing XML.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Namespace the service uses for operation payloads.
pub const USERS_NS: &str = "http://actu.com/users";
/// Namespace for the bearer-token header block.
pub const SECURITY_NS: &str = "http://actu.com/security";
const SOAPENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// An open, schema-less record decoded from a response element: each direct
/// child's local name (namespace prefix stripped) maps to its text content.
pub type Record = BTreeMap<String, String>;

/// Builder for a request envelope. The operation name becomes the
/// `usr:{op}Request` body element; fields and groups are appended in call
/// order; attaching a bearer token adds the `sec:Authorization` header and
/// the security namespace declaration.
pub struct Envelope {
    op: String,
    token: Option<String>,
    fields: String,
}

impl Envelope {
    pub fn request(op: &str) -> Self {
        Envelope {
            op: op.to_string(),
            token: None,
            fields: String::new(),
        }
    }

    /// Attach the session token as a bearer credential.
    pub fn bearer(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Append a `usr:`-qualified text field. The value is XML-escaped.
    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields
            .push_str(&format!("<usr:{name}>{}</usr:{name}>", escape(value)));
        self
    }

    /// Append a `usr:`-qualified wrapper element containing text fields,
    /// e.g. the `<usr:user>` block of create/update requests.
    pub fn group(mut self, name: &str, fields: &[(&str, &str)]) -> Self {
        self.fields.push_str(&format!("<usr:{name}>"));
        for (field, value) in fields {
            self.fields
                .push_str(&format!("<usr:{field}>{}</usr:{field}>", escape(value)));
        }
        self.fields.push_str(&format!("</usr:{name}>"));
        self
    }

    /// Render the complete envelope.
    pub fn build(self) -> String {
        let sec_decl = if self.token.is_some() {
            format!(" xmlns:sec=\"{SECURITY_NS}\"")
        } else {
            String::new()
        };
        let header = match &self.token {
            Some(token) => format!("<sec:Authorization>Bearer {}</sec:Authorization>", escape(token)),
            None => String::new(),
        };
        format!(
            "<soapenv:Envelope xmlns:soapenv=\"{SOAPENV_NS}\" xmlns:usr=\"{USERS_NS}\"{sec_decl}>\
             <soapenv:Header>{header}</soapenv:Header>\
             <soapenv:Body><usr:{op}Request>{fields}</usr:{op}Request></soapenv:Body>\
             </soapenv:Envelope>",
            op = self.op,
            fields = self.fields,
        )
    }
}

fn local_name_of(event: &quick_xml::events::BytesStart<'_>) -> String {
    String::from_utf8_lossy(event.local_name().as_ref()).into_owned()
}

/// Collect every element whose local tag name matches, at any nesting depth,
/// and decode each into a [`Record`]. Zero matches is an empty vec, not an
/// error; malformed XML is.
pub fn records_with_tag(xml: &str, tag: &str) -> Result<Vec<Record>> {
    let mut reader = Reader::from_str(xml);
    let mut records = Vec::new();
    loop {
        match reader.read_event().context("Malformed XML in response")? {
            Event::Start(start) if start.local_name().as_ref() == tag.as_bytes() => {
                let end = start.name().as_ref().to_vec();
                records.push(read_record(&mut reader, &end)?);
            }
            Event::Empty(start) if start.local_name().as_ref() == tag.as_bytes() => {
                records.push(Record::new());
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(records)
}

fn read_record<'a>(reader: &mut Reader<&'a [u8]>, end: &[u8]) -> Result<Record> {
    let mut record = Record::new();
    loop {
        match reader.read_event().context("Malformed XML in response")? {
            Event::Start(child) => {
                let key = local_name_of(&child);
                let value = reader
                    .read_text(child.name())
                    .context("Malformed XML in response")?
                    .into_owned();
                record.insert(key, value);
            }
            Event::Empty(child) => {
                record.insert(local_name_of(&child), String::new());
            }
            Event::End(e) if e.name().as_ref() == end => break,
            Event::Eof => bail!(
                "Unexpected end of document inside <{}>",
                String::from_utf8_lossy(end)
            ),
            _ => {}
        }
    }
    Ok(record)
}

/// Text content of the first element with the given local tag name, anywhere
/// in the document. `None` when no such element exists.
pub fn first_text(xml: &str, tag: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().context("Malformed XML in response")? {
            Event::Start(start) if start.local_name().as_ref() == tag.as_bytes() => {
                let text = reader
                    .read_text(start.name())
                    .context("Malformed XML in response")?
                    .into_owned();
                return Ok(Some(text));
            }
            Event::Empty(start) if start.local_name().as_ref() == tag.as_bytes() => {
                return Ok(Some(String::new()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}
