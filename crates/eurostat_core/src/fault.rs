//! Structured error documents returned by the API.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// A SOAP fault, returned in place of data when the API rejects a request or
/// has nothing to return.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fault {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl Fault {
    /// Human readable description of the fault.
    pub fn description(&self) -> &str {
        self.message
            .as_deref()
            .or(self.code.as_deref())
            .unwrap_or("unknown fault")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaultField {
    Code,
    Message,
}

/// Try to parse a fault document.
///
/// Returns `None` if the body isn't well formed xml or the root element isn't
/// a `Fault`, optionally wrapped in a SOAP envelope.
pub fn parse_fault(body: &str) -> Option<Fault> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut fault: Option<Fault> = None;
    let mut field: Option<FaultField> = None;

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) => match (fault.is_some(), e.local_name().as_ref()) {
                (false, b"Fault") => fault = Some(Fault::default()),
                (false, b"Envelope" | b"Body") => (),
                (false, _) => return None,
                (true, b"faultcode") => field = Some(FaultField::Code),
                (true, b"faultstring") => field = Some(FaultField::Message),
                _ => (),
            },
            Event::Empty(e) => {
                if fault.is_none() {
                    return (e.local_name().as_ref() == b"Fault").then(Fault::default);
                }
            }
            Event::Text(text) => {
                if let (Some(fault), Some(field)) = (fault.as_mut(), field) {
                    let text = text.unescape().ok()?.into_owned();
                    match field {
                        FaultField::Code => fault.code = Some(text),
                        FaultField::Message => fault.message = Some(text),
                    }
                }
            }
            Event::End(_) => field = None,
            Event::Eof => return fault,
            _ => (),
        }
    }
}
