//! Syndication XML parsing.
//!
//! Walks `channel/item` elements with a streaming reader and collects
//! `(title, link, homepage)` triples in document order. The link comes from
//! `<link>` or, failing that, an `<enclosure url="..."/>` attribute.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::types::{Candidate, FeedError};

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    link: Option<String>,
    enclosure: Option<String>,
    homepage: Option<String>,
}

impl ItemBuilder {
    fn build(self) -> Option<Candidate> {
        let url = self.link.or(self.enclosure)?;
        Some(Candidate {
            name: self.title?,
            url,
            homepage: self.homepage,
        })
    }
}

fn enclosure_url(e: &BytesStart<'_>) -> Option<String> {
    for attr in e.attributes().filter_map(|a| a.ok()) {
        if attr.key.as_ref() == b"url" {
            return Some(String::from_utf8_lossy(attr.value.as_ref()).to_string());
        }
    }
    None
}

/// Parse a syndication document into candidates in document order.
///
/// `limit == 0` returns every item; otherwise the list is truncated to the
/// first `limit` items.
pub fn parse_feed(xml: &[u8], limit: usize) -> Result<Vec<Candidate>, FeedError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut candidates = Vec::new();
    let mut buf = Vec::new();

    let mut current: Option<ItemBuilder> = None;
    let mut current_element = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" {
                    current = Some(ItemBuilder::default());
                } else if name == "enclosure" {
                    if let Some(ref mut item) = current {
                        item.enclosure = enclosure_url(&e);
                    }
                }
                current_element = name;
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"enclosure" {
                    if let Some(ref mut item) = current {
                        item.enclosure = enclosure_url(&e);
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" {
                    if let Some(builder) = current.take() {
                        if let Some(candidate) = builder.build() {
                            candidates.push(candidate);
                            if limit > 0 && candidates.len() >= limit {
                                return Ok(candidates);
                            }
                        }
                    }
                }
                current_element.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(ref mut item) = current {
                    let text = e.unescape().unwrap_or_default().to_string();
                    if !text.is_empty() {
                        match current_element.as_str() {
                            "title" => item.title = Some(text),
                            "link" => item.link = Some(text),
                            "guid" | "homepage" => item.homepage = Some(text),
                            _ => {}
                        }
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(ref mut item) = current {
                    if current_element == "title" {
                        item.title = Some(String::from_utf8_lossy(e.as_ref()).to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(candidates)
}
