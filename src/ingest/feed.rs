// src/ingest/feed.rs
//! Syndication feed parsing (RSS 2.0, RSS 1.0/RDF, Atom) into `RawEntry` values.
//!
//! Feeds in the wild mix namespaces freely (`atom:link` next to `link`,
//! `dc:title` next to `title`) and carry HTML entities an XML parser rejects,
//! so entries are read from the raw event stream instead of a serde model.
use anyhow::{bail, Context, Result};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

use crate::ingest::types::RawEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedFormat {
    Rss,
    Rdf,
    Atom,
}

impl FeedFormat {
    fn from_root(local: &[u8]) -> Result<Self> {
        match local {
            b"rss" => Ok(FeedFormat::Rss),
            b"RDF" => Ok(FeedFormat::Rdf),
            b"feed" => Ok(FeedFormat::Atom),
            other => bail!(
                "unsupported feed root <{}>",
                String::from_utf8_lossy(other)
            ),
        }
    }

    fn entry_tag(self) -> &'static [u8] {
        match self {
            FeedFormat::Rss | FeedFormat::Rdf => b"item",
            FeedFormat::Atom => b"entry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Summary,
    Content,
    Published,
    Updated,
    DcDate,
}

impl Field {
    /// Field for a child element of an entry. `native` is true when the element
    /// lives in the feed's own namespace.
    fn for_element(format: FeedFormat, native: bool, local: &[u8]) -> Option<Self> {
        if !native {
            return match local {
                b"date" if format != FeedFormat::Atom => Some(Field::DcDate),
                _ => None,
            };
        }
        match (format, local) {
            (_, b"title") => Some(Field::Title),
            (_, b"link") => Some(Field::Link),
            (FeedFormat::Atom, b"summary") => Some(Field::Summary),
            (FeedFormat::Atom, b"content") => Some(Field::Content),
            (FeedFormat::Atom, b"published") => Some(Field::Published),
            (FeedFormat::Atom, b"updated") => Some(Field::Updated),
            (_, b"description") => Some(Field::Summary),
            (_, b"pubDate") => Some(Field::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct EntryBuilder {
    title: Option<String>,
    link: Option<String>,
    atom_links: Vec<(Option<String>, String)>,
    summary: Option<String>,
    content: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    dc_date: Option<String>,
}

impl EntryBuilder {
    /// First occurrence wins, like a reader skimming the entry top-down.
    fn set(&mut self, field: Field, text: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::DcDate => &mut self.dc_date,
        };
        if slot.is_none() {
            *slot = Some(text);
        }
    }

    /// `rel="alternate"` (or no rel) wins over other link relations.
    fn best_atom_link(&self) -> Option<String> {
        self.atom_links
            .iter()
            .find(|(rel, _)| matches!(rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.atom_links.first())
            .map(|(_, href)| href.clone())
    }

    fn finish(self) -> RawEntry {
        let link = self
            .best_atom_link()
            .or(self.link)
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        let trimmed = |s: Option<String>| {
            s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };
        RawEntry {
            title: self.title.map(|t| clean_text(&t)),
            summary: self.summary.or(self.content).map(|s| clean_text(&s)),
            link,
            published: trimmed(self.published).or_else(|| trimmed(self.dc_date)),
            updated: trimmed(self.updated),
        }
    }
}

/// Decode HTML entities left in the text and strip embedded markup.
fn clean_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    let decoded = html_escape::decode_html_entities(s).replace('\u{a0}', " ");
    re_tags.replace_all(&decoded, " ").to_string()
}

/// Attribute value with HTML entities resolved; malformed attributes are skipped.
fn attr(e: &BytesStart<'_>, decoder: Decoder, name: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| {
            decoder
                .decode(&a.value)
                .ok()
                .map(|v| html_escape::decode_html_entities(&v).into_owned())
        })
}

/// Entry currently being read, with the open field (if any) and its depth.
struct OpenEntry {
    depth: usize,
    builder: EntryBuilder,
    field: Option<(Field, usize, String)>,
}

/// Parse a feed document into entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<RawEntry>> {
    let t0 = std::time::Instant::now();

    let mut reader = Reader::from_str(xml);
    let decoder = reader.decoder();

    let mut format: Option<FeedFormat> = None;
    // Namespace prefix of the root element; entry children sharing it are native.
    let mut root_prefix: Option<Vec<u8>> = None;
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut entry: Option<OpenEntry> = None;
    let mut entries: Vec<RawEntry> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("reading feed xml at byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.name();
                let local = name.local_name();
                let prefix = name.prefix().map(|p| p.as_ref().to_vec());

                let fmt = match format {
                    Some(f) => f,
                    None => {
                        let f = FeedFormat::from_root(local.as_ref())?;
                        format = Some(f);
                        root_prefix = prefix.clone();
                        f
                    }
                };
                let native = match fmt {
                    FeedFormat::Atom => prefix == root_prefix,
                    FeedFormat::Rss | FeedFormat::Rdf => prefix.is_none(),
                };
                let depth = open.len();

                match entry.as_mut() {
                    None if native && local.as_ref() == fmt.entry_tag() => {
                        if is_empty {
                            entries.push(EntryBuilder::default().finish());
                        } else {
                            entry = Some(OpenEntry {
                                depth,
                                builder: EntryBuilder::default(),
                                field: None,
                            });
                        }
                    }
                    Some(cur) if cur.field.is_none() && depth == cur.depth + 1 => {
                        let field = Field::for_element(fmt, native, local.as_ref());
                        if field == Some(Field::Link) {
                            if let Some(href) = attr(e, decoder, b"href") {
                                cur.builder.atom_links.push((attr(e, decoder, b"rel"), href));
                            }
                        }
                        if let (Some(f), false) = (field, is_empty) {
                            cur.field = Some((f, depth, String::new()));
                        }
                    }
                    _ => {}
                }

                if !is_empty {
                    open.push(name.as_ref().to_vec());
                }
            }
            Event::End(_) => {
                // The reader already rejects mismatched end tags.
                open.pop();
                let depth = open.len();
                if let Some(cur) = entry.as_mut() {
                    if matches!(cur.field, Some((_, d, _)) if d == depth) {
                        if let Some((f, _, text)) = cur.field.take() {
                            cur.builder.set(f, text);
                        }
                    } else if depth == cur.depth {
                        if let Some(done) = entry.take() {
                            entries.push(done.builder.finish());
                        }
                    }
                }
            }
            Event::Text(ref t) => {
                if let Some((_, _, buf)) = entry.as_mut().and_then(|c| c.field.as_mut()) {
                    buf.push_str(&decoder.decode(t).context("decoding feed text")?);
                }
            }
            Event::CData(ref c) => {
                if let Some((_, _, buf)) = entry.as_mut().and_then(|c| c.field.as_mut()) {
                    buf.push_str(&decoder.decode(c).context("decoding feed cdata")?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if format.is_none() {
        bail!("empty feed document");
    }
    if let Some(unclosed) = open.last() {
        bail!(
            "feed document ends inside <{}>",
            String::from_utf8_lossy(unclosed)
        );
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_events_total").increment(entries.len() as u64);
    Ok(entries)
}
