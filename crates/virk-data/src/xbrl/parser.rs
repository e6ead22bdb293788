//! XBRL instance parsing.
//!
//! Danish annual reports are filed as XBRL instance documents. Every element
//! carrying a `contextRef` attribute is a fact; contexts map a context id to
//! the reporting entity and period. Documents are decoded with the encoding
//! named in their XML declaration.

use crate::error::Result;
use chrono::{Datelike, NaiveDate};
use quick_xml::NsReader;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// XBRL instance namespace.
pub const XBRLI_NS: &str = "http://www.xbrl.org/2003/instance";

/// Reporting entity and period of a context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XbrlContext {
    /// Entity identifier, usually the CVR number
    pub identifier: Option<String>,
    /// Start of a duration period
    pub start_date: Option<String>,
    /// End of a duration period
    pub end_date: Option<String>,
    /// Point in time of an instant period
    pub instant: Option<String>,
}

/// A fact as it appears in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XbrlFact {
    /// Element local name, e.g. `ProfitLoss`
    pub tag: String,
    /// Trimmed text before the first child element; `None` when empty
    pub value: Option<String>,
    /// Referenced context id
    pub context_ref: String,
    /// Referenced unit id
    pub unit_ref: Option<String>,
    /// Declared precision
    pub decimals: Option<String>,
}

/// A fact joined with its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRecord {
    /// Element local name
    pub tag: String,
    /// Fact value
    pub value: Option<String>,
    /// Referenced context id
    pub context_ref: String,
    /// Referenced unit id
    pub unit_ref: Option<String>,
    /// Declared precision
    pub decimals: Option<String>,
    /// Entity identifier from the context
    pub identifier: Option<String>,
    /// Duration start
    pub period_start: Option<NaiveDate>,
    /// Duration end
    pub period_end: Option<NaiveDate>,
    /// Instant date
    pub period_instant: Option<NaiveDate>,
}

impl FactRecord {
    /// Whether the period ends, or the instant falls, inside `year`.
    pub fn in_year(&self, year: i32) -> bool {
        self.period_end.is_some_and(|d| d.year() == year)
            || self.period_instant.is_some_and(|d| d.year() == year)
    }
}

/// Parse the date part of an XBRL date or date-time.
pub fn parse_xbrl_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Contexts and facts of one instance document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XbrlDocument {
    /// Contexts keyed by id
    pub contexts: HashMap<String, XbrlContext>,
    /// Facts in document order
    pub facts: Vec<XbrlFact>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextField {
    Identifier,
    StartDate,
    EndDate,
    Instant,
}

impl ContextField {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"identifier" => Some(Self::Identifier),
            b"startDate" => Some(Self::StartDate),
            b"endDate" => Some(Self::EndDate),
            b"instant" => Some(Self::Instant),
            _ => None,
        }
    }

    fn slot(self, context: &mut XbrlContext) -> &mut Option<String> {
        match self {
            Self::Identifier => &mut context.identifier,
            Self::StartDate => &mut context.start_date,
            Self::EndDate => &mut context.end_date,
            Self::Instant => &mut context.instant,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenFact {
    index: usize,
    depth: usize,
    /// A child element was opened; later text is tail text.
    sealed: bool,
}

#[derive(Debug, Default)]
struct ParseState {
    depth: usize,
    context: Option<(String, XbrlContext, usize)>,
    context_field: Option<(ContextField, usize)>,
    open_facts: Vec<OpenFact>,
}

fn attribute(e: &BytesStart<'_>, name: &str, decoder: Decoder) -> Result<Option<String>> {
    match e.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.decode_and_unescape_value(decoder)?.into_owned())),
        None => Ok(None),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl XbrlDocument {
    /// Creates a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an XBRL instance document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DataError::XmlParse`] if the document is not
    /// well-formed or cannot be decoded with its declared encoding.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = NsReader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut doc = Self::new();
        let mut state = ParseState::default();
        let mut buf = Vec::new();

        loop {
            let (ns, event) = reader.read_resolved_event_into(&mut buf)?;
            let in_xbrli = matches!(ns, ResolveResult::Bound(Namespace(n)) if n == XBRLI_NS.as_bytes());
            let decoder = reader.decoder();

            match event {
                Event::Start(e) => {
                    state.depth += 1;
                    doc.open_element(&e, in_xbrli, &mut state, false, decoder)?;
                }
                Event::Empty(e) => {
                    state.depth += 1;
                    doc.open_element(&e, in_xbrli, &mut state, true, decoder)?;
                    state.depth -= 1;
                }
                Event::Text(t) => {
                    let text = t.unescape()?;
                    doc.push_text(&text, &mut state);
                }
                Event::CData(c) => {
                    let text = decoder.decode(&c).map_err(quick_xml::Error::from)?;
                    doc.push_text(&text, &mut state);
                }
                Event::End(_) => {
                    doc.close_element(&mut state);
                    state.depth = state.depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(doc)
    }

    fn open_element(
        &mut self,
        e: &BytesStart<'_>,
        in_xbrli: bool,
        state: &mut ParseState,
        empty: bool,
        decoder: Decoder,
    ) -> Result<()> {
        if let Some(open) = state.open_facts.last_mut()
            && state.depth > open.depth
        {
            open.sealed = true;
        }

        let local = e.local_name();
        let local = local.as_ref();

        if in_xbrli && local == b"context" {
            if let Some(id) = attribute(e, "id", decoder)?
                && !empty
            {
                state.context = Some((id, XbrlContext::default(), state.depth));
            }
            return Ok(());
        }

        if in_xbrli && state.context.is_some() && !empty {
            if let Some(field) = ContextField::from_local_name(local) {
                state.context_field = Some((field, state.depth));
            }
            return Ok(());
        }

        if let Some(context_ref) = attribute(e, "contextRef", decoder)? {
            let tag = decoder
                .decode(local)
                .map_err(quick_xml::Error::from)?
                .trim()
                .to_string();
            self.facts.push(XbrlFact {
                tag,
                value: None,
                context_ref,
                unit_ref: non_empty(attribute(e, "unitRef", decoder)?),
                decimals: non_empty(attribute(e, "decimals", decoder)?),
            });
            if !empty {
                state.open_facts.push(OpenFact {
                    index: self.facts.len() - 1,
                    depth: state.depth,
                    sealed: false,
                });
            }
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str, state: &mut ParseState) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        if let (Some((field, depth)), Some((_, context, _))) =
            (state.context_field, state.context.as_mut())
            && depth == state.depth
        {
            append(field.slot(context), text);
            return;
        }

        if let Some(open) = state.open_facts.last()
            && open.depth == state.depth
            && !open.sealed
        {
            append(&mut self.facts[open.index].value, text);
        }
    }

    fn close_element(&mut self, state: &mut ParseState) {
        if state
            .context_field
            .is_some_and(|(_, depth)| depth == state.depth)
        {
            state.context_field = None;
        }

        if state
            .context
            .as_ref()
            .is_some_and(|(_, _, depth)| *depth == state.depth)
            && let Some((id, context, _)) = state.context.take()
        {
            self.contexts.insert(id, context);
        }

        if state
            .open_facts
            .last()
            .is_some_and(|open| open.depth == state.depth)
        {
            state.open_facts.pop();
        }
    }

    /// Join every fact with its context.
    ///
    /// Facts referencing an unknown context keep `None` for the context
    /// fields.
    pub fn fact_records(&self) -> Vec<FactRecord> {
        self.facts
            .iter()
            .map(|fact| {
                let context = self.contexts.get(&fact.context_ref);
                FactRecord {
                    tag: fact.tag.clone(),
                    value: fact.value.clone(),
                    context_ref: fact.context_ref.clone(),
                    unit_ref: fact.unit_ref.clone(),
                    decimals: fact.decimals.clone(),
                    identifier: context.and_then(|c| c.identifier.clone()),
                    period_start: context_date(context, |c| c.start_date.as_deref()),
                    period_end: context_date(context, |c| c.end_date.as_deref()),
                    period_instant: context_date(context, |c| c.instant.as_deref()),
                }
            })
            .collect()
    }

    /// Distinct fact tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.facts.iter().map(|f| f.tag.clone()).collect();
        tags.sort();
        tags.dedup();
        tags
    }
}

fn context_date(
    context: Option<&XbrlContext>,
    pick: impl Fn(&XbrlContext) -> Option<&str>,
) -> Option<NaiveDate> {
    context.and_then(pick).and_then(parse_xbrl_date)
}

fn append(slot: &mut Option<String>, text: &str) {
    match slot {
        Some(existing) => existing.push_str(text),
        None => *slot = Some(text.to_string()),
    }
}
