use std::collections::HashMap;

use url::form_urlencoded;

use crate::dom::NodeId;
use crate::network::{Method, MockResponse, PendingRequest};
use crate::page::{EventKind, EventState, Page, WidgetId, WidgetKind};
use crate::wire::{CityRecord, CitySearchResponse};
use crate::{Error, Result};

/// Element ids and tuning for a [`Page::attach_city_autocomplete`] call.
/// Defaults match the registration page markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityAutocompleteConfig {
    pub input_id: String,
    pub datalist_id: String,
    pub endpoint: String,
    pub debounce_ms: i64,
}

impl Default for CityAutocompleteConfig {
    fn default() -> Self {
        Self {
            input_id: "city".into(),
            datalist_id: "city-suggestions".into(),
            endpoint: "/api/search-cities".into(),
            debounce_ms: 300,
        }
    }
}

/// Debounced city-name autocomplete.
///
/// Keystrokes on the bound input restart a debounce timer; when it fires, the
/// captured query is sent to the search endpoint and the datalist options plus
/// the set of submittable city names are replaced from the response. Responses
/// carry a per-widget sequence number and only the latest issued one is ever
/// applied, so a slow earlier lookup can not overwrite a newer result. The
/// enclosing form's submission is blocked (alert + refocus) unless the trimmed
/// input value exactly matches one of the current suggestion names.
#[derive(Debug)]
pub(crate) struct CityAutocomplete {
    id: WidgetId,
    input: NodeId,
    datalist: NodeId,
    form: NodeId,
    endpoint: String,
    debounce_ms: i64,
    timer: Option<i64>,
    pending_query: Option<String>,
    valid_cities: Vec<String>,
    next_seq: u64,
}

impl Page {
    pub fn attach_city_autocomplete(
        &mut self,
        config: CityAutocompleteConfig,
    ) -> Result<WidgetId> {
        let input = self.select_one(&format!("#{}", config.input_id))?;
        let input_tag = self
            .dom
            .tag_name(input)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if input_tag != "input" {
            return Err(Error::TypeMismatch {
                selector: format!("#{}", config.input_id),
                expected: "input".into(),
                actual: input_tag,
            });
        }

        let datalist = self.select_one(&format!("#{}", config.datalist_id))?;
        let datalist_tag = self
            .dom
            .tag_name(datalist)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if datalist_tag != "datalist" {
            return Err(Error::TypeMismatch {
                selector: format!("#{}", config.datalist_id),
                expected: "datalist".into(),
                actual: datalist_tag,
            });
        }

        let form = self
            .dom
            .find_ancestor_by_tag(input, "form")
            .ok_or_else(|| {
                Error::Runtime(format!(
                    "input #{} has no enclosing form",
                    config.input_id
                ))
            })?;

        let id = self.register_widget(|id| {
            WidgetKind::CityAutocomplete(CityAutocomplete {
                id,
                input,
                datalist,
                form,
                endpoint: config.endpoint,
                debounce_ms: config.debounce_ms,
                timer: None,
                pending_query: None,
                valid_cities: Vec::new(),
                next_seq: 0,
            })
        });
        self.add_listener(input, EventKind::Input, id);
        self.add_listener(form, EventKind::Submit, id);
        self.trace_event_line(format!(
            "[event] attach city-autocomplete widget={} input=#{}",
            id.0, config.input_id
        ));
        Ok(id)
    }
}

impl CityAutocomplete {
    pub(crate) fn on_event(&mut self, page: &mut Page, event: &mut EventState) -> Result<()> {
        match event.kind {
            EventKind::Input if event.target == self.input => self.on_input(page),
            EventKind::Submit if event.target == self.form => self.on_submit(page, event),
            _ => Ok(()),
        }
    }

    fn on_input(&mut self, page: &mut Page) -> Result<()> {
        // Every keystroke cancels the previous lookup, even one that shrinks
        // the query below the minimum length.
        if let Some(timer) = self.timer.take() {
            page.clear_timeout(timer);
        }
        self.pending_query = None;

        let query = page.dom.value(self.input)?;
        if query.chars().count() < 2 {
            self.valid_cities.clear();
            return Ok(());
        }

        self.pending_query = Some(query);
        self.timer = Some(page.set_timeout(self.id, self.debounce_ms));
        Ok(())
    }

    pub(crate) fn on_timer(&mut self, page: &mut Page) -> Result<()> {
        self.timer = None;
        let Some(query) = self.pending_query.take() else {
            return Ok(());
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair("q", &query)
            .finish();
        let url = format!("{}?{encoded}", self.endpoint);
        page.issue_request(self.id, seq, Method::Get, url, Vec::new(), None);
        Ok(())
    }

    pub(crate) fn on_response(
        &mut self,
        page: &mut Page,
        request: &PendingRequest,
        response: Option<MockResponse>,
    ) -> Result<()> {
        // Only the latest issued lookup may touch the suggestions.
        if request.seq + 1 != self.next_seq {
            page.trace_fetch_line(format!(
                "[fetch] drop stale suggestions id={} seq={}",
                request.id.value(),
                request.seq
            ));
            return Ok(());
        }

        // The status line is not inspected: any delivered body is parsed, and
        // an unparsable body or a transport failure empties the suggestions.
        let parsed = response
            .and_then(|response| serde_json::from_str::<CitySearchResponse>(&response.body).ok());
        match parsed {
            Some(data) => self.apply_suggestions(page, &data.cities)?,
            None => self.clear_suggestions(page),
        }
        Ok(())
    }

    fn apply_suggestions(&mut self, page: &mut Page, cities: &[CityRecord]) -> Result<()> {
        page.dom.clear_children(self.datalist);
        self.valid_cities.clear();
        for city in cities {
            let mut attrs = HashMap::new();
            attrs.insert("value".to_string(), city.name.clone());
            let option = page
                .dom
                .create_element(self.datalist, "option".to_string(), attrs);
            page.dom.set_text_content(option, &city.display)?;
            self.valid_cities.push(city.name.clone());
        }
        page.trace_event_line(format!(
            "[event] suggestions applied count={}",
            cities.len()
        ));
        Ok(())
    }

    fn clear_suggestions(&mut self, page: &mut Page) {
        page.dom.clear_children(self.datalist);
        self.valid_cities.clear();
        page.trace_event_line("[event] suggestions cleared".into());
    }

    fn on_submit(&mut self, page: &mut Page, event: &mut EventState) -> Result<()> {
        let value = page.dom.value(self.input)?;
        let trimmed = value.trim();
        if self.valid_cities.iter().any(|city| city == trimmed) {
            return Ok(());
        }
        event.prevent_default();
        page.alert("Please select a city from the suggestions list");
        page.focus_node(self.input);
        Ok(())
    }

    pub(crate) fn teardown(&mut self, page: &mut Page) {
        if let Some(timer) = self.timer.take() {
            page.clear_timeout(timer);
        }
        self.pending_query = None;
    }
}
