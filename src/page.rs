use std::collections::HashMap;

use url::Url;

use crate::autocomplete::CityAutocomplete;
use crate::dom::{Dom, NodeId, truncate_chars};
use crate::html::parse_html;
use crate::network::{
    FetchCall, Method, MockResponse, NetworkState, PendingRequest, PendingRequestInfo, RequestId,
};
use crate::platform::{FormSubmission, LocationNavigation, PlatformState};
use crate::register::RegistrationForm;
use crate::scheduler::{PendingTimer, SchedulerState};
use crate::trace::TraceState;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum EventKind {
    Input,
    Submit,
}

impl EventKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Submit => "submit",
        }
    }
}

#[derive(Debug)]
pub(crate) struct EventState {
    pub(crate) kind: EventKind,
    pub(crate) target: NodeId,
    pub(crate) default_prevented: bool,
}

impl EventState {
    fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            default_prevented: false,
        }
    }

    pub(crate) fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}

#[derive(Debug, Default)]
struct ListenerStore {
    map: HashMap<(NodeId, EventKind), Vec<WidgetId>>,
}

impl ListenerStore {
    fn add(&mut self, node: NodeId, kind: EventKind, widget: WidgetId) {
        self.map.entry((node, kind)).or_default().push(widget);
    }

    fn remove_widget(&mut self, widget: WidgetId) {
        for listeners in self.map.values_mut() {
            listeners.retain(|entry| *entry != widget);
        }
        self.map.retain(|_, listeners| !listeners.is_empty());
    }

    fn get(&self, node: NodeId, kind: EventKind) -> Vec<WidgetId> {
        self.map.get(&(node, kind)).cloned().unwrap_or_default()
    }
}

#[derive(Debug)]
pub(crate) enum WidgetKind {
    CityAutocomplete(CityAutocomplete),
    RegistrationForm(RegistrationForm),
}

impl WidgetKind {
    fn on_event(&mut self, page: &mut Page, event: &mut EventState) -> Result<()> {
        match self {
            Self::CityAutocomplete(widget) => widget.on_event(page, event),
            Self::RegistrationForm(widget) => widget.on_event(page, event),
        }
    }

    fn on_timer(&mut self, page: &mut Page) -> Result<()> {
        match self {
            Self::CityAutocomplete(widget) => widget.on_timer(page),
            // No timer-driven behavior; a stray task for this widget is a no-op.
            Self::RegistrationForm(_) => Ok(()),
        }
    }

    fn on_response(
        &mut self,
        page: &mut Page,
        request: &PendingRequest,
        response: Option<MockResponse>,
    ) -> Result<()> {
        match self {
            Self::CityAutocomplete(widget) => widget.on_response(page, request, response),
            Self::RegistrationForm(widget) => widget.on_response(page, request, response),
        }
    }

    fn teardown(&mut self, page: &mut Page) {
        match self {
            Self::CityAutocomplete(widget) => widget.teardown(page),
            Self::RegistrationForm(_) => {}
        }
    }
}

#[derive(Debug)]
pub struct Page {
    pub(crate) dom: Dom,
    listeners: ListenerStore,
    pub(crate) scheduler: SchedulerState,
    pub(crate) network: NetworkState,
    pub(crate) platform: PlatformState,
    pub(crate) trace: TraceState,
    document_url: String,
    widgets: Vec<Option<WidgetKind>>,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_url("about:blank", html)
    }

    pub fn from_html_with_url(url: &str, html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        Ok(Self {
            dom,
            listeners: ListenerStore::default(),
            scheduler: SchedulerState::default(),
            network: NetworkState::default(),
            platform: PlatformState::default(),
            trace: TraceState::default(),
            document_url: url.to_string(),
            widgets: Vec::new(),
        })
    }

    pub fn document_url(&self) -> &str {
        &self.document_url
    }

    pub(crate) fn register_widget(
        &mut self,
        build: impl FnOnce(WidgetId) -> WidgetKind,
    ) -> WidgetId {
        let id = WidgetId(self.widgets.len());
        self.widgets.push(Some(build(id)));
        id
    }

    pub(crate) fn add_listener(&mut self, node: NodeId, kind: EventKind, widget: WidgetId) {
        self.listeners.add(node, kind, widget);
    }

    /// Removes a widget from the page, clearing its listeners and any timer it
    /// still has scheduled. In-flight network requests it issued are delivered
    /// to nobody.
    pub fn detach(&mut self, widget: WidgetId) -> Result<()> {
        let slot = self
            .widgets
            .get_mut(widget.0)
            .ok_or_else(|| Error::Runtime(format!("unknown widget id {}", widget.0)))?;
        let Some(mut taken) = slot.take() else {
            return Err(Error::Runtime(format!(
                "widget {} is already detached",
                widget.0
            )));
        };
        self.listeners.remove_widget(widget);
        taken.teardown(self);
        let cancelled = self.scheduler.cancel_widget_tasks(widget);
        self.trace_event_line(format!(
            "[event] detach widget={} cancelled_timers={cancelled}",
            widget.0
        ));
        Ok(())
    }

    fn with_widget(
        &mut self,
        id: WidgetId,
        f: impl FnOnce(&mut WidgetKind, &mut Self) -> Result<()>,
    ) -> Result<()> {
        let Some(slot) = self.widgets.get_mut(id.0) else {
            return Err(Error::Runtime(format!("unknown widget id {}", id.0)));
        };
        let Some(mut widget) = slot.take() else {
            // Detached while work for it was still queued.
            return Ok(());
        };
        let result = f(&mut widget, self);
        self.widgets[id.0] = Some(widget);
        result
    }

    pub(crate) fn dispatch_event(&mut self, target: NodeId, kind: EventKind) -> Result<EventState> {
        let label = self.node_label(target);
        self.trace_event_line(format!(
            "[event] dispatch type={} target={label}",
            kind.as_str()
        ));
        let mut event = EventState::new(kind, target);
        for widget in self.listeners.get(target, kind) {
            self.with_widget(widget, |w, page| w.on_event(page, &mut event))?;
        }
        Ok(event)
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let tag = self
            .dom
            .tag_name(target)
            .ok_or_else(|| Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: "non-element".into(),
            })?
            .to_ascii_lowercase();
        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag,
            });
        }
        self.dom.set_value(target, text)?;
        self.dispatch_event(target, EventKind::Input)?;
        Ok(())
    }

    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let Some(form) = self.resolve_form_for_submit(target) else {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "form or element inside a form".into(),
                actual: self
                    .dom
                    .tag_name(target)
                    .unwrap_or("non-element")
                    .to_string(),
            });
        };
        let event = self.dispatch_event(form, EventKind::Submit)?;
        if !event.default_prevented {
            self.perform_native_submit(form);
        }
        Ok(())
    }

    fn resolve_form_for_submit(&self, target: NodeId) -> Option<NodeId> {
        if self
            .dom
            .tag_name(target)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("form"))
        {
            return Some(target);
        }
        self.dom.find_ancestor_by_tag(target, "form")
    }

    fn perform_native_submit(&mut self, form: NodeId) {
        let form_id = self.dom.attr(form, "id").unwrap_or_default();
        let action = self
            .dom
            .attr(form, "action")
            .unwrap_or_else(|| self.document_url.clone());
        let method = self
            .dom
            .attr(form, "method")
            .unwrap_or_else(|| "get".into())
            .to_ascii_lowercase();
        self.trace_event_line(format!(
            "[event] native-submit form=#{form_id} action={action}"
        ));
        self.platform.form_submissions.push(FormSubmission {
            form_id,
            action,
            method,
        });
    }

    pub(crate) fn focus_node(&mut self, node: NodeId) {
        if self.dom.active_element() == Some(node) {
            return;
        }
        let label = self.node_label(node);
        self.dom.set_active_element(Some(node));
        self.trace_event_line(format!("[event] focus target={label}"));
    }

    pub fn focused_element_id(&self) -> Option<String> {
        self.dom
            .active_element()
            .and_then(|node| self.dom.attr(node, "id"))
    }

    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms
    }

    pub(crate) fn set_timeout(&mut self, widget: WidgetId, delay_ms: i64) -> i64 {
        let id = self.scheduler.schedule(widget, delay_ms);
        self.trace_timer_line(format!(
            "[timer] set id={id} widget={} delay_ms={delay_ms} now_ms={}",
            widget.0, self.scheduler.now_ms
        ));
        id
    }

    pub(crate) fn clear_timeout(&mut self, timer_id: i64) {
        let existed = self.scheduler.cancel(timer_id);
        self.trace_timer_line(format!("[timer] clear id={timer_id} existed={existed}"));
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.scheduler.pending_timers()
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Runtime(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.scheduler.timer_step_limit = max_steps;
        Ok(())
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Runtime(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.scheduler.now_ms;
        self.scheduler.now_ms = self.scheduler.now_ms.saturating_add(delta_ms);
        let ran = self.run_due_timers_internal()?;
        self.trace_timer_line(format!(
            "[timer] advance delta_ms={} from={} to={} ran_due={}",
            delta_ms, from, self.scheduler.now_ms, ran
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.scheduler.now_ms {
            return Err(Error::Runtime(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.scheduler.now_ms
            )));
        }
        let from = self.scheduler.now_ms;
        self.scheduler.now_ms = target_ms;
        let ran = self.run_due_timers_internal()?;
        self.trace_timer_line(format!(
            "[timer] advance_to from={} to={} ran_due={}",
            from, self.scheduler.now_ms, ran
        ));
        Ok(())
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_due_timers_internal()?;
        self.trace_timer_line(format!(
            "[timer] run_due now_ms={} ran={}",
            self.scheduler.now_ms, ran
        ));
        Ok(ran)
    }

    fn run_due_timers_internal(&mut self) -> Result<usize> {
        self.run_timer_queue(Some(self.scheduler.now_ms), false)
    }

    pub(crate) fn run_timer_queue(
        &mut self,
        due_limit: Option<i64>,
        advance_clock: bool,
    ) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.scheduler.next_task_index(due_limit) {
            steps += 1;
            if steps > self.scheduler.timer_step_limit {
                return Err(self.timer_step_limit_error(steps, due_limit));
            }
            let task = self.scheduler.task_queue.remove(next_idx);
            if advance_clock && task.due_at > self.scheduler.now_ms {
                self.scheduler.now_ms = task.due_at;
            }
            self.trace_timer_line(format!(
                "[timer] run id={} due_at={} now_ms={}",
                task.id, task.due_at, self.scheduler.now_ms
            ));
            self.with_widget(task.widget, |w, page| w.on_timer(page))?;
        }
        Ok(steps)
    }

    fn timer_step_limit_error(&self, steps: usize, due_limit: Option<i64>) -> Error {
        let due_limit_desc = due_limit
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());
        Error::Runtime(format!(
            "timer queue exceeded max task steps: limit={}, steps={steps}, now_ms={}, due_limit={}, pending_tasks={}",
            self.scheduler.timer_step_limit,
            self.scheduler.now_ms,
            due_limit_desc,
            self.scheduler.task_queue.len()
        ))
    }

    pub fn set_fetch_mock(&mut self, method: Method, url: &str, status: u16, body: &str) {
        self.network.set_mock(method, url, status, body);
    }

    pub fn clear_fetch_mocks(&mut self) {
        self.network.clear_mocks();
    }

    pub fn take_fetch_calls(&mut self) -> Vec<FetchCall> {
        std::mem::take(&mut self.network.calls)
    }

    pub fn pending_requests(&self) -> Vec<PendingRequestInfo> {
        self.network.pending_infos()
    }

    pub(crate) fn issue_request(
        &mut self,
        widget: WidgetId,
        seq: u64,
        method: Method,
        url: String,
        headers: Vec<(String, String)>,
        body: Option<String>,
    ) -> RequestId {
        let id = self.network.allocate_request_id();
        self.trace_fetch_line(format!("[fetch] issue id={} {} {}", id.0, method, url));
        self.network.calls.push(FetchCall {
            method,
            url: url.clone(),
            headers,
            body,
        });
        self.network.pending.push(PendingRequest {
            id,
            widget,
            seq,
            method,
            url,
        });
        id
    }

    /// Delivers one in-flight response by request id. Tests use this to
    /// exercise arbitrary interleavings of overlapping requests.
    pub fn deliver_response(&mut self, id: RequestId) -> Result<()> {
        let idx = self
            .network
            .pending
            .iter()
            .position(|request| request.id == id)
            .ok_or_else(|| Error::Runtime(format!("no pending request with id {}", id.0)))?;
        self.deliver_at(idx)
    }

    pub fn deliver_next(&mut self) -> Result<bool> {
        if self.network.pending.is_empty() {
            return Ok(false);
        }
        self.deliver_at(0)?;
        Ok(true)
    }

    pub fn deliver_all(&mut self) -> Result<usize> {
        let mut steps = 0usize;
        while !self.network.pending.is_empty() {
            steps += 1;
            if steps > self.scheduler.timer_step_limit {
                return Err(Error::Runtime(format!(
                    "deliver_all exceeded max steps: limit={}, pending={}",
                    self.scheduler.timer_step_limit,
                    self.network.pending.len()
                )));
            }
            self.deliver_at(0)?;
        }
        Ok(steps)
    }

    fn deliver_at(&mut self, idx: usize) -> Result<()> {
        let request = self.network.pending.remove(idx);
        let response = self.network.lookup(request.method, &request.url);
        match &response {
            Some(response) => self.trace_fetch_line(format!(
                "[fetch] deliver id={} status={}",
                request.id.0, response.status
            )),
            None => self.trace_fetch_line(format!(
                "[fetch] deliver id={} transport-failed",
                request.id.0
            )),
        }
        self.with_widget(request.widget, |w, page| {
            w.on_response(page, &request, response)
        })
    }

    /// Runs every scheduled timer (advancing the clock) and delivers every
    /// in-flight response, repeating until the page is idle.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            let ran = self.run_timer_queue(None, true)?;
            let delivered = self.deliver_all()?;
            if ran == 0 && delivered == 0 {
                return Ok(());
            }
        }
    }

    pub(crate) fn alert(&mut self, message: &str) {
        self.trace_event_line(format!("[event] alert message={message:?}"));
        self.platform.alert_messages.push(message.to_string());
    }

    pub fn take_alert_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.platform.alert_messages)
    }

    pub(crate) fn navigate(&mut self, target: &str) {
        let to = self.resolve_url(target);
        self.trace_event_line(format!(
            "[event] navigate from={} to={to}",
            self.document_url
        ));
        self.platform.location_navigations.push(LocationNavigation {
            from: self.document_url.clone(),
            to: to.clone(),
        });
        self.document_url = to;
    }

    pub fn take_location_navigations(&mut self) -> Vec<LocationNavigation> {
        std::mem::take(&mut self.platform.location_navigations)
    }

    pub fn take_form_submissions(&mut self) -> Vec<FormSubmission> {
        std::mem::take(&mut self.platform.form_submissions)
    }

    fn resolve_url(&self, target: &str) -> String {
        Url::parse(&self.document_url)
            .ok()
            .and_then(|base| base.join(target).ok())
            .map(|resolved| resolved.to_string())
            .unwrap_or_else(|| target.to_string())
    }

    pub(crate) fn csrf_token(&self) -> Option<String> {
        self.dom
            .find_first(|dom, node| {
                dom.tag_name(node)
                    .is_some_and(|tag| tag.eq_ignore_ascii_case("meta"))
                    && dom.attr(node, "name").as_deref() == Some("csrf-token")
            })
            .and_then(|node| self.dom.attr(node, "content"))
            .filter(|content| !content.is_empty())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node), 200)
    }

    fn node_label(&self, node: NodeId) -> String {
        match self.dom.attr(node, "id") {
            Some(id) => format!("#{id}"),
            None => self.dom.tag_name(node).unwrap_or("node").to_string(),
        }
    }

    pub fn set_trace(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace.set_stderr(enabled);
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace.events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace.timers = enabled;
    }

    pub fn set_trace_fetches(&mut self, enabled: bool) {
        self.trace.fetches = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        self.trace.set_log_limit(max_entries)
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace.take_logs()
    }

    pub(crate) fn trace_event_line(&mut self, line: String) {
        if self.trace.enabled && self.trace.events {
            self.trace.push_line(line);
        }
    }

    pub(crate) fn trace_timer_line(&mut self, line: String) {
        if self.trace.enabled && self.trace.timers {
            self.trace.push_line(line);
        }
    }

    pub(crate) fn trace_fetch_line(&mut self, line: String) {
        if self.trace.enabled && self.trace.fetches {
            self.trace.push_line(line);
        }
    }
}
