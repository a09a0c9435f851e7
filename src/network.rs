use std::collections::HashMap;
use std::fmt;

use crate::page::WidgetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub(crate) u64);

impl RequestId {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A request as issued by a widget, recorded verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl FetchCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockResponse {
    pub(crate) status: u16,
    pub(crate) body: String,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingRequest {
    pub(crate) id: RequestId,
    pub(crate) widget: WidgetId,
    pub(crate) seq: u64,
    pub(crate) method: Method,
    pub(crate) url: String,
}

/// Public view of an in-flight request, for tests that control delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequestInfo {
    pub id: RequestId,
    pub method: Method,
    pub url: String,
}

#[derive(Debug, Default)]
pub(crate) struct NetworkState {
    routes: HashMap<String, MockResponse>,
    pub(crate) calls: Vec<FetchCall>,
    pub(crate) pending: Vec<PendingRequest>,
    next_request_id: u64,
}

impl NetworkState {
    pub(crate) fn allocate_request_id(&mut self) -> RequestId {
        self.next_request_id += 1;
        RequestId(self.next_request_id)
    }

    pub(crate) fn set_mock(&mut self, method: Method, url: &str, status: u16, body: &str) {
        self.routes.insert(
            route_key(method, url),
            MockResponse {
                status,
                body: body.to_string(),
            },
        );
    }

    pub(crate) fn clear_mocks(&mut self) {
        self.routes.clear();
    }

    pub(crate) fn lookup(&self, method: Method, url: &str) -> Option<MockResponse> {
        self.routes.get(&route_key(method, url)).cloned()
    }

    pub(crate) fn pending_infos(&self) -> Vec<PendingRequestInfo> {
        self.pending
            .iter()
            .map(|request| PendingRequestInfo {
                id: request.id,
                method: request.method,
                url: request.url.clone(),
            })
            .collect()
    }
}

fn route_key(method: Method, url: &str) -> String {
    format!("{method} {url}")
}
