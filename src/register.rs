use crate::dom::NodeId;
use crate::network::{Method, MockResponse, PendingRequest};
use crate::page::{EventKind, EventState, Page, WidgetId, WidgetKind};
use crate::wire::RegistrationPayload;
use crate::{Error, Result};

/// Element ids and endpoints for a [`Page::attach_registration_form`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationFormConfig {
    pub form_id: String,
    pub username_id: String,
    pub nickname_id: String,
    pub password_id: String,
    pub confirm_password_id: String,
    pub endpoint: String,
    pub login_url: String,
}

impl Default for RegistrationFormConfig {
    fn default() -> Self {
        Self {
            form_id: "registerForm".into(),
            username_id: "username".into(),
            nickname_id: "nickname".into(),
            password_id: "password".into(),
            confirm_password_id: "confirm_password".into(),
            endpoint: "/api/register".into(),
            login_url: "/login".into(),
        }
    }
}

/// Registration submit handler. Posts the four credential fields as JSON and
/// reflects the outcome through alerts and a login redirect. The submit
/// control is never disabled while a request is in flight, so a double submit
/// sends two requests.
#[derive(Debug)]
pub(crate) struct RegistrationForm {
    id: WidgetId,
    form: NodeId,
    username: NodeId,
    nickname: NodeId,
    password: NodeId,
    confirm_password: NodeId,
    endpoint: String,
    login_url: String,
    next_seq: u64,
}

impl Page {
    pub fn attach_registration_form(
        &mut self,
        config: RegistrationFormConfig,
    ) -> Result<WidgetId> {
        let form = self.select_one(&format!("#{}", config.form_id))?;
        let form_tag = self
            .dom
            .tag_name(form)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if form_tag != "form" {
            return Err(Error::TypeMismatch {
                selector: format!("#{}", config.form_id),
                expected: "form".into(),
                actual: form_tag,
            });
        }

        let username = self.select_one(&format!("#{}", config.username_id))?;
        let nickname = self.select_one(&format!("#{}", config.nickname_id))?;
        let password = self.select_one(&format!("#{}", config.password_id))?;
        let confirm_password = self.select_one(&format!("#{}", config.confirm_password_id))?;

        let id = self.register_widget(|id| {
            WidgetKind::RegistrationForm(RegistrationForm {
                id,
                form,
                username,
                nickname,
                password,
                confirm_password,
                endpoint: config.endpoint,
                login_url: config.login_url,
                next_seq: 0,
            })
        });
        self.add_listener(form, EventKind::Submit, id);
        self.trace_event_line(format!(
            "[event] attach registration-form widget={} form=#{}",
            id.0, config.form_id
        ));
        Ok(id)
    }
}

impl RegistrationForm {
    pub(crate) fn on_event(&mut self, page: &mut Page, event: &mut EventState) -> Result<()> {
        if event.kind != EventKind::Submit || event.target != self.form {
            return Ok(());
        }
        event.prevent_default();

        let payload = RegistrationPayload {
            username: page.dom.value(self.username)?,
            nickname: page.dom.value(self.nickname)?,
            password: page.dom.value(self.password)?,
            confirm_password: page.dom.value(self.confirm_password)?,
        };
        let body = serde_json::to_string(&payload)
            .map_err(|err| Error::Runtime(format!("registration payload encode failed: {err}")))?;

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(csrf) = page.csrf_token() {
            headers.push(("X-CSRF-Token".to_string(), csrf));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        page.issue_request(
            self.id,
            seq,
            Method::Post,
            self.endpoint.clone(),
            headers,
            Some(body),
        );
        Ok(())
    }

    pub(crate) fn on_response(
        &mut self,
        page: &mut Page,
        _request: &PendingRequest,
        response: Option<MockResponse>,
    ) -> Result<()> {
        let Some(response) = response else {
            page.alert("An error occurred. Please try again.");
            return Ok(());
        };

        // The body is parsed before the status is inspected, so a success
        // status with an unparsable body still lands in the generic branch.
        let Ok(body) = serde_json::from_str::<serde_json::Value>(&response.body) else {
            page.alert("An error occurred. Please try again.");
            return Ok(());
        };

        if (200..300).contains(&response.status) {
            page.alert("Registration successful! Please login.");
            page.navigate(&self.login_url);
        } else {
            let message = body
                .get("error")
                .and_then(|value| value.as_str())
                .filter(|text| !text.is_empty())
                .unwrap_or("Registration failed")
                .to_string();
            page.alert(&message);
        }
        Ok(())
    }
}
