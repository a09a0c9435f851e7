/// A recorded `window.location` style navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationNavigation {
    pub from: String,
    pub to: String,
}

/// A native (non-prevented) form submission, recorded instead of navigating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub form_id: String,
    pub action: String,
    pub method: String,
}

#[derive(Debug, Default)]
pub(crate) struct PlatformState {
    pub(crate) alert_messages: Vec<String>,
    pub(crate) location_navigations: Vec<LocationNavigation>,
    pub(crate) form_submissions: Vec<FormSubmission>,
}
