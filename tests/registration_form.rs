use page_widgets::{Method, Page, RegistrationFormConfig, Result, WidgetId};

const REGISTER_HTML: &str = r#"
    <meta name='csrf-token' content='tok-123'>
    <form id='registerForm'>
      <input id='username' name='username'>
      <input id='nickname' name='nickname'>
      <input id='password' name='password' type='password'>
      <input id='confirm_password' name='confirm_password' type='password'>
      <button id='register'>Register</button>
    </form>
    "#;

const REGISTER_HTML_NO_CSRF: &str = r#"
    <form id='registerForm'>
      <input id='username'>
      <input id='nickname'>
      <input id='password' type='password'>
      <input id='confirm_password' type='password'>
    </form>
    "#;

fn register_page(html: &str) -> Result<(Page, WidgetId)> {
    let mut page = Page::from_html_with_url("https://app.local/register", html)?;
    let widget = page.attach_registration_form(RegistrationFormConfig::default())?;
    Ok((page, widget))
}

fn fill_credentials(page: &mut Page) -> Result<()> {
    page.type_text("#username", "ada")?;
    page.type_text("#nickname", "al")?;
    page.type_text("#password", "hunter2")?;
    page.type_text("#confirm_password", "hunter2")?;
    Ok(())
}

#[test]
fn submission_posts_exactly_the_four_fields_with_csrf_header() -> Result<()> {
    let (mut page, _) = register_page(REGISTER_HTML)?;
    fill_credentials(&mut page)?;

    page.submit("#registerForm")?;

    let calls = page.take_fetch_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::Post);
    assert_eq!(calls[0].url, "/api/register");
    assert_eq!(calls[0].header("content-type"), Some("application/json"));
    assert_eq!(calls[0].header("x-csrf-token"), Some("tok-123"));
    assert_eq!(
        calls[0].body.as_deref(),
        Some(
            r#"{"username":"ada","nickname":"al","password":"hunter2","confirm_password":"hunter2"}"#
        )
    );

    // The default action is always prevented; nothing navigates natively.
    assert!(page.take_form_submissions().is_empty());
    Ok(())
}

#[test]
fn field_values_are_sent_verbatim_without_client_validation() -> Result<()> {
    let (mut page, _) = register_page(REGISTER_HTML)?;
    page.type_text("#username", "  ada  ")?;
    page.type_text("#password", "one")?;
    page.type_text("#confirm_password", "two")?;

    page.submit("#registerForm")?;

    let calls = page.take_fetch_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].body.as_deref(),
        Some(r#"{"username":"  ada  ","nickname":"","password":"one","confirm_password":"two"}"#)
    );
    Ok(())
}

#[test]
fn csrf_header_is_omitted_without_a_meta_tag() -> Result<()> {
    let (mut page, _) = register_page(REGISTER_HTML_NO_CSRF)?;
    page.submit("#registerForm")?;

    let calls = page.take_fetch_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].header("x-csrf-token"), None);
    Ok(())
}

#[test]
fn csrf_header_is_omitted_for_an_empty_meta_content() -> Result<()> {
    let html = r#"
        <meta name='csrf-token' content=''>
        <form id='registerForm'>
          <input id='username'>
          <input id='nickname'>
          <input id='password'>
          <input id='confirm_password'>
        </form>
        "#;
    let (mut page, _) = register_page(html)?;
    page.submit("#registerForm")?;

    let calls = page.take_fetch_calls();
    assert_eq!(calls[0].header("x-csrf-token"), None);
    Ok(())
}

#[test]
fn successful_registration_alerts_and_navigates_to_login() -> Result<()> {
    let (mut page, _) = register_page(REGISTER_HTML)?;
    page.set_fetch_mock(Method::Post, "/api/register", 200, r#"{"ok":true}"#);
    fill_credentials(&mut page)?;

    page.submit("#registerForm")?;
    assert!(page.deliver_next()?);

    assert_eq!(
        page.take_alert_messages(),
        vec!["Registration successful! Please login."]
    );
    let navigations = page.take_location_navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(navigations[0].from, "https://app.local/register");
    assert_eq!(navigations[0].to, "https://app.local/login");
    assert_eq!(page.document_url(), "https://app.local/login");
    Ok(())
}

#[test]
fn server_error_message_is_alerted_without_navigation() -> Result<()> {
    let (mut page, _) = register_page(REGISTER_HTML)?;
    page.set_fetch_mock(
        Method::Post,
        "/api/register",
        409,
        r#"{"error":"Username already taken"}"#,
    );

    page.submit("#registerForm")?;
    page.deliver_all()?;

    assert_eq!(page.take_alert_messages(), vec!["Username already taken"]);
    assert!(page.take_location_navigations().is_empty());
    assert_eq!(page.document_url(), "https://app.local/register");
    Ok(())
}

#[test]
fn missing_or_empty_error_field_falls_back_to_generic_failure() -> Result<()> {
    let (mut page, _) = register_page(REGISTER_HTML)?;

    page.set_fetch_mock(Method::Post, "/api/register", 400, r#"{}"#);
    page.submit("#registerForm")?;
    page.deliver_all()?;
    assert_eq!(page.take_alert_messages(), vec!["Registration failed"]);

    page.set_fetch_mock(Method::Post, "/api/register", 400, r#"{"error":""}"#);
    page.submit("#registerForm")?;
    page.deliver_all()?;
    assert_eq!(page.take_alert_messages(), vec!["Registration failed"]);
    Ok(())
}

#[test]
fn non_json_error_body_alerts_the_generic_message() -> Result<()> {
    let (mut page, _) = register_page(REGISTER_HTML)?;
    page.set_fetch_mock(Method::Post, "/api/register", 500, "Internal Server Error");

    page.submit("#registerForm")?;
    page.deliver_all()?;

    assert_eq!(
        page.take_alert_messages(),
        vec!["An error occurred. Please try again."]
    );
    assert!(page.take_location_navigations().is_empty());
    Ok(())
}

#[test]
fn network_failure_alerts_the_generic_message() -> Result<()> {
    let (mut page, _) = register_page(REGISTER_HTML)?;

    page.submit("#registerForm")?;
    page.deliver_all()?;

    assert_eq!(
        page.take_alert_messages(),
        vec!["An error occurred. Please try again."]
    );
    assert!(page.take_location_navigations().is_empty());
    Ok(())
}

#[test]
fn success_status_with_unparsable_body_does_not_navigate() -> Result<()> {
    let (mut page, _) = register_page(REGISTER_HTML)?;
    page.set_fetch_mock(Method::Post, "/api/register", 204, "");

    page.submit("#registerForm")?;
    page.deliver_all()?;

    assert_eq!(
        page.take_alert_messages(),
        vec!["An error occurred. Please try again."]
    );
    assert!(page.take_location_navigations().is_empty());
    Ok(())
}

#[test]
fn double_submit_sends_two_requests() -> Result<()> {
    let (mut page, _) = register_page(REGISTER_HTML)?;
    page.set_fetch_mock(Method::Post, "/api/register", 200, r#"{"ok":true}"#);
    fill_credentials(&mut page)?;

    // Nothing disables the submit control while a request is in flight.
    page.submit("#registerForm")?;
    page.submit("#registerForm")?;
    assert_eq!(page.pending_requests().len(), 2);
    assert_eq!(page.take_fetch_calls().len(), 2);

    page.deliver_all()?;
    assert_eq!(page.take_alert_messages().len(), 2);
    assert_eq!(page.take_location_navigations().len(), 2);
    Ok(())
}
