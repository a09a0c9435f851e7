use page_widgets::{CityAutocompleteConfig, Method, Page, Result, WidgetId};

const CITY_FORM_HTML: &str = r#"
    <form id='cityForm' action='/profile' method='post'>
      <label for='city'>City</label>
      <input id='city' name='city' list='city-suggestions'>
      <datalist id='city-suggestions'></datalist>
      <button id='save'>Save</button>
    </form>
    "#;

const BERLIN_BODY: &str = r#"{"cities":[{"name":"Berlin","display":"Berlin, DE"}]}"#;

fn city_page() -> Result<(Page, WidgetId)> {
    let mut page = Page::from_html(CITY_FORM_HTML)?;
    let widget = page.attach_city_autocomplete(CityAutocompleteConfig::default())?;
    Ok((page, widget))
}

#[test]
fn short_query_issues_no_fetch_and_blocks_submission() -> Result<()> {
    let (mut page, _) = city_page()?;

    page.type_text("#city", "b")?;
    page.advance_time(1_000)?;

    assert!(page.take_fetch_calls().is_empty());
    page.submit("#cityForm")?;
    assert_eq!(
        page.take_alert_messages(),
        vec!["Please select a city from the suggestions list"]
    );
    assert!(page.take_form_submissions().is_empty());
    assert_eq!(page.focused_element_id().as_deref(), Some("city"));
    Ok(())
}

#[test]
fn shrinking_the_query_below_two_chars_cancels_the_scheduled_lookup() -> Result<()> {
    let (mut page, _) = city_page()?;

    page.type_text("#city", "ber")?;
    assert_eq!(page.pending_timers().len(), 1);

    page.type_text("#city", "b")?;
    assert!(page.pending_timers().is_empty());

    page.advance_time(1_000)?;
    assert!(page.take_fetch_calls().is_empty());
    Ok(())
}

#[test]
fn rapid_typing_debounces_to_exactly_one_urlencoded_fetch() -> Result<()> {
    let (mut page, _) = city_page()?;

    page.type_text("#city", "ne")?;
    page.advance_time(100)?;
    page.type_text("#city", "new y")?;
    page.advance_time(100)?;
    page.type_text("#city", "new york")?;
    page.advance_time(300)?;

    let calls = page.take_fetch_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::Get);
    assert_eq!(calls[0].url, "/api/search-cities?q=new+york");
    assert!(calls[0].body.is_none());
    Ok(())
}

#[test]
fn debounce_waits_the_full_interval_after_the_last_keystroke() -> Result<()> {
    let (mut page, _) = city_page()?;

    page.type_text("#city", "ber")?;
    page.advance_time(299)?;
    assert!(page.take_fetch_calls().is_empty());

    page.advance_time(1)?;
    assert_eq!(page.take_fetch_calls().len(), 1);
    Ok(())
}

#[test]
fn suggestion_response_populates_datalist_and_gates_submission() -> Result<()> {
    let (mut page, _) = city_page()?;
    page.set_fetch_mock(Method::Get, "/api/search-cities?q=ber", 200, BERLIN_BODY);

    page.type_text("#city", "ber")?;
    page.advance_time(300)?;
    assert!(page.deliver_next()?);

    assert_eq!(
        page.dump_dom("#city-suggestions")?,
        "<datalist id='city-suggestions'><option value='Berlin'>Berlin, DE</option></datalist>"
    );

    page.type_text("#city", "Berlin")?;
    page.submit("#cityForm")?;
    assert!(page.take_alert_messages().is_empty());
    let submissions = page.take_form_submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].form_id, "cityForm");
    assert_eq!(submissions[0].action, "/profile");

    // Case mismatch against the suggestion list is rejected.
    page.type_text("#city", "berlin")?;
    page.submit("#cityForm")?;
    assert_eq!(
        page.take_alert_messages(),
        vec!["Please select a city from the suggestions list"]
    );
    assert!(page.take_form_submissions().is_empty());
    assert_eq!(page.focused_element_id().as_deref(), Some("city"));
    Ok(())
}

#[test]
fn surrounding_whitespace_is_trimmed_before_matching() -> Result<()> {
    let (mut page, _) = city_page()?;
    page.set_fetch_mock(Method::Get, "/api/search-cities?q=ber", 200, BERLIN_BODY);

    page.type_text("#city", "ber")?;
    page.advance_time(300)?;
    page.deliver_all()?;

    page.type_text("#city", "  Berlin  ")?;
    page.submit("#cityForm")?;
    assert!(page.take_alert_messages().is_empty());
    assert_eq!(page.take_form_submissions().len(), 1);
    Ok(())
}

#[test]
fn out_of_order_responses_apply_only_the_latest_lookup() -> Result<()> {
    let (mut page, _) = city_page()?;
    page.set_fetch_mock(Method::Get, "/api/search-cities?q=ber", 200, BERLIN_BODY);
    page.set_fetch_mock(
        Method::Get,
        "/api/search-cities?q=bern",
        200,
        r#"{"cities":[{"name":"Bern","display":"Bern, CH"}]}"#,
    );

    page.type_text("#city", "ber")?;
    page.advance_time(300)?;
    page.type_text("#city", "bern")?;
    page.advance_time(300)?;

    let pending = page.pending_requests();
    assert_eq!(pending.len(), 2);

    // The older lookup lands last; it must not overwrite the newer result.
    page.deliver_response(pending[1].id)?;
    page.deliver_response(pending[0].id)?;

    assert_eq!(
        page.dump_dom("#city-suggestions")?,
        "<datalist id='city-suggestions'><option value='Bern'>Bern, CH</option></datalist>"
    );
    page.type_text("#city", "Bern")?;
    page.submit("#cityForm")?;
    assert!(page.take_alert_messages().is_empty());
    assert_eq!(page.take_form_submissions().len(), 1);

    page.type_text("#city", "Berlin")?;
    page.submit("#cityForm")?;
    assert_eq!(page.take_alert_messages().len(), 1);
    assert!(page.take_form_submissions().is_empty());
    Ok(())
}

#[test]
fn failed_lookup_silently_clears_previous_suggestions() -> Result<()> {
    let (mut page, _) = city_page()?;
    page.set_fetch_mock(Method::Get, "/api/search-cities?q=ber", 200, BERLIN_BODY);

    page.type_text("#city", "ber")?;
    page.advance_time(300)?;
    page.deliver_all()?;
    page.assert_text("#city-suggestions", "Berlin, DE")?;

    // No route configured for the second query: the transport fails.
    page.type_text("#city", "bern")?;
    page.advance_time(300)?;
    page.deliver_all()?;

    assert_eq!(page.dump_dom("#city-suggestions")?, "<datalist id='city-suggestions'></datalist>");
    assert!(page.take_alert_messages().is_empty());

    page.type_text("#city", "Berlin")?;
    page.submit("#cityForm")?;
    assert_eq!(page.take_alert_messages().len(), 1);
    Ok(())
}

#[test]
fn malformed_suggestion_body_clears_suggestions() -> Result<()> {
    let (mut page, _) = city_page()?;
    page.set_fetch_mock(Method::Get, "/api/search-cities?q=ber", 200, BERLIN_BODY);
    page.set_fetch_mock(Method::Get, "/api/search-cities?q=bern", 200, "not json at all");

    page.type_text("#city", "ber")?;
    page.advance_time(300)?;
    page.deliver_all()?;

    page.type_text("#city", "bern")?;
    page.advance_time(300)?;
    page.deliver_all()?;

    assert_eq!(page.dump_dom("#city-suggestions")?, "<datalist id='city-suggestions'></datalist>");
    Ok(())
}

#[test]
fn non_success_status_with_valid_body_still_applies() -> Result<()> {
    // The suggestion lookup ignores the status line; only the body shape matters.
    let (mut page, _) = city_page()?;
    page.set_fetch_mock(Method::Get, "/api/search-cities?q=ber", 404, BERLIN_BODY);

    page.type_text("#city", "ber")?;
    page.advance_time(300)?;
    page.deliver_all()?;

    page.type_text("#city", "Berlin")?;
    page.submit("#cityForm")?;
    assert!(page.take_alert_messages().is_empty());
    assert_eq!(page.take_form_submissions().len(), 1);
    Ok(())
}

#[test]
fn detaching_the_widget_clears_its_pending_debounce_timer() -> Result<()> {
    let (mut page, widget) = city_page()?;

    page.type_text("#city", "ber")?;
    assert_eq!(page.pending_timers().len(), 1);

    page.detach(widget)?;
    assert!(page.pending_timers().is_empty());

    page.advance_time(1_000)?;
    assert!(page.take_fetch_calls().is_empty());
    Ok(())
}

#[test]
fn custom_config_overrides_ids_endpoint_and_debounce() -> Result<()> {
    let html = r#"
        <form id='travelForm'>
          <input id='destination' list='destination-options'>
          <datalist id='destination-options'></datalist>
        </form>
        "#;
    let mut page = Page::from_html(html)?;
    page.attach_city_autocomplete(CityAutocompleteConfig {
        input_id: "destination".into(),
        datalist_id: "destination-options".into(),
        endpoint: "/api/destinations".into(),
        debounce_ms: 50,
    })?;

    page.type_text("#destination", "os")?;
    page.advance_time(50)?;

    let calls = page.take_fetch_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "/api/destinations?q=os");
    Ok(())
}
