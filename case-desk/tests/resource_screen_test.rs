mod common;

use case_core::{ErrorKind, SessionStore};
use case_desk::forms::templates;
use case_desk::forms::FieldPath;
use case_desk::screens::{ScreenError, ScreenMode};
use case_desk::{InvestigationDetails, Resource, ResourceClient, ResourceScreen};
use common::{TestBackend, REFRESH_PATH};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOTICES: &str = "/api/investigation/show-cause-notice/";
const NOTICE_3: &str = "/api/investigation/show-cause-notice/3/";

fn notice() -> Value {
    json!({
        "id": 3,
        "file_number": "INV/2024/017",
        "number": "SCN-11",
        "noticees": [
            { "name": "Unitech Traders", "amounts": [{ "tax": 1000 }] },
            { "name": "K. Shah", "amounts": [] },
        ],
    })
}

async fn mount_get(server: &MockServer, route: &str, body: Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_edit_sends_full_record_then_refetches() {
    let backend = TestBackend::start().await;

    let mut updated = notice();
    updated["noticees"] = json!([
        { "name": "Unitech Traders", "amounts": [{ "tax": 1000 }, { "tax": 250 }] },
    ]);

    mount_get(&backend.server, NOTICES, json!([notice()]), 2).await;
    mount_get(&backend.server, NOTICE_3, notice(), 2).await;
    Mock::given(method("PUT"))
        .and(path(NOTICE_3))
        .and(body_json(updated.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated.clone()))
        .expect(1)
        .mount(&backend.server)
        .await;

    let mut screen = ResourceScreen::new(ResourceClient::new(
        backend.api.clone(),
        Resource::ShowCauseNotice,
    ));
    screen.load().await.unwrap();
    assert_eq!(screen.rows().len(), 1);

    screen.select("3").await.unwrap();
    assert_eq!(screen.mode(), &ScreenMode::Viewing);

    let noticees = FieldPath::field("noticees");
    let form = screen.begin_edit().unwrap();
    let keys = form.entry_keys(&noticees);
    assert_eq!(keys.len(), 2);

    form.remove_entry(&noticees, keys[1]).unwrap();
    let amounts = noticees.entry(keys[0]).then("amounts");
    let line = form.push_entry(&amounts, json!({})).unwrap();
    form.update_at(&amounts.entry(line).then("tax"), json!(250))
        .unwrap();

    screen.submit().await.unwrap();

    assert_eq!(screen.mode(), &ScreenMode::Viewing);
    assert_eq!(screen.selected(), Some(&notice()));
    assert!(screen.notice().is_none());
    backend.server.verify().await;
}

#[tokio::test]
async fn test_delete_needs_confirmation() {
    let backend = TestBackend::start().await;
    let route = "/api/investigation/seizure/8/";

    mount_get(&backend.server, "/api/investigation/seizure/", json!([{ "id": 8 }]), 2).await;
    mount_get(&backend.server, route, json!({ "id": 8, "place": "Ward 12" }), 1).await;
    Mock::given(method("DELETE"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&backend.server)
        .await;

    let mut screen = ResourceScreen::new(ResourceClient::new(backend.api.clone(), Resource::Seizure));
    screen.load().await.unwrap();
    screen.select("8").await.unwrap();

    assert!(matches!(
        screen.confirm_delete().await,
        Err(ScreenError::DeleteNotRequested)
    ));
    assert_eq!(backend.requests_to("DELETE", route).await, 0);

    screen.request_delete().unwrap();
    screen.cancel();
    assert_eq!(screen.mode(), &ScreenMode::Viewing);

    screen.request_delete().unwrap();
    screen.confirm_delete().await.unwrap();

    assert_eq!(screen.mode(), &ScreenMode::Browsing);
    assert!(screen.selected().is_none());
    backend.server.verify().await;
}

#[tokio::test]
async fn test_failed_update_keeps_form_and_sets_notice() {
    let backend = TestBackend::start().await;

    mount_get(&backend.server, NOTICE_3, notice(), 1).await;
    Mock::given(method("PUT"))
        .and(path(NOTICE_3))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "number": ["This field is required."] })),
        )
        .expect(1)
        .mount(&backend.server)
        .await;

    let mut screen = ResourceScreen::new(ResourceClient::new(
        backend.api.clone(),
        Resource::ShowCauseNotice,
    ));
    screen.select("3").await.unwrap();
    screen
        .begin_edit()
        .unwrap()
        .update_at(&FieldPath::field("number"), Value::Null)
        .unwrap();

    let err = screen.submit().await.unwrap_err();
    assert!(matches!(err, ScreenError::Client(_)));

    let notice = screen.notice().unwrap();
    assert_eq!(notice.kind, ErrorKind::Request);
    assert!(!notice.requires_sign_in);
    assert!(matches!(screen.mode(), ScreenMode::Editing(_)));
    assert_eq!(
        screen.form().unwrap().get(&FieldPath::field("number")),
        Some(&Value::Null)
    );
}

#[tokio::test]
async fn test_failed_refresh_asks_for_sign_in() {
    let backend = TestBackend::start().await;

    Mock::given(method("GET"))
        .and(path("/api/investigation/arrest/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&backend.server)
        .await;

    let mut screen = ResourceScreen::new(ResourceClient::new(backend.api.clone(), Resource::Arrest));
    assert!(screen.load().await.is_err());

    let notice = screen.notice().unwrap();
    assert_eq!(notice.kind, ErrorKind::RefreshFailed);
    assert!(notice.requires_sign_in);
    assert!(screen.rows().is_empty());
    assert!(backend.store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_on_scoped_screen() {
    let backend = TestBackend::start().await;
    let scoped_list = "/api/investigation/summons/investigation/INV%2F2024%2F017/";

    let sent = json!({
        "file_number": "INV/2024/017",
        "persons": [{ "name": "R. Mehta", "designation": "", "statements": [] }],
    });
    let mut created = sent.clone();
    created["id"] = json!(21);

    Mock::given(method("POST"))
        .and(path("/api/investigation/summons/"))
        .and(body_json(sent))
        .respond_with(ResponseTemplate::new(201).set_body_json(created.clone()))
        .expect(1)
        .mount(&backend.server)
        .await;
    mount_get(&backend.server, scoped_list, json!([created.clone()]), 1).await;
    mount_get(&backend.server, "/api/investigation/summons/21/", created.clone(), 1).await;

    let mut screen = ResourceScreen::scoped(
        ResourceClient::new(backend.api.clone(), Resource::Summons),
        "INV/2024/017",
    );
    let persons = FieldPath::field("persons");
    let form = screen.begin_create().unwrap();
    let person = form.push_entry(&persons, templates::summons_person()).unwrap();
    form.update_at(&persons.entry(person).then("name"), json!("R. Mehta"))
        .unwrap();

    screen.submit().await.unwrap();

    assert_eq!(screen.rows().len(), 1);
    assert_eq!(screen.selected(), Some(&created));
    assert_eq!(screen.mode(), &ScreenMode::Viewing);
    backend.server.verify().await;
}

#[tokio::test]
async fn test_investigation_panels_are_scoped_to_file_number() {
    let backend = TestBackend::start().await;

    mount_get(
        &backend.server,
        "/api/investigation/inspection/investigation/INV%2F2024%2F017/",
        json!([{ "id": 1 }, { "id": 2 }]),
        1,
    )
    .await;

    let mut details = InvestigationDetails::new(backend.api.clone(), "INV/2024/017");
    assert_eq!(details.active_panel(), Resource::Taxpayer);
    assert!(!InvestigationDetails::panels().contains(&Resource::Investigation));

    details.show(Resource::Inspection).await.unwrap();
    assert_eq!(details.active_panel(), Resource::Inspection);
    assert_eq!(details.screen().rows().len(), 2);
    assert_eq!(details.screen().file_number(), Some("INV/2024/017"));

    assert!(matches!(
        details.show(Resource::Investigation).await,
        Err(ScreenError::UnknownPanel(Resource::Investigation))
    ));
    assert_eq!(details.active_panel(), Resource::Inspection);
    backend.server.verify().await;
}
