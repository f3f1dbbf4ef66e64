mod test_utils;

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use calsync::model::Provider;
use calsync::store::CalendarStore;

use test_utils::Harness;

#[tokio::test]
async fn new_google_calendars_are_created_with_all_remote_fields() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server);
    let account_id = Uuid::new_v4();
    harness.seed_fresh_credential(account_id, Provider::Google).await;

    Mock::given(method("GET"))
        .and(path("/users/me/calendarList"))
        .and(bearer_token("stored-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "primary-cal",
                    "summary": "Personal",
                    "backgroundColor": "#9fe1e7",
                    "primary": true,
                    "accessRole": "owner"
                },
                {
                    "id": "team-cal",
                    "summary": "Team",
                    "description": "Shared team calendar",
                    "accessRole": "reader"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    harness
        .engine
        .sync_calendar_list(account_id, Provider::Google)
        .await
        .unwrap();

    let calendars = harness
        .store
        .list_for_account(account_id, Provider::Google)
        .await
        .unwrap();
    assert_eq!(calendars.len(), 2);

    let primary = calendars
        .iter()
        .find(|calendar| calendar.external_id == "primary-cal")
        .unwrap();
    assert_eq!(primary.name, "Personal");
    assert_eq!(primary.color.as_deref(), Some("#9fe1e7"));
    assert!(primary.is_primary);
    assert!(!primary.is_read_only);
    assert!(primary.is_visible);
    assert!(!primary.is_favorite);

    let team = calendars
        .iter()
        .find(|calendar| calendar.external_id == "team-cal")
        .unwrap();
    assert_eq!(team.description.as_deref(), Some("Shared team calendar"));
    assert!(team.is_read_only);
}

#[tokio::test]
async fn resync_updates_remote_fields_but_preserves_user_owned_flags() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server);
    let account_id = Uuid::new_v4();
    harness.seed_fresh_credential(account_id, Provider::Google).await;

    let list_body = |name: &str| {
        json!({
            "items": [
                { "id": "cal-1", "summary": name, "backgroundColor": "#111111", "accessRole": "owner" }
            ]
        })
    };

    let first_pass = Mock::given(method("GET"))
        .and(path("/users/me/calendarList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body("Before")))
        .expect(1)
        .mount_as_scoped(&server)
        .await;
    harness
        .engine
        .sync_calendar_list(account_id, Provider::Google)
        .await
        .unwrap();
    drop(first_pass);

    // The user hides the calendar, stars it, and recolors it locally.
    let mut local = harness
        .store
        .list_for_account(account_id, Provider::Google)
        .await
        .unwrap()
        .remove(0);
    local.is_visible = false;
    local.is_favorite = true;
    local.color = Some("#ff0000".into());
    harness.store.update(local).await.unwrap();

    Mock::given(method("GET"))
        .and(path("/users/me/calendarList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body("After")))
        .expect(1)
        .mount(&server)
        .await;
    harness
        .engine
        .sync_calendar_list(account_id, Provider::Google)
        .await
        .unwrap();

    let calendars = harness
        .store
        .list_for_account(account_id, Provider::Google)
        .await
        .unwrap();
    assert_eq!(calendars.len(), 1, "resync must not duplicate the calendar");
    let synced = &calendars[0];
    assert_eq!(synced.name, "After");
    assert!(!synced.is_visible, "visibility is user-owned");
    assert!(synced.is_favorite, "favorite flag is user-owned");
    assert_eq!(
        synced.color.as_deref(),
        Some("#ff0000"),
        "color is user-owned after creation"
    );
}

#[tokio::test]
async fn graph_calendar_list_maps_writability_and_auto_color() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server);
    let account_id = Uuid::new_v4();
    harness
        .seed_fresh_credential(account_id, Provider::Microsoft)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/calendars"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {
                    "id": "AAMk-default",
                    "name": "Calendar",
                    "color": "auto",
                    "isDefaultCalendar": true,
                    "canEdit": true
                },
                {
                    "id": "AAMk-shared",
                    "name": "Org Events",
                    "color": "lightBlue",
                    "isDefaultCalendar": false,
                    "canEdit": false
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    harness
        .engine
        .sync_calendar_list(account_id, Provider::Microsoft)
        .await
        .unwrap();

    let calendars = harness
        .store
        .list_for_account(account_id, Provider::Microsoft)
        .await
        .unwrap();
    assert_eq!(calendars.len(), 2);

    let default = calendars
        .iter()
        .find(|calendar| calendar.external_id == "AAMk-default")
        .unwrap();
    assert!(default.is_primary);
    assert_eq!(default.color, None, "'auto' is not a real color");

    let shared = calendars
        .iter()
        .find(|calendar| calendar.external_id == "AAMk-shared")
        .unwrap();
    assert!(shared.is_read_only);
    assert_eq!(shared.color.as_deref(), Some("lightBlue"));
}
