use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use rstest::*;
use serde_json::{json, Value};
use speculoos::prelude::*;
use tower::ServiceExt;
use uuid::Uuid;

use nabta_opportunities::{
    adapters::{
        auth::jwt::JwtAuth,
        database::memory::MemoryDatabase,
        http::{router, AppState},
    },
    domain::{Actor, Company, Volunteer},
    ports::database::{ChangeSet, DatabasePort},
};

struct TestApp {
    app: Router,
    auth: JwtAuth,
    database: MemoryDatabase,
}

impl TestApp {
    fn token(&self, actor: Actor) -> String {
        self.auth.issue(actor, Duration::hours(1)).unwrap()
    }

    async fn volunteer(&self, name: &str, points: u32) -> Volunteer {
        let mut volunteer = Volunteer::new(name, format!("{name}@example.com"));
        volunteer.points = points;
        self.database
            .commit(ChangeSet::default().with_volunteer(volunteer))
            .await
            .unwrap()
            .volunteers
            .remove(0)
    }

    async fn company(&self, name: &str) -> Company {
        let company = Company::new(name, format!("contact@{name}.example"), "Sponsor");
        self.database
            .commit(ChangeSet::default().with_company(company))
            .await
            .unwrap()
            .companies
            .remove(0)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        actor: Option<Actor>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token(actor)),
            );
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

#[fixture]
fn test_app() -> TestApp {
    let database = MemoryDatabase::default();
    let auth = JwtAuth::new("integration-secret");
    let state = AppState::new(Arc::new(database.clone()), Arc::new(auth.clone()));

    TestApp {
        app: router(state),
        auth,
        database,
    }
}

fn new_opportunity(max_participants: u32, points: u32) -> Value {
    json!({
        "title": "Beach clean-up",
        "description": "Collect plastic along the shore",
        "location": "Jeddah Corniche",
        "category": "environmental",
        "type": "volunteering",
        "date": Utc::now() + Duration::days(3),
        "duration": 3,
        "points": points,
        "maxParticipants": max_participants,
    })
}

fn opportunity_id(body: &Value) -> String {
    body["data"]["id"].as_str().unwrap().to_string()
}

#[rstest]
#[tokio::test]
async fn test_health(test_app: TestApp) {
    let (status, body) = test_app.send(Method::GET, "/health", None, None).await;

    assert_that!(status).is_equal_to(StatusCode::OK);
    assert_that!(body["status"]).is_equal_to(json!("healthy"));
}

#[rstest]
#[tokio::test]
async fn test_full_lifecycle(test_app: TestApp) {
    // GIVEN a company and three volunteers
    let company = test_app.company("greenco").await;
    let a = test_app.volunteer("a", 0).await;
    let b = test_app.volunteer("b", 0).await;
    let c = test_app.volunteer("c", 0).await;

    // WHEN the company creates an opportunity with 2 spots
    let (status, body) = test_app
        .send(
            Method::POST,
            "/api/opportunities",
            Some(Actor::Company(company.id)),
            Some(new_opportunity(2, 50)),
        )
        .await;
    assert_that!(status).is_equal_to(StatusCode::CREATED);
    assert_that!(body["data"]["remainingSpots"]).is_equal_to(json!(2));
    assert_that!(body["data"]["status"]).is_equal_to(json!("upcoming"));
    let id = opportunity_id(&body);

    // AND three volunteers try to join
    for volunteer in [&a, &b] {
        let (status, _) = test_app
            .send(
                Method::POST,
                &format!("/api/opportunities/{id}/join"),
                Some(Actor::Volunteer(volunteer.id)),
                None,
            )
            .await;
        assert_that!(status).is_equal_to(StatusCode::OK);
    }
    let (status, body) = test_app
        .send(
            Method::POST,
            &format!("/api/opportunities/{id}/join"),
            Some(Actor::Volunteer(c.id)),
            None,
        )
        .await;
    assert_that!(status).is_equal_to(StatusCode::BAD_REQUEST);
    assert_that!(body["error"]["kind"]).is_equal_to(json!("CapacityError"));

    // AND the company completes it
    let (status, body) = test_app
        .send(
            Method::POST,
            &format!("/api/opportunities/{id}/complete"),
            Some(Actor::Company(company.id)),
            None,
        )
        .await;
    assert_that!(status).is_equal_to(StatusCode::OK);
    assert_that!(body["data"]["status"]).is_equal_to(json!("completed"));
    assert_that!(body["awarded"].as_array().unwrap().len()).is_equal_to(2);

    // THEN A and B have 50 points each, and completing again fails
    let (_, stats) = test_app
        .send(Method::GET, &format!("/api/users/{}/stats", a.id), None, None)
        .await;
    assert_that!(stats["data"]["points"]).is_equal_to(json!(50));
    assert_that!(stats["data"]["eventsCompleted"]).is_equal_to(json!(1));
    let (status, body) = test_app
        .send(
            Method::POST,
            &format!("/api/opportunities/{id}/complete"),
            Some(Actor::Company(company.id)),
            None,
        )
        .await;
    assert_that!(status).is_equal_to(StatusCode::BAD_REQUEST);
    assert_that!(body["error"]["kind"]).is_equal_to(json!("AlreadyCompletedError"));

    let (_, impact) = test_app
        .send(
            Method::GET,
            &format!("/api/companies/{}/impact", company.id),
            None,
            None,
        )
        .await;
    assert_that!(impact["data"]["impactMetrics"]["hoursContributed"]).is_equal_to(json!(6.0));
}

#[rstest]
#[tokio::test]
async fn test_create_requires_token(test_app: TestApp) {
    let (status, body) = test_app
        .send(
            Method::POST,
            "/api/opportunities",
            None,
            Some(new_opportunity(2, 50)),
        )
        .await;

    assert_that!(status).is_equal_to(StatusCode::UNAUTHORIZED);
    assert_that!(body["success"]).is_equal_to(json!(false));
    assert_that!(body["error"]["kind"]).is_equal_to(json!("UnauthenticatedError"));
}

#[rstest]
#[tokio::test]
async fn test_create_by_volunteer_forbidden(test_app: TestApp) {
    let (status, _) = test_app
        .send(
            Method::POST,
            "/api/opportunities",
            Some(Actor::Volunteer(Uuid::new_v4())),
            Some(new_opportunity(2, 50)),
        )
        .await;

    assert_that!(status).is_equal_to(StatusCode::FORBIDDEN);
}

#[rstest]
#[tokio::test]
async fn test_create_invalid_payload(test_app: TestApp) {
    let (status, body) = test_app
        .send(
            Method::POST,
            "/api/opportunities",
            Some(Actor::Admin(Uuid::new_v4())),
            Some(json!({ "title": "Missing everything" })),
        )
        .await;

    assert_that!(status).is_equal_to(StatusCode::BAD_REQUEST);
    assert_that!(body["error"]["kind"]).is_equal_to(json!("ValidationError"));

    let (status, _) = test_app
        .send(
            Method::POST,
            "/api/opportunities",
            Some(Actor::Admin(Uuid::new_v4())),
            Some(new_opportunity(2, 0)),
        )
        .await;
    assert_that!(status).is_equal_to(StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test]
async fn test_get_missing_and_malformed(test_app: TestApp) {
    let (status, body) = test_app
        .send(
            Method::GET,
            &format!("/api/opportunities/{}", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_that!(status).is_equal_to(StatusCode::NOT_FOUND);
    assert_that!(body["error"]["kind"]).is_equal_to(json!("NotFoundError"));

    let (status, _) = test_app
        .send(Method::GET, "/api/opportunities/not-an-id", None, None)
        .await;
    assert_that!(status).is_equal_to(StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test]
async fn test_exclusive_event_insufficient_points(test_app: TestApp) {
    // GIVEN an exclusive event costing 200 points
    let volunteer = test_app.volunteer("amal", 50).await;
    let mut payload = new_opportunity(10, 1);
    payload["type"] = json!("exclusive_event");
    payload["pointsRequired"] = json!(200);
    let (_, body) = test_app
        .send(
            Method::POST,
            "/api/opportunities",
            Some(Actor::Admin(Uuid::new_v4())),
            Some(payload),
        )
        .await;
    let id = opportunity_id(&body);

    // WHEN a volunteer with 50 points joins
    let (status, body) = test_app
        .send(
            Method::POST,
            &format!("/api/opportunities/{id}/join"),
            Some(Actor::Volunteer(volunteer.id)),
            None,
        )
        .await;

    // THEN the message tells how many points are missing
    assert_that!(status).is_equal_to(StatusCode::BAD_REQUEST);
    assert_that!(body["error"]["kind"]).is_equal_to(json!("InsufficientPointsError"));
    assert_that!(body["error"]["message"]).is_equal_to(json!(
        "You need 200 points to join this event, but you only have 50"
    ));

    // AND it is listed among exclusive events only
    let (_, exclusive) = test_app
        .send(Method::GET, "/api/opportunities/exclusive", None, None)
        .await;
    assert_that!(exclusive["count"]).is_equal_to(json!(1));
    let (_, volunteering) = test_app
        .send(Method::GET, "/api/opportunities", None, None)
        .await;
    assert_that!(volunteering["count"]).is_equal_to(json!(0));
}

#[rstest]
#[tokio::test]
async fn test_update_delete_by_owner(test_app: TestApp) {
    let owner = test_app.company("greenco").await;
    let other = test_app.company("otherco").await;
    let (_, body) = test_app
        .send(
            Method::POST,
            "/api/opportunities",
            Some(Actor::Company(owner.id)),
            Some(new_opportunity(5, 20)),
        )
        .await;
    let id = opportunity_id(&body);
    let uri = format!("/api/opportunities/{id}");

    let (status, _) = test_app
        .send(
            Method::PUT,
            &uri,
            Some(Actor::Company(other.id)),
            Some(json!({ "title": "Hijacked" })),
        )
        .await;
    assert_that!(status).is_equal_to(StatusCode::FORBIDDEN);

    let (status, body) = test_app
        .send(
            Method::PUT,
            &uri,
            Some(Actor::Company(owner.id)),
            Some(json!({ "title": "Mangrove planting" })),
        )
        .await;
    assert_that!(status).is_equal_to(StatusCode::OK);
    assert_that!(body["data"]["title"]).is_equal_to(json!("Mangrove planting"));

    let (status, body) = test_app
        .send(Method::DELETE, &uri, Some(Actor::Company(owner.id)), None)
        .await;
    assert_that!(status).is_equal_to(StatusCode::OK);
    assert_that!(body["data"]).is_equal_to(json!({}));

    let (status, _) = test_app.send(Method::GET, &uri, None, None).await;
    assert_that!(status).is_equal_to(StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn test_category_and_location(test_app: TestApp) {
    test_app
        .send(
            Method::POST,
            "/api/opportunities",
            Some(Actor::Admin(Uuid::new_v4())),
            Some(new_opportunity(5, 20)),
        )
        .await;

    let (status, body) = test_app
        .send(
            Method::GET,
            "/api/opportunities/category/environmental",
            None,
            None,
        )
        .await;
    assert_that!(status).is_equal_to(StatusCode::OK);
    assert_that!(body["count"]).is_equal_to(json!(1));

    let (status, _) = test_app
        .send(Method::GET, "/api/opportunities/category/sports", None, None)
        .await;
    assert_that!(status).is_equal_to(StatusCode::BAD_REQUEST);

    let (_, body) = test_app
        .send(Method::GET, "/api/opportunities/location/corniche", None, None)
        .await;
    assert_that!(body["count"]).is_equal_to(json!(1));
}

#[rstest]
#[tokio::test]
async fn test_canceled_opportunity_is_closed(test_app: TestApp) {
    // GIVEN an opportunity canceled by an admin
    let admin = Actor::Admin(Uuid::new_v4());
    let volunteer = test_app.volunteer("amal", 0).await;
    let (_, body) = test_app
        .send(
            Method::POST,
            "/api/opportunities",
            Some(admin),
            Some(new_opportunity(5, 50)),
        )
        .await;
    let id = opportunity_id(&body);
    let (status, body) = test_app
        .send(
            Method::PUT,
            &format!("/api/opportunities/{id}"),
            Some(admin),
            Some(json!({ "status": "canceled" })),
        )
        .await;
    assert_that!(status).is_equal_to(StatusCode::OK);
    assert_that!(body["data"]["status"]).is_equal_to(json!("canceled"));

    // WHEN a volunteer joins and the admin completes it
    let (join_status, join_body) = test_app
        .send(
            Method::POST,
            &format!("/api/opportunities/{id}/join"),
            Some(Actor::Volunteer(volunteer.id)),
            None,
        )
        .await;
    let (complete_status, complete_body) = test_app
        .send(
            Method::POST,
            &format!("/api/opportunities/{id}/complete"),
            Some(admin),
            None,
        )
        .await;

    // THEN both are rejected and it stays canceled
    assert_that!(join_status).is_equal_to(StatusCode::BAD_REQUEST);
    assert_that!(join_body["error"]["kind"]).is_equal_to(json!("CanceledError"));
    assert_that!(complete_status).is_equal_to(StatusCode::BAD_REQUEST);
    assert_that!(complete_body["error"]["kind"]).is_equal_to(json!("CanceledError"));
    let (_, body) = test_app
        .send(Method::GET, &format!("/api/opportunities/{id}"), None, None)
        .await;
    assert_that!(body["data"]["status"]).is_equal_to(json!("canceled"));
    let (_, stats) = test_app
        .send(
            Method::GET,
            &format!("/api/users/{}/stats", volunteer.id),
            None,
            None,
        )
        .await;
    assert_that!(stats["data"]["points"]).is_equal_to(json!(0));
}
