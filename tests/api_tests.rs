use movie_api::{AppConfig, AppState, MemoryRepository, create_router};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: Client,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let router = create_router(AppState::new(repo, AppConfig::default()));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        client: Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Signs up and signs in, returning the full `JWT <token>` header value.
    async fn login(&self, username: &str) -> String {
        let creds = json!({ "name": "Tester", "username": username, "password": "secret" });

        let signup: Value = self
            .client
            .post(self.url("/signup"))
            .json(&creds)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(signup["success"], true);

        let signin: Value = self
            .client
            .post(self.url("/signin"))
            .json(&creds)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        signin["token"].as_str().unwrap().to_string()
    }

    async fn create_movie(&self, token: &str, title: &str) -> Vec<Value> {
        let response = self
            .client
            .post(self.url("/movies"))
            .header("Authorization", token)
            .json(&json!({
                "title": title,
                "releaseDate": "1986",
                "genre": "Action",
                "actors": ["Sigourney Weaver", "Michael Biehn"],
                "imageUrl": "https://img.example/poster.jpg"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }

    async fn post_review(&self, token: &str, movie_id: &str, rating: f64) -> StatusCode {
        self.client
            .post(self.url("/reviews"))
            .header("Authorization", token)
            .json(&json!({
                "movieId": movie_id,
                "username": "critic",
                "review": "worth it",
                "rating": rating
            }))
            .send()
            .await
            .unwrap()
            .status()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.unwrap();

    assert!(response.status().is_success());
    // Request correlation header is always echoed.
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_movies_require_token() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/movies")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    let response = app
        .client
        .get(app.url("/reviews"))
        .header("Authorization", "Bearer whatever")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signin_token_has_jwt_scheme() {
    let app = spawn_app().await;
    let token = app.login("ellen").await;

    assert!(token.starts_with("JWT "));
}

#[tokio::test]
async fn test_signin_wrong_password_is_unauthorized() {
    let app = spawn_app().await;
    app.login("ellen").await;

    let response = app
        .client
        .post(app.url("/signin"))
        .json(&json!({ "username": "ellen", "password": "guess" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_signup_missing_password_keeps_ok_status() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/signup"))
        .json(&json!({ "username": "ellen" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_credentials_without_body_are_answered_in_json() {
    let app = spawn_app().await;

    // No Content-Type and no body at all.
    let response = app.client.post(app.url("/signup")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["msg"], "Please include both username and password to signup.");

    // JSON Content-Type with an empty body.
    let response = app
        .client
        .post(app.url("/signup"))
        .header("Content-Type", "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    for content_type in [None, Some("application/json")] {
        let mut request = app.client.post(app.url("/signin"));
        if let Some(value) = content_type {
            request = request.header("Content-Type", value);
        }
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["msg"], "Authentication failed.");
    }
}

#[tokio::test]
async fn test_lowercase_scheme_is_accepted() {
    let app = spawn_app().await;
    let token = app.login("ellen").await;
    let lowercase = token.replacen("JWT ", "jwt   ", 1);

    let response = app
        .client
        .get(app.url("/reviews"))
        .header("Authorization", lowercase)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unsupported_verbs_are_405_without_token() {
    let app = spawn_app().await;

    for (method, path) in [
        (reqwest::Method::PATCH, "/movies"),
        (reqwest::Method::DELETE, "/movies"),
        (reqwest::Method::POST, "/movies/Aliens"),
        (reqwest::Method::PUT, "/reviews"),
    ] {
        let response = app
            .client
            .request(method, app.url(path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{path}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "HTTP method not supported.");
    }
}

#[tokio::test]
async fn test_movie_review_lifecycle() {
    let app = spawn_app().await;
    let token = app.login("ellen").await;

    app.create_movie(&token, "Aliens").await;
    let movies = app.create_movie(&token, "Terminator").await;
    assert_eq!(movies.len(), 2);
    app.create_movie(&token, "Unreviewed").await;

    let id_of = |title: &str| {
        movies
            .iter()
            .find(|m| m["title"] == title)
            .and_then(|m| m["id"].as_str())
            .unwrap()
            .to_string()
    };
    let aliens = id_of("Aliens");
    let terminator = id_of("Terminator");

    assert_eq!(app.post_review(&token, &aliens, 2.0).await, StatusCode::OK);
    assert_eq!(app.post_review(&token, &aliens, 4.0).await, StatusCode::OK);
    assert_eq!(app.post_review(&token, &terminator, 5.0).await, StatusCode::OK);

    // Joined listing: highest average first, unrated last with a null average.
    let joined: Vec<Value> = app
        .client
        .get(app.url("/movies?reviews=true"))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<&str> = joined.iter().map(|m| m["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["Terminator", "Aliens", "Unreviewed"]);
    assert_eq!(joined[1]["avgRating"], 3.0);
    assert_eq!(joined[1]["reviews"].as_array().unwrap().len(), 2);
    assert!(joined[2]["avgRating"].is_null());

    // Title lookup, update and delete.
    let response = app
        .client
        .put(app.url("/movies/Aliens"))
        .header("Authorization", &token)
        .json(&json!({ "genre": "Sci-Fi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["genre"], "Sci-Fi");
    assert_eq!(updated["releaseDate"], "1986");

    let response = app
        .client
        .delete(app.url("/movies/Aliens"))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .get(app.url("/movies/Aliens"))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Reviews of the deleted movie remain listed.
    let reviews: Vec<Value> = app
        .client
        .get(app.url("/reviews"))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reviews.len(), 3);
}

#[tokio::test]
async fn test_review_for_unknown_movie_is_404() {
    let app = spawn_app().await;
    let token = app.login("ellen").await;

    let status = app
        .post_review(&token, &uuid::Uuid::new_v4().to_string(), 3.0)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let reviews: Vec<Value> = app
        .client
        .get(app.url("/reviews"))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(reviews.is_empty());
}

#[tokio::test]
async fn test_delete_unknown_title_is_404() {
    let app = spawn_app().await;
    let token = app.login("ellen").await;

    let response = app
        .client
        .delete(app.url("/movies/Nothing%20Here"))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;

    let doc: Value = app
        .client
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["paths"].get("/movies/{title}").is_some());
    assert!(doc["paths"].get("/signin").is_some());
}
