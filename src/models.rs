use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A registered account as held by the credential store. The `password` field is
/// the bcrypt hash and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    // Unique across all users.
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Movie
///
/// A movie document from the `movies` table. Titles are unique and used as the
/// lookup key on `/movies/{title}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub release_date: Option<String>,
    pub genre: Option<String>,
    // Billing order is preserved.
    pub actors: Vec<String>,
    pub image_url: Option<String>,
}

/// Review
///
/// A single rating left on a movie. `movie_id` references `Movie::id`; reviews are
/// never updated or deleted through the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Review {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub username: String,
    pub review: String,
    pub rating: f64,
}

/// MovieWithReviews
///
/// Result of the review join: the movie's own fields, every review attached to it,
/// and the mean rating. `avg_rating` is `null` (not zero) when there are no reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MovieWithReviews {
    #[serde(flatten)]
    pub movie: Movie,
    pub reviews: Vec<Review>,
    pub avg_rating: Option<f64>,
}

// --- Request Payloads (Input Schemas) ---

/// SignupRequest
///
/// Body of `POST /signup`. Fields are optional at the JSON level so that a missing
/// username or password produces the `success: false` answer instead of a 422.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// SigninRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct SigninRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// CreateMovieRequest
///
/// Body of `POST /movies`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateMovieRequest {
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// UpdateMovieRequest
///
/// Partial update payload for `PUT /movies/{title}`. Only provided fields are written;
/// the title itself cannot be changed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateMovieRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// CreateReviewRequest
///
/// Body of `POST /reviews`. `movie_id` is kept as a string: an id that does not parse
/// cannot reference a movie and is answered with 404 like any other unknown id.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateReviewRequest {
    pub movie_id: String,
    // Falls back to the authenticated username when omitted.
    #[serde(default)]
    pub username: Option<String>,
    pub review: String,
    pub rating: f64,
}

// --- Internal insert payloads ---

/// NewUser
///
/// Insert payload for the credential store. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub username: String,
    pub password_hash: String,
}

/// NewReview
#[derive(Debug, Clone)]
pub struct NewReview {
    pub movie_id: Uuid,
    pub username: String,
    pub review: String,
    pub rating: f64,
}

// --- Response Schemas (Output) ---

/// AuthResponse
///
/// Answer shape shared by `/signup` and `/signin`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    // Already carries the `JWT ` scheme prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// MessageResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}
