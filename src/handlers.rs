use crate::{
    AppState,
    auth::{self, AuthUser, TOKEN_SCHEME},
    error::ApiError,
    models::{
        AuthResponse, CreateMovieRequest, CreateReviewRequest, MessageResponse, Movie,
        MovieWithReviews, NewReview, NewUser, Review, SigninRequest, SignupRequest,
        UpdateMovieRequest,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// ReviewsQuery
///
/// Query string accepted by the movie read endpoints. Only the exact value `true`
/// enables the review join; anything else (or nothing) returns plain movies.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewsQuery {
    /// Set to `true` to attach reviews and `avgRating`.
    pub reviews: Option<String>,
}

impl ReviewsQuery {
    pub fn include_reviews(&self) -> bool {
        self.reviews.as_deref() == Some("true")
    }
}

/// A missing or malformed credentials body reads as one with every field absent.
fn body_or_default<T: Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!("unreadable credentials body: {}", rejection.body_text());
            T::default()
        }
    }
}

/// Treats `None` and `Some("")` alike.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// --- Account Handlers ---

/// signup
///
/// [Public Route] Registers a new user. Missing credentials (including a missing or
/// unreadable body) and duplicate usernames are answered with `200` and `success: false`.
#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Created, or rejected with success=false", body = AuthResponse),
        (status = 500, description = "Store failure")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let payload = body_or_default(payload);
    let (Some(username), Some(password)) = (non_empty(payload.username), non_empty(payload.password))
    else {
        return Err(ApiError::Validation(
            "Please include both username and password to signup.",
        ));
    };

    let password_hash = auth::hash_password_blocking(password, state.config.bcrypt_cost).await?;
    let user = state
        .repo
        .create_user(NewUser {
            name: payload.name,
            username,
            password_hash,
        })
        .await?;

    tracing::info!("created user {}", user.username);

    Ok(Json(AuthResponse {
        success: true,
        msg: Some("Successfully created new user.".to_string()),
        token: None,
    }))
}

/// signin
///
/// [Public Route] Exchanges credentials for a token prefixed with `JWT `. Unknown
/// usernames, wrong passwords and missing bodies all answer 401.
#[utoipa::path(
    post,
    path = "/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 401, description = "Authentication failed")
    )
)]
pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let payload = body_or_default(payload);
    let username = payload.username.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let found = state.repo.find_user_by_username(&username).await?;
    let known = found.is_some();

    let Some(user) = auth::check_credentials(found, password, state.config.bcrypt_cost).await?
    else {
        if known {
            tracing::warn!("signin with wrong password for {}", username);
        } else {
            tracing::warn!("signin for unknown user {}", username);
        }
        return Err(ApiError::Unauthorized);
    };

    let token = auth::issue_token(&state.config.jwt_secret, user.id, &user.username)?;

    Ok(Json(AuthResponse {
        success: true,
        msg: None,
        token: Some(format!("{TOKEN_SCHEME}{token}")),
    }))
}

// --- Movie Handlers ---

/// list_movies
///
/// [Authenticated Route] Lists every movie. With `reviews=true` each movie carries its
/// reviews and `avgRating`, highest rated first and unrated last.
#[utoipa::path(
    get,
    path = "/movies",
    params(ReviewsQuery),
    responses(
        (status = 200, description = "Movies (joined with reviews when reviews=true)", body = [MovieWithReviews]),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_movies(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Response, ApiError> {
    if query.include_reviews() {
        let movies = state.repo.list_movies_with_reviews().await?;
        Ok(Json(movies).into_response())
    } else {
        let movies = state.repo.list_movies().await?;
        Ok(Json(movies).into_response())
    }
}

/// create_movie
///
/// [Authenticated Route] Inserts a movie and answers with the whole collection, not the
/// created item.
#[utoipa::path(
    post,
    path = "/movies",
    request_body = CreateMovieRequest,
    responses(
        (status = 200, description = "All movies after the insert", body = [Movie]),
        (status = 409, description = "Title already exists")
    )
)]
pub async fn create_movie(
    AuthUser { username, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateMovieRequest>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let movie = state.repo.create_movie(payload).await?;
    tracing::info!("{} created movie {}", username, movie.title);

    Ok(Json(state.repo.list_movies().await?))
}

/// get_movie
///
/// [Authenticated Route] Looks a movie up by title. With `reviews=true` the answer is an
/// array of joined documents; otherwise the single movie object.
#[utoipa::path(
    get,
    path = "/movies/{title}",
    params(("title" = String, Path, description = "Movie title"), ReviewsQuery),
    responses(
        (status = 200, description = "Movie, or [MovieWithReviews] when reviews=true", body = Movie),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn get_movie(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(title): Path<String>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Response, ApiError> {
    if query.include_reviews() {
        let movies = state.repo.find_movie_with_reviews(&title).await?;
        if movies.is_empty() {
            return Err(ApiError::NotFound);
        }
        Ok(Json(movies).into_response())
    } else {
        let movie = state
            .repo
            .find_movie_by_title(&title)
            .await?
            .ok_or(ApiError::NotFound)?;
        Ok(Json(movie).into_response())
    }
}

/// update_movie
///
/// [Authenticated Route] Overwrites release date, genre, actors and image URL of the
/// movie with this title. Omitted fields are left unchanged.
#[utoipa::path(
    put,
    path = "/movies/{title}",
    params(("title" = String, Path, description = "Movie title")),
    request_body = UpdateMovieRequest,
    responses(
        (status = 200, description = "Updated", body = Movie),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn update_movie(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(title): Path<String>,
    Json(payload): Json<UpdateMovieRequest>,
) -> Result<Json<Movie>, ApiError> {
    match state.repo.update_movie(&title, payload).await? {
        Some(movie) => Ok(Json(movie)),
        None => Err(ApiError::NotFound),
    }
}

/// delete_movie
///
/// [Authenticated Route] Removes the movie with this title. Its reviews are kept.
#[utoipa::path(
    delete,
    path = "/movies/{title}",
    params(("title" = String, Path, description = "Movie title")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn delete_movie(
    AuthUser { username, .. }: AuthUser,
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.repo.delete_movie(&title).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!("{} deleted movie {}", username, title);

    Ok(Json(MessageResponse {
        message: "Movie deleted successfully".to_string(),
    }))
}

// --- Review Handlers ---

/// list_reviews
///
/// [Authenticated Route] Lists every review.
#[utoipa::path(
    get,
    path = "/reviews",
    responses((status = 200, description = "All reviews", body = [Review]))
)]
pub async fn list_reviews(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(state.repo.list_reviews().await?))
}

/// create_review
///
/// [Authenticated Route] Stores a review after checking that the referenced movie
/// exists. The check and the insert are separate store calls.
#[utoipa::path(
    post,
    path = "/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Created", body = MessageResponse),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn create_review(
    AuthUser { username: caller, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let movie_id = Uuid::parse_str(&payload.movie_id).map_err(|_| ApiError::NotFound)?;
    if state.repo.find_movie(movie_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let review = state
        .repo
        .create_review(NewReview {
            movie_id,
            username: non_empty(payload.username).unwrap_or(caller),
            review: payload.review,
            rating: payload.rating,
        })
        .await?;
    tracing::debug!("review {} stored for movie {}", review.id, movie_id);

    Ok(Json(MessageResponse {
        message: "Review Created!".to_string(),
    }))
}

/// method_not_allowed
///
/// Fallback for unsupported verbs on the movie and review routes. Answers without
/// requiring a token.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
