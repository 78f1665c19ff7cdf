use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Movie and review endpoints. Each handler takes the `AuthUser` extractor, which
/// rejects missing or invalid tokens with 401 before the repository is reached.
///
/// Every route registers `method_not_allowed` as its method fallback, so unsupported
/// verbs answer 405 with a JSON message and no credential check.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /movies?reviews=true
        // Lists movies, optionally joined with reviews and sorted by average rating.
        // POST /movies
        // Creates a movie and returns the full collection.
        .route(
            "/movies",
            get(handlers::list_movies)
                .post(handlers::create_movie)
                .fallback(handlers::method_not_allowed),
        )
        // GET/PUT/DELETE /movies/{title}
        // Title-keyed read, partial update and removal.
        .route(
            "/movies/{title}",
            get(handlers::get_movie)
                .put(handlers::update_movie)
                .delete(handlers::delete_movie)
                .fallback(handlers::method_not_allowed),
        )
        // GET/POST /reviews
        // Review listing and creation. Creation checks the movie exists first.
        .route(
            "/reviews",
            get(handlers::list_reviews)
                .post(handlers::create_review)
                .fallback(handlers::method_not_allowed),
        )
}
