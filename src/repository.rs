use crate::error::RepoError;
use crate::models::{
    CreateMovieRequest, Movie, MovieWithReviews, NewReview, NewUser, Review, UpdateMovieRequest,
    User,
};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, types::Json};
use std::{cmp::Ordering, collections::HashMap, sync::Arc};
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, so handlers stay
/// independent of the concrete store (`PostgresRepository`, `MemoryRepository`).
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---
    // Fails with DuplicateUsername when the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    // --- Movies ---
    async fn list_movies(&self) -> Result<Vec<Movie>, RepoError>;
    // Joined with reviews, ordered by average rating (unrated last).
    async fn list_movies_with_reviews(&self) -> Result<Vec<MovieWithReviews>, RepoError>;
    async fn find_movie(&self, id: Uuid) -> Result<Option<Movie>, RepoError>;
    async fn find_movie_by_title(&self, title: &str) -> Result<Option<Movie>, RepoError>;
    // Empty when no movie has this title.
    async fn find_movie_with_reviews(&self, title: &str) -> Result<Vec<MovieWithReviews>, RepoError>;
    // Fails with DuplicateTitle when the title is taken.
    async fn create_movie(&self, req: CreateMovieRequest) -> Result<Movie, RepoError>;
    async fn update_movie(
        &self,
        title: &str,
        req: UpdateMovieRequest,
    ) -> Result<Option<Movie>, RepoError>;
    // Returns true if a movie was removed.
    async fn delete_movie(&self, title: &str) -> Result<bool, RepoError>;

    // --- Reviews ---
    async fn list_reviews(&self) -> Result<Vec<Review>, RepoError>;
    async fn create_review(&self, review: NewReview) -> Result<Review, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Review join ---

/// average_rating
///
/// Arithmetic mean of the ratings, or `None` for an empty slice.
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: f64 = reviews.iter().map(|r| r.rating).sum();
    Some(total / reviews.len() as f64)
}

/// join_reviews
///
/// Attaches to every movie the reviews whose `movie_id` matches its id and computes
/// the average rating. Movie order is preserved; review order follows the input.
pub fn join_reviews(movies: Vec<Movie>, reviews: &[Review]) -> Vec<MovieWithReviews> {
    let mut by_movie: HashMap<Uuid, Vec<Review>> = HashMap::new();
    for review in reviews {
        by_movie.entry(review.movie_id).or_default().push(review.clone());
    }

    movies
        .into_iter()
        .map(|movie| {
            let reviews = by_movie.remove(&movie.id).unwrap_or_default();
            let avg_rating = average_rating(&reviews);
            MovieWithReviews {
                movie,
                reviews,
                avg_rating,
            }
        })
        .collect()
}

/// sort_by_avg_rating
///
/// Orders by `avg_rating` descending. Unrated movies go last; ties keep their order.
pub fn sort_by_avg_rating(movies: &mut [MovieWithReviews]) {
    movies.sort_by(|a, b| match (a.avg_rating, b.avg_rating) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

// --- Postgres ---

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row shape of the join query: movie columns plus the aggregated reviews.
#[derive(FromRow)]
struct MovieReviewRow {
    #[sqlx(flatten)]
    movie: Movie,
    reviews: Json<Vec<Review>>,
    avg_rating: Option<f64>,
}

impl From<MovieReviewRow> for MovieWithReviews {
    fn from(row: MovieReviewRow) -> Self {
        MovieWithReviews {
            movie: row.movie,
            reviews: row.reviews.0,
            avg_rating: row.avg_rating,
        }
    }
}

const MOVIE_COLUMNS: &str = "id, title, release_date, genre, actors, image_url";

// `json_build_object` keys match the camelCase serde names of `Review`.
const MOVIE_REVIEW_JOIN: &str = r#"
    SELECT
        m.id, m.title, m.release_date, m.genre, m.actors, m.image_url,
        COALESCE(
            json_agg(
                json_build_object(
                    'id', r.id,
                    'movieId', r.movie_id,
                    'username', r.username,
                    'review', r.review,
                    'rating', r.rating
                )
            ) FILTER (WHERE r.id IS NOT NULL),
            '[]'::json
        ) AS reviews,
        AVG(r.rating) AS avg_rating
    FROM movies m
    LEFT JOIN reviews r ON r.movie_id = m.id
"#;

/// Maps a unique violation on `constraint` to `duplicate`, anything else to `Database`.
fn classify(err: sqlx::Error, constraint: &str, duplicate: RepoError) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() && db_err.constraint() == Some(constraint) {
            return duplicate;
        }
    }
    RepoError::Database(err)
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, username, password) VALUES ($1, $2, $3, $4)
             RETURNING id, name, username, password",
        )
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.username)
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "users_username_key", RepoError::DuplicateUsername))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, username, password FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, RepoError> {
        let movies = sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies"))
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }

    /// list_movies_with_reviews
    ///
    /// Single aggregate query. `NULLS LAST` keeps unrated movies at the end, matching
    /// `sort_by_avg_rating`.
    async fn list_movies_with_reviews(&self) -> Result<Vec<MovieWithReviews>, RepoError> {
        let query = format!("{MOVIE_REVIEW_JOIN} GROUP BY m.id ORDER BY avg_rating DESC NULLS LAST");
        let rows = sqlx::query_as::<_, MovieReviewRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(MovieWithReviews::from).collect())
    }

    async fn find_movie(&self, id: Uuid) -> Result<Option<Movie>, RepoError> {
        let movie =
            sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(movie)
    }

    async fn find_movie_by_title(&self, title: &str) -> Result<Option<Movie>, RepoError> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE title = $1"
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn find_movie_with_reviews(&self, title: &str) -> Result<Vec<MovieWithReviews>, RepoError> {
        let query = format!("{MOVIE_REVIEW_JOIN} WHERE m.title = $1 GROUP BY m.id");
        let rows = sqlx::query_as::<_, MovieReviewRow>(&query)
            .bind(title)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(MovieWithReviews::from).collect())
    }

    async fn create_movie(&self, req: CreateMovieRequest) -> Result<Movie, RepoError> {
        sqlx::query_as::<_, Movie>(&format!(
            "INSERT INTO movies (id, title, release_date, genre, actors, image_url)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(req.title)
        .bind(req.release_date)
        .bind(req.genre)
        .bind(req.actors)
        .bind(req.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "movies_title_key", RepoError::DuplicateTitle))
    }

    /// update_movie
    ///
    /// Uses `COALESCE` so only fields present in `req` overwrite the stored values.
    async fn update_movie(
        &self,
        title: &str,
        req: UpdateMovieRequest,
    ) -> Result<Option<Movie>, RepoError> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            r#"
            UPDATE movies
            SET release_date = COALESCE($2, release_date),
                genre = COALESCE($3, genre),
                actors = COALESCE($4, actors),
                image_url = COALESCE($5, image_url)
            WHERE title = $1
            RETURNING {MOVIE_COLUMNS}
            "#
        ))
        .bind(title)
        .bind(req.release_date)
        .bind(req.genre)
        .bind(req.actors)
        .bind(req.image_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn delete_movie(&self, title: &str) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM movies WHERE title = $1")
            .bind(title)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, RepoError> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT id, movie_id, username, review, rating FROM reviews",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn create_review(&self, review: NewReview) -> Result<Review, RepoError> {
        let review = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (id, movie_id, username, review, rating) VALUES ($1, $2, $3, $4, $5)
             RETURNING id, movie_id, username, review, rating",
        )
        .bind(Uuid::new_v4())
        .bind(review.movie_id)
        .bind(review.username)
        .bind(review.review)
        .bind(review.rating)
        .fetch_one(&self.pool)
        .await?;
        Ok(review)
    }
}
