use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::RepoError,
    models::{
        CreateMovieRequest, Movie, MovieWithReviews, NewReview, NewUser, Review,
        UpdateMovieRequest, User,
    },
    repository::{Repository, join_reviews, sort_by_avg_rating},
};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    movies: Vec<Movie>,
    reviews: Vec<Review>,
}

/// MemoryRepository
///
/// An in-process implementation of `Repository`. Used when no `DATABASE_URL` is
/// configured locally and by the test suite. Collections keep insertion order and
/// follow the same uniqueness and ordering rules as the Postgres schema.
#[derive(Default)]
pub struct MemoryRepository {
    data: RwLock<Collections>,
    /// When true, every operation fails with a simulated database error.
    pub should_fail: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.data.read().await.users.len()
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.should_fail {
            return Err(RepoError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        self.check()?;
        let mut data = self.data.write().await;
        if data.users.iter().any(|u| u.username == user.username) {
            return Err(RepoError::DuplicateUsername);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            username: user.username,
            password: user.password_hash,
        };
        data.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        self.check()?;
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.username == username).cloned())
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, RepoError> {
        self.check()?;
        Ok(self.data.read().await.movies.clone())
    }

    async fn list_movies_with_reviews(&self) -> Result<Vec<MovieWithReviews>, RepoError> {
        self.check()?;
        let data = self.data.read().await;
        let mut joined = join_reviews(data.movies.clone(), &data.reviews);
        sort_by_avg_rating(&mut joined);
        Ok(joined)
    }

    async fn find_movie(&self, id: Uuid) -> Result<Option<Movie>, RepoError> {
        self.check()?;
        let data = self.data.read().await;
        Ok(data.movies.iter().find(|m| m.id == id).cloned())
    }

    async fn find_movie_by_title(&self, title: &str) -> Result<Option<Movie>, RepoError> {
        self.check()?;
        let data = self.data.read().await;
        Ok(data.movies.iter().find(|m| m.title == title).cloned())
    }

    async fn find_movie_with_reviews(&self, title: &str) -> Result<Vec<MovieWithReviews>, RepoError> {
        self.check()?;
        let data = self.data.read().await;
        let matching: Vec<Movie> = data
            .movies
            .iter()
            .filter(|m| m.title == title)
            .cloned()
            .collect();
        Ok(join_reviews(matching, &data.reviews))
    }

    async fn create_movie(&self, req: CreateMovieRequest) -> Result<Movie, RepoError> {
        self.check()?;
        let mut data = self.data.write().await;
        if data.movies.iter().any(|m| m.title == req.title) {
            return Err(RepoError::DuplicateTitle);
        }
        let movie = Movie {
            id: Uuid::new_v4(),
            title: req.title,
            release_date: req.release_date,
            genre: req.genre,
            actors: req.actors,
            image_url: req.image_url,
        };
        data.movies.push(movie.clone());
        Ok(movie)
    }

    async fn update_movie(
        &self,
        title: &str,
        req: UpdateMovieRequest,
    ) -> Result<Option<Movie>, RepoError> {
        self.check()?;
        let mut data = self.data.write().await;
        let Some(movie) = data.movies.iter_mut().find(|m| m.title == title) else {
            return Ok(None);
        };
        if let Some(release_date) = req.release_date {
            movie.release_date = Some(release_date);
        }
        if let Some(genre) = req.genre {
            movie.genre = Some(genre);
        }
        if let Some(actors) = req.actors {
            movie.actors = actors;
        }
        if let Some(image_url) = req.image_url {
            movie.image_url = Some(image_url);
        }
        Ok(Some(movie.clone()))
    }

    async fn delete_movie(&self, title: &str) -> Result<bool, RepoError> {
        self.check()?;
        let mut data = self.data.write().await;
        let before = data.movies.len();
        data.movies.retain(|m| m.title != title);
        Ok(data.movies.len() < before)
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, RepoError> {
        self.check()?;
        Ok(self.data.read().await.reviews.clone())
    }

    async fn create_review(&self, review: NewReview) -> Result<Review, RepoError> {
        self.check()?;
        let review = Review {
            id: Uuid::new_v4(),
            movie_id: review.movie_id,
            username: review.username,
            review: review.review,
            rating: review.rating,
        };
        self.data.write().await.reviews.push(review.clone());
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_movie(title: &str) -> CreateMovieRequest {
        CreateMovieRequest {
            title: title.to_string(),
            ..CreateMovieRequest::default()
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let repo = MemoryRepository::new();
        let user = NewUser {
            name: None,
            username: "dallas".to_string(),
            password_hash: "hash".to_string(),
        };
        repo.create_user(user.clone()).await.unwrap();

        let err = repo.create_user(user).await.unwrap_err();
        assert!(matches!(err, RepoError::DuplicateUsername));
        assert_eq!(repo.user_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_title_is_rejected() {
        let repo = MemoryRepository::new();
        repo.create_movie(new_movie("Alien")).await.unwrap();

        let err = repo.create_movie(new_movie("Alien")).await.unwrap_err();
        assert!(matches!(err, RepoError::DuplicateTitle));
    }

    #[tokio::test]
    async fn update_keeps_absent_fields() {
        let repo = MemoryRepository::new();
        repo.create_movie(CreateMovieRequest {
            genre: Some("Horror".to_string()),
            actors: vec!["Sigourney Weaver".to_string()],
            ..new_movie("Alien")
        })
        .await
        .unwrap();

        let updated = repo
            .update_movie(
                "Alien",
                UpdateMovieRequest {
                    release_date: Some("1979".to_string()),
                    ..UpdateMovieRequest::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.release_date.as_deref(), Some("1979"));
        assert_eq!(updated.genre.as_deref(), Some("Horror"));
        assert_eq!(updated.actors, vec!["Sigourney Weaver".to_string()]);
    }

    #[tokio::test]
    async fn deleting_a_movie_leaves_its_reviews() {
        let repo = MemoryRepository::new();
        let movie = repo.create_movie(new_movie("Alien")).await.unwrap();
        repo.create_review(NewReview {
            movie_id: movie.id,
            username: "ash".to_string(),
            review: "perfect organism".to_string(),
            rating: 5.0,
        })
        .await
        .unwrap();

        assert!(repo.delete_movie("Alien").await.unwrap());
        assert!(!repo.delete_movie("Alien").await.unwrap());
        assert_eq!(repo.list_reviews().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_store_reports_database_error() {
        let repo = MemoryRepository::new_failing();
        let err = repo.list_movies().await.unwrap_err();
        assert!(matches!(err, RepoError::Database(_)));
    }
}
