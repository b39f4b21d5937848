pub mod comment;
pub mod movie;
pub mod movie_country;
pub mod movie_genre;
