pub mod access;
pub mod comment;
pub mod error;
pub mod like;
pub mod post;
pub mod user;
