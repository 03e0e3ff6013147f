pub mod auth;
pub mod comment;
pub mod like;
pub mod post;
pub mod user;

use crate::application::auth_service::AuthService;
use crate::application::comment_service::CommentService;
use crate::application::like_service::LikeService;
use crate::application::post_service::PostService;
use crate::application::user_service::UserService;
use crate::data::comment_repository::PostgresCommentRepository;
use crate::data::like_repository::PostgresLikeRepository;
use crate::data::post_repository::PostgresPostRepository;
use crate::data::user_repository::PostgresUserRepository;

pub type Auth = AuthService<PostgresUserRepository>;
pub type Posts = PostService<PostgresPostRepository>;
pub type Comments = CommentService<PostgresCommentRepository, PostgresPostRepository>;
pub type Likes = LikeService<PostgresLikeRepository>;
pub type Users = UserService<PostgresUserRepository>;
