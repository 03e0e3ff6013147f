use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::comment_tree;
use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::domain::access::authorize;
use crate::domain::comment::{Comment, CommentNode};
use crate::domain::error::DomainError;

/// Comment writes and thread reads. Threads always come from the store.
#[derive(Clone)]
pub struct CommentService<C, P>
where
    C: CommentRepository + 'static,
    P: PostRepository + 'static,
{
    comments: Arc<C>,
    posts: Arc<P>,
}

impl<C, P> CommentService<C, P>
where
    C: CommentRepository + 'static,
    P: PostRepository + 'static,
{
    pub fn new(comments: Arc<C>, posts: Arc<P>) -> Self {
        Self { comments, posts }
    }

    #[instrument(skip(self, content))]
    pub async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        parent_comment_id: Option<Uuid>,
        content: String,
    ) -> Result<Comment, DomainError> {
        self.comments
            .create(Comment::new(post_id, author_id, parent_comment_id, content))
            .await
    }

    pub async fn get_comment(&self, id: Uuid) -> Result<Comment, DomainError> {
        self.comments
            .find_by_id(id)
            .await?
            .ok_or(DomainError::CommentNotFound(id))
    }

    /// The post's comments as reply trees, oldest root first.
    #[instrument(skip(self))]
    pub async fn get_thread(&self, post_id: Uuid) -> Result<Vec<CommentNode>, DomainError> {
        if !self.posts.exists(post_id).await? {
            return Err(DomainError::PostNotFound(post_id));
        }

        let comments = self.comments.list_by_post(post_id).await?;
        debug!(%post_id, comments = comments.len(), "building comment thread");
        comment_tree::build(comments)
    }

    #[instrument(skip(self, content))]
    pub async fn update_comment(
        &self,
        id: Uuid,
        actor_id: Uuid,
        content: String,
    ) -> Result<Comment, DomainError> {
        let current = self.get_comment(id).await?;
        authorize(current.author_id, actor_id)?;

        self.comments
            .update_content(id, content)
            .await?
            .ok_or(DomainError::CommentNotFound(id))
    }

    /// Deletes the comment and every reply below it.
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, id: Uuid, actor_id: Uuid) -> Result<(), DomainError> {
        let current = self.get_comment(id).await?;
        authorize(current.author_id, actor_id)?;

        if !self.comments.delete(id).await? {
            return Err(DomainError::CommentNotFound(id));
        }
        Ok(())
    }
}
