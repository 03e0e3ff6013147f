use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        post_id: Uuid,
        author_id: Uuid,
        parent_comment_id: Option<Uuid>,
        content: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            parent_comment_id,
            content,
            like_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A comment together with its direct replies, each carrying their own.
///
/// Threads can be arbitrarily deep, so nothing here walks a tree by
/// recursion: dropping is iterative and JSON goes through [`thread_to_json`].
#[derive(Debug)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn id(&self) -> Uuid {
        self.comment.id
    }
}

impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

/// Renders a forest as a JSON array of comment objects, each with the
/// comment's fields plus a nested `replies` array.
pub fn thread_to_json(roots: &[CommentNode]) -> serde_json::Result<Vec<u8>> {
    let mut out = vec![b'['];
    let mut open: Vec<std::slice::Iter<'_, CommentNode>> = vec![roots.iter()];
    let mut first = true;

    while let Some(siblings) = open.last_mut() {
        match siblings.next() {
            Some(node) => {
                if !first {
                    out.push(b',');
                }
                serde_json::to_writer(&mut out, &node.comment)?;
                // reopen the comment object to append its replies
                out.pop();
                out.extend_from_slice(b",\"replies\":[");
                open.push(node.replies.iter());
                first = true;
            }
            None => {
                open.pop();
                out.push(b']');
                if !open.is_empty() {
                    out.push(b'}');
                }
                first = false;
            }
        }
    }
    Ok(out)
}
