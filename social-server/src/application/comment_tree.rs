//! Reconstruction of reply threads from a flat, parent-linked recordset.

use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

use crate::domain::comment::{Comment, CommentNode};
use crate::domain::error::DomainError;

/// Nests `comments` (all from one post) into reply trees.
///
/// Roots and every `replies` list are ordered by creation time, ties broken
/// by id. A comment pointing at a parent outside the set, or a parent chain
/// that never reaches a root, is reported as an internal error.
pub fn build(mut comments: Vec<Comment>) -> Result<Vec<CommentNode>, DomainError> {
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let index: HashMap<Uuid, usize> = comments
        .iter()
        .enumerate()
        .map(|(slot, comment)| (comment.id, slot))
        .collect();

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    for (slot, comment) in comments.iter().enumerate() {
        match comment.parent_comment_id {
            None => roots.push(slot),
            Some(parent_id) => {
                let parent = index.get(&parent_id).ok_or_else(|| {
                    DomainError::Internal(format!(
                        "comment {} references missing parent {}",
                        comment.id, parent_id
                    ))
                })?;
                children[*parent].push(slot);
            }
        }
    }

    // Breadth-first from the roots: every parent is listed before its replies.
    let mut visit_order = Vec::with_capacity(comments.len());
    let mut queue: VecDeque<usize> = roots.iter().copied().collect();
    while let Some(slot) = queue.pop_front() {
        visit_order.push(slot);
        queue.extend(children[slot].iter().copied());
    }
    if visit_order.len() != comments.len() {
        return Err(DomainError::Internal(format!(
            "{} comments are not reachable from any root",
            comments.len() - visit_order.len()
        )));
    }

    // Materialize leaves first so each parent can take its finished replies.
    let mut pending: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentNode>> = std::iter::repeat_with(|| None)
        .take(pending.len())
        .collect();
    for &slot in visit_order.iter().rev() {
        let replies = children[slot]
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        if let Some(comment) = pending[slot].take() {
            built[slot] = Some(CommentNode { comment, replies });
        }
    }

    Ok(roots
        .into_iter()
        .filter_map(|slot| built[slot].take())
        .collect())
}
