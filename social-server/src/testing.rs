//! In-memory stand-ins for the store and the cache, used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::data::comment_repository::CommentRepository;
use crate::data::like_repository::LikeRepository;
use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::comment::Comment;
use crate::domain::error::DomainError;
use crate::domain::like::LikeTarget;
use crate::domain::post::{Post, PostPatch};
use crate::domain::user::{User, UserPatch};
use crate::infrastructure::cache::{Cache, CacheError};

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
}

impl MemoryCache {
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .is_some_and(|(_, expires)| *expires > Instant::now())
    }

    pub fn expires_at(&self, key: &str) -> Option<Instant> {
        self.entries.lock().unwrap().get(key).map(|(_, expires)| *expires)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_vec(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: &[u8],
    ) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(key) {
            Some((current, expires))
                if *expires > Instant::now() && current.as_slice() == expected =>
            {
                *current = value.to_vec();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Memory cache whose reads give other tasks a turn before returning, so
/// interleaved read-modify-write sequences actually interleave.
#[derive(Default)]
pub struct YieldingCache(pub MemoryCache);

#[async_trait]
impl Cache for YieldingCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let value = self.0.get(key).await;
        tokio::task::yield_now().await;
        value
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.0.set(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        self.0.delete(keys).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: &[u8],
    ) -> Result<bool, CacheError> {
        self.0.compare_and_swap(key, expected, value).await
    }
}

/// Memory cache where every compare-and-swap loses to another writer.
#[derive(Default)]
pub struct ContendedCache(pub MemoryCache);

#[async_trait]
impl Cache for ContendedCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.0.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.0.set(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        self.0.delete(keys).await
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: &[u8],
        _value: &[u8],
    ) -> Result<bool, CacheError> {
        Ok(false)
    }
}

fn unreachable_redis() -> CacheError {
    CacheError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

/// Every call fails as if Redis were down.
pub struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(unreachable_redis())
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        Err(unreachable_redis())
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), CacheError> {
        Err(unreachable_redis())
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: &[u8],
        _value: &[u8],
    ) -> Result<bool, CacheError> {
        Err(unreachable_redis())
    }
}

/// Every call hangs for the given duration before missing.
pub struct SlowCache(pub Duration);

#[async_trait]
impl Cache for SlowCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        tokio::time::sleep(self.0).await;
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), CacheError> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: &[u8],
        _value: &[u8],
    ) -> Result<bool, CacheError> {
        tokio::time::sleep(self.0).await;
        Ok(false)
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    post_likes: HashSet<(Uuid, Uuid)>,
    comment_likes: HashSet<(Uuid, Uuid)>,
}

impl Tables {
    fn post_with_count(&self, id: Uuid) -> Option<Post> {
        let mut post = self.posts.get(&id)?.clone();
        post.like_count = self.post_likes.iter().filter(|(p, _)| *p == id).count() as i64;
        Some(post)
    }

    fn comment_with_count(&self, id: Uuid) -> Option<Comment> {
        let mut comment = self.comments.get(&id)?.clone();
        comment.like_count = self
            .comment_likes
            .iter()
            .filter(|(c, _)| *c == id)
            .count() as i64;
        Some(comment)
    }

    fn remove_post(&mut self, id: Uuid) -> bool {
        if self.posts.remove(&id).is_none() {
            return false;
        }
        self.post_likes.retain(|(p, _)| *p != id);
        let roots: Vec<Uuid> = self
            .comments
            .values()
            .filter(|c| c.post_id == id && c.parent_comment_id.is_none())
            .map(|c| c.id)
            .collect();
        for root in roots {
            self.remove_comment_tree(root);
        }
        true
    }

    fn remove_comment_tree(&mut self, id: Uuid) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            self.comments.remove(&id);
            self.comment_likes.retain(|(c, _)| *c != id);
            pending.extend(
                self.comments
                    .values()
                    .filter(|c| c.parent_comment_id == Some(id))
                    .map(|c| c.id),
            );
        }
    }
}

/// Store double enforcing the same keys and cascades as the SQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    post_reads: AtomicUsize,
}

impl MemoryStore {
    /// Number of single-post and listing reads served so far.
    pub fn post_reads(&self) -> usize {
        self.post_reads.load(Ordering::SeqCst)
    }

    pub fn like_rows(&self, target: LikeTarget) -> usize {
        let tables = self.tables.lock().unwrap();
        match target {
            LikeTarget::Post(id) => tables.post_likes.iter().filter(|(p, _)| *p == id).count(),
            LikeTarget::Comment(id) => tables
                .comment_likes
                .iter()
                .filter(|(c, _)| *c == id)
                .count(),
        }
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create(&self, post: Post) -> Result<Post, DomainError> {
        self.tables
            .lock()
            .unwrap()
            .posts
            .insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
        self.post_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.lock().unwrap().post_with_count(id))
    }

    async fn exists(&self, id: Uuid) -> Result<bool, DomainError> {
        Ok(self.tables.lock().unwrap().posts.contains_key(&id))
    }

    async fn list(&self) -> Result<Vec<Post>, DomainError> {
        self.post_reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        let mut posts: Vec<Post> = tables
            .posts
            .keys()
            .filter_map(|id| tables.post_with_count(*id))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(posts)
    }

    async fn update(&self, id: Uuid, patch: &PostPatch) -> Result<Option<Post>, DomainError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(post) = tables.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(content) = &patch.content {
            post.content = content.clone();
        }
        if let Some(photo_url) = &patch.photo_url {
            post.photo_url = Some(photo_url.clone());
        }
        post.updated_at = Utc::now().max(post.updated_at);
        Ok(tables.post_with_count(id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        Ok(self.tables.lock().unwrap().remove_post(id))
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, comment: Comment) -> Result<Comment, DomainError> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(DomainError::PostNotFound(comment.post_id));
        }
        if let Some(parent) = comment.parent_comment_id {
            let same_post = tables
                .comments
                .get(&parent)
                .is_some_and(|p| p.post_id == comment.post_id);
            if !same_post {
                return Err(DomainError::CommentNotFound(parent));
            }
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, DomainError> {
        Ok(self.tables.lock().unwrap().comment_with_count(id))
    }

    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, DomainError> {
        let tables = self.tables.lock().unwrap();
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| tables.comment_with_count(c.id))
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, DomainError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(comment) = tables.comments.get_mut(&id) else {
            return Ok(None);
        };
        comment.content = content;
        comment.updated_at = Utc::now().max(comment.updated_at);
        Ok(tables.comment_with_count(id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.comments.contains_key(&id) {
            return Ok(false);
        }
        tables.remove_comment_tree(id);
        Ok(true)
    }
}

#[async_trait]
impl LikeRepository for MemoryStore {
    async fn insert(&self, target: LikeTarget, user_id: Uuid) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().unwrap();
        let inserted = match target {
            LikeTarget::Post(id) if tables.posts.contains_key(&id) => {
                tables.post_likes.insert((id, user_id))
            }
            LikeTarget::Comment(id) if tables.comments.contains_key(&id) => {
                tables.comment_likes.insert((id, user_id))
            }
            _ => return Err(DomainError::target_not_found(target)),
        };
        if inserted {
            Ok(())
        } else {
            Err(DomainError::AlreadyLiked(target))
        }
    }

    async fn remove(&self, target: LikeTarget, user_id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(match target {
            LikeTarget::Post(id) => tables.post_likes.remove(&(id, user_id)),
            LikeTarget::Comment(id) => tables.comment_likes.remove(&(id, user_id)),
        })
    }

    async fn exists(&self, target: LikeTarget, user_id: Uuid) -> Result<bool, DomainError> {
        let tables = self.tables.lock().unwrap();
        Ok(match target {
            LikeTarget::Post(id) => tables.post_likes.contains(&(id, user_id)),
            LikeTarget::Comment(id) => tables.comment_likes.contains(&(id, user_id)),
        })
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: User) -> Result<User, DomainError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DomainError::UserAlreadyExists(
                "email already registered".to_string(),
            ));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.tables.lock().unwrap().users.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, DomainError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(email) = &patch.email {
            if tables.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(DomainError::UserAlreadyExists(
                    "email already registered".to_string(),
                ));
            }
        }
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        let patch = patch.clone();
        if let Some(first_name) = patch.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(date_of_birth) = patch.date_of_birth {
            user.date_of_birth = Some(date_of_birth);
        }
        if let Some(bio) = patch.bio {
            user.bio = Some(bio);
        }
        if let Some(avatar_url) = patch.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        user.updated_at = Utc::now().max(user.updated_at);
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Vec<Uuid>>, DomainError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.remove(&id).is_none() {
            return Ok(None);
        }
        let post_ids: Vec<Uuid> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in &post_ids {
            tables.remove_post(*post_id);
        }
        let comment_ids: Vec<Uuid> = tables
            .comments
            .values()
            .filter(|c| c.author_id == id)
            .map(|c| c.id)
            .collect();
        for comment_id in comment_ids {
            tables.remove_comment_tree(comment_id);
        }
        tables.post_likes.retain(|(_, u)| *u != id);
        tables.comment_likes.retain(|(_, u)| *u != id);
        Ok(Some(post_ids))
    }
}

/// Like store that hands control to other tasks right after the
/// existence check, so two likes can both pass it before either inserts.
pub struct YieldingLikes(pub Arc<MemoryStore>);

#[async_trait]
impl LikeRepository for YieldingLikes {
    async fn insert(&self, target: LikeTarget, user_id: Uuid) -> Result<(), DomainError> {
        LikeRepository::insert(&*self.0, target, user_id).await
    }

    async fn remove(&self, target: LikeTarget, user_id: Uuid) -> Result<bool, DomainError> {
        LikeRepository::remove(&*self.0, target, user_id).await
    }

    async fn exists(&self, target: LikeTarget, user_id: Uuid) -> Result<bool, DomainError> {
        let found = LikeRepository::exists(&*self.0, target, user_id).await;
        tokio::task::yield_now().await;
        found
    }
}
