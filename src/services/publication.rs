//! Post publication
//!
//! Owns post creation and editing plus the visibility rules for read paths.
//! A `post_published` job is enqueued when a post is created already
//! published or when its stored flag flips from false to true.

use std::sync::Arc;

use super::error::{CoreError, CoreResult};
use super::paging::fetch_clamped;
use super::validation::{non_empty, required};
use crate::db::repositories::{
    AuthorRepository, CommentRepository, PostRepository, SqlxAuthorRepository,
    SqlxCommentRepository, SqlxPostRepository,
};
use crate::db::DynDatabasePool;
use crate::jobs::{enqueue_or_warn, JobQueue};
use crate::models::{
    CreatePostInput, Identity, ListParams, NotificationJob, PagedResult, Post, PostDetail,
    UpdatePostInput, SHORT_DESCRIPTION_MAX_LEN, TITLE_MAX_LEN,
};

/// Post publication service
pub struct PostPublication {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    authors: Arc<dyn AuthorRepository>,
    queue: Arc<dyn JobQueue>,
}

impl PostPublication {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        authors: Arc<dyn AuthorRepository>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            posts,
            comments,
            authors,
            queue,
        }
    }

    pub fn from_pool(pool: DynDatabasePool, queue: Arc<dyn JobQueue>) -> Self {
        Self::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxAuthorRepository::boxed(pool),
            queue,
        )
    }

    /// Create a post owned by `owner`
    pub async fn create_post(&self, owner: &Identity, input: CreatePostInput) -> CoreResult<Post> {
        let input = CreatePostInput {
            title: required("Title", &input.title, TITLE_MAX_LEN)?,
            short_description: required(
                "Short description",
                &input.short_description,
                SHORT_DESCRIPTION_MAX_LEN,
            )?,
            full_description: non_empty("Full description", &input.full_description)?,
            image: input.image.filter(|image| !image.trim().is_empty()),
            is_published: input.is_published,
        };

        let post = self.posts.create(owner.author_id, &input).await?;
        tracing::info!(
            post_id = post.id,
            owner_id = owner.author_id,
            is_published = post.is_published,
            "Post created"
        );

        if post.is_published {
            enqueue_or_warn(self.queue.as_ref(), NotificationJob::post_published(post.id));
        }
        Ok(post)
    }

    /// Edit a post. Only its owner may do so.
    ///
    /// A false→true change of `is_published` enqueues one `post_published`
    /// job; every other change is silent.
    pub async fn update_post(
        &self,
        post_id: i64,
        input: UpdatePostInput,
        actor: &Identity,
    ) -> CoreResult<Post> {
        let mut post = self.load(post_id).await?;
        if post.owner_id != actor.author_id {
            return Err(CoreError::forbidden("Only the post owner can edit this post"));
        }

        let input = validate_update(input)?;
        let before = post.clone();
        input.apply_to(&mut post);
        if post != before {
            post = self.posts.update(&post).await?;
            tracing::debug!(post_id, "Post fields updated");
        }

        match input.is_published {
            Some(value) if value != post.is_published => {
                self.transition(post_id, value).await?;
                self.load(post_id).await
            }
            _ => Ok(post),
        }
    }

    /// A post with its published comments.
    ///
    /// Drafts are visible to their owner only; others get `NotFound`.
    /// Unpublished comments are never listed, whoever is looking.
    pub async fn post_detail(
        &self,
        post_id: i64,
        viewer: Option<&Identity>,
        params: ListParams,
    ) -> CoreResult<PostDetail> {
        let post = self.load(post_id).await?;
        let is_owner = viewer.is_some_and(|identity| identity.author_id == post.owner_id);
        if !post.is_published && !is_owner {
            return Err(CoreError::not_found(format!("Post {}", post_id)));
        }

        let comments =
            fetch_clamped(params, |p| self.comments.list_published_for_post(post_id, p)).await?;
        Ok(PostDetail {
            post,
            comments,
            is_owner,
        })
    }

    /// Public listing of published posts, newest first
    pub async fn list_published(&self, params: ListParams) -> CoreResult<PagedResult<Post>> {
        Ok(fetch_clamped(params, |p| self.posts.list_published(p)).await?)
    }

    /// Published posts of one author
    pub async fn list_by_author(&self, username: &str, params: ListParams) -> CoreResult<PagedResult<Post>> {
        let author = self
            .authors
            .get_by_username(username)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Author {}", username)))?;

        Ok(fetch_clamped(params, |p| self.posts.list_by_owner(author.id, true, p)).await?)
    }

    /// The caller's own drafts
    pub async fn list_unpublished_for_owner(
        &self,
        owner: &Identity,
        params: ListParams,
    ) -> CoreResult<PagedResult<Post>> {
        Ok(fetch_clamped(params, |p| self.posts.list_by_owner(owner.author_id, false, p)).await?)
    }

    /// Staff override of a post's publication flag
    pub async fn admin_set_published(&self, post_id: i64, value: bool) -> CoreResult<Post> {
        let post = self.load(post_id).await?;
        if post.is_published == value {
            tracing::debug!(post_id, is_published = value, "Post already in requested state");
            return Ok(post);
        }
        self.transition(post_id, value).await?;
        self.load(post_id).await
    }

    /// Publish each post individually, returning how many actually flipped
    pub async fn bulk_publish_posts(&self, post_ids: &[i64]) -> CoreResult<usize> {
        self.bulk_transition(post_ids, true).await
    }

    /// Unpublish each post individually; never notifies
    pub async fn bulk_unpublish_posts(&self, post_ids: &[i64]) -> CoreResult<usize> {
        self.bulk_transition(post_ids, false).await
    }

    /// Failing rows are logged and skipped; the error is returned only when
    /// no row changed.
    async fn bulk_transition(&self, post_ids: &[i64], value: bool) -> CoreResult<usize> {
        let mut changed = 0;
        let mut failed = 0;
        let mut first_error = None;
        for &id in post_ids {
            match self.transition(id, value).await {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(post_id = id, error = %e, "Bulk publication failed for post");
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }
        tracing::info!(
            requested = post_ids.len(),
            changed,
            failed,
            is_published = value,
            "Bulk post publication"
        );
        match first_error {
            Some(e) if changed == 0 => Err(e),
            _ => Ok(changed),
        }
    }

    async fn load(&self, post_id: i64) -> CoreResult<Post> {
        self.posts
            .get_by_id(post_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Post {}", post_id)))
    }

    /// Atomic flip to `value`; enqueues on false→true. Unknown ids report
    /// no change.
    async fn transition(&self, post_id: i64, value: bool) -> CoreResult<bool> {
        let changed = self
            .posts
            .compare_and_set_published(post_id, !value, value)
            .await?;
        if !changed {
            tracing::debug!(post_id, is_published = value, "Post publication unchanged");
            return Ok(false);
        }

        tracing::info!(post_id, is_published = value, "Post publication changed");
        if value {
            enqueue_or_warn(self.queue.as_ref(), NotificationJob::post_published(post_id));
        }
        Ok(true)
    }
}

fn validate_update(input: UpdatePostInput) -> CoreResult<UpdatePostInput> {
    Ok(UpdatePostInput {
        title: input
            .title
            .map(|t| required("Title", &t, TITLE_MAX_LEN))
            .transpose()?,
        short_description: input
            .short_description
            .map(|d| required("Short description", &d, SHORT_DESCRIPTION_MAX_LEN))
            .transpose()?,
        full_description: input
            .full_description
            .map(|d| non_empty("Full description", &d))
            .transpose()?,
        image: input
            .image
            .map(|image| image.filter(|i| !i.trim().is_empty())),
        is_published: input.is_published,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, create_test_pool, migrations};
    use crate::db::repositories::author::tests::new_author;
    use crate::jobs::testing::RecordingQueue;
    use crate::models::{JobKind, NewComment, POST_ID};
    use crate::services::CommentModeration;

    struct Fixture {
        publication: PostPublication,
        moderation: CommentModeration,
        comments: Arc<dyn CommentRepository>,
        queue: Arc<RecordingQueue>,
        alice: Identity,
        bob: Identity,
    }

    async fn setup() -> Fixture {
        setup_with_pool(create_test_pool().await.expect("Failed to create test pool")).await
    }

    async fn setup_with_pool(pool: DynDatabasePool) -> Fixture {
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let authors = SqlxAuthorRepository::new(pool.clone());
        let alice = authors.create(&new_author("alice")).await.unwrap().identity();
        let bob = authors.create(&new_author("bob")).await.unwrap().identity();
        let queue = Arc::new(RecordingQueue::new());

        Fixture {
            publication: PostPublication::from_pool(pool.clone(), queue.clone()),
            moderation: CommentModeration::from_pool(pool.clone(), queue.clone()),
            comments: SqlxCommentRepository::boxed(pool),
            queue,
            alice,
            bob,
        }
    }

    fn input(title: &str, is_published: bool) -> CreatePostInput {
        CreatePostInput::new(title, "short", "full").published(is_published)
    }

    fn publish() -> UpdatePostInput {
        UpdatePostInput {
            is_published: Some(true),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_published_post_notifies_once() {
        let fx = setup().await;

        let post = fx.publication.create_post(&fx.alice, input("Live", true)).await.unwrap();

        assert!(post.is_published);
        assert_eq!(fx.queue.jobs(), vec![NotificationJob::post_published(post.id)]);
    }

    #[tokio::test]
    async fn test_create_draft_does_not_notify() {
        let fx = setup().await;

        let post = fx.publication.create_post(&fx.alice, input("Draft", false)).await.unwrap();

        assert!(!post.is_published);
        assert!(fx.queue.is_empty());
    }

    #[tokio::test]
    async fn test_create_post_validation() {
        let fx = setup().await;

        let err = fx.publication.create_post(&fx.alice, input("  ", true)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let long = "t".repeat(TITLE_MAX_LEN + 1);
        let err = fx.publication.create_post(&fx.alice, input(&long, true)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(fx.queue.is_empty());
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_rejected() {
        let fx = setup().await;
        let post = fx.publication.create_post(&fx.alice, input("Draft", false)).await.unwrap();

        let err = fx
            .publication
            .update_post(post.id, publish(), &fx.bob)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Authorization(_)));
        assert!(fx.queue.is_empty());
    }

    #[tokio::test]
    async fn test_update_publishing_draft_notifies_once() {
        let fx = setup().await;
        let post = fx.publication.create_post(&fx.alice, input("Draft", false)).await.unwrap();

        let updated = fx.publication.update_post(post.id, publish(), &fx.alice).await.unwrap();
        fx.publication.update_post(post.id, publish(), &fx.alice).await.unwrap();

        assert!(updated.is_published);
        assert_eq!(fx.queue.count(JobKind::PostPublished), 1);
    }

    #[tokio::test]
    async fn test_update_fields_and_unpublish_are_silent() {
        let fx = setup().await;
        let post = fx.publication.create_post(&fx.alice, input("Live", true)).await.unwrap();
        fx.queue.take();

        let updated = fx
            .publication
            .update_post(
                post.id,
                UpdatePostInput {
                    title: Some("Renamed".to_string()),
                    is_published: Some(false),
                    ..Default::default()
                },
                &fx.alice,
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert!(!updated.is_published);
        assert!(fx.queue.is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_post() {
        let fx = setup().await;
        let err = fx.publication.update_post(77, publish(), &fx.alice).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_post_detail_visibility() {
        let fx = setup().await;
        let draft = fx.publication.create_post(&fx.alice, input("Draft", false)).await.unwrap();

        let err = fx
            .publication
            .post_detail(draft.id, None, ListParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        let err = fx
            .publication
            .post_detail(draft.id, Some(&fx.bob), ListParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        let detail = fx
            .publication
            .post_detail(draft.id, Some(&fx.alice), ListParams::default())
            .await
            .unwrap();
        assert!(detail.is_owner);
    }

    #[tokio::test]
    async fn test_post_detail_hides_unpublished_comments_from_owner() {
        let fx = setup().await;
        let post = fx.publication.create_post(&fx.alice, input("Live", true)).await.unwrap();
        let published = fx
            .comments
            .create(&NewComment {
                post_id: post.id,
                author: "Guest A".to_string(),
                text: "visible".to_string(),
                is_published: true,
            })
            .await
            .unwrap();
        fx.comments
            .create(&NewComment {
                post_id: post.id,
                author: "Guest B".to_string(),
                text: "pending".to_string(),
                is_published: false,
            })
            .await
            .unwrap();

        for viewer in [None, Some(&fx.bob), Some(&fx.alice)] {
            let detail = fx
                .publication
                .post_detail(post.id, viewer, ListParams::default())
                .await
                .unwrap();
            assert_eq!(detail.comments.total, 1);
            assert_eq!(detail.comments.items[0].id, published.id);
            assert_eq!(detail.is_owner, viewer == Some(&fx.alice));
        }
    }

    #[tokio::test]
    async fn test_listings() {
        let fx = setup().await;
        let a1 = fx.publication.create_post(&fx.alice, input("A1", true)).await.unwrap();
        let a2 = fx.publication.create_post(&fx.alice, input("A2", false)).await.unwrap();
        let b1 = fx.publication.create_post(&fx.bob, input("B1", true)).await.unwrap();

        let public = fx.publication.list_published(ListParams::default()).await.unwrap();
        let ids: Vec<i64> = public.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b1.id, a1.id]);

        let by_alice = fx
            .publication
            .list_by_author("alice", ListParams::default())
            .await
            .unwrap();
        assert_eq!(by_alice.items.len(), 1);
        assert_eq!(by_alice.items[0].id, a1.id);

        let drafts = fx
            .publication
            .list_unpublished_for_owner(&fx.alice, ListParams::default())
            .await
            .unwrap();
        assert_eq!(drafts.items.len(), 1);
        assert_eq!(drafts.items[0].id, a2.id);

        let err = fx
            .publication
            .list_by_author("nobody", ListParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listing_page_clamps() {
        let fx = setup().await;
        for i in 0..12 {
            fx.publication
                .create_post(&fx.alice, input(&format!("P{}", i), true))
                .await
                .unwrap();
        }

        let page = fx.publication.list_published(ListParams::new(9, 10)).await.unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 12);
    }

    #[tokio::test]
    async fn test_admin_set_published() {
        let fx = setup().await;
        let post = fx.publication.create_post(&fx.alice, input("Draft", false)).await.unwrap();

        let post = fx.publication.admin_set_published(post.id, true).await.unwrap();
        fx.publication.admin_set_published(post.id, true).await.unwrap();
        fx.publication.admin_set_published(post.id, false).await.unwrap();

        assert!(post.is_published);
        assert_eq!(fx.queue.len(), 1);
        assert_eq!(fx.queue.jobs()[0].key(POST_ID), Some(post.id));
    }

    #[tokio::test]
    async fn test_bulk_publish_posts_counts_transitions() {
        let fx = setup().await;
        let live = fx.publication.create_post(&fx.alice, input("Live", true)).await.unwrap();
        let draft = fx.publication.create_post(&fx.bob, input("Draft", false)).await.unwrap();
        fx.queue.take();

        let count = fx
            .publication
            .bulk_publish_posts(&[live.id, draft.id, 404])
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(fx.queue.jobs(), vec![NotificationJob::post_published(draft.id)]);
    }

    #[tokio::test]
    async fn test_bulk_unpublish_posts_is_silent() {
        let fx = setup().await;
        let first = fx.publication.create_post(&fx.alice, input("One", true)).await.unwrap();
        let second = fx.publication.create_post(&fx.bob, input("Two", true)).await.unwrap();
        let draft = fx.publication.create_post(&fx.bob, input("Draft", false)).await.unwrap();
        fx.queue.take();

        let count = fx
            .publication
            .bulk_unpublish_posts(&[first.id, second.id, draft.id, 404])
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert!(fx.queue.is_empty());
        let page = fx.publication.list_published(ListParams::default()).await.unwrap();
        assert_eq!(page.total, 0);

        // Publishing again notifies as usual
        assert_eq!(fx.publication.bulk_publish_posts(&[first.id]).await.unwrap(), 1);
        assert_eq!(fx.queue.count(JobKind::PostPublished), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_post_publish_notifies_once() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("posts.db").display());
        let pool = create_pool(&crate::config::DatabaseConfig {
            driver: crate::config::DatabaseDriver::Sqlite,
            url,
        })
        .await
        .expect("Failed to create file pool");
        let fx = Arc::new(setup_with_pool(pool).await);

        for round in 0..5 {
            let draft = fx
                .publication
                .create_post(&fx.alice, input(&format!("Draft {}", round), false))
                .await
                .unwrap();
            let id = draft.id;

            let mut handles = Vec::new();
            for i in 0..4 {
                let fx = fx.clone();
                handles.push(tokio::spawn(async move {
                    if i % 2 == 0 {
                        fx.publication.update_post(id, publish(), &fx.alice).await
                    } else {
                        fx.publication.admin_set_published(id, true).await
                    }
                }));
            }
            for handle in handles {
                assert!(handle.await.unwrap().unwrap().is_published);
            }
        }

        assert_eq!(fx.queue.count(JobKind::PostPublished), 5);
        let page = fx.publication.list_published(ListParams::default()).await.unwrap();
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn test_comment_flow_on_published_post() {
        let fx = setup().await;
        let post = fx.publication.create_post(&fx.alice, input("Live", true)).await.unwrap();
        fx.queue.take();

        let comment = fx
            .moderation
            .submit(
                post.id,
                crate::models::SubmitCommentInput {
                    author: "Alex".to_string(),
                    text: "First!".to_string(),
                },
                None,
            )
            .await
            .unwrap();
        fx.moderation.set_published(comment.id, true).await.unwrap();

        let detail = fx
            .publication
            .post_detail(post.id, None, ListParams::default())
            .await
            .unwrap();
        assert_eq!(detail.comments.items[0].author, "Guest Alex");
        assert_eq!(fx.queue.count(JobKind::CommentPublished), 1);
    }
}
