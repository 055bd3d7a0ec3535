use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::{Store, TITLE_NOT_FOUND},
    error::{AppError, AppResult, FieldErrors},
    models::{Actor, PlatformInput, StreamPlatform, Title, TitleFilter, TitleInput},
    policy::{self, Operation, ResourceKind},
};

const PLATFORM_NOT_FOUND: &str = "Stream platform not found";

/// A platform together with the titles it hosts
#[derive(Debug, Clone)]
pub struct PlatformDetail {
    pub platform: StreamPlatform,
    pub titles: Vec<Title>,
}

/// Staff-curated platforms and titles
pub struct Catalog {
    store: Arc<dyn Store>,
}

impl Catalog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn detail(&self, platform: StreamPlatform) -> AppResult<PlatformDetail> {
        let titles = self.store.titles_for_platform(platform.id).await?;
        Ok(PlatformDetail { platform, titles })
    }

    /// Resolves the platform a title points at, reporting a missing one as a field error
    async fn existing_platform(&self, platform_id: Uuid) -> AppResult<Uuid> {
        if self.store.get_platform(platform_id).await?.is_some() {
            return Ok(platform_id);
        }

        let mut errors = FieldErrors::new();
        errors.add(
            "platform_id",
            format!("Invalid pk \"{}\" - object does not exist.", platform_id),
        );
        Err(AppError::Validation(errors))
    }

    pub async fn list_platforms(&self) -> AppResult<Vec<PlatformDetail>> {
        let platforms = self.store.list_platforms().await?;

        let mut details = Vec::with_capacity(platforms.len());
        for platform in platforms {
            details.push(self.detail(platform).await?);
        }
        Ok(details)
    }

    pub async fn get_platform(&self, id: Uuid) -> AppResult<PlatformDetail> {
        let platform = self
            .store
            .get_platform(id)
            .await?
            .ok_or_else(|| AppError::NotFound(PLATFORM_NOT_FOUND.to_string()))?;
        self.detail(platform).await
    }

    #[instrument(skip_all)]
    pub async fn create_platform(
        &self,
        actor: Option<&Actor>,
        input: PlatformInput,
    ) -> AppResult<PlatformDetail> {
        policy::require(actor, ResourceKind::StreamPlatform, Operation::Create, None)?;
        input.validate()?;

        let platform = self.store.insert_platform(StreamPlatform::new(input)).await?;
        tracing::info!(platform_id = %platform.id, name = %platform.name, "Stream platform created");

        Ok(PlatformDetail {
            platform,
            titles: Vec::new(),
        })
    }

    #[instrument(skip(self, actor, input))]
    pub async fn update_platform(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        input: PlatformInput,
    ) -> AppResult<PlatformDetail> {
        policy::require(actor, ResourceKind::StreamPlatform, Operation::Update, None)?;

        let mut platform = self
            .store
            .get_platform(id)
            .await?
            .ok_or_else(|| AppError::NotFound(PLATFORM_NOT_FOUND.to_string()))?;
        input.validate()?;
        platform.apply(input);

        let platform = self
            .store
            .update_platform(platform)
            .await?
            .ok_or_else(|| AppError::NotFound(PLATFORM_NOT_FOUND.to_string()))?;
        self.detail(platform).await
    }

    /// Deletes a platform along with its titles and their reviews
    #[instrument(skip(self, actor))]
    pub async fn delete_platform(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<()> {
        policy::require(actor, ResourceKind::StreamPlatform, Operation::Delete, None)?;

        if !self.store.delete_platform(id).await? {
            return Err(AppError::NotFound(PLATFORM_NOT_FOUND.to_string()));
        }
        tracing::info!(platform_id = %id, "Stream platform deleted");
        Ok(())
    }

    pub async fn list_titles(&self, filter: &TitleFilter) -> AppResult<Vec<Title>> {
        self.store.list_titles(filter).await
    }

    pub async fn get_title(&self, id: Uuid) -> AppResult<Title> {
        self.store
            .get_title(id)
            .await?
            .ok_or_else(|| AppError::NotFound(TITLE_NOT_FOUND.to_string()))
    }

    #[instrument(skip_all)]
    pub async fn create_title(&self, actor: Option<&Actor>, input: TitleInput) -> AppResult<Title> {
        policy::require(actor, ResourceKind::Title, Operation::Create, None)?;
        let platform_id = input.validate()?;
        let platform_id = self.existing_platform(platform_id).await?;

        let title = self.store.insert_title(Title::new(input, platform_id)).await?;
        tracing::info!(title_id = %title.id, title = %title.title, "Title created");
        Ok(title)
    }

    #[instrument(skip(self, actor, input))]
    pub async fn update_title(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        input: TitleInput,
    ) -> AppResult<Title> {
        policy::require(actor, ResourceKind::Title, Operation::Update, None)?;

        let mut title = self.get_title(id).await?;
        let platform_id = input.validate()?;
        let platform_id = self.existing_platform(platform_id).await?;
        title.apply(input, platform_id);

        self.store
            .update_title(title)
            .await?
            .ok_or_else(|| AppError::NotFound(TITLE_NOT_FOUND.to_string()))
    }

    /// Deletes a title along with its reviews
    #[instrument(skip(self, actor))]
    pub async fn delete_title(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<()> {
        policy::require(actor, ResourceKind::Title, Operation::Delete, None)?;

        if !self.store.delete_title(id).await? {
            return Err(AppError::NotFound(TITLE_NOT_FOUND.to_string()));
        }
        tracing::info!(title_id = %id, "Title deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::{Rating, Review},
        services::ledger::apply_rating,
    };

    fn netflix() -> PlatformInput {
        PlatformInput {
            name: "netflix".to_string(),
            about: "Get all the best movies and series in one place".to_string(),
            website: "https://netflix.com".to_string(),
        }
    }

    fn aladdin(platform_id: Uuid) -> TitleInput {
        TitleInput {
            title: "Aladdin".to_string(),
            description: "It is about a genie and a boy".to_string(),
            platform_id: Some(platform_id),
            active: true,
        }
    }

    fn catalog() -> (Catalog, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Catalog::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_staff_creates_platform() {
        let (catalog, _) = catalog();
        let staff = Actor::new("admin", true);

        let created = catalog.create_platform(Some(&staff), netflix()).await.unwrap();
        assert_eq!(created.platform.name, "netflix");

        let listed = catalog.list_platforms().await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_non_staff_writes_forbidden() {
        let (catalog, _) = catalog();
        let staff = Actor::new("admin", true);
        let user = Actor::new("jude", false);
        let platform = catalog.create_platform(Some(&staff), netflix()).await.unwrap().platform;

        for actor in [None, Some(&user)] {
            assert!(matches!(
                catalog.create_platform(actor, netflix()).await,
                Err(AppError::Forbidden(_))
            ));
            assert!(matches!(
                catalog.update_platform(actor, platform.id, netflix()).await,
                Err(AppError::Forbidden(_))
            ));
            assert!(matches!(
                catalog.delete_platform(actor, platform.id).await,
                Err(AppError::Forbidden(_))
            ));
            assert!(matches!(
                catalog.create_title(actor, aladdin(platform.id)).await,
                Err(AppError::Forbidden(_))
            ));
        }

        assert_eq!(catalog.list_platforms().await.unwrap().len(), 1);
        assert!(catalog.list_titles(&TitleFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_does_not_reveal_missing_platform() {
        let (catalog, _) = catalog();
        let user = Actor::new("jude", false);
        assert!(matches!(
            catalog.delete_platform(Some(&user), Uuid::new_v4()).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_platform_input() {
        let (catalog, _) = catalog();
        let staff = Actor::new("admin", true);
        let input = PlatformInput {
            name: String::new(),
            ..netflix()
        };
        assert!(matches!(
            catalog.create_platform(Some(&staff), input).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_title_needs_existing_platform() {
        let (catalog, _) = catalog();
        let staff = Actor::new("admin", true);
        match catalog.create_title(Some(&staff), aladdin(Uuid::new_v4())).await {
            Err(AppError::Validation(errors)) => assert!(errors.get("platform_id").is_some()),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_platform_detail_lists_titles() {
        let (catalog, _) = catalog();
        let staff = Actor::new("admin", true);
        let platform = catalog.create_platform(Some(&staff), netflix()).await.unwrap().platform;
        let title = catalog.create_title(Some(&staff), aladdin(platform.id)).await.unwrap();

        let detail = catalog.get_platform(platform.id).await.unwrap();
        assert_eq!(detail.titles, vec![title]);
    }

    #[tokio::test]
    async fn test_update_title_keeps_aggregate() {
        let (catalog, store) = catalog();
        let staff = Actor::new("admin", true);
        let platform = catalog.create_platform(Some(&staff), netflix()).await.unwrap().platform;
        let title = catalog.create_title(Some(&staff), aladdin(platform.id)).await.unwrap();
        let review = Review::new(&Actor::new("jude", false), title.id, Rating::new(4).unwrap(), None);
        store.create_review(review, apply_rating).await.unwrap();

        let updated = catalog
            .update_title(
                Some(&staff),
                title.id,
                TitleInput {
                    active: false,
                    ..aladdin(platform.id)
                },
            )
            .await
            .unwrap();
        assert!(!updated.active);
        assert_eq!(updated.avg_rating, 4.0);
        assert_eq!(updated.number_rating, 1);
    }

    #[tokio::test]
    async fn test_delete_platform_cascades_through_titles_and_reviews() {
        let (catalog, store) = catalog();
        let staff = Actor::new("admin", true);
        let platform = catalog.create_platform(Some(&staff), netflix()).await.unwrap().platform;
        let title = catalog.create_title(Some(&staff), aladdin(platform.id)).await.unwrap();
        let review = Review::new(&Actor::new("jude", false), title.id, Rating::new(4).unwrap(), None);
        let (review, _) = store.create_review(review, apply_rating).await.unwrap();

        catalog.delete_platform(Some(&staff), platform.id).await.unwrap();

        assert!(matches!(catalog.get_platform(platform.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(catalog.get_title(title.id).await, Err(AppError::NotFound(_))));
        assert!(store.get_review(review.id).await.unwrap().is_none());
        assert!(matches!(
            catalog.delete_platform(Some(&staff), platform.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_titles() {
        let (catalog, _) = catalog();
        let staff = Actor::new("admin", true);
        let netflix_platform = catalog.create_platform(Some(&staff), netflix()).await.unwrap().platform;
        let hulu = catalog
            .create_platform(
                Some(&staff),
                PlatformInput {
                    name: "hulu".to_string(),
                    about: "Streaming".to_string(),
                    website: "https://hulu.com".to_string(),
                },
            )
            .await
            .unwrap()
            .platform;
        catalog.create_title(Some(&staff), aladdin(netflix_platform.id)).await.unwrap();
        catalog
            .create_title(
                Some(&staff),
                TitleInput {
                    title: "47 Ronin".to_string(),
                    ..aladdin(hulu.id)
                },
            )
            .await
            .unwrap();

        let all = catalog.list_titles(&TitleFilter::default()).await.unwrap();
        assert_eq!(all[0].title, "47 Ronin");

        let on_hulu = catalog.list_titles(&TitleFilter::search("Hulu")).await.unwrap();
        assert_eq!(on_hulu.len(), 1);
        assert_eq!(on_hulu[0].title, "47 Ronin");

        let by_name = catalog.list_titles(&TitleFilter::search("ladd")).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].title, "Aladdin");
    }
}
