//! Repository behavior against a real Postgres. Needs `DATABASE_URL`.

use sqlx::PgPool;
use time::macros::datetime;
use uuid::Uuid;

use articles::application::pagination::PageRequest;
use articles::application::repos::{
    ArticleQueryFilter, ArticlesRepo, ArticlesWriteRepo, CreateArticleParams, CreateUserParams,
    RepoError, UpdateArticleParams, UsersRepo,
};
use articles::infra::db::PostgresRepositories;

async fn seed_user(repos: &PostgresRepositories, email: &str) -> Uuid {
    repos
        .create_user(CreateUserParams {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: "Pg".to_string(),
            last_name: "User".to_string(),
        })
        .await
        .expect("user")
        .id
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn create_update_delete_round_trip(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = seed_user(&repos, "pg@example.com").await;

    let created = repos
        .create_article(CreateArticleParams {
            title: "Stored".to_string(),
            description: "Persisted through Postgres.".to_string(),
            published_at: datetime!(2025-01-12 00:00 UTC),
            author_id: author,
        })
        .await
        .expect("create");
    assert_eq!(created.author.email, "pg@example.com");

    let updated = repos
        .update_article(UpdateArticleParams {
            id: created.id,
            title: Some("Restored".to_string()),
            description: None,
            published_at: None,
        })
        .await
        .expect("update");
    assert_eq!(updated.title, "Restored");
    assert_eq!(updated.description, created.description);
    assert!(updated.updated_at >= created.updated_at);

    repos.delete_article(created.id).await.expect("delete");
    assert!(matches!(
        repos.delete_article(created.id).await,
        Err(RepoError::NotFound)
    ));
    assert!(repos.find_article(created.id).await.expect("find").is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn filters_and_ordering_match_the_query(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = seed_user(&repos, "order@example.com").await;
    for (title, day) in [
        ("Tenth 100%", datetime!(2025-01-10 00:00 UTC)),
        ("Twelfth", datetime!(2025-01-12 00:00 UTC)),
        ("Fourteenth", datetime!(2025-01-14 00:00 UTC)),
    ] {
        repos
            .create_article(CreateArticleParams {
                title: title.to_string(),
                description: "Ordering fixture.".to_string(),
                published_at: day,
                author_id: author,
            })
            .await
            .expect("create");
    }

    let all = ArticleQueryFilter::default();
    let page = repos
        .list_articles(&all, PageRequest::new(Some(1), Some(2)))
        .await
        .expect("list");
    let titles: Vec<_> = page.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, ["Fourteenth", "Twelfth"]);
    assert_eq!(repos.count_articles(&all).await.expect("count"), 3);

    let ranged = ArticleQueryFilter {
        published_from: Some(datetime!(2025-01-11 00:00 UTC)),
        published_to: Some(datetime!(2025-01-13 00:00 UTC)),
        ..Default::default()
    };
    assert_eq!(repos.count_articles(&ranged).await.expect("count"), 1);

    let literal_percent = ArticleQueryFilter {
        search: Some("100%".to_string()),
        ..Default::default()
    };
    assert_eq!(repos.count_articles(&literal_percent).await.expect("count"), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_email_maps_to_duplicate(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    seed_user(&repos, "twice@example.com").await;
    let err = repos
        .create_user(CreateUserParams {
            email: "twice@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Pg".to_string(),
            last_name: "Again".to_string(),
        })
        .await
        .expect_err("duplicate");
    assert!(matches!(err, RepoError::Duplicate { .. }));
}
