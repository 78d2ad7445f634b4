use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    ArticleQueryFilter, ArticlesRepo, ArticlesWriteRepo, CreateArticleParams, RepoError,
    UpdateArticleParams,
};
use crate::domain::entities::{ArticleRecord, AuthorSummary};

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};

/// Columns of an article joined with its author, read from alias `a` and `u`.
const ARTICLE_COLUMNS: &str = "a.id, a.title, a.description, a.published_at, a.author_id, \
     a.created_at, a.updated_at, u.email AS author_email, \
     u.first_name AS author_first_name, u.last_name AS author_last_name";

#[derive(sqlx::FromRow)]
pub(crate) struct ArticleRow {
    pub(crate) id: Uuid,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) published_at: OffsetDateTime,
    pub(crate) author_id: Uuid,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
    pub(crate) author_email: String,
    pub(crate) author_first_name: String,
    pub(crate) author_last_name: String,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            published_at: row.published_at,
            author_id: row.author_id,
            author: AuthorSummary {
                id: row.author_id,
                email: row.author_email,
                first_name: row.author_first_name,
                last_name: row.author_last_name,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

impl PostgresRepositories {
    fn apply_article_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q ArticleQueryFilter) {
        if let Some(author_id) = filter.author_id {
            qb.push(" AND a.author_id = ");
            qb.push_bind(author_id);
        }

        if let Some(from) = filter.published_from {
            qb.push(" AND a.published_at >= ");
            qb.push_bind(from);
        }

        if let Some(to) = filter.published_to {
            qb.push(" AND a.published_at <= ");
            qb.push_bind(to);
        }

        if let Some(search) = filter.search.as_ref() {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (a.title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR a.description ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }
}

#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn list_articles(
        &self,
        filter: &ArticleQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<ArticleRecord>, RepoError> {
        let offset = i64::try_from(page.offset())
            .map_err(|_| RepoError::InvalidInput {
                message: "page offset exceeds supported range".to_string(),
            })?;

        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(ARTICLE_COLUMNS);
        qb.push(" FROM articles a INNER JOIN users u ON u.id = a.author_id WHERE 1=1 ");
        Self::apply_article_filter(&mut qb, filter);
        qb.push(" ORDER BY a.published_at DESC, a.created_at DESC, a.id DESC LIMIT ");
        qb.push_bind(i64::from(page.limit()));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<ArticleRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ArticleRecord::from).collect())
    }

    async fn count_articles(&self, filter: &ArticleQueryFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM articles a INNER JOIN users u ON u.id = a.author_id WHERE 1=1 ",
        );
        Self::apply_article_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        convert_count(count)
    }

    async fn find_article(&self, id: Uuid) -> Result<Option<ArticleRecord>, RepoError> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a \
             INNER JOIN users u ON u.id = a.author_id WHERE a.id = $1"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ArticleRecord::from))
    }
}

#[async_trait]
impl ArticlesWriteRepo for PostgresRepositories {
    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let CreateArticleParams {
            title,
            description,
            published_at,
            author_id,
        } = params;

        let sql = format!(
            "WITH a AS ( \
                 INSERT INTO articles (id, title, description, published_at, author_id, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $6) \
                 RETURNING * \
             ) \
             SELECT {ARTICLE_COLUMNS} FROM a INNER JOIN users u ON u.id = a.author_id"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(title)
            .bind(description)
            .bind(published_at)
            .bind(author_id)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_article(
        &self,
        params: UpdateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let UpdateArticleParams {
            id,
            title,
            description,
            published_at,
        } = params;

        let sql = format!(
            "WITH a AS ( \
                 UPDATE articles SET \
                     title = COALESCE($2, title), \
                     description = COALESCE($3, description), \
                     published_at = COALESCE($4, published_at), \
                     updated_at = $5 \
                 WHERE id = $1 \
                 RETURNING * \
             ) \
             SELECT {ARTICLE_COLUMNS} FROM a INNER JOIN users u ON u.id = a.author_id"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .bind(title)
            .bind(description)
            .bind(published_at)
            .bind(OffsetDateTime::now_utc())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ArticleRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_article(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
