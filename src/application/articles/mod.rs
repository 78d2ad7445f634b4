mod service;
pub mod types;

pub use service::ArticleService;
pub use types::{
    ArticlePage, ArticleQuery, ArticleServiceError, CreateArticleCommand, UpdateArticleCommand,
};
