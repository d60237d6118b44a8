//! Business logic services

pub mod borrows;
pub mod catalog;
pub mod descriptions;
pub mod email;
pub mod metadata;
pub mod stats;
pub mod translation;

use std::sync::Arc;

use crate::{
    config::{EmailConfig, MetadataConfig, TranslationConfig},
    error::AppResult,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub borrows: borrows::BorrowsService,
    pub catalog: catalog::CatalogService,
    pub descriptions: descriptions::DescriptionService,
    pub stats: stats::StatsService,
    pub email: email::EmailService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        translation_config: &TranslationConfig,
        metadata_config: &MetadataConfig,
        email_config: EmailConfig,
    ) -> AppResult<Self> {
        let backend = Arc::new(translation::HttpTranslationBackend::new(translation_config)?);
        let translation_stats = Arc::new(translation::TranslationStats::default());
        let gateway = translation::TranslationGateway::new(backend, translation_stats);

        let provider = Arc::new(metadata::GoogleBooksProvider::new(metadata_config)?);
        let email = email::EmailService::new(email_config);

        Ok(Self {
            borrows: borrows::BorrowsService::new(repository.clone(), email.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            descriptions: descriptions::DescriptionService::new(
                repository.clone(),
                gateway.clone(),
                provider,
            ),
            stats: stats::StatsService::new(repository, gateway),
            email,
        })
    }
}
