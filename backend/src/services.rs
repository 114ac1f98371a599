//! Collaborator interfaces consumed by the search pipeline, and the
//! per-request metadata cache built on top of them.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use common::search_query::FacetOperator;
use serde::{Deserialize, Serialize};

use crate::api::search::localization::LocalizationStrategy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxonomy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub facet_operator: Option<FacetOperator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyTerm {
    pub id: String,
    pub text: String,
}

/// Content type or dam type metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfo {
    #[serde(rename = "type")]
    pub label: String,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
}

#[async_trait]
pub trait TaxonomyService: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Taxonomy>>;
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Taxonomy>>;
    async fn localization_strategy(&self) -> anyhow::Result<LocalizationStrategy>;
    async fn fallback_locale(&self) -> anyhow::Result<String>;
}

#[async_trait]
pub trait TaxonomyTermService: Send + Sync {
    async fn find_by_id(&self, term_id: &str) -> anyhow::Result<Option<TaxonomyTerm>>;
    /// Label of a navigation (page tree) term.
    async fn navigation_label(&self, term_id: &str) -> anyhow::Result<Option<String>>;
}

#[async_trait]
pub trait ContentTypeService: Send + Sync {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<TypeInfo>>;
    /// Ids of content types carrying a position field.
    async fn geolocated_content_types(&self) -> anyhow::Result<Vec<String>>;
}

#[async_trait]
pub trait DamTypeService: Send + Sync {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<TypeInfo>>;
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<UserInfo>>;
}

#[async_trait]
pub trait LanguageService: Send + Sync {
    async fn active_locales(&self) -> anyhow::Result<Vec<String>>;
}

pub trait Translator: Send + Sync {
    fn translate(&self, key: &str, default: &str) -> String;
    fn translate_in_working_language(&self, key: &str, default: &str) -> String;
}

#[derive(Clone)]
pub struct Collaborators {
    pub taxonomies: Arc<dyn TaxonomyService>,
    pub terms: Arc<dyn TaxonomyTermService>,
    pub content_types: Arc<dyn ContentTypeService>,
    pub dam_types: Arc<dyn DamTypeService>,
    pub users: Arc<dyn UserService>,
    pub languages: Arc<dyn LanguageService>,
    pub translator: Arc<dyn Translator>,
}


/// Memoizes content type and dam type lookups for the duration of one
/// search call. Misses are cached too.
pub struct MetadataCache<'a> {
    services: &'a Collaborators,
    content_types: HashMap<String, Option<TypeInfo>>,
    dam_types: HashMap<String, Option<TypeInfo>>,
}

impl<'a> MetadataCache<'a> {
    pub fn new(services: &'a Collaborators) -> Self {
        Self { services, content_types: HashMap::new(), dam_types: HashMap::new() }
    }

    pub async fn content_type(&mut self, id: &str) -> anyhow::Result<Option<TypeInfo>> {
        if let Some(cached) = self.content_types.get(id) {
            return Ok(cached.clone());
        }
        let found = self.services.content_types.find_by_id(id).await?;
        self.content_types.insert(id.to_string(), found.clone());
        Ok(found)
    }

    pub async fn dam_type(&mut self, id: &str) -> anyhow::Result<Option<TypeInfo>> {
        if let Some(cached) = self.dam_types.get(id) {
            return Ok(cached.clone());
        }
        let found = self.services.dam_types.find_by_id(id).await?;
        self.dam_types.insert(id.to_string(), found.clone());
        Ok(found)
    }
}
