#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use backend::{
    api::search::localization::LocalizationStrategy,
    context::{CurrentUser, ReadWorkspaces, SearchContext, SearchMode},
    db_utils::engine::{EngineBucket, EngineHit, EngineQuery, EngineResponse, IndexTarget, SearchEngine},
    error::EngineError,
    services::{
        Collaborators, ContentTypeService, DamTypeService, LanguageService, Taxonomy, TaxonomyService, TaxonomyTerm,
        TaxonomyTermService, Translator, TypeInfo, UserInfo, UserService,
    },
};
use chrono::{DateTime, TimeZone, Utc};
use common::search_query::FacetOperator;
use serde_json::{Map, Value, json};

pub const TAGS: &str = "0123456789abcdef01234567";
pub const THEMES: &str = "89abcdef0123456789abcdef";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 0).unwrap()
}

pub struct FakeTaxonomies {
    pub taxonomies: Vec<Taxonomy>,
    pub strategy: LocalizationStrategy,
    pub fallback: String,
}

#[async_trait]
impl TaxonomyService for FakeTaxonomies {
    async fn list(&self) -> anyhow::Result<Vec<Taxonomy>> {
        Ok(self.taxonomies.clone())
    }
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Taxonomy>> {
        Ok(self.taxonomies.iter().find(|t| t.id == id).cloned())
    }
    async fn localization_strategy(&self) -> anyhow::Result<LocalizationStrategy> {
        Ok(self.strategy)
    }
    async fn fallback_locale(&self) -> anyhow::Result<String> {
        Ok(self.fallback.clone())
    }
}

#[derive(Default)]
pub struct FakeTerms {
    pub texts: HashMap<String, String>,
    pub navigation: HashMap<String, String>,
}

#[async_trait]
impl TaxonomyTermService for FakeTerms {
    async fn find_by_id(&self, term_id: &str) -> anyhow::Result<Option<TaxonomyTerm>> {
        Ok(self.texts.get(term_id).map(|text| TaxonomyTerm { id: term_id.to_string(), text: text.clone() }))
    }
    async fn navigation_label(&self, term_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.navigation.get(term_id).cloned())
    }
}

#[derive(Default)]
pub struct FakeTypes {
    pub types: HashMap<String, TypeInfo>,
    pub geolocated: Vec<String>,
    pub lookups: Mutex<usize>,
}

impl FakeTypes {
    fn lookup(&self, id: &str) -> Option<TypeInfo> {
        *self.lookups.lock().unwrap() += 1;
        self.types.get(id).cloned()
    }
}

#[async_trait]
impl ContentTypeService for FakeTypes {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<TypeInfo>> {
        Ok(self.lookup(id))
    }
    async fn geolocated_content_types(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.geolocated.clone())
    }
}

#[async_trait]
impl DamTypeService for FakeTypes {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<TypeInfo>> {
        Ok(self.lookup(id))
    }
}

pub struct FakeUsers(pub HashMap<String, String>);

#[async_trait]
impl UserService for FakeUsers {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<UserInfo>> {
        Ok(self.0.get(id).map(|name| UserInfo { name: name.clone() }))
    }
}

pub struct FakeLanguages(pub Vec<String>);

#[async_trait]
impl LanguageService for FakeLanguages {
    async fn active_locales(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Returns the default text for every key.
pub struct EchoTranslator;

impl Translator for EchoTranslator {
    fn translate(&self, _key: &str, default: &str) -> String {
        default.to_string()
    }
    fn translate_in_working_language(&self, _key: &str, default: &str) -> String {
        default.to_string()
    }
}

pub struct Fixture {
    pub services: Collaborators,
    pub content_types: Arc<FakeTypes>,
}

fn type_info(label: &str, read_only: bool) -> TypeInfo {
    TypeInfo { label: label.to_string(), read_only }
}

pub fn fixture() -> Fixture {
    let taxonomies = FakeTaxonomies {
        taxonomies: vec![
            Taxonomy { id: TAGS.to_string(), name: "Tags".to_string(), facet_operator: Some(FacetOperator::Or) },
            Taxonomy { id: THEMES.to_string(), name: "Themes".to_string(), facet_operator: None },
            Taxonomy { id: "navigation".to_string(), name: "Navigation".to_string(), facet_operator: None },
        ],
        strategy: LocalizationStrategy::Fallback,
        fallback: "en".to_string(),
    };
    let terms = FakeTerms {
        texts: HashMap::from([
            ("t-rock".to_string(), "Rock".to_string()),
            ("t-jazz".to_string(), "Jazz".to_string()),
            ("th-sea".to_string(), "Sea".to_string()),
        ]),
        navigation: HashMap::from([("page-home".to_string(), "Home".to_string())]),
    };
    let content_types = Arc::new(FakeTypes {
        types: HashMap::from([
            ("article".to_string(), type_info("Article", false)),
            ("legal".to_string(), type_info("Legal notice", true)),
        ]),
        geolocated: vec!["place".to_string()],
        ..Default::default()
    });
    let dam_types = Arc::new(FakeTypes {
        types: HashMap::from([("image".to_string(), type_info("Image", false))]),
        ..Default::default()
    });
    let users = FakeUsers(HashMap::from([
        ("u1".to_string(), "Alice Martin".to_string()),
        ("u2".to_string(), "Bob Durand".to_string()),
    ]));

    let services = Collaborators {
        taxonomies: Arc::new(taxonomies),
        terms: Arc::new(terms),
        content_types: content_types.clone(),
        dam_types,
        users: Arc::new(users),
        languages: Arc::new(FakeLanguages(vec!["fr".to_string(), "en".to_string(), "de".to_string()])),
        translator: Arc::new(EchoTranslator),
    };
    Fixture { services, content_types }
}

pub fn user() -> CurrentUser {
    CurrentUser {
        working_language: "en".to_string(),
        read_workspaces: ReadWorkspaces::from_list(vec!["global".to_string(), "marketing".to_string()]),
        write_workspaces: vec!["global".to_string()],
        can_write_contents: true,
        can_write_dam: true,
    }
}

pub fn front_office() -> SearchContext {
    SearchContext { mode: SearchMode::FrontOffice, locale: "fr".to_string(), now: now(), user: user() }
}

pub fn back_office() -> SearchContext {
    SearchContext { mode: SearchMode::BackOffice, locale: "fr".to_string(), now: now(), user: user() }
}

/// Answers every call with a canned response and records what it was asked.
pub struct RecordingEngine {
    response: Result<EngineResponse, EngineError>,
    pub calls: Mutex<Vec<(Vec<IndexTarget>, EngineQuery)>>,
}

impl RecordingEngine {
    pub fn new(response: EngineResponse) -> Self {
        Self { response: Ok(response), calls: Mutex::new(vec![]) }
    }

    pub fn failing(error: EngineError) -> Self {
        Self { response: Err(error), calls: Mutex::new(vec![]) }
    }

    pub fn last_call(&self) -> (Vec<IndexTarget>, EngineQuery) {
        self.calls.lock().unwrap().last().cloned().expect("engine was not called")
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchEngine for RecordingEngine {
    async fn execute(&self, targets: &[IndexTarget], query: &EngineQuery) -> Result<EngineResponse, EngineError> {
        self.calls.lock().unwrap().push((targets.to_vec(), query.clone()));
        self.response.clone()
    }
}

pub fn source(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

pub fn content_hit(id: &str, score: Option<f64>, write_workspace: &str, content_type: &str) -> EngineHit {
    EngineHit {
        id: id.to_string(),
        index: "contents".to_string(),
        doc_type: None,
        score,
        source: source(json!({
            "objectType": "content",
            "text": "Fallback title",
            "text_fr": "Titre",
            "summary_fr": "Résumé",
            "contentType": content_type,
            "writeWorkspace": write_workspace,
            "createUser.id": "u1",
            "createUser.fullName": "Alice Martin",
            "availableLanguages": "fr",
            "lastUpdateTime": "2024-03-15T10:00:00Z",
        })),
        highlights: Default::default(),
    }
}

pub fn bucket(key: &str, count: u64) -> EngineBucket {
    EngineBucket { key: key.to_string(), count }
}
