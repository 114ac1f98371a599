//! Picks the text fields to query and the locales to accept from the site
//! localization strategy.

use std::fmt;

use serde::{Deserialize, Serialize};

const GENERIC_FIELD: &str = "_all";
const NON_LOCALIZED: &str = "nonlocalized";
const DOWN_WEIGHT: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum LocalizationStrategy {
    BackOffice,
    OnlyOne,
    #[default]
    #[serde(other)]
    Fallback,
}

impl LocalizationStrategy {
    /// Unknown names fall back to `fallback`.
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "backOffice" => LocalizationStrategy::BackOffice,
            "onlyOne" => LocalizationStrategy::OnlyOne,
            _ => LocalizationStrategy::Fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedField {
    pub name: String,
    pub boost: f32,
}

impl WeightedField {
    fn full(name: String) -> Self {
        Self { name, boost: 1.0 }
    }

    fn reduced(name: String) -> Self {
        Self { name, boost: DOWN_WEIGHT }
    }
}

impl fmt::Display for WeightedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.boost == 1.0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}^{}", self.name, self.boost)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalizationPlan {
    pub strategy: LocalizationStrategy,
    pub locale: String,
    pub fallback: Option<String>,
    pub fields: Vec<WeightedField>,
    pub locale_filter: Vec<String>,
}

impl LocalizationPlan {
    /// `locale` is the working language in back office and the current
    /// locale otherwise. `active_locales` is only read by `backOffice`.
    pub fn resolve(
        strategy: LocalizationStrategy,
        locale: &str,
        fallback: Option<&str>,
        active_locales: &[String],
        suggest: bool,
    ) -> Self {
        let family = if suggest { "autocomplete_" } else { "all_" };
        let localized = |loc: &str| format!("{family}{loc}");

        let (fields, locale_filter) = match strategy {
            LocalizationStrategy::BackOffice => (
                vec![WeightedField::full(localized(locale)), WeightedField::reduced(GENERIC_FIELD.to_string())],
                active_locales.to_vec(),
            ),
            LocalizationStrategy::OnlyOne => (
                vec![WeightedField::full(localized(locale)), WeightedField::full(localized(NON_LOCALIZED))],
                vec![locale.to_string()],
            ),
            LocalizationStrategy::Fallback => match fallback.filter(|fb| *fb != locale) {
                Some(fb) => (
                    vec![
                        WeightedField::full(localized(locale)),
                        WeightedField::reduced(localized(fb)),
                        WeightedField::reduced(localized(NON_LOCALIZED)),
                    ],
                    vec![locale.to_string(), fb.to_string()],
                ),
                None => (
                    vec![WeightedField::full(localized(locale)), WeightedField::full(localized(NON_LOCALIZED))],
                    vec![locale.to_string()],
                ),
            },
        };

        Self {
            strategy,
            locale: locale.to_string(),
            fallback: fallback.map(|s| s.to_string()),
            fields,
            locale_filter,
        }
    }

    /// Autocomplete fields whose highlights feed suggestions, in precedence
    /// order: current locale, fallback locale, non-localized.
    pub fn highlight_fields(&self) -> Vec<String> {
        let mut fields = vec![format!("autocomplete_{}", self.locale)];
        if let Some(fb) = self.fallback.as_deref().filter(|fb| *fb != self.locale) {
            fields.push(format!("autocomplete_{fb}"));
        }
        fields.push(format!("autocomplete_{NON_LOCALIZED}"));
        fields
    }
}
