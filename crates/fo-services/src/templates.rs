//! Document templates and rendering
//!
//! Placeholders are `{{ key }}` with optional whitespace inside the braces.
//! A key is looked up as given first, then as a dotted path into nested
//! objects (`client.name`).

use std::collections::BTreeMap;
use std::sync::Arc;

use fo_activity::ActivityLogger;
use fo_auth::CurrentUser;
use fo_contracts::base::{ensure_allowed, Contract};
use fo_contracts::templates::{permissions, CreateTemplateContract, UpdateTemplateContract};
use fo_core::error::FoError;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::result::{FoResult, OptionExt};
use fo_core::traits::Id;
use fo_db::{DocumentTemplateStore, Stores};
use fo_models::{normalize_code, DocumentTemplate, NewDocumentTemplate, UpdateDocumentTemplate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::base::{actor, clean, ensure_unique, invalid_base};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("valid placeholder pattern"));

/// Output of a render; unresolved keys are listed once each, in order of
/// first appearance, and left in the content as written
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedDocument {
    pub content: String,
    pub unresolved: Vec<String>,
}

/// Keys of every placeholder in `content`, without duplicates
pub fn placeholders(content: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(content) {
        let key = &caps[1];
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// Replaces the placeholders in `content` with `values`
pub fn render(content: &str, values: &BTreeMap<String, Value>) -> RenderedDocument {
    let mut unresolved: Vec<String> = Vec::new();
    let rendered = PLACEHOLDER.replace_all(content, |caps: &Captures| {
        let key = &caps[1];
        match lookup(values, key) {
            Some(value) => display(value),
            None => {
                if !unresolved.iter().any(|k| k == key) {
                    unresolved.push(key.to_string());
                }
                caps[0].to_string()
            }
        }
    });
    RenderedDocument {
        content: rendered.into_owned(),
        unresolved,
    }
}

fn lookup<'a>(values: &'a BTreeMap<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = values.get(key) {
        return Some(value);
    }
    let mut parts = key.split('.');
    let mut current = values.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct DocumentTemplateService {
    templates: Arc<dyn DocumentTemplateStore>,
    activity: ActivityLogger,
}

impl DocumentTemplateService {
    pub fn new(stores: &Stores, activity: ActivityLogger) -> Self {
        Self {
            templates: stores.templates.clone(),
            activity,
        }
    }

    pub async fn list(&self, user: &CurrentUser, pagination: Pagination) -> FoResult<PaginatedResult<DocumentTemplate>> {
        ensure_allowed(user, permissions::VIEW)?;
        let items = self.templates.find_all(pagination.limit, pagination.offset).await?;
        let total = self.templates.count().await?;
        Ok(PaginatedResult::new(items, total, pagination))
    }

    pub async fn get(&self, user: &CurrentUser, id: Id) -> FoResult<DocumentTemplate> {
        ensure_allowed(user, permissions::VIEW)?;
        self.find(id).await
    }

    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn create(&self, user: &CurrentUser, mut input: NewDocumentTemplate) -> FoResult<DocumentTemplate> {
        input.code = normalize_code(&input.code);
        input.name = input.name.trim().to_string();
        input.category = clean(input.category);

        CreateTemplateContract::new(user).check(&input)?;
        ensure_unique(self.templates.is_code_unique(&input.code, None).await?, "code")?;

        let template = self.templates.create(input, actor(user)).await?;
        info!(id = template.id, code = %template.code, "Document template created");
        self.activity
            .created(actor(user), &template, format!("Template {} created", template.code))
            .await;
        Ok(template)
    }

    #[instrument(skip(self, user, patch), fields(user_id = user.id))]
    pub async fn update(
        &self,
        user: &CurrentUser,
        id: Id,
        mut patch: UpdateDocumentTemplate,
    ) -> FoResult<DocumentTemplate> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        patch.name = patch.name.map(|n| n.trim().to_string());

        UpdateTemplateContract::new(user).check(&patch)?;
        let updated = self.templates.update(id, patch, actor(user)).await?;
        self.activity.updated(actor(user), &current, &updated).await;
        Ok(updated)
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete(&self, user: &CurrentUser, id: Id) -> FoResult<()> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        self.templates.delete(id, actor(user)).await?;
        self.activity
            .deleted(actor(user), &current, format!("Template {} deleted", current.code))
            .await;
        Ok(())
    }

    /// Renders an active template. With `strict` any unresolved placeholder
    /// fails the render.
    #[instrument(skip(self, user, values), fields(user_id = user.id))]
    pub async fn render(
        &self,
        user: &CurrentUser,
        id: Id,
        values: &BTreeMap<String, Value>,
        strict: bool,
    ) -> FoResult<RenderedDocument> {
        ensure_allowed(user, permissions::VIEW)?;
        let template = self.find(id).await?;
        if !template.is_active {
            return Err(invalid_base(format!("Template {} is inactive", template.code)));
        }

        let rendered = render(&template.content, values);
        if strict && !rendered.unresolved.is_empty() {
            return Err(FoError::invalid(
                "values",
                format!("missing {}", rendered.unresolved.join(", ")),
            ));
        }
        debug!(id, unresolved = rendered.unresolved.len(), "Template rendered");
        Ok(rendered)
    }

    async fn find(&self, id: Id) -> FoResult<DocumentTemplate> {
        self.templates
            .find_by_id(id)
            .await?
            .or_not_found("DocumentTemplate", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, seeded_stores, user_with};
    use serde_json::json;

    fn values(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_render_tolerates_whitespace() {
        let out = render(
            "Dear {{client_name}}, order {{ number }} is {{  status }}.",
            &values(json!({ "client_name": "Acme", "number": "WO-2024-00012", "status": "completed" })),
        );
        assert_eq!(out.content, "Dear Acme, order WO-2024-00012 is completed.");
        assert!(out.unresolved.is_empty());
    }

    #[test]
    fn test_unresolved_are_kept_and_reported_once() {
        let out = render("{{ a }} {{b}} {{ a }}", &values(json!({ "b": 2 })));
        assert_eq!(out.content, "{{ a }} 2 {{ a }}");
        assert_eq!(out.unresolved, vec!["a".to_string()]);
    }

    #[test]
    fn test_dotted_keys() {
        let data = values(json!({ "client": { "name": "Acme", "vat": null }, "site.city": "Utrecht" }));
        let out = render("{{client.name}} / {{ site.city }} / [{{client.vat}}]", &data);
        assert_eq!(out.content, "Acme / Utrecht / []");
        assert_eq!(placeholders("{{client.name}} {{ x }} {{client.name}}"), vec!["client.name", "x"]);
    }

    fn receipt(code: &str) -> NewDocumentTemplate {
        NewDocumentTemplate {
            code: code.into(),
            name: "Completion receipt".into(),
            category: Some("work_orders".into()),
            content: "Work order {{ number }} completed for {{ client }}".into(),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_render_through_the_service() {
        let stores = seeded_stores().await;
        let service = DocumentTemplateService::new(&stores, ActivityLogger::new(stores.activity.clone()));
        let template = service.create(&admin(), receipt("receipt")).await.unwrap();
        assert_eq!(template.code, "RECEIPT");
        assert!(service.create(&admin(), receipt("RECEIPT")).await.is_err());

        let reader = user_with(4, &[permissions::VIEW]);
        let partial = values(json!({ "number": "WO-2024-00001" }));
        let lenient = service.render(&reader, template.id, &partial, false).await.unwrap();
        assert_eq!(lenient.unresolved, vec!["client".to_string()]);

        let err = service.render(&reader, template.id, &partial, true).await.unwrap_err();
        match err {
            FoError::Validation(errors) => assert!(errors.has_error("values")),
            other => panic!("unexpected {:?}", other),
        }

        let patch = UpdateDocumentTemplate {
            is_active: Some(false),
            ..Default::default()
        };
        service.update(&admin(), template.id, patch).await.unwrap();
        assert!(service.render(&reader, template.id, &partial, false).await.is_err());
    }
}
