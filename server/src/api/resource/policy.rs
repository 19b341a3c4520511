//! Authorization and validation policies for resources
//!
//! A policy decides whether a request may perform an action, which
//! validation rules apply to writes, and which extra constraints are
//! applied to listings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use subtle::ConstantTimeEq;

use super::rules::RuleSet;
use crate::api::extractors::RequestContext;
use crate::data::Record;
use crate::data::filters::ParsedClause;

/// Header checked when no bearer token is sent
pub const API_KEY_HEADER: &str = "x-api-key";

/// Controller action being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewAny,
    View,
    Create,
    Update,
    Delete,
}

pub trait ResourcePolicy: Send + Sync {
    fn authorize(&self, action: Action, request: &RequestContext) -> bool;

    fn validation_rules(&self, _action: Action) -> RuleSet {
        RuleSet::default()
    }

    /// Clauses AND-ed around the user's filters on index
    fn index_scope(&self, _request: &RequestContext) -> Vec<ParsedClause> {
        Vec::new()
    }

    /// Hook to adjust a record before insert
    fn prepare_create(&self, _record: &mut Record, _request: &RequestContext) {}

    /// Extra entries merged into collection `meta`
    fn meta(&self, _request: &RequestContext) -> Map<String, Value> {
        Map::new()
    }
}

/// Permits every action without rules
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ResourcePolicy for AllowAll {
    fn authorize(&self, _action: Action, _request: &RequestContext) -> bool {
        true
    }
}

/// Shared-key policy with per-resource validation rules
#[derive(Debug, Clone, Default)]
pub struct ApiKeyPolicy {
    api_key: Option<String>,
    public_actions: Vec<Action>,
    create_rules: RuleSet,
    update_rules: RuleSet,
}

impl ApiKeyPolicy {
    /// No key means every action is public
    pub fn new(api_key: Option<String>, public_actions: Vec<Action>) -> Self {
        Self {
            api_key,
            public_actions,
            ..Self::default()
        }
    }

    pub fn with_rules(mut self, create_rules: RuleSet, update_rules: RuleSet) -> Self {
        self.create_rules = create_rules;
        self.update_rules = update_rules;
        self
    }
}

impl ResourcePolicy for ApiKeyPolicy {
    fn authorize(&self, action: Action, request: &RequestContext) -> bool {
        let Some(expected) = &self.api_key else {
            return true;
        };
        if self.public_actions.contains(&action) {
            return true;
        }

        let presented = request
            .bearer_token()
            .or_else(|| request.header(API_KEY_HEADER));
        match presented {
            Some(key) => key.as_bytes().ct_eq(expected.as_bytes()).into(),
            None => {
                tracing::debug!(?action, "Request without API key");
                false
            }
        }
    }

    fn validation_rules(&self, action: Action) -> RuleSet {
        match action {
            Action::Create => self.create_rules.clone(),
            Action::Update => self.update_rules.clone(),
            _ => RuleSet::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::rules::Rule;
    use axum::http::{HeaderMap, HeaderValue, Method, Uri};

    fn request(headers: &[(&'static str, &str)]) -> RequestContext {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        RequestContext {
            method: Method::GET,
            uri: Uri::from_static("/api/v1/posts"),
            headers: map,
        }
    }

    #[test]
    fn test_action_deserializes_snake_case() {
        let actions: Vec<Action> = serde_json::from_str(r#"["view_any", "delete"]"#).unwrap();
        assert_eq!(actions, vec![Action::ViewAny, Action::Delete]);
    }

    #[test]
    fn test_allow_all() {
        assert!(AllowAll.authorize(Action::Delete, &request(&[])));
        assert!(AllowAll.validation_rules(Action::Create).is_empty());
        assert!(AllowAll.index_scope(&request(&[])).is_empty());
    }

    #[test]
    fn test_without_key_everything_is_public() {
        let policy = ApiKeyPolicy::new(None, Vec::new());
        assert!(policy.authorize(Action::Create, &request(&[])));
    }

    #[test]
    fn test_bearer_and_header_keys() {
        let policy = ApiKeyPolicy::new(Some("s3cret".to_string()), Vec::new());
        assert!(policy.authorize(
            Action::View,
            &request(&[("authorization", "Bearer s3cret")])
        ));
        assert!(policy.authorize(Action::View, &request(&[("x-api-key", "s3cret")])));
        assert!(!policy.authorize(Action::View, &request(&[("x-api-key", "s3cre")])));
        assert!(!policy.authorize(
            Action::View,
            &request(&[("authorization", "Bearer wrong")])
        ));
        assert!(!policy.authorize(Action::View, &request(&[])));
    }

    #[test]
    fn test_public_actions() {
        let policy = ApiKeyPolicy::new(
            Some("s3cret".to_string()),
            vec![Action::ViewAny, Action::View],
        );
        assert!(policy.authorize(Action::ViewAny, &request(&[])));
        assert!(!policy.authorize(Action::Delete, &request(&[])));
    }

    #[test]
    fn test_rules_per_action() {
        let mut create = RuleSet::new();
        create.add("title", vec![Rule::Required]);
        let policy = ApiKeyPolicy::new(None, Vec::new()).with_rules(create.clone(), RuleSet::new());
        assert_eq!(policy.validation_rules(Action::Create), create);
        assert!(policy.validation_rules(Action::Update).is_empty());
        assert!(policy.validation_rules(Action::Delete).is_empty());
    }
}
