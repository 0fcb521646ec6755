//! Authorization by token scope.

use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_credentials::{CredentialHandler, TokenError};

use crate::{AuthorizeError, Authorizer};

/// The scope granting every resource and action.
pub const SCOPE_ALL: &str = "mender.*";

/// A scope requirement for a family of resources.
///
/// A rule applies to a request when the resource is
/// [`ScopeRule::resource`] or lies below it (if set) and the action equals
/// [`ScopeRule::action`] (if set). An applicable rule permits the request when
/// the token carries [`ScopeRule::scope`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeRule {
    /// Scope the token must carry.
    pub scope: String,
    /// Resource prefix the rule is limited to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Action the rule is limited to, upper case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl ScopeRule {
    /// A rule that applies to every request.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            resource: None,
            action: None,
        }
    }

    /// Limit the rule to resources starting with `prefix`.
    #[must_use]
    pub fn on_resource(mut self, prefix: impl Into<String>) -> Self {
        self.resource = Some(prefix.into());
        self
    }

    /// Limit the rule to one action.
    #[must_use]
    pub fn on_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into().to_ascii_uppercase());
        self
    }

    /// Returns `true` if this rule governs the given request.
    ///
    /// A resource limit covers the named resource and everything below it,
    /// matched on whole `:` segments.
    #[must_use]
    pub fn applies_to(&self, resource: &str, action: &str) -> bool {
        let resource_matches = self
            .resource
            .as_deref()
            .is_none_or(|prefix| match resource.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with(':') || prefix.is_empty(),
                None => false,
            });
        let action_matches = self
            .action
            .as_deref()
            .is_none_or(|expected| expected.eq_ignore_ascii_case(action));

        resource_matches && action_matches
    }
}

/// Returned when a rule cannot be parsed from its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid scope rule `{0}`, expected SCOPE[@RESOURCE[#ACTION]]")]
pub struct ParseScopeRuleError(String);

/// Parses `SCOPE`, `SCOPE@RESOURCE` or `SCOPE@RESOURCE#ACTION`.
///
/// An empty resource applies the rule to every resource, so
/// `mender.audit@#GET` limits the rule to reads only.
impl FromStr for ScopeRule {
    type Err = ParseScopeRuleError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseScopeRuleError(text.to_owned());

        let (scope, target) = match text.split_once('@') {
            Some((scope, target)) => (scope, Some(target)),
            None => (text, None),
        };
        if scope.is_empty() || scope.contains(char::is_whitespace) {
            return Err(invalid());
        }

        let mut rule = ScopeRule::new(scope);
        if let Some(target) = target {
            let (resource, action) = match target.split_once('#') {
                Some((resource, action)) => (resource, Some(action)),
                None => (target, None),
            };
            if !resource.is_empty() {
                rule = rule.on_resource(resource);
            }
            match action {
                Some("") => return Err(invalid()),
                Some(action) => rule = rule.on_action(action),
                None => {}
            }
        }

        Ok(rule)
    }
}

impl fmt::Display for ScopeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scope)?;
        if self.resource.is_some() || self.action.is_some() {
            write!(f, "@{}", self.resource.as_deref().unwrap_or_default())?;
        }
        if let Some(action) = &self.action {
            write!(f, "#{action}")?;
        }
        Ok(())
    }
}

/// Allows requests whose token carries a scope demanded by a matching rule.
///
/// The token is verified again with the configured handler, so this
/// authorizer can be used without trusting its caller. The token's `scp`
/// claim is read as a space separated list of scopes.
#[derive(Clone)]
pub struct ScopeAuthorizer {
    handler: Arc<dyn CredentialHandler>,
    rules: Vec<ScopeRule>,
}

impl ScopeAuthorizer {
    /// An authorizer that only admits [`SCOPE_ALL`] until rules are added.
    pub fn new(handler: Arc<dyn CredentialHandler>) -> Self {
        Self {
            handler,
            rules: Vec::new(),
        }
    }

    /// Add a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: ScopeRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add several rules.
    #[must_use]
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = ScopeRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Configured rules in insertion order.
    #[must_use]
    pub fn rules(&self) -> &[ScopeRule] {
        &self.rules
    }

    fn permits(&self, granted: &str, resource: &str, action: &str) -> bool {
        let scopes: Vec<&str> = granted.split_whitespace().collect();
        if scopes.contains(&SCOPE_ALL) {
            return true;
        }

        self.rules
            .iter()
            .filter(|rule| rule.applies_to(resource, action))
            .any(|rule| scopes.contains(&rule.scope.as_str()))
    }
}

impl fmt::Debug for ScopeAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeAuthorizer")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Authorizer for ScopeAuthorizer {
    async fn authorize(
        &self,
        token: &str,
        resource: &str,
        action: &str,
    ) -> Result<(), AuthorizeError> {
        let verified = self.handler.verify(token).map_err(|error| match error {
            TokenError::Expired => AuthorizeError::denied("token expired"),
            TokenError::Invalid => AuthorizeError::denied("token invalid"),
        })?;

        let granted = &verified.claims().scope;
        if self.permits(granted, resource, action) {
            Ok(())
        } else {
            tracing::debug!(scope = %granted, resource, action, "no scope rule permits request");
            Err(AuthorizeError::denied(format!(
                "scope does not permit {action} on {resource}"
            )))
        }
    }
}
