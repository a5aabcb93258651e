//! # Role Definitions
//!
//! Custom role definitions. Creation is synchronous on the remote side and an
//! existing definition is never updated. Deletion is retained: a definition may
//! only go once no role assignment references it, and nothing checks that yet.

use serde::{Deserialize, Serialize};

use crate::client::AsyncClient;
use crate::engine::AsyncReconciler;
use crate::spec::{ResourceSpec, SpecProvider};

use super::{DeletePolicy, ResourceService};

pub const SERVICE_NAME: &str = "roledefinitions";

/// Role type set on every definition this service creates
pub const CUSTOM_ROLE_TYPE: &str = "CustomRole";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub not_actions: Vec<String>,
    #[serde(default)]
    pub data_actions: Vec<String>,
    #[serde(default)]
    pub not_data_actions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDefinitionProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_type: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub assignable_scopes: Vec<String>,
}

/// Remote role definition as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<RoleDefinitionProperties>,
}

impl RoleDefinition {
    /// Request body for a create, as adapters send it
    #[must_use]
    pub fn from_properties(role_definition_id: &str, properties: RoleDefinitionProperties) -> Self {
        Self {
            id: Some(role_definition_id.to_string()),
            name: properties.role_name.clone(),
            properties: Some(properties),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDefinitionSpec {
    pub resource_group: String,
    pub role_definition_id: String,
    /// Scope the definition is created under
    pub scope: String,
    pub role_name: Option<String>,
    pub assignable_scopes: Vec<String>,
    pub permissions: Vec<Permission>,
}

impl ResourceSpec for RoleDefinitionSpec {
    type Object = RoleDefinition;
    type Parameters = RoleDefinitionProperties;

    fn resource_name(&self) -> &str {
        &self.role_definition_id
    }

    fn owner_resource_name(&self) -> &str {
        &self.scope
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn parameters(
        &self,
        existing: Option<&RoleDefinition>,
    ) -> anyhow::Result<Option<RoleDefinitionProperties>> {
        if existing.is_some() {
            return Ok(None);
        }

        Ok(Some(RoleDefinitionProperties {
            role_name: self.role_name.clone(),
            role_type: Some(CUSTOM_ROLE_TYPE.to_string()),
            permissions: self.permissions.clone(),
            assignable_scopes: self.assignable_scopes.clone(),
        }))
    }
}

/// Build the role definitions service
pub fn service<C>(
    engine: AsyncReconciler<C>,
    specs: impl SpecProvider<RoleDefinitionSpec> + 'static,
) -> ResourceService<C, RoleDefinitionSpec>
where
    C: AsyncClient<Object = RoleDefinition, Parameters = RoleDefinitionProperties>,
{
    ResourceService::new(SERVICE_NAME, engine, specs).with_delete_policy(DeletePolicy::Retain)
}
