//! Reusable document base types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Common fields of a tenant-scoped document.
///
/// Flatten it into an entity to share the identifier, tenant and timestamp
/// fields:
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use tessera_store::TenantModel;
///
/// #[derive(Serialize, Deserialize)]
/// struct Invoice {
///     #[serde(flatten)]
///     base: TenantModel,
///     amount: i64,
/// }
///
/// let invoice = Invoice { base: TenantModel::new("inv-1", "acme"), amount: 42 };
/// let doc = bson::to_document(&invoice).unwrap();
/// assert_eq!(doc.get_str("_id").unwrap(), "inv-1");
/// assert_eq!(doc.get_str("tenantId").unwrap(), "acme");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantModel {
    /// Document identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Creation time.
    pub created_time: DateTime<Utc>,
    /// Last modification time, unset until the first update.
    #[serde(default)]
    pub updated_time: Option<DateTime<Utc>>,
}

impl TenantModel {
    /// Creates a model stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            created_time: Utc::now(),
            updated_time: None,
        }
    }

    /// Records a modification at the current time.
    pub fn touch(&mut self) {
        self.updated_time = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_unmodified() {
        let model = TenantModel::new("t1", "acme");
        assert_eq!(model.id, "t1");
        assert_eq!(model.tenant_id, "acme");
        assert!(model.updated_time.is_none());
    }

    #[test]
    fn test_touch_sets_updated_time() {
        let mut model = TenantModel::new("t1", "acme");
        model.touch();
        let updated = model.updated_time.expect("updated");
        assert!(updated >= model.created_time);
    }

    #[test]
    fn test_json_field_names() {
        let model = TenantModel::new("t1", "acme");
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["_id"], "t1");
        assert_eq!(json["tenantId"], "acme");
        assert!(json.get("createdTime").is_some());
        assert!(json["updatedTime"].is_null());
    }

    #[test]
    fn test_missing_updated_time_defaults() {
        let json = r#"{"_id":"t1","tenantId":"acme","createdTime":"2024-01-01T00:00:00Z"}"#;
        let model: TenantModel = serde_json::from_str(json).unwrap();
        assert!(model.updated_time.is_none());
    }
}
