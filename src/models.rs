use std::collections::BTreeMap;

use serde::Serialize;

/// Login response retained after a successful `connect`.
#[derive(Debug, Clone)]
pub struct Session {
    /// The short-lived token attached to every call as `X-Hybrik-Sapiauth`.
    pub token: String,
    /// Full login response JSON.
    pub raw: serde_json::Value,
}

/// POST /login body.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub auth_key: &'a str,
    pub auth_secret: &'a str,
}

/// Optional fields for [`create_job`](crate::HybrikClient::create_job).
///
/// Every `None` field is left off the wire body entirely; the API treats an
/// explicit `null` differently from an absent key.
#[derive(Debug, Clone, Default)]
pub struct CreateJobOptions {
    /// Job schema. Defaults to `"hybrik"` on the wire.
    pub schema: Option<String>,
    /// Minutes until a completed job expires and is deleted.
    pub expiration: Option<u64>,
    /// 1 = lowest, 254 = highest.
    pub priority: Option<u32>,
    /// Tags restricting which task groups may pick up the job.
    pub task_tags: Option<Vec<String>>,
    /// Machine-trackable identifier, up to 192 characters. Uniqueness is
    /// not verified by the API.
    pub user_tag: Option<String>,
    pub task_retry_count: Option<u32>,
    pub task_retry_delay_secs: Option<u64>,
}

pub(crate) const DEFAULT_SCHEMA: &str = "hybrik";

/// POST /jobs body. The retry fields use the API's `task_retry:`-prefixed
/// key names.
#[derive(Serialize)]
pub(crate) struct CreateJobRequest<'a> {
    pub name: &'a str,
    pub payload: &'a serde_json::Value,
    pub schema: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_tags: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_tag: Option<&'a str>,
    #[serde(rename = "task_retry:count", skip_serializing_if = "Option::is_none")]
    pub task_retry_count: Option<u32>,
    #[serde(rename = "task_retry:delay_secs", skip_serializing_if = "Option::is_none")]
    pub task_retry_delay_secs: Option<u64>,
}

/// Query options for [`list_jobs`](crate::HybrikClient::list_jobs).
///
/// Follows the same include-only-if-present policy as job creation. The
/// `filters` parameter is only sent when both `filters_field` and
/// `filters_values` are supplied.
#[derive(Debug, Clone, Default)]
pub struct ListJobsQuery {
    pub ids: Option<Vec<String>>,
    pub fields: Option<Vec<String>>,
    pub filters_field: Option<String>,
    pub filters_values: Option<Vec<String>>,
    pub order: Option<String>,
    pub skip: Option<u32>,
    pub sort_field: Option<String>,
    pub take: Option<u32>,
}

impl ListJobsQuery {
    pub(crate) fn to_query(&self) -> BTreeMap<String, String> {
        let mut query = BTreeMap::new();
        if let Some(ids) = &self.ids {
            query.insert("ids".to_string(), ids.join(","));
        }
        if let Some(fields) = &self.fields {
            query.insert("fields".to_string(), fields.join(","));
        }
        if let (Some(field), Some(values)) = (&self.filters_field, &self.filters_values) {
            let filters = serde_json::json!({ field: values });
            query.insert("filters".to_string(), filters.to_string());
        }
        if let Some(order) = &self.order {
            query.insert("order".to_string(), order.clone());
        }
        if let Some(skip) = self.skip {
            query.insert("skip".to_string(), skip.to_string());
        }
        if let Some(sort_field) = &self.sort_field {
            query.insert("sort_field".to_string(), sort_field.clone());
        }
        if let Some(take) = self.take {
            query.insert("take".to_string(), take.to_string());
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_job_body_with_no_optionals() {
        let payload = json!({"a": 1});
        let request = CreateJobRequest {
            name: "x",
            payload: &payload,
            schema: DEFAULT_SCHEMA,
            expiration: None,
            priority: None,
            task_tags: None,
            user_tag: None,
            task_retry_count: None,
            task_retry_delay_secs: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"name": "x", "payload": {"a": 1}, "schema": "hybrik"}));
    }

    #[test]
    fn create_job_body_includes_exactly_the_supplied_optionals() {
        let payload = json!({});
        let request = CreateJobRequest {
            name: "transcode",
            payload: &payload,
            schema: DEFAULT_SCHEMA,
            expiration: Some(120),
            priority: None,
            task_tags: None,
            user_tag: Some("batch-7"),
            task_retry_count: Some(3),
            task_retry_delay_secs: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "transcode",
                "payload": {},
                "schema": "hybrik",
                "expiration": 120,
                "user_tag": "batch-7",
                "task_retry:count": 3,
            })
        );
    }

    #[test]
    fn retry_fields_use_prefixed_wire_keys() {
        let payload = json!({});
        let request = CreateJobRequest {
            name: "n",
            payload: &payload,
            schema: DEFAULT_SCHEMA,
            expiration: None,
            priority: None,
            task_tags: None,
            user_tag: None,
            task_retry_count: Some(1),
            task_retry_delay_secs: Some(30),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["task_retry:count"], 1);
        assert_eq!(body["task_retry:delay_secs"], 30);
        assert!(body.get("task_retry_count").is_none());
        assert!(body.get("task_retry_delay_secs").is_none());
    }

    #[test]
    fn list_jobs_query_empty_by_default() {
        assert!(ListJobsQuery::default().to_query().is_empty());
    }

    #[test]
    fn list_jobs_filters_require_both_field_and_values() {
        let field_only = ListJobsQuery {
            filters_field: Some("status".to_string()),
            ..Default::default()
        };
        assert!(field_only.to_query().get("filters").is_none());

        let values_only = ListJobsQuery {
            filters_values: Some(vec!["done".to_string()]),
            ..Default::default()
        };
        assert!(values_only.to_query().get("filters").is_none());

        let both = ListJobsQuery {
            filters_field: Some("status".to_string()),
            filters_values: Some(vec!["done".to_string()]),
            ..Default::default()
        };
        assert_eq!(
            both.to_query().get("filters").map(String::as_str),
            Some(r#"{"status":["done"]}"#)
        );
    }

    #[test]
    fn list_jobs_joins_ids_and_fields() {
        let query = ListJobsQuery {
            ids: Some(vec!["1".to_string(), "2".to_string()]),
            fields: Some(vec!["id".to_string(), "status".to_string()]),
            skip: Some(0),
            take: Some(100),
            sort_field: Some("id".to_string()),
            ..Default::default()
        };
        let query = query.to_query();
        assert_eq!(query.get("ids").map(String::as_str), Some("1,2"));
        assert_eq!(query.get("fields").map(String::as_str), Some("id,status"));
        assert_eq!(query.get("skip").map(String::as_str), Some("0"));
        assert_eq!(query.get("take").map(String::as_str), Some("100"));
        assert_eq!(query.get("sort_field").map(String::as_str), Some("id"));
    }
}
