use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::store::SessionStore;
use super::{SessionId, SessionRecord};
use crate::error::SessionError;

const ATTR_ID: &str = "id";
const ATTR_DATA: &str = "data";
/// Epoch seconds. Point the table's TTL setting at this attribute to let
/// DynamoDB reap expired items on its own schedule.
const ATTR_EXPIRES: &str = "expires";

type Item = HashMap<String, AttributeValue>;

/// One scan page: its items and the key to resume from.
type ScanPage = (Vec<Item>, Option<Item>);

/// DynamoDB-based session store.
///
/// Table layout: partition key `id` (S), `data` (B), `expires` (N).
pub struct DynamoSessionStore {
    client: Client,
    table_name: String,
}

impl DynamoSessionStore {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    async fn scan_expired_page(
        &self,
        now: i64,
        start_key: Option<Item>,
    ) -> Result<ScanPage, SessionError> {
        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .filter_expression("#e <= :now")
            .expression_attribute_names("#e", ATTR_EXPIRES)
            .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
            .projection_expression("#i")
            .expression_attribute_names("#i", ATTR_ID)
            .set_exclusive_start_key(start_key)
            .send()
            .await
            .map_err(|e| {
                warn!("DynamoDB scan error: {}", DisplayErrorContext(&e));
                SessionError::StoreUnavailable(DisplayErrorContext(&e).to_string())
            })?;
        Ok((output.items.unwrap_or_default(), output.last_evaluated_key))
    }

    /// Delete only while the stored expiry is still in the past, so a
    /// session saved again since the scan is kept.
    async fn delete_if_expired(&self, id: &SessionId, now: i64) -> Result<bool, SessionError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(ATTR_ID, AttributeValue::S(id.as_str().to_string()))
            .condition_expression("#e <= :now")
            .expression_attribute_names("#e", ATTR_EXPIRES)
            .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                debug!("Session {} changed since scan, keeping it", id.short());
                Ok(false)
            }
            Err(e) => {
                warn!("DynamoDB delete_item error: {}", DisplayErrorContext(&e));
                Err(SessionError::StoreUnavailable(
                    DisplayErrorContext(&e).to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl SessionStore for DynamoSessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ATTR_ID, AttributeValue::S(id.as_str().to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| {
                warn!("DynamoDB get_item error: {}", DisplayErrorContext(&e));
                SessionError::StoreUnavailable(DisplayErrorContext(&e).to_string())
            })?;

        match output.item {
            Some(item) => live_record(id, &item, Utc::now()),
            None => Ok(None),
        }
    }

    async fn upsert(&self, record: &SessionRecord) -> Result<(), SessionError> {
        // PutItem replaces the whole item in one request.
        self.client
            .put_item()
            .table_name(&self.table_name)
            .item(ATTR_ID, AttributeValue::S(record.id.as_str().to_string()))
            .item(ATTR_DATA, AttributeValue::B(Blob::new(record.data.clone())))
            .item(
                ATTR_EXPIRES,
                AttributeValue::N(record.expires_at.timestamp().to_string()),
            )
            .send()
            .await
            .map_err(|e| {
                warn!("DynamoDB put_item error: {}", DisplayErrorContext(&e));
                SessionError::StoreUnavailable(DisplayErrorContext(&e).to_string())
            })?;
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(ATTR_ID, AttributeValue::S(id.as_str().to_string()))
            .send()
            .await
            .map_err(|e| {
                warn!("DynamoDB delete_item error: {}", DisplayErrorContext(&e));
                SessionError::StoreUnavailable(DisplayErrorContext(&e).to_string())
            })?;
        Ok(())
    }

    async fn delete_expired(&self) -> Result<usize, SessionError> {
        let now = Utc::now().timestamp();
        let ids = collect_expired_ids(|start| self.scan_expired_page(now, start)).await?;

        let mut removed = 0;
        for id in &ids {
            if self.delete_if_expired(id, now).await? {
                removed += 1;
            }
        }

        debug!("Purged {} expired sessions from {}", removed, self.table_name);
        Ok(removed)
    }

    fn name(&self) -> &'static str {
        "dynamodb"
    }
}

/// Walk every scan page, following `LastEvaluatedKey`, and gather the ids.
async fn collect_expired_ids<F, Fut>(mut fetch: F) -> Result<Vec<SessionId>, SessionError>
where
    F: FnMut(Option<Item>) -> Fut,
    Fut: Future<Output = Result<ScanPage, SessionError>>,
{
    let mut ids = Vec::new();
    let mut start_key = None;
    loop {
        let (items, last_key) = fetch(start_key.take()).await?;
        ids.extend(items.iter().filter_map(item_id));
        match last_key {
            Some(key) if !key.is_empty() => start_key = Some(key),
            _ => break,
        }
    }
    Ok(ids)
}

fn item_id(item: &Item) -> Option<SessionId> {
    let raw = item.get(ATTR_ID).and_then(|v| v.as_s().ok())?;
    match SessionId::parse(raw) {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("Skipping session item with bad id: {}", e);
            None
        }
    }
}

/// Decode an item, treating an expiry at or before `now` as absent.
fn live_record(
    id: &SessionId,
    item: &Item,
    now: DateTime<Utc>,
) -> Result<Option<SessionRecord>, SessionError> {
    let record = parse_record_from_item(id, item)?;
    Ok(Some(record).filter(|r| !r.is_expired_at(now)))
}

fn parse_record_from_item(id: &SessionId, item: &Item) -> Result<SessionRecord, SessionError> {
    let data = item
        .get(ATTR_DATA)
        .and_then(|v| v.as_b().ok())
        .map(|b| b.as_ref().to_vec())
        .ok_or_else(|| SessionError::CorruptRecord("missing data attribute".to_string()))?;

    let expires_at = item
        .get(ATTR_EXPIRES)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .ok_or_else(|| SessionError::CorruptRecord("missing expires attribute".to_string()))?;

    Ok(SessionRecord::new(id.clone(), data, expires_at))
}
