//! Helpers shared by resource and data source callbacks
//!
//! Mutations against Genesys Cloud are eventually consistent: a freshly
//! created entity can 404 on the next read, and a deleted one can linger in
//! listings for a while. Every lifecycle callback that observes state after
//! a mutation polls through the retry helpers here instead of trusting one
//! response. The state helpers write API models back into Terraform state
//! with explicit nulls so applied state never carries unknowns.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::schema::AttributeType;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tokio::time::{sleep, Instant};

use crate::api::common::AddressableEntityRef;

const RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Window for read-after-write visibility of freshly mutated entities
pub const READ_TIMEOUT: Duration = Duration::from_secs(300);
/// How long delete waits for the API to report the entity gone
pub const DELETE_TIMEOUT: Duration = Duration::from_secs(180);
/// How long a data source waits for its named entity to appear
pub const DATA_SOURCE_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome of a single poll attempt
pub enum RetryAction<T> {
    Done(T),
    /// Try again until the deadline; the diagnostic is surfaced if it never succeeds
    Retry(Diagnostic),
    Fail(Diagnostic),
}

/// Terminal failure of a poll loop
#[derive(Debug)]
pub enum RetryFailure {
    Fatal(Diagnostic),
    /// Deadline passed or context cancelled; carries the last attempt's diagnostic
    TimedOut(Diagnostic),
}

impl RetryFailure {
    pub fn into_diagnostic(self) -> Diagnostic {
        match self {
            RetryFailure::Fatal(diag) | RetryFailure::TimedOut(diag) => diag,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, RetryFailure::TimedOut(_))
    }
}

/// Runs `op` until it reports `Done` or `Fail`, or until `timeout` elapses.
///
/// Sleeps a fixed interval between attempts on the tokio clock, so tests can
/// run the loop under paused time. Cancelling the context ends the loop at
/// the next retry decision.
pub async fn with_retries<T, F, Fut>(
    ctx: &Context,
    timeout: Duration,
    mut op: F,
) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RetryAction<T>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        match op().await {
            RetryAction::Done(value) => return Ok(value),
            RetryAction::Fail(diag) => return Err(RetryFailure::Fatal(diag)),
            RetryAction::Retry(diag) => {
                if ctx.is_cancelled() || Instant::now() + RETRY_INTERVAL > deadline {
                    return Err(RetryFailure::TimedOut(diag));
                }
                sleep(RETRY_INTERVAL).await;
            }
        }
    }
}

/// Poll wrapper for read callbacks, bounded by the read-after-write window.
pub async fn with_retries_for_read<T, F, Fut>(ctx: &Context, op: F) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RetryAction<T>>,
{
    with_retries(ctx, READ_TIMEOUT, op).await
}

/// Formats an API failure the way every lifecycle callback reports it.
pub fn api_error_diagnostic(summary: impl Into<String>, err: &dyn std::fmt::Display) -> Diagnostic {
    Diagnostic::error(summary, format!("API error: {}", err))
}

/// Writes an optional string attribute, nulling it when the API omitted it.
pub fn set_opt_string(state: &mut DynamicValue, name: &str, value: Option<&str>) {
    let path = AttributePath::new(name);
    let _ = match value {
        Some(value) => state.set_string(&path, value.to_string()),
        None => state.set_null(&path),
    };
}

pub fn set_opt_bool(state: &mut DynamicValue, name: &str, value: Option<bool>) {
    let path = AttributePath::new(name);
    let _ = match value {
        Some(value) => state.set_bool(&path, value),
        None => state.set_null(&path),
    };
}

pub fn set_opt_int(state: &mut DynamicValue, name: &str, value: Option<i64>) {
    let path = AttributePath::new(name);
    let _ = match value {
        Some(value) => state.set_int(&path, value),
        None => state.set_null(&path),
    };
}

pub fn set_opt_number(state: &mut DynamicValue, name: &str, value: Option<f64>) {
    let path = AttributePath::new(name);
    let _ = match value {
        Some(value) => state.set_number(&path, value),
        None => state.set_null(&path),
    };
}

/// Writes an `{id, name, self_uri}` reference attribute.
pub fn set_entity_ref(state: &mut DynamicValue, name: &str, value: Option<&AddressableEntityRef>) {
    let path = AttributePath::new(name);
    let _ = match value {
        Some(entity) => state.set_map(&path, entity_ref_map(entity)),
        None => state.set_null(&path),
    };
}

/// Object value for an entity reference. Object attributes carry every key,
/// so absent fields are null rather than missing.
pub fn entity_ref_map(entity: &AddressableEntityRef) -> HashMap<String, Dynamic> {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), opt_string_dynamic(entity.id.as_deref()));
    fields.insert(
        "name".to_string(),
        opt_string_dynamic(entity.name.as_deref()),
    );
    fields.insert(
        "self_uri".to_string(),
        opt_string_dynamic(entity.self_uri.as_deref()),
    );
    fields
}

/// String attribute value, null when absent.
pub fn opt_string_dynamic(value: Option<&str>) -> Dynamic {
    match value {
        Some(value) => Dynamic::String(value.to_string()),
        None => Dynamic::Null,
    }
}

pub fn opt_int_dynamic(value: Option<i64>) -> Dynamic {
    match value {
        Some(value) => Dynamic::Number(value as f64),
        None => Dynamic::Null,
    }
}

pub fn opt_bool_dynamic(value: Option<bool>) -> Dynamic {
    match value {
        Some(value) => Dynamic::Bool(value),
        None => Dynamic::Null,
    }
}

/// Schema type for the reference objects the API attaches to owned entities.
pub fn entity_ref_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("id".to_string(), AttributeType::String),
        ("name".to_string(), AttributeType::String),
        ("self_uri".to_string(), AttributeType::String),
    ]))
}

/// Collects the string entries of a list attribute value.
pub fn string_list(entries: Vec<Dynamic>) -> Vec<String> {
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Dynamic::String(value) => Some(value),
            _ => None,
        })
        .collect()
}

/// Reads a string field out of an object attribute value.
pub fn string_field(fields: &HashMap<String, Dynamic>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Dynamic::String(value)) => Some(value.clone()),
        _ => None,
    }
}
