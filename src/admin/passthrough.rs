//! # Direct Passthrough Methods
//!
//! Core methods with no logic of their own beyond forwarding to a
//! collaborator. Collaborator errors come back untouched.

use std::sync::Arc;

use chrono::{DateTime, Local, Offset, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::errors::AdminResult;
use super::identity::CallerIdentity;
use crate::services::{Broadcaster, EventLog, IdentityService, SearchIndex};

/// Locale used when neither the caller nor the site chose one
pub const FALLBACK_LOCALE: &str = "en-GB";

/// Event reloading every tab of a user
pub const LIVERELOAD_EVENT: &str = "event:livereload";

/// Arguments of `fireEvent`
#[derive(Debug, Clone, Deserialize)]
pub struct FireEventArgs {
    pub name: String,
    #[serde(default)]
    pub payload: Option<Value>,
}

/// Result of `getServerTime`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTime {
    /// Unix epoch milliseconds
    pub timestamp_millis: i64,
    /// Minutes to add to local time to get UTC (UTC+2 is -120)
    pub timezone_offset_minutes: i32,
}

impl ServerTime {
    pub fn at<Tz: TimeZone>(instant: DateTime<Tz>) -> Self {
        let east_secs = instant.offset().fix().local_minus_utc();
        Self {
            timestamp_millis: instant.timestamp_millis(),
            timezone_offset_minutes: -east_secs / 60,
        }
    }

    pub fn now() -> Self {
        Self::at(Local::now())
    }
}

/// Handlers for the passthrough methods
#[derive(Clone)]
pub struct CoreMethods {
    identity: Arc<dyn IdentityService>,
    event_log: Arc<dyn EventLog>,
    broadcaster: Arc<dyn Broadcaster>,
    search: Arc<dyn SearchIndex>,
    default_locale: Option<String>,
}

impl CoreMethods {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        event_log: Arc<dyn EventLog>,
        broadcaster: Arc<dyn Broadcaster>,
        search: Arc<dyn SearchIndex>,
        default_locale: Option<String>,
    ) -> Self {
        Self {
            identity,
            event_log,
            broadcaster,
            search,
            default_locale,
        }
    }

    /// Broadcast `payload` (or `{}`) under `name` to every connection
    pub fn fire_event(&self, args: FireEventArgs) {
        let payload = args.payload.unwrap_or_else(|| json!({}));
        self.broadcaster.emit_all(&args.name, payload);
    }

    pub async fn delete_events(&self, ids: &[i64]) -> AdminResult<()> {
        Ok(self.event_log.delete_by_ids(ids).await?)
    }

    pub async fn delete_all_events(&self) -> AdminResult<()> {
        Ok(self.event_log.delete_all().await?)
    }

    /// Caller's setting, then the site default, then `en-GB`
    pub async fn resolve_locale(&self, caller: &CallerIdentity) -> AdminResult<String> {
        let user_setting = self.identity.locale_setting(caller.uid).await?;
        let locale = non_blank(user_setting)
            .or_else(|| non_blank(self.default_locale.clone()))
            .unwrap_or_else(|| FALLBACK_LOCALE.to_string());
        Ok(locale)
    }

    pub async fn get_search_dict(&self, caller: &CallerIdentity) -> AdminResult<Value> {
        let locale = self.resolve_locale(caller).await?;
        Ok(self.search.dictionary(&locale).await?)
    }

    pub async fn delete_all_sessions(&self, caller: &CallerIdentity) -> AdminResult<()> {
        Ok(self.identity.delete_all_sessions(caller.uid).await?)
    }

    /// Tell every tab of the caller to reload
    pub fn reload_all_sessions(&self, caller: &CallerIdentity) {
        self.broadcaster
            .emit_to_group(&caller.group_key(), LIVERELOAD_EVENT, Value::Null);
    }

    pub fn get_server_time(&self) -> ServerTime {
        ServerTime::now()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
