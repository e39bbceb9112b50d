use serde::{Deserialize, Serialize};

use crate::registry::{DomainRecord, LifecycleEvent};

/// RDAP domain object (RFC 9083), limited to the members the exporter reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapResponse {
    #[serde(default)]
    pub object_class_name: Option<String>,

    #[serde(default)]
    pub handle: Option<String>,

    #[serde(default)]
    pub ldh_name: Option<String>,

    #[serde(default)]
    pub unicode_name: Option<String>,

    #[serde(default)]
    pub status: Vec<String>,

    #[serde(default)]
    pub events: Vec<RdapEvent>,

    #[serde(default)]
    pub port43: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapEvent {
    pub event_action: String,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub event_actor: Option<String>,
}

impl RdapResponse {
    pub fn domain_name(&self) -> Option<&str> {
        self.ldh_name.as_deref().or(self.unicode_name.as_deref())
    }
}

impl From<RdapEvent> for LifecycleEvent {
    fn from(event: RdapEvent) -> Self {
        // a missing date is kept as empty so it fails parsing and gets logged
        LifecycleEvent::new(event.event_action, event.event_date.unwrap_or_default())
    }
}

impl From<RdapResponse> for DomainRecord {
    fn from(response: RdapResponse) -> Self {
        DomainRecord::new(response.events.into_iter().map(Into::into).collect())
    }
}
