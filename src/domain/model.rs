use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A garment in the wardrobe.
///
/// Only `id`, `tag_id` and `hanger_id` matter to pairing; the descriptive
/// fields ride along so the store file stays a faithful copy of the item
/// records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub tag_id: Option<String>,
    #[serde(default)]
    pub hanger_id: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag_id: impl Into<String>) -> Self {
        self.tag_id = Some(tag_id.into());
        self
    }

    pub fn with_hanger(mut self, hanger_id: impl Into<String>) -> Self {
        self.hanger_id = Some(hanger_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hanger {
    pub id: String,
    pub tag_id: String,
    /// LED topic of the smart hanger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_topic: Option<String>,
}

impl Hanger {
    pub fn new(id: impl Into<String>, tag_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_id: tag_id.into(),
            mqtt_topic: None,
        }
    }
}

/// One physical scan, as accepted by the ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    pub tag_id: String,
    pub sequence: u64,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindResult {
    pub tag_id: String,
    pub item_id: String,
}

/// The two kinds of binding a scan can complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Association {
    #[serde(rename_all = "camelCase")]
    Hanger { item_id: String, hanger_id: String },
    #[serde(rename_all = "camelCase")]
    Tag { tag_id: String, item_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    AssociationComplete(Association),
    #[serde(rename = "wait_hanger", rename_all = "camelCase")]
    WaitingForHanger { item_id: String },
    #[serde(rename = "wait_item", rename_all = "camelCase")]
    WaitingForItem { hanger_id: String },
    #[serde(rename_all = "camelCase")]
    Unrecognized { tag_id: String },
}

impl ScanOutcome {
    pub fn tag_bound(tag_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self::AssociationComplete(Association::Tag {
            tag_id: tag_id.into(),
            item_id: item_id.into(),
        })
    }

    pub fn hanger_bound(item_id: impl Into<String>, hanger_id: impl Into<String>) -> Self {
        Self::AssociationComplete(Association::Hanger {
            item_id: item_id.into(),
            hanger_id: hanger_id.into(),
        })
    }
}

/// Terminal body of a bind long-poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BindResponse {
    #[serde(rename_all = "camelCase")]
    AssociationComplete { item_id: String, tag_id: String },
    #[serde(rename_all = "camelCase")]
    Superseded { item_id: String },
    #[serde(rename_all = "camelCase")]
    Cancelled { item_id: String },
    #[serde(rename_all = "camelCase")]
    Timeout { item_id: String },
}

impl From<BindResult> for BindResponse {
    fn from(result: BindResult) -> Self {
        Self::AssociationComplete {
            item_id: result.item_id,
            tag_id: result.tag_id,
        }
    }
}

/// Read-only view of the coordinator slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingSnapshot {
    pub pending_item_id: Option<String>,
    pub item_awaiting_hanger: Option<String>,
    pub hanger_awaiting_item: Option<String>,
}

impl PairingSnapshot {
    pub fn is_idle(&self) -> bool {
        self.pending_item_id.is_none()
            && self.item_awaiting_hanger.is_none()
            && self.hanger_awaiting_item.is_none()
    }
}
