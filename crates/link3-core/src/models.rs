//! Data models for Link3
//!
//! Defines the core data structures: Hub, Link and the payloads the remote
//! store accepts. Field names on the wire follow the store (`image_uri`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a link, assigned by the remote store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct LinkId(pub u64);

impl LinkId {
    /// Get the raw value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LinkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for LinkId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Wallet account name (e.g. `alice.testnet`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create an account id, rejecting blank names
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            None
        } else {
            Some(Self(name))
        }
    }

    /// Get the account name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single entry in a hub
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    /// Stable identifier, unique within a hub
    pub id: LinkId,
    /// Destination URI
    pub uri: String,
    /// Display title
    pub title: String,
    /// Short description
    pub description: String,
    /// Content reference of the link image
    #[serde(rename = "image_uri", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    /// Display rank within the hub
    #[serde(default)]
    pub order: u32,
    /// Publish flag; `None` means published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

impl Link {
    /// Build a link from a store-bound payload and an id
    pub fn from_new(id: LinkId, new: &NewLink, order: u32) -> Self {
        Self {
            id,
            uri: new.uri.clone(),
            title: new.title.clone(),
            description: new.description.clone(),
            image_ref: new.image_ref.clone(),
            order,
            is_published: None,
        }
    }

    /// Whether the link is shown on the public hub page
    pub fn is_visible(&self) -> bool {
        self.is_published != Some(false)
    }
}

/// Payload for adding a link (id is assigned by the store)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewLink {
    pub uri: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "image_uri", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

/// The owner's link collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hub {
    pub title: String,
    pub description: String,
    #[serde(rename = "image_uri", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub owner_account_id: AccountId,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Hub {
    /// Hub-level metadata without the links
    pub fn meta(&self) -> HubMeta {
        HubMeta {
            title: self.title.clone(),
            description: self.description.clone(),
            image_ref: self.image_ref.clone(),
            owner_account_id: self.owner_account_id.clone(),
        }
    }
}

/// Hub metadata held by the aggregate next to the link store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HubMeta {
    pub title: String,
    pub description: String,
    #[serde(rename = "image_uri", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub owner_account_id: AccountId,
}

/// Payload for creating or updating a hub
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HubDto {
    pub title: String,
    pub description: String,
    #[serde(rename = "image_uri", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}
