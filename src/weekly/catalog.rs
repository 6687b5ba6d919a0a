//! Upstream catalog records and the HTTP client that fetches them.
//!
//! Two sources feed the weekly-material mapping: the material catalog
//! (list + per-material detail) and the new-character catalog, which
//! learns about characters released after the material catalog's last
//! update.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

use crate::config::{Endpoints, REQUEST_TIMEOUT, USER_AGENT};
use crate::error::CatalogError;
use crate::types::CharacterId;

/// Entry from the material list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MaterialSummary {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub rank: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DropSource {
    pub name: String,
}

/// Character references are usually numeric, but elemental variants of the
/// traveler come as tagged strings such as `"10000005-anemo"`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AvatarRef {
    Id(CharacterId),
    Tagged(String),
}

/// The catalog lists consumers as `{"id": .., "name": .., "rank": ..}`
/// objects; older dumps carry the bare id
#[derive(Deserialize)]
#[serde(untagged)]
enum AvatarEntry {
    Object { id: AvatarRef },
    Bare(AvatarRef),
}

impl From<AvatarEntry> for AvatarRef {
    fn from(entry: AvatarEntry) -> Self {
        match entry {
            AvatarEntry::Object { id } | AvatarEntry::Bare(id) => id,
        }
    }
}

fn avatar_refs<'de, D>(deserializer: D) -> Result<Vec<AvatarRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<AvatarEntry>::deserialize(deserializer)?;
    Ok(entries.into_iter().map(AvatarRef::from).collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RequiredBy {
    #[serde(default, deserialize_with = "avatar_refs")]
    pub avatar: Vec<AvatarRef>,
}

/// Per-material detail: who drops it and who consumes it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDetail {
    #[serde(default)]
    pub dropped_by: Vec<DropSource>,
    #[serde(default)]
    pub required_by: RequiredBy,
}

/// Everything the resolver needs from upstream
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// All items in the material catalog
    async fn materials(&self) -> Result<Vec<MaterialSummary>, CatalogError>;

    async fn material_detail(&self, id: u32) -> Result<MaterialDetail, CatalogError>;

    /// Characters released after the material catalog was last updated
    async fn new_characters(&self) -> Result<Vec<CharacterId>, CatalogError>;

    /// Name of the weekly boss material in the character's last talent upgrade
    async fn talent_material(&self, id: CharacterId) -> Result<String, CatalogError>;
}

#[async_trait]
impl<'a, T: CatalogSource + ?Sized> CatalogSource for &'a T {
    async fn materials(&self) -> Result<Vec<MaterialSummary>, CatalogError> {
        (**self).materials().await
    }

    async fn material_detail(&self, id: u32) -> Result<MaterialDetail, CatalogError> {
        (**self).material_detail(id).await
    }

    async fn new_characters(&self) -> Result<Vec<CharacterId>, CatalogError> {
        (**self).new_characters().await
    }

    async fn talent_material(&self, id: CharacterId) -> Result<String, CatalogError> {
        (**self).talent_material(id).await
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct MaterialList {
    items: HashMap<String, MaterialSummary>,
}

#[derive(Deserialize)]
struct DetailData {
    additions: MaterialDetail,
}

#[derive(Deserialize)]
struct NewReleases {
    #[serde(default)]
    character: Vec<CharacterId>,
}

/// Talent upgrade steps are listed per talent; step 8 (level 9 to 10)
/// consumes the boss material as its third item
const TALENT_MATERIAL_POINTER: &str = "/Materials/Talents/0/8/Mats/2/Name";

pub struct HttpCatalog {
    client: Client,
    endpoints: Endpoints,
}

impl HttpCatalog {
    pub fn new(endpoints: Endpoints) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, endpoints })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| {
            tracing::debug!(url, body = %String::from_utf8_lossy(&bytes), "Undecodable catalog response");
            CatalogError::Decode {
                url: url.to_string(),
                source,
            }
        })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    async fn materials(&self) -> Result<Vec<MaterialSummary>, CatalogError> {
        let url = format!("{}/material", self.endpoints.catalog);
        let list: Envelope<MaterialList> = self.get_json(&url).await?;

        let mut items: Vec<MaterialSummary> = list.data.items.into_values().collect();
        items.sort_by_key(|m| m.id);
        Ok(items)
    }

    async fn material_detail(&self, id: u32) -> Result<MaterialDetail, CatalogError> {
        let url = format!("{}/material/{}", self.endpoints.catalog, id);
        let detail: Envelope<DetailData> = self.get_json(&url).await?;
        Ok(detail.data.additions)
    }

    async fn new_characters(&self) -> Result<Vec<CharacterId>, CatalogError> {
        let url = format!("{}/new.json", self.endpoints.new_characters);
        let releases: NewReleases = self.get_json(&url).await?;
        Ok(releases.character)
    }

    async fn talent_material(&self, id: CharacterId) -> Result<String, CatalogError> {
        let url = format!("{}/data/zh/character/{}.json", self.endpoints.new_characters, id);
        let detail: Value = self.get_json(&url).await?;
        talent_material_name(&detail).ok_or(CatalogError::MissingField {
            url,
            field: "talent boss material",
        })
    }
}

/// Pull the boss material name out of a character detail document
pub fn talent_material_name(detail: &Value) -> Option<String> {
    detail
        .pointer(TALENT_MATERIAL_POINTER)
        .and_then(Value::as_str)
        .map(str::to_string)
}
