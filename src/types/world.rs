use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct World {
    pub id: String,
    pub name: String,
    pub description: String,
    pub author_id: String,
    pub author_name: String,
    pub capacity: u32,
    pub recommended_capacity: u32,
    pub occupants: u32,
    pub public_occupants: u32,
    pub private_occupants: u32,
    pub favorites: u32,
    pub visits: u32,
    pub popularity: u32,
    pub heat: u32,
    pub image_url: String,
    pub thumbnail_image_url: String,
    pub release_status: String,
    pub tags: Vec<String>,
    #[serde(rename = "created_at")]
    pub created_at: String,
    #[serde(rename = "updated_at")]
    pub updated_at: String,
}
