use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::types::location::WORLD_MARKER;

/// The logged-in account, as returned by `auth/user`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub status: String,
    pub status_description: String,
    pub bio: String,
    pub presence: Option<Presence>,
    pub friends: Vec<String>,
}

impl User {
    /// World the user is currently in, according to the presence block.
    pub fn current_world(&self) -> Option<&str> {
        self.presence
            .as_ref()
            .map(|presence| presence.world.as_str())
            .filter(|world| world.starts_with(WORLD_MARKER))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Presence {
    pub world: String,
    pub instance: String,
}

/// A friend entry, as returned by `auth/user/friends`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitedUser {
    pub id: String,
    pub display_name: String,
    pub status: String,
    pub status_description: String,
    pub location: String,
    pub user_icon: String,
    pub current_avatar_thumbnail_image_url: String,
    pub last_platform: String,
    pub tags: Vec<String>,
    // never sent by the api, filled in from the favorites list
    #[serde(skip_deserializing)]
    pub is_favorite: bool,
}

impl LimitedUser {
    /// Icon to show for this friend, falling back to the avatar thumbnail.
    pub fn icon_url(&self) -> &str {
        if self.user_icon.is_empty() {
            &self.current_avatar_thumbnail_image_url
        } else {
            &self.user_icon
        }
    }

    pub fn status(&self) -> Status {
        Status::from_api(&self.status)
    }

    /// Status line for display: the custom description if set, otherwise the status label.
    pub fn status_line(&self) -> String {
        if self.status_description.is_empty() {
            self.status().to_string()
        } else {
            self.status_description.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    JoinMe,
    Active,
    AskMe,
    Busy,
    Offline,
}

impl Status {
    pub fn from_api(s: &str) -> Self {
        match s {
            "join me" => Status::JoinMe,
            "active" => Status::Active,
            "ask me" => Status::AskMe,
            "busy" => Status::Busy,
            _ => Status::Offline,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Status::JoinMe => "Join Me",
            Status::Active => "Online",
            Status::AskMe => "Ask Me",
            Status::Busy => "Do Not Disturb",
            Status::Offline => "Offline",
        };

        write!(f, "{}", label)
    }
}
