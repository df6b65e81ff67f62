use std::fmt::{Display, Formatter};

pub const OFFLINE: &str = "offline";
pub const WORLD_MARKER: &str = "wrld_";

/// A parsed location string, e.g. `wrld_...:12345~private(usr_...)` or `offline`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Offline,
    Private,
    Traveling,
    Instance {
        world_id: String,
        instance: String,
    },
    Unknown(String),
}

impl Location {
    pub fn parse(s: &str) -> Self {
        match s {
            OFFLINE | "" => Location::Offline,
            "private" => Location::Private,
            "traveling" => Location::Traveling,
            s if s.contains(WORLD_MARKER) => {
                let (world_id, instance) = s.split_once(':').unwrap_or((s, ""));
                Location::Instance {
                    world_id: world_id.to_string(),
                    instance: instance.to_string(),
                }
            }
            s => Location::Unknown(s.to_string()),
        }
    }

    pub fn world_id(&self) -> Option<&str> {
        match self {
            Location::Instance { world_id, .. } => Some(world_id),
            _ => None,
        }
    }
}

/// World id referenced by a raw location string, if it names one.
pub fn world_id(location: &str) -> Option<&str> {
    if !location.contains(WORLD_MARKER) {
        return None;
    }

    location.split(':').next()
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Offline => write!(f, "{}", OFFLINE),
            Location::Private => write!(f, "private"),
            Location::Traveling => write!(f, "traveling"),
            Location::Instance { world_id, instance } if instance.is_empty() => write!(f, "{}", world_id),
            Location::Instance { world_id, instance } => write!(f, "{}:{}", world_id, instance),
            Location::Unknown(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_location() {
        let loc = Location::parse("wrld_abc123:12345~private(usr_x)");
        assert_eq!(loc.world_id(), Some("wrld_abc123"));
        assert_eq!(loc, Location::Instance {
            world_id: "wrld_abc123".into(),
            instance: "12345~private(usr_x)".into(),
        });
        assert_eq!(loc.to_string(), "wrld_abc123:12345~private(usr_x)");
    }

    #[test]
    fn special_locations() {
        assert_eq!(Location::parse("offline"), Location::Offline);
        assert_eq!(Location::parse("private"), Location::Private);
        assert_eq!(Location::parse("traveling"), Location::Traveling);
        assert_eq!(Location::parse("somewhere"), Location::Unknown("somewhere".into()));
        assert_eq!(Location::parse("private").world_id(), None);
    }

    #[test]
    fn raw_world_id() {
        assert_eq!(world_id("wrld_abc123:12345"), Some("wrld_abc123"));
        assert_eq!(world_id("wrld_abc123"), Some("wrld_abc123"));
        assert_eq!(world_id("offline"), None);
        assert_eq!(world_id("private"), None);
    }
}
