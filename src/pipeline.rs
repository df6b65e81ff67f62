use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use log::{debug, info, trace, warn};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tokio_tungstenite::tungstenite::{
    client::IntoClientRequest,
    http::{header::USER_AGENT, HeaderValue},
    Message as WsMessage,
};

use crate::{
    cache::SessionCache,
    friends::FriendRegistry,
    types::{config::Config, location::OFFLINE, world::World},
};

#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    FriendLocation(LocationChange),
    FriendOnline(LocationChange),
    FriendOffline(FriendOffline),
    UserLocation(LocationChange),
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationChange {
    pub user_id: String,
    pub location: String,
    pub instance: String,
    pub world_id: String,
    pub world: Option<World>,
}

impl LocationChange {
    fn resolved_world(self) -> Option<World> {
        self.world.filter(|world| !world.id.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FriendOffline {
    pub user_id: String,
}

impl PipelineEvent {
    pub fn decode(text: &str) -> Result<Self> {
        let frame: Frame = serde_json::from_str(text).context("invalid frame")?;

        let event = match frame.kind.as_str() {
            "friend-location" => PipelineEvent::FriendLocation(content(frame.content)?),
            "friend-online" => PipelineEvent::FriendOnline(content(frame.content)?),
            "friend-offline" => PipelineEvent::FriendOffline(content(frame.content)?),
            "user-location" => PipelineEvent::UserLocation(content(frame.content)?),
            _ => PipelineEvent::Other(frame.kind),
        };

        Ok(event)
    }
}

// content usually arrives as a json document encoded in a string
fn content<T: DeserializeOwned>(value: Value) -> Result<T> {
    match value {
        Value::String(s) => serde_json::from_str(&s).context("invalid event content"),
        other => serde_json::from_value(other).context("invalid event content"),
    }
}

pub fn apply(cache: &SessionCache, registry: &FriendRegistry, event: PipelineEvent) {
    match event {
        PipelineEvent::FriendLocation(change) | PipelineEvent::FriendOnline(change) => {
            if !registry.update_location(&change.user_id, &change.location) {
                debug!("location change for unknown friend {}", change.user_id);
            }

            if let Some(world) = change.resolved_world() {
                cache.add_world(world.id, world.name);
            }
        }
        PipelineEvent::FriendOffline(offline) => {
            registry.update_location(&offline.user_id, OFFLINE);
        }
        PipelineEvent::UserLocation(change) => {
            if let Some(world) = change.resolved_world() {
                cache.add_world(world.id.clone(), world.name.clone());
                cache.add_recent(world);
            }
        }
        PipelineEvent::Other(kind) => trace!("ignoring pipeline event {}", kind),
    }
}

/// Follows the presence pipeline until the server closes the socket.
pub async fn run(config: &Config, cache: Arc<SessionCache>, registry: Arc<FriendRegistry>) -> Result<()> {
    let mut url = config.pipeline.url.clone();
    url.query_pairs_mut()
        .append_pair("authToken", config.api.auth_token.as_inner());

    let mut request = url.as_str()
        .into_client_request()
        .context("invalid pipeline url")?;
    request.headers_mut().insert(
        USER_AGENT,
        HeaderValue::from_str(&config.api.user_agent).context("invalid user agent")?,
    );

    let (mut conn, _) = tokio_tungstenite::connect_async(request)
        .await
        .context("could not connect to pipeline")?;
    info!("connected to pipeline");

    while let Some(msg) = conn.next().await {
        match msg.context("pipeline connection failed")? {
            WsMessage::Text(text) => match PipelineEvent::decode(&text) {
                Ok(event) => {
                    trace!("{:?}", event);
                    apply(&cache, &registry, event);
                }
                Err(e) => warn!("skipping pipeline message: {:?}", e),
            },
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    info!("pipeline closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use crate::api::MockApi;
    use crate::cache::CacheListener;
    use crate::types::user::LimitedUser;

    use super::*;

    #[derive(Default)]
    struct Visits(Mutex<Vec<usize>>);

    impl CacheListener for Visits {
        fn updated_last_visited(&self, worlds: &[World]) {
            self.0.lock().push(worlds.len());
        }

        fn initial_cache_created(&self) {}
    }

    fn setup() -> (SessionCache, Arc<FriendRegistry>) {
        let registry = Arc::new(FriendRegistry::default());
        registry.set_friends(vec![LimitedUser {
            id: "usr_a".into(),
            location: "offline".into(),
            ..Default::default()
        }]);

        let cache = SessionCache::new(Arc::new(MockApi::new()), Arc::clone(&registry), 50);
        (cache, registry)
    }

    #[test]
    fn decodes_string_encoded_content() {
        let text = r#"{"type":"friend-location","content":"{\"userId\":\"usr_a\",\"location\":\"wrld_x:1\",\"world\":{\"id\":\"wrld_x\",\"name\":\"X\"}}"}"#;
        let event = PipelineEvent::decode(text).unwrap();

        match event {
            PipelineEvent::FriendLocation(change) => {
                assert_eq!(change.user_id, "usr_a");
                assert_eq!(change.location, "wrld_x:1");
                assert_eq!(change.world.map(|w| w.name), Some("X".to_string()));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn decodes_object_content_and_unknown_types() {
        let event = PipelineEvent::decode(r#"{"type":"friend-offline","content":{"userId":"usr_a"}}"#).unwrap();
        assert_eq!(event, PipelineEvent::FriendOffline(FriendOffline { user_id: "usr_a".into() }));

        let event = PipelineEvent::decode(r#"{"type":"notification","content":"{}"}"#).unwrap();
        assert_eq!(event, PipelineEvent::Other("notification".into()));

        assert!(PipelineEvent::decode("not json").is_err());
        assert!(PipelineEvent::decode(r#"{"type":"friend-online","content":"42"}"#).is_err());
    }

    #[test]
    fn friend_location_updates_registry_and_world_names() {
        let (cache, registry) = setup();

        apply(&cache, &registry, PipelineEvent::FriendLocation(LocationChange {
            user_id: "usr_a".into(),
            location: "wrld_x:1".into(),
            world: Some(World {
                id: "wrld_x".into(),
                name: "X".into(),
                ..Default::default()
            }),
            ..Default::default()
        }));

        assert_eq!(registry.get("usr_a").map(|f| f.location), Some("wrld_x:1".to_string()));
        assert_eq!(cache.get_world("wrld_x"), "X");

        apply(&cache, &registry, PipelineEvent::FriendOffline(FriendOffline { user_id: "usr_a".into() }));
        assert_eq!(registry.get("usr_a").map(|f| f.location), Some("offline".to_string()));
    }

    #[test]
    fn user_location_appends_recent_world() {
        let (cache, registry) = setup();
        let visits = Arc::new(Visits::default());
        cache.set_cache_listener(visits.clone());

        let change = LocationChange {
            location: "wrld_y:2".into(),
            world: Some(World {
                id: "wrld_y".into(),
                name: "Y".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        apply(&cache, &registry, PipelineEvent::UserLocation(change.clone()));
        apply(&cache, &registry, PipelineEvent::UserLocation(change));

        // without a world object there is nothing to record
        apply(&cache, &registry, PipelineEvent::UserLocation(LocationChange {
            location: "traveling".into(),
            ..Default::default()
        }));

        assert_eq!(cache.get_world("wrld_y"), "Y");
        assert_eq!(*visits.0.lock(), [1, 2]);
    }
}
