use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::{Context, Result};
use log::{debug, error, info, trace, warn};
use parking_lot::RwLock;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
};

use crate::{
    api::Api,
    friends::FriendRegistry,
    types::{
        favorite::FavoriteKind,
        location,
        user::{LimitedUser, User},
        world::World,
    },
};

/// Returned by [`SessionCache::get_world`] for ids that were never resolved.
pub const UNKNOWN_WORLD: &str = "Unknown world";

/// Receives cache change notifications. Called synchronously on the task that made the change.
pub trait CacheListener: Send + Sync {
    fn updated_last_visited(&self, worlds: &[World]);

    fn initial_cache_created(&self);
}

/// Profile, world names and recently visited worlds for the logged-in session.
///
/// The world map and recent list only ever grow. Locks are never held across
/// an await point or while the listener runs.
pub struct SessionCache {
    api: Arc<dyn Api>,
    registry: Arc<FriendRegistry>,
    page_size: u32,
    profile: RwLock<Option<User>>,
    worlds: RwLock<HashMap<String, String>>,
    recent: RwLock<Vec<World>>,
    recent_fetch: Mutex<()>,
    listener: RwLock<Option<Arc<dyn CacheListener>>>,
}

impl SessionCache {
    pub fn new(api: Arc<dyn Api>, registry: Arc<FriendRegistry>, page_size: u32) -> Self {
        Self {
            api,
            registry,
            // a zero page size would never advance the offset
            page_size: page_size.max(1),
            profile: Default::default(),
            worlds: Default::default(),
            recent: Default::default(),
            recent_fetch: Mutex::new(()),
            listener: Default::default(),
        }
    }

    /// Runs [`bootstrap`](Self::bootstrap) on a new task, logging any failure.
    ///
    /// Abort the handle to cancel; call again to retry.
    pub fn spawn_bootstrap(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::task::spawn(async move {
            match cache.bootstrap().await {
                Ok(()) => info!("initial cache created"),
                Err(e) => error!("could not create initial cache: {:?}", e),
            }
        })
    }

    /// Fetches the profile, all friends and the worlds they are in, then
    /// publishes the friends to the registry and signals the listener.
    ///
    /// Any failure aborts before the registry is touched.
    pub async fn bootstrap(&self) -> Result<()> {
        let profile = self.api.get_self()
            .await
            .context("could not fetch own profile")?;
        self.set_profile(Some(profile));

        let favorites: HashSet<String> = self.api.get_favorites(FavoriteKind::Friend)
            .await
            .context("could not fetch favorite friends")?
            .unwrap_or_default()
            .into_iter()
            .map(|fav| fav.favorite_id)
            .collect();
        debug!("{} favorite friends", favorites.len());

        let mut friends = self.fetch_friends(false, &favorites).await?;
        let offline = self.fetch_friends(true, &favorites).await?;
        debug!("fetched {} online and {} offline friends", friends.len(), offline.len());
        friends.extend(offline);

        self.registry.set_friends(friends);

        if let Some(listener) = self.listener() {
            listener.initial_cache_created();
        }

        Ok(())
    }

    async fn fetch_friends(&self, offline: bool, favorites: &HashSet<String>) -> Result<Vec<LimitedUser>> {
        let mut friends = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.api.get_friends(offline, self.page_size, offset)
                .await
                .with_context(|| format!("could not fetch friends (offline: {}, offset: {})", offline, offset))?;

            let page = match page {
                Some(page) if !page.is_empty() => page,
                _ => break,
            };
            trace!("friends page at offset {} has {} entries", offset, page.len());

            for mut friend in page {
                if favorites.contains(&friend.id) {
                    friend.is_favorite = true;
                }

                if let Some(world_id) = location::world_id(&friend.location) {
                    let world = self.api.get_world(world_id)
                        .await
                        .with_context(|| format!("could not fetch world {}", world_id))?;
                    self.add_world(world.id, world.name);
                }

                friends.push(friend);
            }

            offset = match offset.checked_add(self.page_size) {
                Some(next) => next,
                None => {
                    warn!("friend list never ended, stopping at offset {}", offset);
                    break;
                }
            };
        }

        Ok(friends)
    }

    /// Replaces any previously registered listener.
    pub fn set_cache_listener(&self, listener: Arc<dyn CacheListener>) {
        *self.listener.write() = Some(listener);
    }

    fn listener(&self) -> Option<Arc<dyn CacheListener>> {
        self.listener.read().clone()
    }

    /// Cached name for a world id, or [`UNKNOWN_WORLD`]. Never fetches.
    pub fn get_world(&self, id: &str) -> String {
        self.world_name(id).unwrap_or_else(|| UNKNOWN_WORLD.to_string())
    }

    pub fn world_name(&self, id: &str) -> Option<String> {
        self.worlds.read().get(id).cloned()
    }

    pub fn add_world(&self, id: impl Into<String>, name: impl Into<String>) {
        self.worlds.write().insert(id.into(), name.into());
    }

    pub fn profile(&self) -> Option<User> {
        self.profile.read().clone()
    }

    pub fn set_profile(&self, profile: Option<User>) {
        *self.profile.write() = profile;
    }

    /// Recently visited worlds, fetched from the api while the list is still empty.
    pub async fn get_recent(&self) -> Result<Vec<World>> {
        let _fetching = self.recent_fetch.lock().await;

        let empty = self.recent.read().is_empty();
        if empty {
            let fetched = self.api.get_recent_worlds()
                .await
                .context("could not fetch recent worlds")?;

            if let Some(worlds) = fetched {
                self.recent.write().extend(worlds);
            }
        }

        Ok(self.recent.read().clone())
    }

    pub fn add_recent(&self, world: World) {
        let recent = {
            let mut recent = self.recent.write();
            recent.push(world);
            recent.clone()
        };

        if let Some(listener) = self.listener() {
            listener.updated_last_visited(&recent);
        }
    }
}
