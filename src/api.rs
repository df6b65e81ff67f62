use anyhow::Result;
use async_trait::async_trait;

use crate::types::{
    favorite::{Favorite, FavoriteKind},
    user::{LimitedUser, User},
    world::World,
};

pub mod http;

/// The slice of the remote web api the cache and console consume.
///
/// Paginated calls return `None` once there is nothing left to fetch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Api: Send + Sync {
    async fn get_self(&self) -> Result<User>;

    async fn get_friends(&self, offline: bool, n: u32, offset: u32) -> Result<Option<Vec<LimitedUser>>>;

    async fn get_favorites(&self, kind: FavoriteKind) -> Result<Option<Vec<Favorite>>>;

    async fn get_world(&self, id: &str) -> Result<World>;

    async fn get_recent_worlds(&self) -> Result<Option<Vec<World>>>;
}
