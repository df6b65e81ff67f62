use std::sync::Arc;

use lazy_static::lazy_static;
use log::debug;
use parking_lot::RwLock;

use crate::types::{location::OFFLINE, user::LimitedUser};

lazy_static! {
    /// Process-wide registry the binary publishes into.
    pub static ref FRIENDS: Arc<FriendRegistry> = Arc::new(FriendRegistry::default());
}

/// The user's friend list, replaced wholesale by the cache and patched by pipeline events.
#[derive(Debug, Default)]
pub struct FriendRegistry {
    friends: RwLock<Vec<LimitedUser>>,
}

impl FriendRegistry {
    pub fn set_friends(&self, friends: Vec<LimitedUser>) {
        debug!("friend registry now holds {} friends", friends.len());
        *self.friends.write() = friends;
    }

    pub fn friends(&self) -> Vec<LimitedUser> {
        self.friends.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<LimitedUser> {
        self.friends.read()
            .iter()
            .find(|f| f.id == id)
            .cloned()
    }

    /// Returns false if no friend has that id.
    pub fn update_location(&self, id: &str, location: &str) -> bool {
        let mut friends = self.friends.write();
        match friends.iter_mut().find(|f| f.id == id) {
            Some(friend) => {
                friend.location = location.to_string();
                true
            }
            None => false,
        }
    }

    pub fn sorted(&self) -> Vec<LimitedUser> {
        let mut friends = self.friends();
        sort_for_display(&mut friends);
        friends
    }

    pub fn len(&self) -> usize {
        self.friends.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.friends.read().is_empty()
    }
}

/// Moves offline friends to the bottom, keeping the order within each group.
pub fn sort_for_display(friends: &mut [LimitedUser]) {
    friends.sort_by_key(|f| f.location == OFFLINE);
}
