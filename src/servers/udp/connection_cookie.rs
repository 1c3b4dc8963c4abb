//! Logic for generating and verifying connection IDs.
//!
//! The UDP tracker requires the client to connect to the server before it
//! can send announce or scrape requests. The server responds with a 64-bit
//! connection ID that the client must present in every subsequent request,
//! which thwarts source-address spoofing by off-path attackers.
//!
//! The simplest implementation would generate a random number per client and
//! store it in a hash table, but that costs memory proportional to the
//! number of clients. Instead the ID is derived from the client's source
//! address with a keyed hash, so it can be verified without storing it:
//!
//! ```text
//! connection ID = keyed_hash(secret key, client address, key slot)
//! ```
//!
//! The keyring holds a current and a previous 32-byte secret. Rotation (once
//! per [`KEY_ROTATION_INTERVAL`]) promotes current to previous and draws a
//! fresh current key, so an ID issued just before a rotation stays valid
//! across exactly one rotation boundary. Validation recomputes the expected
//! value under both keys, loaded together under one lock so a rotation is
//! observed atomically.
use std::net::SocketAddr;
use std::panic::Location;
use std::sync::RwLock;
use std::time::Duration;

use rand::rngs::ThreadRng;
use rand::Rng;

use super::error::Error;
use super::protocol::ConnectionId;
use crate::shared::clock::Time;
use crate::shared::crypto::ephemeral_instance_keys::Seed;
use crate::CurrentClock;

/// How often the current key is rotated.
pub const KEY_ROTATION_INTERVAL: Duration = Duration::from_secs(3600);

pub type Cookie = [u8; 8];

/// Converts a connection ID into a connection cookie.
#[must_use]
pub fn from_connection_id(connection_id: &ConnectionId) -> Cookie {
    connection_id.0.to_be_bytes()
}

/// Converts a connection cookie into a connection ID.
#[must_use]
pub fn into_connection_id(connection_cookie: &Cookie) -> ConnectionId {
    ConnectionId(i64::from_be_bytes(*connection_cookie))
}

#[derive(Clone, Copy, Debug)]
struct KeyEntry {
    key: Seed,
    /// The rotation slot the key became current in: the timestamp truncated
    /// to the rotation interval. It is mixed into the derivation so cookies
    /// from different key generations never collide.
    slot: u64,
}

impl KeyEntry {
    fn fresh() -> Self {
        Self {
            key: Rng::gen(&mut ThreadRng::default()),
            slot: current_slot(),
        }
    }
}

fn current_slot() -> u64 {
    CurrentClock::now().as_secs() / KEY_ROTATION_INTERVAL.as_secs()
}

/// The keyring used to issue and validate connection cookies.
pub struct Keyring {
    /// `(current, previous)`, always loaded as a pair.
    keys: RwLock<(KeyEntry, KeyEntry)>,
}

impl Default for Keyring {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyring {
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: RwLock::new((KeyEntry::fresh(), KeyEntry::fresh())),
        }
    }

    /// Generates a new connection cookie bound to the client's source
    /// address under the current key.
    #[must_use]
    pub fn make(&self, remote_address: &SocketAddr) -> Cookie {
        let (current, _previous) = *self.keys.read().expect("the keyring lock should not be poisoned");

        cookie_builder::build(&current.key, remote_address, current.slot)
    }

    /// Checks if the supplied `connection_cookie` is valid for the client's
    /// source address, under the current or the previous key.
    ///
    /// # Errors
    ///
    /// Will return an `Error::InvalidConnectionId` ("bad connection") if the
    /// cookie fails to verify under both keys.
    pub fn check(&self, remote_address: &SocketAddr, connection_cookie: &Cookie) -> Result<(), Error> {
        let (current, previous) = *self.keys.read().expect("the keyring lock should not be poisoned");

        for entry in [current, previous] {
            if cookie_builder::build(&entry.key, remote_address, entry.slot) == *connection_cookie {
                return Ok(());
            }
        }

        Err(Error::InvalidConnectionId {
            location: Location::caller(),
        })
    }

    /// Promotes the current key to previous and draws a fresh current key.
    ///
    /// Cookies issued under the old current key keep validating until the
    /// next rotation.
    pub fn rotate(&self) {
        let mut keys = self.keys.write().expect("the keyring lock should not be poisoned");

        keys.1 = keys.0;
        keys.0 = KeyEntry::fresh();
    }
}

mod cookie_builder {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::net::SocketAddr;

    use super::Cookie;
    use crate::shared::crypto::ephemeral_instance_keys::Seed;

    pub(super) fn build(key: &Seed, remote_address: &SocketAddr, slot: u64) -> Cookie {
        let mut hasher = DefaultHasher::new();

        key.hash(&mut hasher);
        remote_address.hash(&mut hasher);
        slot.hash(&mut hasher);

        hasher.finish().to_le_bytes()
    }
}
