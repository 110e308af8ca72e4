//! Key encoding utilities for `RocksDB`.
//!
//! Primary records are keyed by the 16 bytes of their UUID. Index entries
//! concatenate an owner ID with a row ID so that a prefix scan over the
//! owner yields every row it owns.

use dairylink_core::{ProfileId, Role};

/// Length of every encoded identifier.
pub const ID_LEN: usize = 16;

/// Encode a primary record key (just the ID bytes).
#[must_use]
pub fn record_key(id: &[u8; ID_LEN]) -> Vec<u8> {
    id.to_vec()
}

/// Encode an index key: `owner || row`.
#[must_use]
pub fn pair_key(owner: &[u8; ID_LEN], row: &[u8; ID_LEN]) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN * 2);
    key.extend_from_slice(owner);
    key.extend_from_slice(row);
    key
}

/// Encode an owner prefix for scanning an index.
#[must_use]
pub fn owner_prefix(owner: &[u8; ID_LEN]) -> Vec<u8> {
    owner.to_vec()
}

/// Extract the row ID from an `owner || row` index key.
///
/// Returns `None` if the key is too short.
#[must_use]
pub fn extract_row_id(key: &[u8]) -> Option<[u8; ID_LEN]> {
    key.get(ID_LEN..ID_LEN * 2)?.try_into().ok()
}

/// Encode a role-profile index key: `role || profile_id`.
#[must_use]
pub fn role_profile_key(role: Role, profile_id: &ProfileId) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + ID_LEN);
    key.push(role.as_u8());
    key.extend_from_slice(profile_id.as_bytes());
    key
}

/// Encode a role prefix for scanning all profiles with a role.
#[must_use]
pub fn role_prefix(role: Role) -> Vec<u8> {
    vec![role.as_u8()]
}

/// Extract the profile ID from a `role || profile_id` key.
#[must_use]
pub fn extract_profile_id_from_role_key(key: &[u8]) -> Option<ProfileId> {
    let bytes: [u8; ID_LEN] = key.get(1..=ID_LEN)?.try_into().ok()?;
    Some(ProfileId::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dairylink_core::CollectionId;

    #[test]
    fn pair_key_roundtrip() {
        let farmer = ProfileId::generate();
        let collection = CollectionId::generate();

        let key = pair_key(farmer.as_bytes(), collection.as_bytes());
        assert_eq!(key.len(), 32);
        assert!(key.starts_with(&owner_prefix(farmer.as_bytes())));

        let extracted = extract_row_id(&key).map(CollectionId::from_bytes);
        assert_eq!(extracted, Some(collection));
    }

    #[test]
    fn short_key_has_no_row() {
        assert!(extract_row_id(&[1u8; 20]).is_none());
    }

    #[test]
    fn role_key_roundtrip() {
        let profile = ProfileId::generate();
        let key = role_profile_key(Role::Agent, &profile);
        assert!(key.starts_with(&role_prefix(Role::Agent)));
        assert!(!key.starts_with(&role_prefix(Role::Farmer)));
        assert_eq!(extract_profile_id_from_role_key(&key), Some(profile));
    }
}
