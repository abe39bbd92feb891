// ABOUTME: Entity and model codec traits shared by every repository backend.
// ABOUTME: A codec maps a domain entity to its flat, serializable model and back.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A domain object identified by a unique string id.
pub trait Entity {
    fn id(&self) -> &str;
}

/// Converts entities of one type to and from their persisted model.
///
/// Both directions are total over the fields the pair declares. Malformed
/// persisted data is rejected earlier, when the model itself is decoded.
pub trait ModelCodec {
    type Entity: Entity;
    type Model: Serialize + DeserializeOwned;

    fn to_model(&self, entity: &Self::Entity) -> Self::Model;

    fn from_model(&self, model: Self::Model) -> Self::Entity;
}

/// Codec for entities that serialize as their own model.
pub struct IdentityCodec<T> {
    _entity: PhantomData<fn() -> T>,
}

impl<T> IdentityCodec<T> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<T> Default for IdentityCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for IdentityCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> ModelCodec for IdentityCodec<T>
where
    T: Entity + Clone + Serialize + DeserializeOwned,
{
    type Entity = T;
    type Model = T;

    fn to_model(&self, entity: &T) -> T {
        entity.clone()
    }

    fn from_model(&self, model: T) -> T {
        model
    }
}
