use serde::Deserialize;
use serde::Serialize;
use std::marker::PhantomData;
use uuid::Uuid;

/// Phantom-typed entity identifier.
/// A fresh `ID<T>` (via `Default`) is a time-ordered uuid v7, so ids sort
/// by creation time. The marker type prevents crossing a session id with a
/// participant id at compile time; `cast` exists for the rare boundary
/// where the same uuid addresses two views of one entity.
pub struct ID<T: ?Sized> {
    uuid: Uuid,
    marker: PhantomData<fn() -> T>,
}

/// Trait for records addressed by a typed id.
pub trait Unique {
    fn id(&self) -> ID<Self>;
}

impl<T: ?Sized> ID<T> {
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
    pub fn cast<U: ?Sized>(self) -> ID<U> {
        ID {
            uuid: self.uuid,
            marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Default for ID<T> {
    fn default() -> Self {
        Self {
            uuid: Uuid::now_v7(),
            marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: ?Sized> Copy for ID<T> {}

impl<T: ?Sized> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}
impl<T: ?Sized> Eq for ID<T> {}

impl<T: ?Sized> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: ?Sized> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.uuid.cmp(&other.uuid)
    }
}

impl<T: ?Sized> std::hash::Hash for ID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl<T: ?Sized> std::fmt::Debug for ID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl<T: ?Sized> std::fmt::Display for ID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl<T: ?Sized> From<Uuid> for ID<T> {
    fn from(uuid: Uuid) -> Self {
        Self {
            uuid,
            marker: PhantomData,
        }
    }
}

impl<T: ?Sized> std::str::FromStr for ID<T> {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self::from)
    }
}

impl<T: ?Sized> Serialize for ID<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.uuid.serialize(serializer)
    }
}

impl<'de, T: ?Sized> Deserialize<'de> for ID<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    struct Marker;
    #[test]
    fn fresh_ids_are_distinct() {
        let a = ID::<Marker>::default();
        let b = ID::<Marker>::default();
        assert_ne!(a, b);
    }
    #[test]
    fn ids_order_by_creation() {
        let a = ID::<Marker>::default();
        let b = ID::<Marker>::default();
        assert!(a < b);
    }
    #[test]
    fn round_trips_through_string() {
        let a = ID::<Marker>::default();
        let b: ID<Marker> = a.to_string().parse().unwrap();
        assert_eq!(a, b);
    }
    #[test]
    fn serializes_as_bare_uuid() {
        let a = ID::<Marker>::default();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{}\"", a));
    }
}
