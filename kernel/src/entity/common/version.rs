use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::marker::PhantomData;

/// Monotone per-document revision.
///
/// A conditional write commits only while the stored revision still equals
/// the one the caller's validation read observed; the store bumps it on
/// every committed write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentVersion<T>(i64, PhantomData<T>);

impl<T> DocumentVersion<T> {
    pub fn new(version: i64) -> Self {
        Self(version, PhantomData)
    }

    /// Revision a fresh document starts at.
    pub fn initial() -> Self {
        Self::new(0)
    }

    pub fn next(&self) -> Self {
        Self::new(self.0 + 1)
    }
}

impl<T> From<i64> for DocumentVersion<T> {
    fn from(version: i64) -> Self {
        Self::new(version)
    }
}

impl<T> From<DocumentVersion<T>> for i64 {
    fn from(version: DocumentVersion<T>) -> Self {
        version.0
    }
}

impl<T> AsRef<i64> for DocumentVersion<T> {
    fn as_ref(&self) -> &i64 {
        &self.0
    }
}

impl<T> Serialize for DocumentVersion<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for DocumentVersion<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <i64>::deserialize(deserializer).map(Self::new)
    }
}
