//! Traits and types for objects that can be loaded from the database by id
use crate::{Database, Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{
    Decode, Sqlite, Type,
    error::BoxDynError,
    sqlite::{SqliteQueryResult, SqliteTypeInfo, SqliteValueRef},
};
use std::fmt::{Debug, Display};

/// A type that can be used as the database id of a [Loadable] object
pub trait Indexable: Copy + PartialEq + Send + Sync + Debug + Display {
    /// A value that indicates the object has not been stored in the database yet
    fn invalid_value() -> Self;
}

impl Indexable for i64 {
    fn invalid_value() -> Self {
        -1
    }
}

/// An object that is stored in the database and can be loaded or deleted by its id
#[async_trait]
pub trait Loadable: Sized + Send {
    type Id: Indexable;

    fn invalid_id() -> Self::Id {
        Self::Id::invalid_value()
    }

    fn id(&self) -> Self::Id;

    fn set_id(&mut self, id: Self::Id);

    /// Load the object with the given id from the database
    async fn load(id: Self::Id, db: &Database) -> Result<Self>;

    /// Delete the object with the given id from the database
    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult>;

    /// Delete this object from the database. After a successful deletion, the
    /// object's id is reset to an invalid value.
    async fn delete(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        let id = self.id();
        if id == Self::invalid_id() {
            return Err(Error::InvalidStateMissingAttribute("id".to_string()));
        }
        let res = Self::delete_id(&id, db).await?;
        self.set_id(Self::invalid_id());
        Ok(res)
    }
}

/// A reference to another database object. It either holds just the id of the
/// object (e.g. when read from a foreign key column) or the full object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, bound(serialize = "T: Serialize, T::Id: Serialize"))]
pub enum ExternalRef<T: Loadable> {
    Stub(T::Id),
    Object(T),
}

impl<T: Loadable> ExternalRef<T> {
    /// The database id of the referenced object
    pub fn id(&self) -> T::Id {
        match self {
            ExternalRef::Stub(id) => *id,
            ExternalRef::Object(obj) => obj.id(),
        }
    }

    /// Returns a reference to the full object, or an error if only the id is known
    pub fn object(&self) -> Result<&T> {
        match self {
            ExternalRef::Stub(_) => Err(Error::InvalidStateMissingAttribute(
                "referenced object is not loaded".to_string(),
            )),
            ExternalRef::Object(obj) => Ok(obj),
        }
    }

    /// Load the full object from the database if only the id is known
    pub async fn load(&mut self, db: &Database) -> Result<&T> {
        if let ExternalRef::Stub(id) = self {
            *self = ExternalRef::Object(T::load(*id, db).await?);
        }
        self.object()
    }
}

impl<T> Type<Sqlite> for ExternalRef<T>
where
    T: Loadable,
    T::Id: Type<Sqlite>,
{
    fn type_info() -> SqliteTypeInfo {
        <T::Id as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <T::Id as Type<Sqlite>>::compatible(ty)
    }
}

impl<'r, T> Decode<'r, Sqlite> for ExternalRef<T>
where
    T: Loadable,
    T::Id: Decode<'r, Sqlite>,
{
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        Ok(ExternalRef::Stub(<T::Id as Decode<Sqlite>>::decode(value)?))
    }
}
