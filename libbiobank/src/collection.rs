//! Objects relating to collections. A Collection groups donor samples under a
//! single disease term and is owned by the user who created it.
use crate::{
    Database,
    core::{
        error::{Error, Result},
        loadable::{ExternalRef, Loadable},
        query::{Cmp, DynFilterPart, FilterPart, push_cmp},
    },
    sample::{self, Sample},
    user::User,
};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{
    FromRow, QueryBuilder, Row, Sqlite,
    sqlite::{SqliteQueryResult, SqliteRow},
};
use tracing::debug;

/// A type for specifying fields that can be used for filtering a database query
/// for collections
#[derive(Clone)]
pub enum Filter {
    /// Match the ID of the collection to the given value
    Id(i64),

    /// Match the id of the user who owns the collection
    User(i64),

    /// Compare the disease term of the collection to the given value
    DiseaseTerm(Cmp, String),

    /// Compare the title of the collection to the given value
    Title(Cmp, String),
}

impl FilterPart for Filter {
    fn add_to_query(&self, builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>) {
        match self {
            Self::Id(id) => _ = builder.push(" C.collectionid = ").push_bind(*id),
            Self::User(id) => _ = builder.push(" C.userid = ").push_bind(*id),
            Self::DiseaseTerm(cmp, frag) => {
                builder.push(" C.disease_term ");
                push_cmp(builder, cmp, frag);
            }
            Self::Title(cmp, frag) => {
                builder.push(" C.title ");
                push_cmp(builder, cmp, frag);
            }
        }
    }
}

/// A group of donor samples associated with a disease term
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Collection {
    /// A unique ID that identifies this collection in the database
    pub id: i64,

    /// The disease term that this collection is organized around
    pub disease_term: String,

    /// A short human-readable title
    pub title: String,

    /// The user who owns this collection
    pub user: ExternalRef<User>,

    /// The number of samples in this collection at the time it was loaded
    pub nsamples: i64,

    /// The samples in this collection. This is only populated after calling
    /// [Collection::load_samples()]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<Sample>,
}

impl FromRow<'_, SqliteRow> for Collection {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("collectionid")?,
            disease_term: row.try_get("disease_term")?,
            title: row.try_get("title")?,
            user: ExternalRef::Object(User::from_row(row)?),
            nsamples: row.try_get("nsamples")?,
            samples: Default::default(),
        })
    }
}

#[async_trait]
impl Loadable for Collection {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.id = id
    }

    async fn load(id: Self::Id, db: &Database) -> Result<Self> {
        Self::build_query(Some(Filter::Id(id).into()))
            .build_query_as()
            .fetch_one(db.pool())
            .await
            .map_err(|e| e.into())
    }

    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult> {
        // samples are removed by the ON DELETE CASCADE foreign key
        sqlx::query("DELETE FROM bb_collections WHERE collectionid=?")
            .bind(id)
            .execute(db.pool())
            .await
            .map_err(|e| e.into())
    }
}

impl Collection {
    /// Create a new collection owned by the given user. The collection is not
    /// stored until [Collection::insert()] is called.
    pub fn new(disease_term: String, title: String, userid: i64) -> Self {
        Self {
            id: Self::invalid_id(),
            disease_term,
            title,
            user: ExternalRef::Stub(userid),
            nsamples: 0,
            samples: Default::default(),
        }
    }

    fn build_query(filter: Option<DynFilterPart>) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(
            r#"SELECT C.collectionid, C.disease_term, C.title, C.userid, U.username,
            (SELECT COUNT(*) FROM bb_samples S WHERE S.collectionid=C.collectionid) AS nsamples
            FROM bb_collections C INNER JOIN bb_users U ON U.userid=C.userid"#,
        );
        if let Some(f) = filter {
            builder.push(" WHERE ");
            f.add_to_query(&mut builder);
        }
        builder.push(" ORDER BY C.collectionid ASC");
        builder
    }

    fn build_count(filter: Option<DynFilterPart>) -> QueryBuilder<'static, Sqlite> {
        let mut builder =
            QueryBuilder::new("SELECT COUNT(*) AS ncollections FROM bb_collections C");
        if let Some(f) = filter {
            builder.push(" WHERE ");
            f.add_to_query(&mut builder);
        }
        builder
    }

    /// Loads all matching collections from the database
    pub async fn load_all(filter: Option<DynFilterPart>, db: &Database) -> Result<Vec<Self>> {
        Self::build_query(filter)
            .build_query_as()
            .fetch_all(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Counts the matching collections in the database
    pub async fn count(filter: Option<DynFilterPart>, db: &Database) -> Result<i64> {
        Self::build_count(filter)
            .build()
            .fetch_one(db.pool())
            .await?
            .try_get("ncollections")
            .map_err(|e| e.into())
    }

    /// Loads all samples that belong to this collection into [Collection::samples]
    pub async fn load_samples(&mut self, db: &Database) -> Result<()> {
        self.samples = Sample::load_all(Some(sample::Filter::Collection(self.id).into()), db).await?;
        self.nsamples = self.samples.len() as i64;
        Ok(())
    }

    /// Add this collection to the database. If this call completes successfully,
    /// the id of this object will be updated to the ID of the inserted row in the
    /// database
    pub async fn insert(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id != Self::invalid_id() {
            return Err(Error::InvalidInsertObjectAlreadyExists(self.id));
        }
        debug!(?self, "Inserting collection into database");
        sqlx::query("INSERT INTO bb_collections (disease_term, title, userid) VALUES (?, ?, ?)")
            .bind(&self.disease_term)
            .bind(&self.title)
            .bind(self.user.id())
            .execute(db.pool())
            .await
            .map(|r| {
                self.id = r.last_insert_rowid();
                r
            })
            .map_err(|e| e.into())
    }

    /// Update the disease term and title of this collection in the database. The
    /// owner of a collection never changes.
    pub async fn update(&self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id == Self::invalid_id() {
            return Err(Error::InvalidUpdateObjectNotFound);
        }
        debug!(?self, "Updating collection in database");
        sqlx::query("UPDATE bb_collections SET disease_term=?, title=? WHERE collectionid=?")
            .bind(&self.disease_term)
            .bind(&self.title)
            .bind(self.id)
            .execute(db.pool())
            .await
            .map_err(|e| e.into())
    }
}
