//! Objects relating to donor samples stored within a collection
use crate::{
    Database,
    collection::Collection,
    core::{
        error::{Error, Result},
        loadable::{ExternalRef, Loadable},
        query::{Cmp, DynFilterPart, FilterPart, push_cmp},
    },
    user::User,
};
use async_trait::async_trait;
use serde::{Serialize, Serializer};
use sqlx::{
    FromRow, QueryBuilder, Row, Sqlite,
    sqlite::{SqliteQueryResult, SqliteRow},
};
use time::Date;
use tracing::debug;

/// A type for specifying fields that can be used for filtering a database query
/// for samples
#[derive(Clone)]
pub enum Filter {
    Id(i64),
    Collection(i64),
    User(i64),
    MaterialType(Cmp, String),
}

impl FilterPart for Filter {
    fn add_to_query(&self, builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>) {
        match self {
            Self::Id(id) => _ = builder.push(" S.sampleid = ").push_bind(*id),
            Self::Collection(id) => _ = builder.push(" S.collectionid = ").push_bind(*id),
            Self::User(id) => _ = builder.push(" S.userid = ").push_bind(*id),
            Self::MaterialType(cmp, frag) => {
                builder.push(" S.material_type ");
                push_cmp(builder, cmp, frag);
            }
        }
    }
}

fn serialize_date<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(date)
}

/// A batch of material collected from one or more donors
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Sample {
    pub id: i64,

    /// The number of donors that contributed to this sample
    pub donor_count: u32,

    /// The kind of material, e.g. "Serum" or "Whole blood"
    pub material_type: String,

    /// The date the sample information was last updated
    #[serde(serialize_with = "serialize_date")]
    pub last_updated: Date,

    /// The collection this sample belongs to
    pub collection: ExternalRef<Collection>,

    /// The user who created the sample
    pub user: ExternalRef<User>,
}

impl FromRow<'_, SqliteRow> for Sample {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("sampleid")?,
            donor_count: row.try_get("donor_count")?,
            material_type: row.try_get("material_type")?,
            last_updated: row.try_get("last_updated")?,
            collection: row.try_get("collectionid")?,
            user: ExternalRef::Object(User::from_row(row)?),
        })
    }
}

#[async_trait]
impl Loadable for Sample {
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
        sqlx::query("DELETE FROM bb_samples WHERE sampleid=?")
            .bind(id)
            .execute(db.pool())
            .await
            .map_err(|e| e.into())
    }
}

impl Sample {
    /// Create a new sample in the given collection. The sample is not stored
    /// until [Sample::insert()] is called.
    pub fn new(
        donor_count: u32,
        material_type: String,
        last_updated: Date,
        collectionid: i64,
        userid: i64,
    ) -> Self {
        Self {
            id: Self::invalid_id(),
            donor_count,
            material_type,
            last_updated,
            collection: ExternalRef::Stub(collectionid),
            user: ExternalRef::Stub(userid),
        }
    }

    fn build_query(filter: Option<DynFilterPart>) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(
            r#"SELECT S.sampleid, S.donor_count, S.material_type, S.last_updated,
            S.collectionid, S.userid, U.username
            FROM bb_samples S INNER JOIN bb_users U ON U.userid=S.userid"#,
        );
        if let Some(f) = filter {
            builder.push(" WHERE ");
            f.add_to_query(&mut builder);
        }
        builder.push(" ORDER BY S.sampleid ASC");
        builder
    }

    fn build_count(filter: Option<DynFilterPart>) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) AS nsamples FROM bb_samples S");
        if let Some(f) = filter {
            builder.push(" WHERE ");
            f.add_to_query(&mut builder);
        }
        builder
    }

    /// Load all samples from the database that match the given filter
    pub async fn load_all(filter: Option<DynFilterPart>, db: &Database) -> Result<Vec<Self>> {
        Self::build_query(filter)
            .build_query_as()
            .fetch_all(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Count the samples in the database that match the given filter
    pub async fn count(filter: Option<DynFilterPart>, db: &Database) -> Result<i64> {
        Self::build_count(filter)
            .build()
            .fetch_one(db.pool())
            .await?
            .try_get("nsamples")
            .map_err(|e| e.into())
    }

    /// Add this sample to the database. If this call completes successfully,
    /// the id of this object will be updated to the ID of the inserted row in the
    /// database
    pub async fn insert(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id != Self::invalid_id() {
            return Err(Error::InvalidInsertObjectAlreadyExists(self.id));
        }
        if self.collection.id() == Collection::invalid_id() {
            return Err(Error::InvalidStateMissingAttribute("collection".to_string()));
        }
        debug!(?self, "Inserting sample into database");
        sqlx::query(
            r#"INSERT INTO bb_samples (donor_count, material_type, last_updated, collectionid, userid)
            VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(self.donor_count)
        .bind(&self.material_type)
        .bind(self.last_updated)
        .bind(self.collection.id())
        .bind(self.user.id())
        .execute(db.pool())
        .await
        .map(|r| {
            self.id = r.last_insert_rowid();
            r
        })
        .map_err(|e| e.into())
    }

    /// Update the editable fields of this sample in the database. The
    /// collection and creator of a sample are fixed when it is inserted.
    pub async fn update(&self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id == Self::invalid_id() {
            return Err(Error::InvalidUpdateObjectNotFound);
        }
        debug!(?self, "Updating sample in database");
        sqlx::query(
            "UPDATE bb_samples SET donor_count=?, material_type=?, last_updated=? WHERE sampleid=?",
        )
        .bind(self.donor_count)
        .bind(&self.material_type)
        .bind(self.last_updated)
        .bind(self.id)
        .execute(db.pool())
        .await
        .map_err(|e| e.into())
    }
}
