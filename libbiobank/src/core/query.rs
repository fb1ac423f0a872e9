//! utilities related to database queries
//!
use std::{ops::Deref, sync::Arc};

/// An operator for combining filter parts to form a more complex filter expression
#[derive(Clone)]
pub enum Op {
    Or,
    And,
}

#[derive(Clone)]
/// An object that allows you easily build compound filters that can be applied to SQL queries
pub struct CompoundFilterBuilder {
    top: CompoundFilter,
}

impl CompoundFilterBuilder {
    /// Create a new [CompoundFilterBuilder] object that will combine all filter
    /// expressions using the given operator
    pub fn new(op: Op) -> Self {
        Self {
            top: CompoundFilter::new(op),
        }
    }

    /// Add a new filter expression to this compound filter. It will be combined
    /// with all existing filter expressions using the operator that was specified in
    /// the constructor.
    pub fn push<F: Into<DynFilterPart>>(mut self, filter: F) -> Self {
        self.top.add_filter(filter.into());
        self
    }

    /// Generate a new [CompoundFilter] object from this builder object
    pub fn build(self) -> DynFilterPart {
        self.top.into()
    }
}

/// A Trait implemented by anything that can be a filter. It could be a single field or a
/// multi-level compound filter condition.
pub trait FilterPart: Send {
    /// convert the given filter part to SQL syntax and add it to the given [sqlx::QueryBuilder] object
    fn add_to_query(&self, builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>);
}

#[derive(Clone)]
/// An object that represents one or more filter conditions that are combined by a single logical
/// operator ([Op]). Multiple compound filters can be combined together into larger filter
/// conditions
pub struct CompoundFilter {
    conditions: Vec<DynFilterPart>,
    op: Op,
}

impl CompoundFilter {
    /// Create a new compound filter object
    pub fn new(op: Op) -> Self {
        Self {
            conditions: Default::default(),
            op,
        }
    }

    /// Create an builder object that is used for building compound filters
    pub fn builder(op: Op) -> CompoundFilterBuilder {
        CompoundFilterBuilder::new(op)
    }

    /// Add a new filter expression to the current filter. It will be combined
    /// with the operator [Op] that was specified in [CompoundFilter::new()]
    pub fn add_filter(&mut self, filter: DynFilterPart) {
        self.conditions.push(filter);
    }
}

impl FilterPart for CompoundFilter {
    fn add_to_query(&self, builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>) {
        if self.conditions.is_empty() {
            builder.push("TRUE");
            return;
        }

        let mut first = true;
        builder.push(" (");
        let separator = match self.op {
            Op::And => " AND ",
            Op::Or => " OR ",
        };

        for cond in &self.conditions {
            if first {
                first = false;
            } else {
                builder.push(separator);
            }
            cond.add_to_query(builder);
        }
        builder.push(")");
    }
}

#[derive(Clone)]
/// An object representing the comparison operator that is used in a filter expression
pub enum Cmp {
    Equal,
    Like,
}

impl std::fmt::Display for Cmp {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Cmp::Equal => write!(f, " IS "),
            Cmp::Like => write!(f, " LIKE "),
        }
    }
}

/// Convert a string filter value into the form expected by the given comparison.
/// `LIKE` comparisons match the fragment literally, anywhere in the field.
pub(crate) fn cmp_value(cmp: &Cmp, frag: &str) -> String {
    match cmp {
        Cmp::Like => {
            let escaped = frag
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        }
        Cmp::Equal => frag.to_string(),
    }
}

/// Push a comparison of the preceding column against `frag`
pub(crate) fn push_cmp(builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>, cmp: &Cmp, frag: &str) {
    builder.push(cmp).push_bind(cmp_value(cmp, frag));
    if let Cmp::Like = cmp {
        builder.push(" ESCAPE '\\'");
    }
}

#[derive(Clone)]
pub struct DynFilterPart(Arc<dyn FilterPart + Sync>);

impl Deref for DynFilterPart {
    type Target = Arc<dyn FilterPart + Sync>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<F> From<F> for DynFilterPart
where
    F: FilterPart + Send + Sync + 'static,
{
    fn from(value: F) -> Self {
        DynFilterPart(Arc::new(value))
    }
}
