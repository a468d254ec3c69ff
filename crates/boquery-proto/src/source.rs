//! Sources, joins and query fields.
//!
//! A `Source` is a named reference to a table together with the joins
//! needed to reach other tables from it. Sources form a tree rooted at the
//! primary source of a select query; joined sources are named by the
//! relationship path that reaches them (`Car`, `Car.Owner`), so a path that
//! is referenced twice resolves to the same join.

use serde::{Deserialize, Serialize};

/// Separator between segments of a relationship path.
pub const PATH_SEPARATOR: char = '.';

/// Kind of join between two sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    /// Rows without a match on the joined side are dropped.
    InnerJoin,
    /// Rows without a match on the joined side are kept with nulls.
    LeftOuterJoin,
}

impl JoinType {
    /// SQL keyword for this join type.
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::InnerJoin => "JOIN",
            JoinType::LeftOuterJoin => "LEFT JOIN",
        }
    }

    /// Combine two requirements for the same join. An inner join wins.
    pub fn merge(self, other: JoinType) -> JoinType {
        match (self, other) {
            (JoinType::LeftOuterJoin, JoinType::LeftOuterJoin) => JoinType::LeftOuterJoin,
            _ => JoinType::InnerJoin,
        }
    }
}

/// One physical field pair of a join condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinField {
    /// Field on the parent (joining) source.
    pub from_field: String,
    /// Field on the joined source.
    pub to_field: String,
}

impl JoinField {
    /// Create a join field pair.
    pub fn new(from_field: impl Into<String>, to_field: impl Into<String>) -> Self {
        Self {
            from_field: from_field.into(),
            to_field: to_field.into(),
        }
    }
}

/// A join from a parent source to another source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Join type.
    pub join_type: JoinType,
    /// The joined source (owns its own joins further down the tree).
    pub to_source: Source,
    /// Field pairs forming the join condition.
    pub join_fields: Vec<JoinField>,
}

/// A named table reference with the joins hanging off it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Alias of the source, unique within a query.
    pub name: String,
    /// Physical table name.
    pub entity_name: String,
    /// Joins to other sources.
    pub joins: Vec<Join>,
}

impl Source {
    /// Create a source with no joins.
    pub fn new(name: impl Into<String>, entity_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_name: entity_name.into(),
            joins: Vec::new(),
        }
    }

    /// Add a join to this source, reusing an existing join to a source of
    /// the same name.
    ///
    /// Returns the joined source so that further hops can be attached to it.
    pub fn add_join(
        &mut self,
        to_source: Source,
        join_fields: Vec<JoinField>,
        join_type: JoinType,
    ) -> &mut Source {
        let position = self
            .joins
            .iter()
            .position(|j| j.to_source.name == to_source.name);

        let index = match position {
            Some(index) => {
                let existing = &mut self.joins[index];
                existing.join_type = existing.join_type.merge(join_type);
                index
            }
            None => {
                self.joins.push(Join {
                    join_type,
                    to_source,
                    join_fields,
                });
                self.joins.len() - 1
            }
        };

        &mut self.joins[index].to_source
    }

    /// Find a source by name anywhere in this tree.
    pub fn find(&self, name: &str) -> Option<&Source> {
        if self.name == name {
            return Some(self);
        }
        self.joins.iter().find_map(|j| j.to_source.find(name))
    }

    /// Find a source by name anywhere in this tree, mutably.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Source> {
        if self.name == name {
            return Some(self);
        }
        self.joins
            .iter_mut()
            .find_map(|j| j.to_source.find_mut(name))
    }

    /// Total number of joins in this tree.
    pub fn join_count(&self) -> usize {
        self.joins
            .iter()
            .map(|j| 1 + j.to_source.join_count())
            .sum()
    }

    /// All joins in depth-first order, paired with the name of the source
    /// they hang off.
    pub fn flatten_joins(&self) -> Vec<(&str, &Join)> {
        let mut out = Vec::new();
        self.collect_joins(&mut out);
        out
    }

    fn collect_joins<'a>(&'a self, out: &mut Vec<(&'a str, &'a Join)>) {
        for join in &self.joins {
            out.push((self.name.as_str(), join));
            join.to_source.collect_joins(out);
        }
    }

    /// Names of every source in the tree, root first.
    pub fn names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        for (_, join) in self.flatten_joins() {
            names.push(join.to_source.name.as_str());
        }
        names
    }
}

/// A reference to a property, optionally through relationships.
///
/// Before resolution only `relationship_path` and `property_name` are set.
/// Resolution fills in the physical `field_name` and the name of the source
/// (in the owning query's source tree) that the field is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryField {
    /// Relationship names walked from the root class.
    pub relationship_path: Vec<String>,
    /// Property name on the final class.
    pub property_name: String,
    /// Physical field name, once resolved.
    pub field_name: String,
    /// Source alias the field belongs to, once resolved.
    pub source_name: Option<String>,
}

impl QueryField {
    /// Create a field for a property on the root class.
    pub fn new(property_name: impl Into<String>) -> Self {
        let property_name = property_name.into();
        Self {
            relationship_path: Vec::new(),
            field_name: property_name.clone(),
            property_name,
            source_name: None,
        }
    }

    /// Parse a dotted path such as `Owner.Surname`.
    pub fn from_path(path: &str) -> Self {
        let mut segments: Vec<String> = path
            .split(PATH_SEPARATOR)
            .map(|s| s.trim().to_string())
            .collect();
        let property_name = segments.pop().unwrap_or_default();
        Self {
            relationship_path: segments,
            field_name: property_name.clone(),
            property_name,
            source_name: None,
        }
    }

    /// Create a resolved field.
    pub fn resolved(
        property_name: impl Into<String>,
        field_name: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            relationship_path: Vec::new(),
            property_name: property_name.into(),
            field_name: field_name.into(),
            source_name: Some(source_name.into()),
        }
    }

    /// The dotted path as written by the caller.
    pub fn path(&self) -> String {
        if self.relationship_path.is_empty() {
            return self.property_name.clone();
        }
        format!(
            "{}{}{}",
            self.relationship_path.join("."),
            PATH_SEPARATOR,
            self.property_name
        )
    }

    /// Check whether this field has been attached to a source.
    pub fn is_resolved(&self) -> bool {
        self.source_name.is_some()
    }
}

impl std::fmt::Display for QueryField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}
