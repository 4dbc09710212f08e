// Data Model Module
//
// This module defines the logical data model a realization is built on: its
// aliased tables, the joins between them, and the canonical join tree derived
// from a fact table and a join sequence.

use std::collections::HashMap;
use std::fmt;
use serde::{Serialize, Deserialize};

use super::column::{TableDesc, TblColRef};

/// Join types supported by data models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
        }
    }
}

/// An equi-join between a foreign-key side and a primary-key side.
///
/// Key lists are non-empty and parallel; deserialization goes through the
/// same check as `JoinDesc::new`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "JoinDescFields")]
pub struct JoinDesc {
    join_type: JoinType,
    /// Columns on the referencing side, parallel to `primary_key`
    foreign_key: Vec<TblColRef>,
    /// Columns on the referenced (lookup) side
    primary_key: Vec<TblColRef>,
}

#[derive(Deserialize)]
struct JoinDescFields {
    join_type: JoinType,
    foreign_key: Vec<TblColRef>,
    primary_key: Vec<TblColRef>,
}

impl TryFrom<JoinDescFields> for JoinDesc {
    type Error = String;

    fn try_from(fields: JoinDescFields) -> Result<Self, String> {
        JoinDesc::new(fields.join_type, fields.foreign_key, fields.primary_key)
    }
}

impl JoinDesc {
    /// Create a join; key lists must be parallel
    pub fn new(join_type: JoinType, foreign_key: Vec<TblColRef>, primary_key: Vec<TblColRef>) -> Result<Self, String> {
        if foreign_key.is_empty() || foreign_key.len() != primary_key.len() {
            return Err(format!(
                "join keys must be non-empty and parallel, got {} foreign and {} primary",
                foreign_key.len(),
                primary_key.len()
            ));
        }
        Ok(JoinDesc { join_type, foreign_key, primary_key })
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn foreign_key(&self) -> &[TblColRef] {
        &self.foreign_key
    }

    pub fn primary_key(&self) -> &[TblColRef] {
        &self.primary_key
    }

    /// Swap every key column `rebind` maps to a new reference; lengths
    /// are preserved
    pub(crate) fn rebind_columns(&mut self, rebind: &impl Fn(&TblColRef) -> Option<TblColRef>) {
        for col in self.foreign_key.iter_mut().chain(self.primary_key.iter_mut()) {
            if let Some(to) = rebind(col) {
                *col = to;
            }
        }
    }

    /// Alias of the referencing side
    pub fn fk_alias(&self) -> &str {
        self.foreign_key[0].table_alias()
    }

    /// Alias of the referenced side
    pub fn pk_alias(&self) -> &str {
        self.primary_key[0].table_alias()
    }
}

impl fmt::Display for JoinDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conds: Vec<String> = self
            .foreign_key
            .iter()
            .zip(&self.primary_key)
            .map(|(fk, pk)| format!("{} = {}", fk, pk))
            .collect();
        write!(f, "{} JOIN {} ON {}", self.join_type, self.pk_alias(), conds.join(" AND "))
    }
}

/// A table as it appears in a model, under its canonical alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    alias: String,
    table: TableDesc,
}

impl TableRef {
    pub fn new(alias: impl Into<String>, table: TableDesc) -> Self {
        TableRef { alias: alias.into(), table }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn table(&self) -> &TableDesc {
        &self.table
    }

    /// Resolve a column of this table under the canonical alias
    pub fn column(&self, name: &str) -> Option<TblColRef> {
        let col = self.table.find_column(name)?;
        Some(TblColRef::new(self.alias.clone(), self.table.name(), col.clone()))
    }
}

/// A logical data model: a root fact table plus aliased lookup tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataModelDesc {
    name: String,
    root_fact: TableRef,
    lookups: Vec<TableRef>,
    joins: Vec<JoinDesc>,
}

impl DataModelDesc {
    pub fn new(name: impl Into<String>, root_fact: TableRef, lookups: Vec<TableRef>, joins: Vec<JoinDesc>) -> Self {
        DataModelDesc {
            name: name.into(),
            root_fact,
            lookups,
            joins,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_fact(&self) -> &TableRef {
        &self.root_fact
    }

    pub fn joins(&self) -> &[JoinDesc] {
        &self.joins
    }

    /// Look up a model table by canonical alias
    pub fn find_table(&self, alias: &str) -> Option<&TableRef> {
        std::iter::once(&self.root_fact)
            .chain(self.lookups.iter())
            .find(|t| t.alias().eq_ignore_ascii_case(alias))
    }

    /// The model's join tree rooted at its fact table
    pub fn joins_tree(&self) -> JoinsTree {
        JoinsTree::new(self.root_fact.alias(), &self.joins)
    }
}

/// One node of a join tree: a table alias and the join that reached it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub alias: String,
    /// None for the root
    pub join: Option<JoinDesc>,
    pub parent: Option<String>,
}

/// Canonical join graph rooted at a fact table.
///
/// Joins whose foreign-key side is not yet reachable from the root are
/// attached as soon as their parent is; joins that never connect are kept in
/// `unattached` so matching can reject them explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinsTree {
    root: String,
    chains: HashMap<String, Chain>,
    unattached: Vec<JoinDesc>,
}

impl JoinsTree {
    pub fn new(root_alias: &str, joins: &[JoinDesc]) -> Self {
        let mut chains = HashMap::new();
        chains.insert(
            root_alias.to_string(),
            Chain { alias: root_alias.to_string(), join: None, parent: None },
        );

        let mut pending: Vec<JoinDesc> = joins.to_vec();
        loop {
            let before = pending.len();
            pending.retain(|join| {
                if !chains.contains_key(join.fk_alias()) || chains.contains_key(join.pk_alias()) {
                    return true;
                }
                chains.insert(
                    join.pk_alias().to_string(),
                    Chain {
                        alias: join.pk_alias().to_string(),
                        join: Some(join.clone()),
                        parent: Some(join.fk_alias().to_string()),
                    },
                );
                false
            });
            if pending.len() == before {
                break;
            }
        }

        JoinsTree {
            root: root_alias.to_string(),
            chains,
            unattached: pending,
        }
    }

    pub fn root_alias(&self) -> &str {
        &self.root
    }

    /// The join that brought `alias` into the tree
    pub fn join_of(&self, alias: &str) -> Option<&JoinDesc> {
        self.chains.get(alias).and_then(|c| c.join.as_ref())
    }

    pub fn parent_of(&self, alias: &str) -> Option<&str> {
        self.chains.get(alias).and_then(|c| c.parent.as_deref())
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.chains.contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Joins that could not be reached from the root
    pub fn unattached(&self) -> &[JoinDesc] {
        &self.unattached
    }

    /// Path of aliases from the root down to `alias`, inclusive
    pub fn path_to(&self, alias: &str) -> Option<Vec<String>> {
        let mut path = vec![alias.to_string()];
        let mut current = self.chains.get(alias)?;
        while let Some(parent) = &current.parent {
            path.push(parent.clone());
            current = self.chains.get(parent)?;
        }
        path.reverse();
        Some(path)
    }
}
