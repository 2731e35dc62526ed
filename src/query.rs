//! Fixed query shapes over a store snapshot.
//!
//! Every shape is first planned into a [`Plan`] (SQL text plus bound
//! parameters) and then executed by a [`QueryEngine`]. Request values only
//! ever reach SQL as bound parameters; the one structural choice a request
//! can make, which region table to read, goes through [`RegionLevel`].
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

use crate::construct::{ObjId, ObjectKey, RegionLevel};
use crate::error::Result;
use crate::view::{AiGroupView, ObjectRow, ObjectView, RegionView, Shape, OBJECT_COLUMNS};

/// Query string that lists everything in scope without consulting the index.
pub const WILDCARD: &str = "*";

lazy_static! {
    static ref SEARCH_TOKEN: Regex = Regex::new(r"[\p{L}\p{N}_]+").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Plan {
    fn new(sql: String, params: Vec<SqlValue>) -> Self {
        Self { sql, params }
    }
}

/// Scope and filters of a listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub map_type: String,
    pub map_name: Option<String>,
    pub query: String,
    pub limit: Option<u32>,
    pub with_map_names: bool,
}

/// What a listing query string turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextFilter {
    /// The wildcard: no text filter at all.
    All,
    /// An FTS5 match expression.
    Match(String),
    /// The string had nothing searchable in it.
    Nothing,
}

impl TextFilter {
    /// Every word of the query must prefix-match some indexed column. Words
    /// are reduced to letters, digits and underscores and quoted, so user
    /// input never reaches the FTS5 query syntax.
    pub fn parse(query: &str) -> Self {
        if query.trim() == WILDCARD {
            return TextFilter::All;
        }
        let terms: Vec<String> = SEARCH_TOKEN
            .find_iter(query)
            .map(|token| format!("\"{}\"*", token.as_str()))
            .collect();
        if terms.is_empty() {
            TextFilter::Nothing
        } else {
            TextFilter::Match(terms.join(" "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Objects,
    Ids,
}

// ------------- Planning -------------
fn key_params(key: &ObjectKey) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(key.map.map_type.clone()),
        SqlValue::Text(key.map.map_name.clone()),
        SqlValue::Integer(key.hash_id),
    ]
}

pub fn plan_by_id(objid: ObjId) -> Plan {
    Plan::new(
        format!("select {OBJECT_COLUMNS} from objs where objid = ? limit 1"),
        vec![SqlValue::Integer(objid)],
    )
}

pub fn plan_by_key(key: &ObjectKey) -> Plan {
    Plan::new(
        format!(
            "select {OBJECT_COLUMNS} from objs
                where map_type = ? and map_name = ? and hash_id = ?
                limit 1"
        ),
        key_params(key),
    )
}

/// Hash ids are only unique within a map; the lowest objid wins.
pub fn plan_by_hash(hash_id: i64) -> Plan {
    Plan::new(
        format!("select {OBJECT_COLUMNS} from objs where hash_id = ? order by objid limit 1"),
        vec![SqlValue::Integer(hash_id)],
    )
}

pub fn plan_gen_group(key: &ObjectKey) -> Plan {
    let mut params = key_params(key);
    params.extend([
        SqlValue::Text(key.map.map_type.clone()),
        SqlValue::Text(key.map.map_name.clone()),
    ]);
    Plan::new(
        format!(
            "select {OBJECT_COLUMNS} from objs
                where gen_group = (
                    select gen_group from objs
                        where map_type = ? and map_name = ? and hash_id = ?
                        limit 1
                )
                and map_type = ? and map_name = ?
                order by objid"
        ),
        params,
    )
}

pub fn plan_ai_groups(key: &ObjectKey) -> Plan {
    Plan::new(
        format!(
            "select {} from ai_groups g
                join ai_group_references r on r.ai_group_id = g.id
                where r.object_id = (
                    select objid from objs
                        where map_type = ? and map_name = ? and hash_id = ?
                        limit 1
                )
                order by g.id",
            AiGroupView::COLUMNS
        ),
        key_params(key),
    )
}

/// `None` when the query string cannot match anything.
pub fn plan_listing(listing: &Listing, projection: Projection) -> Option<Plan> {
    let columns = match projection {
        Projection::Objects => OBJECT_COLUMNS,
        Projection::Ids => "objid",
    };
    let mut sql = format!("select {columns} from objs where map_type = ?");
    let mut params = vec![SqlValue::Text(listing.map_type.clone())];
    if let Some(map_name) = &listing.map_name {
        sql.push_str(" and map_name = ?");
        params.push(SqlValue::Text(map_name.clone()));
    }
    match TextFilter::parse(&listing.query) {
        TextFilter::All => {}
        TextFilter::Match(expression) => {
            sql.push_str(" and objid in (select rowid from objs_fts where objs_fts match ?)");
            params.push(SqlValue::Text(expression));
        }
        TextFilter::Nothing => return None,
    }
    sql.push_str(" order by objid");
    if let Some(limit) = listing.limit {
        sql.push_str(" limit ?");
        params.push(SqlValue::Integer(i64::from(limit)));
    }
    Some(Plan::new(sql, params))
}

pub fn plan_region(level: RegionLevel, map_name: &str) -> Plan {
    Plan::new(
        format!(
            "select objid, id, map_name, name, data from {} where map_name = ? order by objid",
            level.table()
        ),
        vec![SqlValue::Text(map_name.to_string())],
    )
}

pub fn plan_actor(objid: ObjId) -> Plan {
    Plan::new(
        "select actor from objs where objid = ? limit 1".to_string(),
        vec![SqlValue::Integer(objid)],
    )
}

// ------------- Execution -------------
/// Runs planned queries against one read-only connection.
pub struct QueryEngine<'c> {
    conn: &'c Connection,
}

impl<'c> QueryEngine<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn objects(&self, plan: &Plan, shape: Shape) -> Result<Vec<ObjectView>> {
        let mut stmt = self.conn.prepare_cached(&plan.sql)?;
        let rows = stmt.query_map(params_from_iter(plan.params.iter()), ObjectRow::from_row)?;
        let mut views = Vec::new();
        for row in rows {
            views.push(row?.reconstruct(shape)?);
        }
        Ok(views)
    }

    fn object(&self, plan: &Plan) -> Result<Option<ObjectView>> {
        Ok(self.objects(plan, Shape::Full)?.into_iter().next())
    }

    pub fn object_by_id(&self, objid: ObjId) -> Result<Option<ObjectView>> {
        self.object(&plan_by_id(objid))
    }

    pub fn object_by_key(&self, key: &ObjectKey) -> Result<Option<ObjectView>> {
        self.object(&plan_by_key(key))
    }

    pub fn object_by_hash(&self, hash_id: i64) -> Result<Option<ObjectView>> {
        self.object(&plan_by_hash(hash_id))
    }

    /// Every object generated together with `key`, itself included. Empty
    /// when the object is unknown or has no generation group.
    pub fn gen_group(&self, key: &ObjectKey) -> Result<Vec<ObjectView>> {
        self.objects(&plan_gen_group(key), Shape::Full)
    }

    pub fn ai_groups(&self, key: &ObjectKey) -> Result<Vec<AiGroupView>> {
        let plan = plan_ai_groups(key);
        let mut stmt = self.conn.prepare_cached(&plan.sql)?;
        let rows = stmt.query_map(params_from_iter(plan.params.iter()), AiGroupView::from_row)?;
        let mut groups = Vec::new();
        for row in rows {
            let (view, data) = row?;
            groups.push(view.with_data(&data)?);
        }
        Ok(groups)
    }

    pub fn list(&self, listing: &Listing) -> Result<Vec<ObjectView>> {
        match plan_listing(listing, Projection::Objects) {
            Some(plan) => self.objects(
                &plan,
                Shape::Minimal { with_map_names: listing.with_map_names },
            ),
            None => Ok(Vec::new()),
        }
    }

    pub fn list_ids(&self, listing: &Listing) -> Result<Vec<ObjId>> {
        let Some(plan) = plan_listing(listing, Projection::Ids) else {
            return Ok(Vec::new());
        };
        let mut stmt = self.conn.prepare_cached(&plan.sql)?;
        let ids = stmt
            .query_map(params_from_iter(plan.params.iter()), |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<ObjId>>>()?;
        Ok(ids)
    }

    pub fn region_rows(&self, level: RegionLevel, map_name: &str) -> Result<Vec<RegionView>> {
        let plan = plan_region(level, map_name);
        let mut stmt = self.conn.prepare_cached(&plan.sql)?;
        let rows = stmt
            .query_map(params_from_iter(plan.params.iter()), RegionView::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn actor_of(&self, objid: ObjId) -> Result<Option<String>> {
        let plan = plan_actor(objid);
        let mut stmt = self.conn.prepare_cached(&plan.sql)?;
        let actor = stmt
            .query_row(params_from_iter(plan.params.iter()), |r| r.get(0))
            .optional()?;
        Ok(actor)
    }
}
