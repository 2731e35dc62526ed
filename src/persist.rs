// used for persistence
use rusqlite::{params, Connection, OpenFlags, Statement, Transaction};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::construct::{AiGroup, AiGroupReference, IdGenerator, MapId, PlacementObject, RegionLevel, RegionRow};
use crate::decode::{decode_map, MapFile};
use crate::error::{PlacedbError, Result};

/// Bumped whenever the layout below changes. Readers refuse other versions.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
    create table meta (
        schema_version integer not null,
        built_at text not null,
        object_count integer not null
    );
    create table objs (
        objid integer primary key,
        map_type text not null,
        map_name text not null,
        actor text not null,
        name text not null,
        translate text,
        scale text,
        params text not null,
        conditions text not null,
        drops text,
        equip text,
        ui_drops text,
        ui_equip text,
        hash_id integer not null,
        hash text not null,
        data text not null,
        group07_id integer,
        group10_id integer,
        region12 text,
        gen_group integer,
        constraint unique_hash_within_map unique (
            map_type,
            map_name,
            hash_id
        )
    );
    create index objs_hash_id on objs (hash_id);
    create index objs_gen_group on objs (map_type, map_name, gen_group);

    create virtual table objs_fts using fts5 (
        name,
        actor,
        map_name,
        hash,
        content = 'objs',
        content_rowid = 'objid'
    );
    -- the store is never updated in place, so inserts are the only path to keep in sync
    create trigger objs_ai after insert on objs begin
        insert into objs_fts (rowid, name, actor, map_name, hash)
        values (new.objid, new.name, new.actor, new.map_name, new.hash);
    end;

    create table ai_groups (
        id integer primary key,
        map_type text not null,
        map_name text not null,
        hash_id integer not null,
        name text,
        kind text,
        data text not null
    );
    create table ai_group_references (
        object_id integer not null references objs (objid),
        ai_group_id integer not null references ai_groups (id),
        constraint unique_reference primary key (
            object_id,
            ai_group_id
        )
    );
";

fn region_schema(level: RegionLevel) -> String {
    let table = level.table();
    format!(
        "
    create table {table} (
        objid integer primary key,
        id integer not null,
        map_name text not null,
        name text not null,
        data text not null
    );
    create index {table}_map_name on {table} (map_name);
    "
    )
}

// ------------- Persistence -------------
/// Prepared inserts bound to the one transaction a build runs in.
pub struct Persistor<'tx> {
    pub add_object: Statement<'tx>,
    pub add_ai_group: Statement<'tx>,
    pub add_reference: Statement<'tx>,
    pub add_region: [Statement<'tx>; 4],
}

impl<'tx> Persistor<'tx> {
    pub fn new(tx: &'tx Transaction<'_>) -> Result<Persistor<'tx>> {
        let region = |level: RegionLevel| {
            tx.prepare(&format!(
                "
                insert into {} (
                    id,
                    map_name,
                    name,
                    data
                ) values (?, ?, ?, ?)
            ",
                level.table()
            ))
        };
        Ok(Persistor {
            add_object: tx.prepare(
                "
                insert into objs (
                    objid, map_type, map_name, actor, name,
                    translate, scale, params, conditions,
                    drops, equip, ui_drops, ui_equip,
                    hash_id, hash, data,
                    group07_id, group10_id, region12, gen_group
                ) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            )?,
            add_ai_group: tx.prepare(
                "
                insert into ai_groups (
                    id,
                    map_type,
                    map_name,
                    hash_id,
                    name,
                    kind,
                    data
                ) values (?, ?, ?, ?, ?, ?, ?)
            ",
            )?,
            add_reference: tx.prepare(
                "
                insert into ai_group_references (
                    object_id,
                    ai_group_id
                ) values (?, ?)
            ",
            )?,
            add_region: [
                region(RegionLevel::Region07)?,
                region(RegionLevel::Region12)?,
                region(RegionLevel::Region16)?,
                region(RegionLevel::Region18)?,
            ],
        })
    }
    pub fn persist_object(&mut self, o: &PlacementObject) -> Result<()> {
        self.add_object.execute(params![
            o.objid,
            o.map.map_type,
            o.map.map_name,
            o.actor,
            o.name,
            o.translate,
            o.scale,
            o.params,
            o.conditions,
            o.drops,
            o.equip,
            o.ui_drops,
            o.ui_equip,
            o.hash_id,
            o.hash,
            o.data,
            o.group07_id,
            o.group10_id,
            o.region12,
            o.gen_group,
        ])?;
        Ok(())
    }
    pub fn persist_ai_group(&mut self, g: &AiGroup) -> Result<()> {
        self.add_ai_group.execute(params![
            g.id,
            g.map.map_type,
            g.map.map_name,
            g.hash_id,
            g.name,
            g.kind,
            g.data,
        ])?;
        Ok(())
    }
    pub fn persist_reference(&mut self, r: &AiGroupReference) -> Result<()> {
        self.add_reference.execute(params![r.object_id, r.ai_group_id])?;
        Ok(())
    }
    pub fn persist_region(&mut self, r: &RegionRow) -> Result<()> {
        let index = RegionLevel::ALL
            .iter()
            .position(|level| *level == r.level)
            .ok_or_else(|| PlacedbError::InvalidInput(r.level.to_string()))?;
        self.add_region[index].execute(params![r.id, r.map_name, r.name, r.data])?;
        Ok(())
    }
}

// ------------- Building -------------
/// What a successful build loaded.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub maps: usize,
    pub objects: usize,
    pub ai_groups: usize,
    pub references: usize,
    pub region_rows: usize,
}

/// Every raw map file under `content_dir`, in the order they are loaded.
pub fn discover_maps(content_dir: &Path) -> Result<Vec<(MapId, PathBuf)>> {
    let mut maps = Vec::new();
    for entry in WalkDir::new(content_dir)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| PlacedbError::Io(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let map_type = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|s| s.to_str());
        let map_name = path.file_stem().and_then(|s| s.to_str());
        match (map_type, map_name) {
            (Some(map_type), Some(map_name)) => maps.push((MapId::new(map_type, map_name), path.to_path_buf())),
            _ => warn!(path = %path.display(), "skipping map file with a non UTF-8 name"),
        }
    }
    Ok(maps)
}

/// Where a build writes before it is swapped into place.
pub fn temporary_path(store_path: &Path) -> PathBuf {
    let mut name = store_path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Builds a complete store from `content_dir` and atomically swaps it into
/// `store_path`. On failure the previous store, if any, is left untouched.
pub fn build_store(content_dir: &Path, store_path: &Path) -> Result<BuildReport> {
    let tmp = temporary_path(store_path);
    if tmp.exists() {
        warn!(path = %tmp.display(), "removing stale temporary store");
        fs::remove_file(&tmp)?;
    }
    match build_into(content_dir, &tmp) {
        Ok(report) => {
            fs::rename(&tmp, store_path)?;
            info!(
                store = %store_path.display(),
                maps = report.maps,
                objects = report.objects,
                ai_groups = report.ai_groups,
                region_rows = report.region_rows,
                "build complete"
            );
            Ok(report)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                debug!(error = %cleanup, "no temporary store to remove");
            }
            Err(e)
        }
    }
}

fn build_into(content_dir: &Path, tmp: &Path) -> Result<BuildReport> {
    let maps = discover_maps(content_dir)?;
    let mut conn = Connection::open(tmp)?;
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)?;
    for level in RegionLevel::ALL {
        tx.execute_batch(&region_schema(level))?;
    }

    let mut report = BuildReport { maps: maps.len(), ..BuildReport::default() };
    {
        let mut persistor = Persistor::new(&tx)?;
        let mut objids = IdGenerator::new();
        let mut group_ids = IdGenerator::new();
        for (map, path) in &maps {
            let text = fs::read_to_string(path)?;
            let decoded = decode_map(map, MapFile::parse(map, &text)?, &mut objids, &mut group_ids)?;
            debug!(%map, objects = decoded.objects.len(), "loading map");
            for object in &decoded.objects {
                persistor.persist_object(object)?;
            }
            for group in &decoded.ai_groups {
                persistor.persist_ai_group(group)?;
            }
            for reference in &decoded.references {
                persistor.persist_reference(reference)?;
            }
            for region in &decoded.regions {
                persistor.persist_region(region)?;
            }
            report.objects += decoded.objects.len();
            report.ai_groups += decoded.ai_groups.len();
            report.references += decoded.references.len();
            report.region_rows += decoded.regions.len();
        }
    }
    tx.execute(
        "insert into meta (schema_version, built_at, object_count) values (?, ?, ?)",
        params![SCHEMA_VERSION, Utc::now(), report.objects as i64],
    )?;
    tx.commit()?;
    conn.close().map_err(|(_, e)| PlacedbError::from(e))?;
    Ok(report)
}

// ------------- Reading -------------
/// Opens a finished store for reading and checks that its layout is the one
/// this build understands. Returns the connection and the build time.
pub fn open_snapshot(path: &Path) -> Result<(Connection, DateTime<Utc>)> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    let (version, built_at): (i64, DateTime<Utc>) = conn.query_row(
        "select schema_version, built_at from meta limit 1",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    if version != SCHEMA_VERSION {
        return Err(PlacedbError::Persistence(format!(
            "store {} has schema version {version}, expected {SCHEMA_VERSION}",
            path.display()
        )));
    }
    Ok((conn, built_at))
}
