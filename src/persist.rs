// used for persistence
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::error::{LabprepError, Result};
use crate::model::{
    Category, Group, GroupId, Instruction, InstructionId, Practice, PracticeId, PracticeSummary,
    UrineType,
};

// ------------- Source -------------
/// Read-only access to the preparation catalog.
///
/// The consolidation engine only ever sees what this returns, so anything that
/// is inactive or malformed has to be filtered or rejected here.
pub trait PreparationSource: Send + Sync {
    /// Active practices among `ids`, each hydrated with its active groups and
    /// their active instructions in display order. Duplicated identifiers are
    /// treated as one. Unknown or inactive identifiers are skipped, so the
    /// result may be empty.
    fn practices_with_preparation(&self, ids: &[PracticeId]) -> Result<Vec<Practice>>;

    /// A page of active practices, for clients building a selection.
    fn practices(&self, query: &PracticeQuery) -> Result<PracticePage>;
}

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeQuery {
    /// Case-insensitive substring of the practice name.
    pub search: Option<String>,
    /// Case-insensitive exact laboratory area.
    pub area: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl PracticeQuery {
    pub fn new(search: Option<String>, limit: Option<usize>, offset: Option<usize>) -> Self {
        Self {
            search: non_blank(search),
            area: None,
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0),
        }
    }

    pub fn with_area(mut self, area: Option<String>) -> Self {
        self.area = non_blank(area);
        self
    }
}

impl Default for PracticeQuery {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticePage {
    pub practices: Vec<PracticeSummary>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl PracticePage {
    /// True when practices remain past this page.
    pub fn has_more(&self) -> bool {
        self.offset.saturating_add(self.limit) < self.total
    }
}

// ------------- Persistence -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

pub struct Store {
    connection: Mutex<Connection>,
}

// Unicode aware lower case, since the built-in lower() only folds ASCII
const CASE_FOLD: &str = "casefold";

// The "STRICT" keyword is left out so external tools like DBeaver can still attach
const SCHEMA: &str = "
    create table if not exists Practica (
        id_practica integer not null,
        nombre text not null,
        codigo text null,
        area text null,
        activo integer not null default 1,
        constraint referenceable_id_practica primary key (
            id_practica
        )
    );
    create table if not exists Grupo (
        id_grupo integer not null,
        nombre text not null,
        descripcion text null,
        horas_ayuno integer null,
        tipo_orina text null,
        horas_orina integer null,
        activo integer not null default 1,
        constraint referenceable_id_grupo primary key (
            id_grupo
        )
    );
    create table if not exists Indicacion (
        id_indicacion integer not null,
        texto text not null,
        tipo text null,
        orden integer not null default 1,
        activo integer not null default 1,
        constraint referenceable_id_indicacion primary key (
            id_indicacion
        )
    );
    create table if not exists PracticaGrupo (
        id_practica integer not null,
        id_grupo integer not null,
        activo integer not null default 1,
        constraint PracticaGrupo_of_Practica foreign key (
            id_practica
        ) references Practica(id_practica),
        constraint PracticaGrupo_of_Grupo foreign key (
            id_grupo
        ) references Grupo(id_grupo),
        constraint unique_PracticaGrupo primary key (
            id_practica,
            id_grupo
        )
    );
    create table if not exists GrupoIndicacion (
        id_grupo integer not null,
        id_indicacion integer not null,
        orden integer not null,
        activo integer not null default 1,
        constraint GrupoIndicacion_of_Grupo foreign key (
            id_grupo
        ) references Grupo(id_grupo),
        constraint GrupoIndicacion_of_Indicacion foreign key (
            id_indicacion
        ) references Indicacion(id_indicacion),
        constraint unique_GrupoIndicacion primary key (
            id_grupo,
            id_indicacion
        )
    );
";

impl Store {
    pub fn new(mode: PersistenceMode) -> Result<Self> {
        let connection = match &mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        connection.execute_batch("pragma foreign_keys = on;")?;
        connection.create_scalar_function(
            CASE_FOLD,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |context| {
                let text: Option<String> = context.get(0)?;
                Ok(text.map(|t| t.to_lowercase()))
            },
        )?;
        connection.execute_batch(SCHEMA)?;
        debug!(?mode, "opened preparation store");
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| LabprepError::DataAccess(format!("connection lock poisoned: {e}")))
    }

    /// Runs `f` against the underlying connection, for callers that manage the
    /// catalog with their own SQL.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let connection = self.lock()?;
        Ok(f(&connection)?)
    }

    // Adders. They upsert, so fixtures can be replayed.
    pub fn add_practice(
        &self,
        id: PracticeId,
        name: &str,
        code: Option<&str>,
        active: bool,
    ) -> Result<()> {
        self.lock()?
            .prepare_cached(
                "
                insert into Practica (
                    id_practica,
                    nombre,
                    codigo,
                    activo
                ) values (?, ?, ?, ?)
                on conflict (id_practica) do update set
                    nombre = excluded.nombre,
                    codigo = excluded.codigo,
                    activo = excluded.activo
            ",
            )?
            .execute(params![id, name, code, active])?;
        Ok(())
    }

    pub fn add_group(
        &self,
        id: GroupId,
        name: &str,
        fasting_hours: Option<u32>,
        urine_type: Option<UrineType>,
        active: bool,
    ) -> Result<()> {
        self.lock()?
            .prepare_cached(
                "
                insert into Grupo (
                    id_grupo,
                    nombre,
                    horas_ayuno,
                    tipo_orina,
                    horas_orina,
                    activo
                ) values (?, ?, ?, ?, ?, ?)
                on conflict (id_grupo) do update set
                    nombre = excluded.nombre,
                    horas_ayuno = excluded.horas_ayuno,
                    tipo_orina = excluded.tipo_orina,
                    horas_orina = excluded.horas_orina,
                    activo = excluded.activo
            ",
            )?
            .execute(params![
                id,
                name,
                fasting_hours,
                urine_type.map(|t| t.label()),
                urine_type.map(|t| t.hours()),
                active
            ])?;
        Ok(())
    }

    pub fn add_instruction(
        &self,
        id: InstructionId,
        text: &str,
        category: Category,
        order: i64,
        active: bool,
    ) -> Result<()> {
        self.lock()?
            .prepare_cached(
                "
                insert into Indicacion (
                    id_indicacion,
                    texto,
                    tipo,
                    orden,
                    activo
                ) values (?, ?, ?, ?, ?)
                on conflict (id_indicacion) do update set
                    texto = excluded.texto,
                    tipo = excluded.tipo,
                    orden = excluded.orden,
                    activo = excluded.activo
            ",
            )?
            .execute(params![id, text, category.stored_label(), order, active])?;
        Ok(())
    }

    /// Sets the laboratory area. Kept apart from `add_practice` so replaying
    /// the catalog does not wipe it.
    pub fn set_practice_area(&self, id: PracticeId, area: Option<&str>) -> Result<()> {
        self.lock()?
            .prepare_cached("update Practica set area = ? where id_practica = ?")?
            .execute(params![area, id])?;
        Ok(())
    }

    pub fn describe_group(&self, id: GroupId, description: Option<&str>) -> Result<()> {
        self.lock()?
            .prepare_cached("update Grupo set descripcion = ? where id_grupo = ?")?
            .execute(params![description, id])?;
        Ok(())
    }

    pub fn link_practice_group(
        &self,
        practice: PracticeId,
        group: GroupId,
        active: bool,
    ) -> Result<()> {
        self.lock()?
            .prepare_cached(
                "
                insert into PracticaGrupo (
                    id_practica,
                    id_grupo,
                    activo
                ) values (?, ?, ?)
                on conflict (id_practica, id_grupo) do update set
                    activo = excluded.activo
            ",
            )?
            .execute(params![practice, group, active])?;
        Ok(())
    }

    pub fn link_group_instruction(
        &self,
        group: GroupId,
        instruction: InstructionId,
        order: i64,
        active: bool,
    ) -> Result<()> {
        self.lock()?
            .prepare_cached(
                "
                insert into GrupoIndicacion (
                    id_grupo,
                    id_indicacion,
                    orden,
                    activo
                ) values (?, ?, ?, ?)
                on conflict (id_grupo, id_indicacion) do update set
                    orden = excluded.orden,
                    activo = excluded.activo
            ",
            )?
            .execute(params![group, instruction, order, active])?;
        Ok(())
    }
}

// ------------- Hydration -------------
struct PracticeRow {
    id: PracticeId,
    name: String,
    code: Option<String>,
    area: Option<String>,
}

struct GroupRow {
    id: GroupId,
    name: String,
    description: Option<String>,
    fasting_hours: Option<i64>,
    urine_label: Option<String>,
    urine_hours: Option<i64>,
}

struct InstructionRow {
    id: InstructionId,
    text: String,
    category_label: Option<String>,
    order: i64,
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn select_practices(connection: &Connection, ids: &[PracticeId]) -> Result<Vec<PracticeRow>> {
    let sql = format!(
        "
        select id_practica, nombre, codigo, area
            from Practica
            where activo = 1
            and id_practica in ({})
            order by id_practica
    ",
        placeholders(ids.len())
    );
    let mut statement = connection.prepare(&sql)?;
    let rows = statement
        .query_map(params_from_iter(ids.iter()), |row| {
            Ok(PracticeRow {
                id: row.get(0)?,
                name: row.get(1)?,
                code: row.get(2)?,
                area: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn select_group_links(
    connection: &Connection,
    practices: &[PracticeId],
) -> Result<Vec<(PracticeId, GroupRow)>> {
    let sql = format!(
        "
        select pg.id_practica,
                g.id_grupo,
                g.nombre,
                g.descripcion,
                g.horas_ayuno,
                g.tipo_orina,
                g.horas_orina
            from PracticaGrupo pg
            join Grupo g
            on g.id_grupo = pg.id_grupo
            where pg.activo = 1
            and g.activo = 1
            and pg.id_practica in ({})
            order by pg.id_practica, g.id_grupo
    ",
        placeholders(practices.len())
    );
    let mut statement = connection.prepare(&sql)?;
    let rows = statement
        .query_map(params_from_iter(practices.iter()), |row| {
            Ok((
                row.get(0)?,
                GroupRow {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                    fasting_hours: row.get(4)?,
                    urine_label: row.get(5)?,
                    urine_hours: row.get(6)?,
                },
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn select_instruction_links(
    connection: &Connection,
    groups: &[GroupId],
) -> Result<Vec<(GroupId, InstructionRow)>> {
    if groups.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "
        select gi.id_grupo,
                i.id_indicacion,
                i.texto,
                i.tipo,
                i.orden
            from GrupoIndicacion gi
            join Indicacion i
            on i.id_indicacion = gi.id_indicacion
            where gi.activo = 1
            and i.activo = 1
            and gi.id_grupo in ({})
            order by gi.id_grupo, gi.orden, i.id_indicacion
    ",
        placeholders(groups.len())
    );
    let mut statement = connection.prepare(&sql)?;
    let rows = statement
        .query_map(params_from_iter(groups.iter()), |row| {
            Ok((
                row.get(0)?,
                InstructionRow {
                    id: row.get(1)?,
                    text: row.get(2)?,
                    category_label: row.get(3)?,
                    order: row.get(4)?,
                },
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn decode_instruction(row: InstructionRow) -> Result<Instruction> {
    let category = Category::from_label(row.category_label.as_deref()).ok_or_else(|| {
        LabprepError::DataAccess(format!(
            "instruction {} has unknown category '{}'",
            row.id,
            row.category_label.as_deref().unwrap_or_default()
        ))
    })?;
    Ok(Instruction::new(row.id, row.text, category, row.order))
}

fn decode_fasting(row: &GroupRow) -> Result<Option<u32>> {
    row.fasting_hours
        .map(|hours| {
            u32::try_from(hours).map_err(|_| {
                LabprepError::DataAccess(format!(
                    "group {} has invalid fasting hours {hours}",
                    row.id
                ))
            })
        })
        .transpose()
}

fn decode_urine(row: &GroupRow) -> Result<Option<UrineType>> {
    let label = row.urine_label.as_deref().map(str::trim).filter(|l| !l.is_empty());
    let Some(label) = label else {
        return match row.urine_hours {
            None => Ok(None),
            Some(hours) => Err(LabprepError::DataAccess(format!(
                "group {} has urine hours {hours} without a urine type",
                row.id
            ))),
        };
    };
    let urine_type = UrineType::from_label(label).ok_or_else(|| {
        LabprepError::DataAccess(format!("group {} has unknown urine type '{label}'", row.id))
    })?;
    match row.urine_hours {
        Some(hours) if UrineType::from_hours(hours) != Some(urine_type) => {
            Err(LabprepError::DataAccess(format!(
                "group {} pairs urine type {urine_type} with {hours} hours",
                row.id
            )))
        }
        _ => Ok(Some(urine_type)),
    }
}

impl PreparationSource for Store {
    fn practices_with_preparation(&self, ids: &[PracticeId]) -> Result<Vec<Practice>> {
        if ids.is_empty() {
            return Err(LabprepError::InvalidInput(
                "at least one practice identifier is required".into(),
            ));
        }
        let requested: Vec<PracticeId> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

        let connection = self.lock()?;
        let practice_rows = select_practices(&connection, &requested)?;
        if practice_rows.is_empty() {
            debug!(requested = requested.len(), "no active practices in selection");
            return Ok(Vec::new());
        }
        let found: Vec<PracticeId> = practice_rows.iter().map(|p| p.id).collect();
        let link_rows = select_group_links(&connection, &found)?;
        let group_ids: Vec<GroupId> = link_rows
            .iter()
            .map(|(_, g)| g.id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let instruction_rows = select_instruction_links(&connection, &group_ids)?;
        drop(connection);

        // keepers, so a shared instruction or group is hydrated exactly once
        let mut instructions: HashMap<InstructionId, Arc<Instruction>> = HashMap::new();
        let mut by_group: HashMap<GroupId, Vec<Arc<Instruction>>> = HashMap::new();
        for (group, row) in instruction_rows {
            let kept = match instructions.get(&row.id) {
                Some(kept) => Arc::clone(kept),
                None => {
                    let kept = Arc::new(decode_instruction(row)?);
                    instructions.insert(kept.id(), Arc::clone(&kept));
                    kept
                }
            };
            by_group.entry(group).or_default().push(kept);
        }

        let mut groups: BTreeMap<GroupId, Arc<Group>> = BTreeMap::new();
        let mut links: HashMap<PracticeId, Vec<Arc<Group>>> = HashMap::new();
        for (practice, row) in link_rows {
            let group = match groups.get(&row.id) {
                Some(kept) => Arc::clone(kept),
                None => {
                    let group = Group::new(row.id, row.name.clone())
                        .with_description(row.description.clone())
                        .with_fasting_hours(decode_fasting(&row)?)
                        .with_urine_type(decode_urine(&row)?)
                        .with_instructions(by_group.remove(&row.id).unwrap_or_default());
                    let kept = Arc::new(group);
                    groups.insert(row.id, Arc::clone(&kept));
                    kept
                }
            };
            links.entry(practice).or_default().push(group);
        }

        let practices: Vec<Practice> = practice_rows
            .into_iter()
            .map(|row| {
                Practice::new(row.id, row.name)
                    .with_code(row.code)
                    .with_area(row.area)
                    .with_groups(links.remove(&row.id).unwrap_or_default())
            })
            .collect();
        debug!(
            requested = requested.len(),
            practices = practices.len(),
            groups = groups.len(),
            instructions = instructions.len(),
            "hydrated preparation graph"
        );
        Ok(practices)
    }

    fn practices(&self, query: &PracticeQuery) -> Result<PracticePage> {
        // folded here with the same function the queries apply to the columns
        let pattern = query
            .search
            .as_deref()
            .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));
        let area = query.area.as_deref().map(str::to_lowercase);
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        let connection = self.lock()?;
        let total: i64 = connection
            .prepare_cached(
                "
                select count(*)
                    from Practica
                    where activo = 1
                    and (?1 is null or casefold(nombre) like ?1 escape '\\')
                    and (?2 is null or casefold(area) = ?2)
            ",
            )?
            .query_row(params![pattern, area], |r| r.get(0))?;
        let practices = connection
            .prepare_cached(
                "
                select id_practica, nombre, codigo, area
                    from Practica
                    where activo = 1
                    and (?1 is null or casefold(nombre) like ?1 escape '\\')
                    and (?2 is null or casefold(area) = ?2)
                    order by nombre, id_practica
                    limit ?3 offset ?4
            ",
            )?
            .query_map(params![pattern, area, limit, offset], |row| {
                Ok(PracticeSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    code: row.get(2)?,
                    area: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(PracticePage {
            practices,
            total: usize::try_from(total).unwrap_or_default(),
            limit: query.limit,
            offset: query.offset,
        })
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
