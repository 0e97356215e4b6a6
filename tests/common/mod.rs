#![allow(dead_code)]

use std::sync::Arc;

use labprep::model::{Category, Group, Instruction, Practice, UrineType};
use labprep::persist::{PersistenceMode, Store};

// Practices
pub const GLUCEMIA: i64 = 1;
pub const HEMOGRAMA: i64 = 2;
pub const ORINA_COMPLETA: i64 = 3;
pub const ACIDO_URICO_24H: i64 = 4;
pub const CLEARANCE_12H: i64 = 5;
pub const INACTIVE_PRACTICE: i64 = 6;
pub const NO_PREPARATION: i64 = 7;
pub const COLESTEROL: i64 = 8;
pub const INACTIVE_LINK: i64 = 9;
pub const INACTIVE_GROUP: i64 = 10;

// Instructions
pub const FAST_8: i64 = 100;
pub const FAST_4: i64 = 101;
pub const WATER: i64 = 102;
pub const FIRST_MORNING: i64 = 103;
pub const COLLECT_24H: i64 = 104;
pub const COLLECT_12H: i64 = 105;
pub const NO_EXERCISE: i64 = 106;
pub const STOOL_3_DAYS: i64 = 107;
pub const RETIRED: i64 = 108;
pub const BEFORE_9: i64 = 109;
pub const WATER_SHOUTED: i64 = 110;

/// A small catalog covering every filtering and merging path.
pub fn seeded_store() -> Store {
    let store = Store::new(PersistenceMode::InMemory).expect("in-memory store");
    seed(&store);
    store
}

pub fn seed(store: &Store) {
    let practices = [
        (GLUCEMIA, "GLUCEMIA", Some("660412"), true),
        (HEMOGRAMA, "HEMOGRAMA", Some("660475"), true),
        (ORINA_COMPLETA, "ORINA COMPLETA", None, true),
        (ACIDO_URICO_24H, "ACIDO URICO EN ORINA 24H", None, true),
        (CLEARANCE_12H, "CLEARANCE DE CREATININA 12H", None, true),
        (INACTIVE_PRACTICE, "PRACTICA DADA DE BAJA", None, false),
        (NO_PREPARATION, "GRUPO SANGUINEO", None, true),
        (COLESTEROL, "COLESTEROL TOTAL", None, true),
        (INACTIVE_LINK, "PARASITOLOGICO SERIADO", None, true),
        (INACTIVE_GROUP, "TSH", None, true),
    ];
    for (id, name, code, active) in practices {
        store.add_practice(id, name, code, active).expect("practice");
    }

    let groups = [
        (10, "Ayuno 8 horas", Some(8), None, true),
        (11, "Ayuno 4 horas", Some(4), None, true),
        (20, "Primera orina", None, Some(UrineType::FirstMorning), true),
        (21, "Orina de 24 horas", None, Some(UrineType::TwentyFourHour), true),
        (22, "Orina de 12 horas", None, Some(UrineType::TwelveHour), true),
        (30, "Actividad fisica", None, None, true),
        (31, "Materia fecal seriada", None, None, true),
        (40, "Grupo dado de baja", Some(12), None, false),
    ];
    for (id, name, fasting, urine, active) in groups {
        store.add_group(id, name, fasting, urine, active).expect("group");
    }

    let instructions = [
        (FAST_8, "Concurrir con 8 horas de ayuno.", Category::Fasting, true),
        (FAST_4, "Concurrir con 4 horas de ayuno.", Category::Fasting, true),
        (WATER, "Puede tomar agua.", Category::General, true),
        (FIRST_MORNING, "Recolectar la primera orina de la mañana.", Category::Urine, true),
        (COLLECT_24H, "Recolectar toda la orina durante 24 horas.", Category::Urine, true),
        (COLLECT_12H, "Recolectar la orina durante 12 horas.", Category::Urine, true),
        (NO_EXERCISE, "No realizar actividad física intensa el día previo.", Category::General, true),
        (STOOL_3_DAYS, "Recolectar materia fecal durante 3 días.", Category::Stool, true),
        (RETIRED, "Instrucción dada de baja.", Category::General, false),
        (BEFORE_9, "Concurrir antes de las 9 hs.", Category::Schedule, true),
        (WATER_SHOUTED, "  PUEDE TOMAR AGUA.  ", Category::General, true),
    ];
    for (id, text, category, active) in instructions {
        store.add_instruction(id, text, category, 1, active).expect("instruction");
    }

    let practice_groups = [
        (GLUCEMIA, 10, true),
        (HEMOGRAMA, 11, true),
        (ORINA_COMPLETA, 20, true),
        (ACIDO_URICO_24H, 21, true),
        (CLEARANCE_12H, 22, true),
        (INACTIVE_PRACTICE, 10, true),
        (COLESTEROL, 30, true),
        (COLESTEROL, 10, true),
        (INACTIVE_LINK, 31, false),
        (INACTIVE_GROUP, 40, true),
    ];
    for (practice, group, active) in practice_groups {
        store.link_practice_group(practice, group, active).expect("practice link");
    }

    let group_instructions = [
        (10, FAST_8, 1, true),
        (10, WATER, 2, true),
        (10, RETIRED, 3, true),
        (10, NO_EXERCISE, 4, false),
        (11, FAST_4, 1, true),
        (11, WATER_SHOUTED, 2, true),
        (20, FIRST_MORNING, 1, true),
        (21, COLLECT_24H, 1, true),
        (21, BEFORE_9, 2, true),
        (22, COLLECT_12H, 1, true),
        // listed out of order on purpose, display order decides
        (30, NO_EXERCISE, 2, true),
        (30, WATER, 1, true),
        (31, STOOL_3_DAYS, 1, true),
        (40, NO_EXERCISE, 1, true),
    ];
    for (group, instruction, order, active) in group_instructions {
        store
            .link_group_instruction(group, instruction, order, active)
            .expect("instruction link");
    }
}

// In-memory graph builders for engine-only tests.

pub fn instruction(id: i64, text: &str, category: Category) -> Arc<Instruction> {
    Arc::new(Instruction::new(id, text, category, 1))
}

pub fn group(
    id: i64,
    fasting_hours: Option<u32>,
    urine_type: Option<UrineType>,
    instructions: Vec<Arc<Instruction>>,
) -> Arc<Group> {
    Arc::new(
        Group::new(id, format!("Grupo {id}"))
            .with_fasting_hours(fasting_hours)
            .with_urine_type(urine_type)
            .with_instructions(instructions),
    )
}

pub fn practice(id: i64, groups: Vec<Arc<Group>>) -> Practice {
    Practice::new(id, format!("Practica {id}")).with_groups(groups)
}

pub fn texts(instructions: &[Arc<Instruction>]) -> Vec<&str> {
    instructions.iter().map(|i| i.text()).collect()
}

pub fn ids(instructions: &[Arc<Instruction>]) -> Vec<i64> {
    instructions.iter().map(|i| i.id()).collect()
}
