// Patient facing text. The wording is the product's locale and clients match on it,
// so it must stay byte for byte stable.
use std::sync::Arc;

use crate::model::{Instruction, UrineType};

pub const HEADER: &str = "Indicaciones para los estudios solicitados:";
pub const SUMMARY_HEADER: &str = "📋 RESUMEN:";

pub fn patient_text(
    instructions: &[Arc<Instruction>],
    fasting_hours: Option<u32>,
    urine_type: Option<UrineType>,
) -> String {
    let mut text = format!("{HEADER}\n\n");
    for (index, instruction) in instructions.iter().enumerate() {
        text.push_str(&format!("{}. {}\n\n", index + 1, instruction.text()));
    }
    text.push_str(&format!("\n{SUMMARY_HEADER}\n"));
    if let Some(hours) = fasting_hours.filter(|&h| h > 0) {
        text.push_str(&format!("⏰ Ayuno requerido: {hours} horas\n"));
    }
    if let Some(urine_type) = urine_type {
        text.push_str(&urine_line(urine_type));
    }
    text
}

// first morning urine is a moment, not a duration, so it carries no hours
fn urine_line(urine_type: UrineType) -> String {
    match urine_type.hours() {
        hours if hours > 0 => format!("🚰 Tipo de orina: {urine_type} ({hours} horas)\n"),
        _ => format!("🚰 Tipo de orina: {urine_type}\n"),
    }
}
