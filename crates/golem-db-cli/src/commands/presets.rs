//! Preset command handlers

use anyhow::Result;

use golem_db::{Database, Entity, HardwarePreset, TaskPreset};

use crate::output::Output;

/// List hardware presets by name
pub fn hardware(db: &Database, output: &Output) -> Result<()> {
    let presets = HardwarePreset::by_name(db.connection()?)?;
    output.print_hardware_presets(&presets);
    Ok(())
}

/// List task presets, optionally for a single task type
pub fn task(db: &Database, task_type: Option<&str>, output: &Output) -> Result<()> {
    let conn = db.connection()?;
    let presets = match task_type {
        Some(task_type) => TaskPreset::for_type(conn, task_type)?,
        None => TaskPreset::all(conn)?,
    };
    output.print_task_presets(&presets);
    Ok(())
}
