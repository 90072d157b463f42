//! Known hosts command handler

use anyhow::Result;

use golem_db::{Database, KnownHost};

use crate::output::Output;

/// List known hosts, most recently connected first
pub fn list(db: &Database, output: &Output) -> Result<()> {
    let hosts = KnownHost::newest_first(db.connection()?)?;
    output.print_hosts(&hosts);
    Ok(())
}
