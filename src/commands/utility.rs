//! Utility command handlers.

use super::{CommandResult, Context};
use hid_analyzer::table;
use hid_analyzer_transport::{enumerate, DeviceFilter};

/// List attached HID devices, optionally restricted to one VID:PID
pub async fn list(ctx: &Context, filter: Option<DeviceFilter>, json: bool) -> CommandResult {
    let filter = match filter {
        Some(filter) => filter,
        None => ctx.config.filter()?,
    };

    let discovery = ctx.discovery()?;
    let devices = enumerate(discovery.as_ref(), filter).await?;
    let rows = table::rows(&devices);

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No HID devices found matching {filter}");
        return Ok(());
    }
    print!("{}", table::render(&rows));
    Ok(())
}

/// Print the effective configuration, optionally saving it
pub fn config(ctx: &Context, save: bool) -> CommandResult {
    if save {
        ctx.config.save(&ctx.config_path)?;
        println!("Saved {}", ctx.config_path.display());
    }
    println!("# {}", ctx.config_path.display());
    print!("{}", ctx.config.to_toml()?);
    Ok(())
}
