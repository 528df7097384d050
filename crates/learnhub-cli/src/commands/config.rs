use crate::ConfigCommands;
use crate::commands::CommandContext;
use anyhow::{Result, bail};

pub fn handle_config_command(ctx: &CommandContext, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            print!("{}", toml::to_string_pretty(&ctx.config)?);
        }
        ConfigCommands::Init { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            ctx.config.save_to_file(&path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
