mod bindings;
mod cli;
mod paths;
mod run;
mod session;

use anyhow::Result;
use cli::{AssetsAction, Command, ConfigAction};
use paths::{load_config, AppPaths};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    let paths = AppPaths::discover()?;
    let (config, source) = load_config(&paths, cli.config.as_deref())?;
    tracing::debug!(
        config_dir = %paths.config_dir().display(),
        source = ?source,
        "resolved configuration"
    );

    match cli.command {
        Command::Render(args) => run::render(args, &config),
        Command::Still(args) => run::still(args, &config),
        Command::Assets(assets) => match assets.action {
            AssetsAction::Optimize(args) => run::optimize(args, &config),
            AssetsAction::Manifest(args) => run::manifest(args, &config),
        },
        Command::Config(config_cmd) => match config_cmd.action {
            ConfigAction::Where => {
                run::config_where(&paths, &source);
                Ok(())
            }
            ConfigAction::Show => run::config_show(&config),
        },
    }
}
