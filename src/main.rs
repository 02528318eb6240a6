use anyhow::Context;
use home_library::settings::Settings;
use home_library::shell::Shell;
use home_library::{telemetry, BookCatalog, JsonBookStore};
use std::io;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load library settings")?;
    telemetry::init(&settings.log.filter);

    tracing::info!(
        path = %settings.storage.path.display(),
        "opening book store"
    );
    let catalog = BookCatalog::new(JsonBookStore::new(&settings.storage.path));

    let mut shell = Shell::new(catalog, settings.analytics);
    shell
        .run(io::stdin().lock(), io::stdout().lock())
        .context("shell I/O failed")?;
    Ok(())
}
