use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use episode_sync_config::{CredentialStore, PathManager};
use episode_sync_core::ledger::DEFAULT_WINDOW;
use episode_sync_core::PulledEpisodes;

pub fn run_clear(all: bool, ledger: bool, credentials: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();

    if all {
        clear_ledger(&path_manager, output)?;
        clear_credentials(&path_manager, output)?;
        output.success("Ledger and credentials cleared");
        return Ok(());
    }

    if ledger {
        clear_ledger(&path_manager, output)?;
    }

    if credentials {
        clear_credentials(&path_manager, output)?;
    }

    if !ledger && !credentials {
        output.warn("No clear option specified. Use --ledger, --credentials, or --all");
        output.println("\nExample: mazesync clear --ledger");
    }

    Ok(())
}

fn clear_ledger(path_manager: &PathManager, output: &Output) -> Result<()> {
    let ledger_file = path_manager.ledger_file();

    if !ledger_file.exists() {
        output.info("No ledger found to clear");
        return Ok(());
    }

    let ledger = PulledEpisodes::open(ledger_file.clone(), DEFAULT_WINDOW)
        .map_err(|e| eyre!("Failed to open ledger at {}: {}", ledger_file.display(), e))?;
    let removed = ledger
        .clear()
        .map_err(|e| eyre!("Failed to clear ledger at {}: {}", ledger_file.display(), e))?;
    output.success(format!("Cleared {} pulled episode(s) from {}", removed, ledger_file.display()));
    Ok(())
}

fn clear_credentials(path_manager: &PathManager, output: &Output) -> Result<()> {
    let credentials_file = path_manager.credentials_file();

    if !credentials_file.exists() {
        output.info("No credentials file found to clear");
        return Ok(());
    }

    let mut store = CredentialStore::new(credentials_file.clone());
    store
        .load()
        .map_err(|e| eyre!("Failed to load credentials: {}", e))?;
    store.clear_credentials();
    store
        .save()
        .map_err(|e| eyre!("Failed to save credentials to {}: {}", credentials_file.display(), e))?;
    output.success(format!("Cleared TVmaze credentials: {}", credentials_file.display()));
    Ok(())
}
