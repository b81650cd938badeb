//! Command line interface for the JournalKit encrypted journal vault.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::{bail, eyre, Result, WrapErr};
use journalkit_core::{FsVaultStore, JournalVault, OsCryptoProvider, VAULT_RECORD_KEY};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zeroize::Zeroizing;

mod pages;

use pages::PageBook;

type CliVault = JournalVault<FsVaultStore, OsCryptoProvider>;

/// Encrypted local journal, protected by a password with a recovery-code
/// fallback.
#[derive(Parser)]
#[command(name = "journalkit", version, about)]
struct Cli {
    /// Directory holding the vault record.
    #[arg(long, env = "JOURNALKIT_DIR", global = true)]
    vault_dir: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset, e.g. `info` or `journalkit_core=debug`.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new vault and print the recovery code (shown exactly once).
    Init,
    /// Show whether a vault exists and where it lives.
    Status,
    /// Decrypt the journal and print a page.
    Read {
        /// Title of the page to print; defaults to the active page.
        #[arg(long)]
        page: Option<String>,
        /// Print the decrypted payload exactly as stored.
        #[arg(long)]
        raw: bool,
    },
    /// Add or replace a page, then re-encrypt and save.
    Write {
        /// Title of the page to create or replace.
        #[arg(long)]
        title: String,
        /// Read the page body from a file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Reset the password using the recovery code.
    Recover,
    /// Change the vault password.
    ChangePassword,
    /// Issue a new recovery code, invalidating the previous one.
    RotateRecovery,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let vault_dir = resolve_vault_dir(cli.vault_dir)?;
    tracing::debug!("using vault directory {}", vault_dir.display());

    let store = Arc::new(FsVaultStore::new(&vault_dir)?);
    let mut vault = JournalVault::new(store, Arc::new(OsCryptoProvider::new()));

    match cli.command {
        Command::Init => init(&mut vault),
        Command::Status => status(&vault, &vault_dir),
        Command::Read { page, raw } => read(&mut vault, page.as_deref(), raw),
        Command::Write { title, file } => write(&mut vault, &title, file.as_deref()),
        Command::Recover => recover(&mut vault),
        Command::ChangePassword => change_password(&mut vault),
        Command::RotateRecovery => rotate_recovery(&mut vault),
    }
}

fn resolve_vault_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    dirs::data_local_dir()
        .map(|base| base.join("journalkit"))
        .ok_or_else(|| eyre!("could not determine a data directory; pass --vault-dir"))
}

fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    Ok(Zeroizing::new(rpassword::prompt_password(prompt)?))
}

/// Prompts for a new password twice and verifies both entries match.
fn prompt_new_password(label: &str) -> Result<Zeroizing<String>> {
    let first = prompt_password(&format!("{label}: "))?;
    let second = prompt_password(&format!("Confirm {}: ", label.to_lowercase()))?;
    if first.as_bytes() != second.as_bytes() {
        bail!("passwords do not match");
    }
    Ok(first)
}

fn unlock(vault: &mut CliVault) -> Result<()> {
    let password = prompt_password("Password: ")?;
    vault.unlock(&password)?;
    Ok(())
}

fn init(vault: &mut CliVault) -> Result<()> {
    if vault.record_exists()? {
        bail!("a vault already exists here; see `journalkit status`");
    }

    let password = prompt_new_password("Password")?;
    let code = vault.create(&password)?;

    println!("Vault created.");
    println!();
    println!("Recovery code (write it down, it will not be shown again):");
    println!();
    println!("    {code}");
    Ok(())
}

fn status(vault: &CliVault, vault_dir: &Path) -> Result<()> {
    if vault.record_exists()? {
        println!(
            "Vault present at {}",
            vault_dir.join(VAULT_RECORD_KEY).display()
        );
    } else {
        println!(
            "No vault at {}; run `journalkit init`",
            vault_dir.display()
        );
    }
    Ok(())
}

fn read(vault: &mut CliVault, page: Option<&str>, raw: bool) -> Result<()> {
    unlock(vault)?;
    let content = vault.current_content()?;

    if raw {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(content)?;
        stdout.flush()?;
        return Ok(());
    }

    let book = PageBook::decode(content);
    let page = match page {
        Some(title) => book
            .page_by_title(title)
            .ok_or_else(|| eyre!("no page titled {title:?}"))?,
        None => book
            .active()
            .ok_or_else(|| eyre!("the journal has no pages yet"))?,
    };

    println!("# {}", page.title);
    println!();
    println!("{}", page.body);
    Ok(())
}

fn write(vault: &mut CliVault, title: &str, file: Option<&Path>) -> Result<()> {
    let body = match file {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .wrap_err("reading page body from stdin")?;
            buffer
        }
    };

    unlock(vault)?;
    let mut book = PageBook::decode(vault.current_content()?);
    book.upsert_page(title, body.trim_end());
    vault.save(&book.encode()?)?;

    println!("Saved page {title:?}.");
    Ok(())
}

fn recover(vault: &mut CliVault) -> Result<()> {
    let code = prompt_password("Recovery code: ")?;
    let password = prompt_new_password("New password")?;
    vault.recover(&code, &password)?;

    println!("Password reset; the vault is unlocked for this run.");
    Ok(())
}

fn change_password(vault: &mut CliVault) -> Result<()> {
    let current = prompt_password("Current password: ")?;
    vault.unlock(&current)?;

    let new = prompt_new_password("New password")?;
    vault.change_password(&current, &new)?;

    println!("Password changed.");
    Ok(())
}

fn rotate_recovery(vault: &mut CliVault) -> Result<()> {
    let password = prompt_password("Password: ")?;
    vault.unlock(&password)?;

    let code = vault.rotate_recovery(&password)?;

    println!("New recovery code (write it down, it will not be shown again):");
    println!();
    println!("    {code}");
    println!();
    println!("The previous code no longer works.");
    Ok(())
}
