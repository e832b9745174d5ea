use anyhow::{Context, Result};
use colored::*;
use std::path::PathBuf;

use htredirects::cli::{self, Args, Command};
use htredirects::codec::{Rule, RuleEdit};
use htredirects::manager::{RedirectsManager, RuleSet};
use htredirects::{Error, config, diff, logger};

fn main() -> Result<()> {
    let args = cli::parse_args()?;
    let config = config::load_config()?;
    config::validate_config(&config)?;

    logger::init_debug_logging(config.logging.debug.unwrap_or(false))?;

    if let Command::Config { show, path } = &args.command {
        return show_config(&config, *show, *path);
    }

    let manager = build_manager(&args, &config)?;

    match &args.command {
        Command::List { search, json } => list(&manager, search.as_deref(), *json),
        Command::Add {
            old_url,
            new_url,
            status,
        } => {
            let status = status
                .or(config.rules.default_status)
                .unwrap_or(301);
            let edit = RuleEdit::insert(Rule::new(old_url.clone(), new_url.clone(), status));
            apply(&manager, &args, edit, &format!("Added {} -> {}", old_url, new_url))
        }
        Command::Update {
            old_url,
            to,
            rename,
            status,
        } => {
            let ruleset = list_or_hint(&manager)?;
            let current = ruleset
                .rules
                .iter()
                .find(|rule| rule.old_url == *old_url)
                .with_context(|| format!("No managed redirect with old URL '{}'", old_url))?;

            let updated = Rule::new(
                rename.clone().unwrap_or_else(|| current.old_url.clone()),
                to.clone().unwrap_or_else(|| current.new_url.clone()),
                status.unwrap_or(current.status),
            );
            let edit = RuleEdit::update(old_url.clone(), updated);
            apply(&manager, &args, edit, &format!("Updated {}", old_url))
        }
        Command::Remove { old_url } => {
            let edit = RuleEdit::delete(old_url.clone());
            apply(&manager, &args, edit, &format!("Removed {}", old_url))
        }
        Command::Init => {
            if manager.init_block()? {
                println!("Created the managed redirects block in {}", manager.htaccess_path().display());
            } else {
                println!("A managed redirects block already exists. Nothing to do.");
            }
            Ok(())
        }
        Command::Rollback => {
            let backup = manager.rollback()?;
            println!("Restored {} from {}", manager.htaccess_path().display(), backup.display());
            Ok(())
        }
        Command::Config { .. } => unreachable!("handled above"),
    }
}

fn build_manager(args: &Args, config: &config::Config) -> Result<RedirectsManager> {
    let path = args
        .file
        .clone()
        .or_else(|| config.site.htaccess_path.clone())
        .context(
            "No .htaccess path configured.\n\
             Pass one with --file or set site.htaccess_path in ~/.htredirects/config.toml",
        )?;

    let host = args.host.clone().or_else(|| config.site.host.clone());

    let backup_dir = if args.no_backup {
        None
    } else if let Some(dir) = &args.backup_dir {
        Some(PathBuf::from(dir))
    } else {
        config.backup_dir()?
    };

    Ok(RedirectsManager::new(path)
        .with_site_host(host)
        .with_backup_dir(backup_dir))
}

fn list(manager: &RedirectsManager, search: Option<&str>, json: bool) -> Result<()> {
    let mut ruleset = list_or_hint(manager)?;

    if let Some(needle) = search {
        ruleset = RedirectsManager::filter_rules(&ruleset, needle);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ruleset.rules)?);
        return Ok(());
    }

    if ruleset.rules.is_empty() {
        match search {
            Some(needle) => println!("No redirects match '{}'.", needle),
            None => println!("The managed block contains no redirects yet."),
        }
        return Ok(());
    }

    let width = ruleset
        .rules
        .iter()
        .map(|rule| rule.old_url.len())
        .max()
        .unwrap_or(0);

    for rule in &ruleset.rules {
        println!(
            "{:width$}  {}  {}  {}",
            rule.old_url.bold(),
            "->".dimmed(),
            rule.new_url,
            format!("[{}]", rule.status).yellow(),
        );
    }
    println!("\n{} redirect(s)", ruleset.rules.len());

    Ok(())
}

/// List rules, turning a missing block into a hint to run `init`.
fn list_or_hint(manager: &RedirectsManager) -> Result<RuleSet> {
    manager.list_rules().map_err(|err| match err {
        Error::BlockNotFound => anyhow::anyhow!(
            "No managed redirects block found in {}.\n\
             Run 'htredirects init' to create one.",
            manager.htaccess_path().display()
        ),
        other => other.into(),
    })
}

fn apply(manager: &RedirectsManager, args: &Args, edit: RuleEdit, done: &str) -> Result<()> {
    let ruleset = list_or_hint(manager)?;
    let edits = vec![edit];

    if args.dry_run {
        let (before, after) = manager.preview_save(&ruleset, &edits)?;
        let path = manager.htaccess_path().display().to_string();
        print!("{}", diff::format_preview(&path, &before, &after, 2));
        println!("\nDry run: nothing was written. Re-run without --dry-run to apply.");
        return Ok(());
    }

    let saved = manager.save_rules(&ruleset, &edits)?;
    println!("{}", done);
    println!("{} redirect(s) now managed.", saved.rules.len());
    Ok(())
}

fn show_config(config: &config::Config, show: bool, path: bool) -> Result<()> {
    if path {
        println!("{}", config::config_file_path()?.display());
        return Ok(());
    }

    if show {
        println!("{}", toml::to_string_pretty(config)?);
        return Ok(());
    }

    println!("Configuration file: {}", config::config_file_path()?.display());
    println!("Use --show to print the current settings.");
    Ok(())
}
