use anyhow::Result;
use clap::{Parser, Subcommand};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "

Copyright (c) 2025 InkyQuill
License: MIT
Source: https://github.com/InkyQuill/htredirects
Rust Edition: 2024"
);

#[derive(Parser)]
#[command(name = "htredirects")]
#[command(about = "Safe editor for the managed redirects block of an .htaccess file")]
#[command(long_about = "htredirects manages the redirect rules inside the marked block of an
Apache .htaccess file:

    ### Redirects Manager block
    RewriteRule ^old\\-page(/)?$ /new-page$1 [R=301,L]
    ### END Redirects Manager block

Rules are shown and edited as plain URLs; escaping, anchoring and flag
groups are handled for you. Nothing outside the marked block is ever
touched, and every save is atomic with an automatic timestamped backup.

The block may sit at the top level or nested inside <IfModule> (or any
other) blocks; htredirects finds it wherever it is.

EXAMPLES:
  htredirects list                          Show all managed redirects
  htredirects list --search blog            Only rules mentioning 'blog'
  htredirects add /old-page /new-page       Add a 301 redirect
  htredirects add /promo /sale --status 302 Add a temporary redirect
  htredirects update /old-page --to /moved  Change a rule's target
  htredirects remove /old-page              Delete a rule
  htredirects init                          Create the managed block
  htredirects rollback                      Restore the last pre-save backup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = LONG_VERSION)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the .htaccess file (overrides config)
    #[arg(short = 'f', long, value_name = "PATH", global = true)]
    file: Option<String>,

    /// Site host prefix stripped from URLs on save (overrides config)
    #[arg(long, value_name = "URL", global = true)]
    host: Option<String>,

    /// Preview the resulting file change without writing it
    #[arg(short = 'd', long, global = true)]
    #[arg(help = "Preview changes without modifying the file\nShows a diff of what the save would write.")]
    dry_run: bool,

    /// Skip backup creation for this operation
    #[arg(long = "no-backup", global = true)]
    no_backup: bool,

    /// Custom backup directory
    #[arg(long, value_name = "DIR", global = true)]
    #[arg(help = "Use custom directory for backups\nDefault: ~/.htredirects/backups/")]
    backup_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the managed redirects
    #[command(long_about = "List every redirect in the managed block.

Rules are shown in file order as: old URL, new URL, status code.

EXAMPLES:
  htredirects list                 Show all redirects
  htredirects list --search shop   Only rules whose URLs contain 'shop'
  htredirects list --json          Machine-readable output")]
    List {
        /// Only show rules whose old or new URL contains this text
        #[arg(short, long, value_name = "TEXT")]
        search: Option<String>,

        /// Output rules as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a redirect
    #[command(long_about = "Add a redirect to the managed block.

URLs may be given with or without the site host; the host (when
configured) is stripped before the rule is written. The new rule is
appended after the existing ones.

EXAMPLES:
  htredirects add /old-page /new-page            301 redirect
  htredirects add /promo /sale --status 302      Temporary redirect
  htredirects add https://example.com/a /b       Host stripped on save")]
    Add {
        /// URL to redirect from
        #[arg(value_name = "OLD_URL")]
        old_url: String,

        /// URL to redirect to
        #[arg(value_name = "NEW_URL")]
        new_url: String,

        /// Redirect status code (default from config, normally 301)
        #[arg(long, value_name = "CODE")]
        status: Option<u16>,
    },

    /// Update an existing redirect
    #[command(long_about = "Update the redirect whose old URL matches exactly.

Only the parts you pass change; the rest of the rule is kept.

EXAMPLES:
  htredirects update /old-page --to /moved         Change the target
  htredirects update /old-page --status 302        Change the status
  htredirects update /old-page --rename /old-post  Change the source URL")]
    Update {
        /// Old URL of the rule to update (exact match)
        #[arg(value_name = "OLD_URL")]
        old_url: String,

        /// New target URL
        #[arg(long, value_name = "URL")]
        to: Option<String>,

        /// New source URL
        #[arg(long, value_name = "URL")]
        rename: Option<String>,

        /// New redirect status code
        #[arg(long, value_name = "CODE")]
        status: Option<u16>,
    },

    /// Remove a redirect
    #[command(long_about = "Remove the redirect whose old URL matches exactly.

EXAMPLES:
  htredirects remove /old-page")]
    Remove {
        /// Old URL of the rule to remove (exact match)
        #[arg(value_name = "OLD_URL")]
        old_url: String,
    },

    /// Create the managed block at the end of the file
    #[command(long_about = "Create an empty managed block.

Appends the marker comments to the end of the .htaccess file. Does
nothing if a managed block already exists.

EXAMPLES:
  htredirects init")]
    Init,

    /// Restore the most recent pre-save backup
    #[command(long_about = "Restore the .htaccess file from the most recent backup.

Every save writes a timestamped copy of the previous file content to
the backup directory; rollback puts the newest one back.

EXAMPLES:
  htredirects rollback")]
    Rollback,

    /// Show or edit configuration
    #[command(long_about = "Show the configuration file.

The configuration lives at ~/.htredirects/config.toml and holds the
.htaccess path, the site host, the default status code, and backup
settings.

EXAMPLES:
  htredirects config --show       Show current configuration
  htredirects config --path       Print the config file path")]
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Print the configuration file path
        #[arg(long)]
        path: bool,
    },
}

/// Parsed command plus the global options every command shares.
#[derive(Debug)]
pub struct Args {
    pub command: Command,
    pub file: Option<String>,
    pub host: Option<String>,
    pub dry_run: bool,
    pub no_backup: bool,
    pub backup_dir: Option<String>,
}

#[derive(Debug)]
pub enum Command {
    List {
        search: Option<String>,
        json: bool,
    },
    Add {
        old_url: String,
        new_url: String,
        status: Option<u16>,
    },
    Update {
        old_url: String,
        to: Option<String>,
        rename: Option<String>,
        status: Option<u16>,
    },
    Remove {
        old_url: String,
    },
    Init,
    Rollback,
    Config {
        show: bool,
        path: bool,
    },
}

pub fn parse_args() -> Result<Args> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::List { search, json } => Command::List { search, json },
        Commands::Add {
            old_url,
            new_url,
            status,
        } => Command::Add {
            old_url,
            new_url,
            status,
        },
        Commands::Update {
            old_url,
            to,
            rename,
            status,
        } => {
            if to.is_none() && rename.is_none() && status.is_none() {
                anyhow::bail!(
                    "Nothing to update. Pass at least one of --to, --rename, --status."
                );
            }
            Command::Update {
                old_url,
                to,
                rename,
                status,
            }
        }
        Commands::Remove { old_url } => Command::Remove { old_url },
        Commands::Init => Command::Init,
        Commands::Rollback => Command::Rollback,
        Commands::Config { show, path } => Command::Config { show, path },
    };

    Ok(Args {
        command,
        file: cli.file,
        host: cli.host,
        dry_run: cli.dry_run,
        no_backup: cli.no_backup,
        backup_dir: cli.backup_dir,
    })
}
