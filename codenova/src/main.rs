//! Multi-file code editor CLI.
//!
//! Keeps a session of source files in a state directory (`.codenova/` by
//! default) and runs them: JavaScript in a local sandboxed child process,
//! Python, Java, C++ and C on a remote execution service.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use codenova::core::language::Language;
use codenova::core::types::{ExecutionStatus, Settings, SettingsPatch, Theme};
use codenova::exit_codes;
use codenova::io::config::{EditorConfig, load_config, write_config};
use codenova::logging;
use codenova::workbench::{DiskWorkbench, open_workbench};

#[derive(Parser)]
#[command(name = "codenova", version, about = "Multi-file code editor core")]
struct Cli {
    /// Directory holding the persisted session and `config.toml`.
    #[arg(long, global = true, default_value = ".codenova")]
    state_dir: PathBuf,
    /// Config file to use instead of `<state-dir>/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List open files; the active one is marked with `*`.
    List,
    /// Print a file's content (default: the active file).
    Show {
        #[arg(long)]
        id: Option<String>,
    },
    /// Create `untitled.js` and make it active.
    New,
    /// Load a file from disk into the session.
    Open { path: PathBuf },
    /// Write a file's content to disk (default: the active file).
    Save {
        #[arg(long)]
        id: Option<String>,
        path: PathBuf,
    },
    /// Write the whole project as JSON.
    Export { path: PathBuf },
    /// Close a file. The last remaining file cannot be closed.
    Close { id: String },
    /// Make a file active.
    Select { id: String },
    Rename { id: String, name: String },
    /// Switch a file's language. Its content is replaced by the new template,
    /// except for plaintext, which keeps it.
    Language { id: String, language: String },
    /// Replace a file's content from `--from <path>` or stdin.
    Edit {
        id: String,
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Run a file (default: the active file) and print its output.
    Run {
        #[arg(long)]
        id: Option<String>,
    },
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Print the theme, or set it to `dark` or `light`.
    Theme { theme: Option<String> },
    /// Print the effective configuration; `--write` saves it as the config file.
    Config {
        #[arg(long)]
        write: bool,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    /// Change settings. Font size is clamped to 10..=24 and tab size snapped to 2, 4, 6 or 8.
    Set {
        #[arg(long)]
        font_size: Option<u32>,
        #[arg(long)]
        tab_size: Option<u32>,
        #[arg(long)]
        word_wrap: Option<bool>,
        #[arg(long)]
        minimap: Option<bool>,
        #[arg(long)]
        line_numbers: Option<bool>,
        #[arg(long)]
        auto_save: Option<bool>,
        #[arg(long)]
        format_on_save: Option<bool>,
    },
    Reset,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.state_dir.join("config.toml"));
    let config = load_config(&config_path)?;

    if let Command::Config { write } = cli.command {
        return cmd_config(&config_path, &config, write);
    }

    let mut bench = open_workbench(&cli.state_dir, &config)?;
    let code = dispatch(&mut bench, cli.command);
    let finished = bench.finish();
    let code = code?;
    finished.context("edits were not saved")?;
    Ok(code)
}

fn dispatch(bench: &mut DiskWorkbench, command: Command) -> Result<i32> {
    match command {
        Command::List => cmd_list(bench),
        Command::Show { id } => {
            let session = bench.store().session();
            let file = match &id {
                Some(id) => session.file(id).with_context(|| format!("no file with id {id}"))?,
                None => session.active_file().context("session has no active file")?,
            };
            print!("{}", file.content);
        }
        Command::New => {
            let session = bench.store_mut().add_file();
            println!("{}", session.active_file_id);
        }
        Command::Open { path } => {
            let file = bench.open_from_disk(&path)?;
            println!("{}\t{}\t{}", file.id, file.name, file.language);
        }
        Command::Save { id, path } => {
            let written = bench.save_to_disk(id.as_deref(), &path)?;
            println!("{}", written.display());
        }
        Command::Export { path } => bench.export(&path)?,
        Command::Close { id } => {
            require_file(bench, &id)?;
            if bench.store().session().files.len() == 1 {
                bail!("cannot close the last open file");
            }
            bench.store_mut().close_file(&id);
        }
        Command::Select { id } => {
            require_file(bench, &id)?;
            bench.store_mut().set_active_file(&id);
        }
        Command::Rename { id, name } => {
            require_file(bench, &id)?;
            if name.trim().is_empty() {
                bail!("file name must not be blank");
            }
            bench.store_mut().rename_file(&id, &name);
        }
        Command::Language { id, language } => {
            require_file(bench, &id)?;
            let language = Language::from_id(&language).with_context(|| {
                format!(
                    "unknown language {language:?}; expected one of: {}",
                    Language::SUPPORTED.map(Language::id).join(", ")
                )
            })?;
            let session = bench.store_mut().change_language(&id, language);
            if let Some(file) = session.file(&id) {
                println!("{}", file.name);
            }
        }
        Command::Edit { id, from } => {
            require_file(bench, &id)?;
            let content = read_content(from.as_deref())?;
            bench.store_mut().update_content(&id, content);
        }
        Command::Run { id } => return cmd_run(bench, id.as_deref()),
        Command::Settings { action } => cmd_settings(bench, action)?,
        Command::Theme { theme } => match theme {
            None => println!("{}", bench.store().theme().as_str()),
            Some(value) => {
                let theme = Theme::parse(&value)
                    .with_context(|| format!("unknown theme {value:?}; expected dark or light"))?;
                bench.store_mut().set_theme(theme);
            }
        },
        Command::Config { .. } => bail!("config is handled before the session opens"),
    }
    Ok(exit_codes::OK)
}

fn cmd_list(bench: &DiskWorkbench) {
    let session = bench.store().session();
    for file in &session.files {
        let marker = if file.id == session.active_file_id { "*" } else { " " };
        println!("{marker} {}\t{}\t{}", file.id, file.name, file.language);
    }
}

fn cmd_run(bench: &DiskWorkbench, id: Option<&str>) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    let result = runtime.block_on(bench.run(id))?;
    println!("{}", result.display_text());
    Ok(match result.status {
        ExecutionStatus::Success => exit_codes::OK,
        ExecutionStatus::ProgramFailure | ExecutionStatus::UnsupportedLanguage => {
            exit_codes::PROGRAM_FAILED
        }
        ExecutionStatus::TransportFailure => exit_codes::UNAVAILABLE,
    })
}

fn cmd_settings(bench: &mut DiskWorkbench, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = &bench.store().session().settings;
            println!(
                "{}",
                serde_json::to_string_pretty(settings).context("serialize settings")?
            );
        }
        SettingsAction::Set {
            font_size,
            tab_size,
            word_wrap,
            minimap,
            line_numbers,
            auto_save,
            format_on_save,
        } => {
            let requested = SettingsPatch {
                font_size,
                tab_size,
                word_wrap,
                minimap,
                line_numbers,
                auto_save,
                format_on_save,
            };
            if requested.is_empty() {
                bail!("no settings given");
            }
            let patch = clamp_patch(&bench.store().session().settings, requested);
            bench.store_mut().update_settings(&patch);
        }
        SettingsAction::Reset => {
            bench.store_mut().reset_settings();
        }
    }
    Ok(())
}

/// Bring numeric fields into the ranges the editor controls allow.
fn clamp_patch(current: &Settings, mut patch: SettingsPatch) -> SettingsPatch {
    let mut preview = current.clone();
    preview.apply(&patch);
    let clamped = preview.clamped();
    patch.font_size = patch.font_size.map(|_| clamped.font_size);
    patch.tab_size = patch.tab_size.map(|_| clamped.tab_size);
    patch
}

fn cmd_config(path: &Path, config: &EditorConfig, write: bool) -> Result<i32> {
    if write {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        write_config(path, config)?;
        println!("{}", path.display());
    } else {
        print!(
            "{}",
            toml::to_string_pretty(config).context("serialize config toml")?
        );
    }
    Ok(exit_codes::OK)
}

fn require_file(bench: &DiskWorkbench, id: &str) -> Result<()> {
    if bench.store().session().file(id).is_none() {
        bail!("no file with id {id}");
    }
    Ok(())
}

fn read_content(from: Option<&Path>) -> Result<String> {
    match from {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read content from stdin")?;
            Ok(buf)
        }
    }
}
