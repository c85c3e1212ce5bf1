//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands. Every
//! command resolves a fresh service from the effective configuration and
//! acts as a privileged caller.

use crate::api;
use crate::config::{AppConfig, DEFAULT_CONFIG_FILE};
use crate::service::ClassPagesService;
use class_pages_core::primitives::MAX_IMPORT_DOCUMENT_SIZE;
use class_pages_core::{
    Caller, ClassPagesError, ImportMode, NavAction, NavigationState, OverrideEdit, RecordType,
    ScopeId, SettingsGateway, SpellFilter, ViewModel,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Maximum size of a saved navigation state (1 MB).
const MAX_STATE_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
///
/// This prevents memory exhaustion from malicious or accidental large files.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), ClassPagesError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ClassPagesError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(ClassPagesError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and ensure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, ClassPagesError> {
    let canonical = path.canonicalize().map_err(|e| {
        ClassPagesError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(ClassPagesError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: its parent must be an existing directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, ClassPagesError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        ClassPagesError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(ClassPagesError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| ClassPagesError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read a validated, size-checked text file.
fn read_input(path: &Path, max_size: u64) -> Result<String, ClassPagesError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;
    std::fs::read_to_string(&validated)
        .map_err(|e| ClassPagesError::IoError(format!("Read file: {}", e)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ClassPagesError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ClassPagesError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), ClassPagesError> {
    let service = ClassPagesService::from_config(config)?;

    println!("class-pages Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", config.server.host);
    println!("  Port:     {}", config.server.port);
    println!("  Database: {:?}", config.database);
    println!("  Catalog:  {:?}", config.catalog_dir);
    println!();
    println!("Endpoints:");
    println!("  GET  /view      - Build a class page");
    println!("  POST /navigate  - Navigate");
    println!("  GET  /lists     - Spell list matrix");
    println!("  POST /import    - Import spell lists");
    println!("  GET  /export    - Export spell lists");
    println!("  GET  /overrides - Label and backdrop overrides");
    println!("  GET  /sources   - Catalog sources");
    println!("  GET  /health    - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(service, &config.server).await
}

// =============================================================================
// VIEW COMMANDS
// =============================================================================

/// Build and print one page, optionally narrowing its spells.
pub async fn cmd_view(
    config: &AppConfig,
    json_mode: bool,
    class: Option<&str>,
    subtab: Option<&str>,
    filter: Option<&str>,
) -> Result<(), ClassPagesError> {
    let service = ClassPagesService::from_config(config)?;
    let mut view = service.build_view(Caller::Privileged, class, subtab).await?;
    if let Some(filter) = filter {
        view.filter_spells(&SpellFilter::parse(filter));
    }
    print_view(&view, json_mode)
}

/// Arguments of `navigate`.
#[derive(Debug, Clone, Copy)]
pub struct NavigateArgs<'a> {
    pub action: &'a str,
    pub scope: &'a str,
    pub member: Option<&'a str>,
    pub state: Option<&'a Path>,
    pub class: Option<&'a str>,
    pub subtab: Option<&'a str>,
}

/// Build the action named on the command line.
pub fn parse_action(
    action: &str,
    scope: &str,
    member: Option<&str>,
) -> Result<NavAction, ClassPagesError> {
    let scope: ScopeId = scope.parse()?;
    match action.trim().to_ascii_lowercase().as_str() {
        "next" => Ok(NavAction::Next { scope }),
        "previous" | "prev" => Ok(NavAction::Previous { scope }),
        "focus" => Ok(NavAction::Focus { scope }),
        "jump" => {
            let member = member.ok_or_else(|| ClassPagesError::UnknownMember {
                scope: scope.to_string(),
                member: String::new(),
            })?;
            Ok(NavAction::Jump {
                scope,
                member: member.to_string(),
            })
        }
        other => Err(ClassPagesError::UnknownMember {
            scope: "action".to_string(),
            member: other.to_string(),
        }),
    }
}

/// Apply one action, starting from a saved state or a fresh page.
pub async fn cmd_navigate(
    config: &AppConfig,
    json_mode: bool,
    args: NavigateArgs<'_>,
) -> Result<(), ClassPagesError> {
    let action = parse_action(args.action, args.scope, args.member)?;
    let service = ClassPagesService::from_config(config)?;

    let previous = match args.state {
        Some(path) => {
            let text = read_input(path, MAX_STATE_FILE_SIZE)?;
            serde_json::from_str::<NavigationState>(&text)
                .map_err(|e| ClassPagesError::DeserializationError(e.to_string()))?
        }
        None => {
            service
                .build_view(Caller::Privileged, args.class, args.subtab)
                .await?
                .navigation
        }
    };

    let view = service
        .navigate(Caller::Privileged, Some(&previous), Some(&action))
        .await?;
    print_view(&view, json_mode)
}

fn print_view(view: &ViewModel, json_mode: bool) -> Result<(), ClassPagesError> {
    if json_mode {
        return print_json(view);
    }

    let Some(class) = &view.class else {
        println!("No classes loaded. Configure sources with `class-pages sources`.");
        print_reports(view);
        return Ok(());
    };

    println!("{} ({})", class.record.entry.name, class.record.identifier);
    println!("{}", "=".repeat(class.record.entry.name.len() + class.record.identifier.len() + 3));
    if let Some(subtab) = view.selection.subtab {
        println!("Subtab:   {}", subtab);
    }
    if let Some(backdrop) = &view.backdrop {
        println!("Backdrop: {}", backdrop);
    }
    println!();

    println!("{}:", view.subclass_label);
    if view.subclasses.is_empty() {
        println!("  (none)");
    }
    for subclass in &view.subclasses {
        println!("  - {}", subclass.record.entry.name);
    }
    println!();

    println!("Spells:");
    for bucket in view.spells.iter().filter(|b| !b.spells.is_empty()) {
        let names: Vec<&str> = bucket
            .spells
            .iter()
            .map(|s| s.record.entry.name.as_str())
            .collect();
        let marker = if view.selection.spell_level == Some(bucket.level) {
            ">"
        } else {
            " "
        };
        println!(" {} {}: {}", marker, bucket.label, names.join(", "));
    }
    println!();

    let gallery: Vec<String> = view
        .classes
        .iter()
        .map(|c| {
            if view.identifier.as_deref() == Some(c.identifier.as_str()) {
                format!("[{}]", c.name)
            } else {
                c.name.clone()
            }
        })
        .collect();
    println!("Classes: {}", gallery.join("  "));
    print_reports(view);
    Ok(())
}

fn print_reports(view: &ViewModel) {
    if view.reports.is_empty() {
        return;
    }
    println!();
    println!("Reports ({}):", view.reports.len());
    for report in &view.reports {
        println!("  - {}", report);
    }
}

// =============================================================================
// IMPORT / EXPORT COMMANDS
// =============================================================================

/// Import a spell list document.
pub async fn cmd_import(
    config: &AppConfig,
    json_mode: bool,
    input: &Path,
    mode: &str,
) -> Result<(), ClassPagesError> {
    let mode: ImportMode = mode.parse()?;
    let document = read_input(input, MAX_IMPORT_DOCUMENT_SIZE as u64)?;

    let service = ClassPagesService::from_config(config)?;
    let lists = service.import(Caller::Privileged, &document, mode).await?;

    if json_mode {
        return print_json(&lists);
    }
    println!("Imported spell lists ({} mode): {} classes", mode, lists.len());
    for (class, uuids) in lists.iter() {
        println!("  {}: {} spells", class, uuids.len());
    }
    Ok(())
}

/// Write the spell list backup.
pub async fn cmd_export(config: &AppConfig, output: Option<&Path>) -> Result<(), ClassPagesError> {
    let service = ClassPagesService::from_config(config)?;
    let document = service.export(Caller::Privileged).await?;

    let target = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(format!("{}.json", document.name)),
    };
    let validated_output = validate_output_path(&target)?;

    std::fs::write(&validated_output, &document.body)
        .map_err(|e| ClassPagesError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Exported {} bytes to {:?}",
        document.body.len(),
        validated_output
    );
    Ok(())
}

// =============================================================================
// CONFIGURATION COMMANDS
// =============================================================================

/// Show every class's overrides, or edit one class.
pub async fn cmd_override(
    config: &AppConfig,
    json_mode: bool,
    class: Option<&str>,
    label: Option<String>,
    backdrop: Option<String>,
) -> Result<(), ClassPagesError> {
    let service = ClassPagesService::from_config(config)?;

    let Some(class) = class else {
        let rows = service.overrides_table(Caller::Privileged).await?;
        if json_mode {
            return print_json(&rows);
        }
        println!("{:<24} {:<24} {:<20} BACKDROP", "CLASS", "NAME", "LABEL");
        for row in rows {
            println!(
                "{:<24} {:<24} {:<20} {}",
                row.identifier,
                row.name,
                row.label.as_deref().unwrap_or("-"),
                row.backdrop.as_deref().unwrap_or("-")
            );
        }
        return Ok(());
    };

    let overrides = service
        .set_override(Caller::Privileged, class, OverrideEdit { label, backdrop })
        .await?;
    if json_mode {
        return print_json(&overrides);
    }
    println!("Updated overrides for '{}'", class);
    println!("  Label:    {}", overrides.label(class).unwrap_or(config.default_subclass_label.as_str()));
    println!("  Backdrop: {}", overrides.backdrop(class).unwrap_or("-"));
    Ok(())
}

/// Show sources, or set one family's sources.
pub async fn cmd_sources(
    config: &AppConfig,
    json_mode: bool,
    record_type: Option<&str>,
    keys: Vec<String>,
    clear: bool,
) -> Result<(), ClassPagesError> {
    let service = ClassPagesService::from_config(config)?;

    if let Some(record_type) = record_type {
        let record_type: RecordType = record_type.parse()?;
        if keys.is_empty() && !clear {
            let sources = service.sources(Caller::Privileged).await?;
            let keys = sources.get(&record_type).cloned().unwrap_or_default();
            if json_mode {
                return print_json(&keys);
            }
            println!("{}: {}", record_type, keys.join(", "));
            return Ok(());
        }

        let stored = service
            .set_sources(Caller::Privileged, record_type, keys)
            .await?;
        if json_mode {
            return print_json(&stored);
        }
        println!("Set {} sources: {}", record_type, stored.join(", "));
        return Ok(());
    }

    let sources = service.sources(Caller::Privileged).await?;
    let available = service.available_sources(Caller::Privileged).await?;
    if json_mode {
        return print_json(&serde_json::json!({
            "sources": sources,
            "available": available,
        }));
    }
    for record_type in RecordType::ALL {
        let keys = sources.get(&record_type).cloned().unwrap_or_default();
        println!("{:<9} {}", format!("{}:", record_type), keys.join(", "));
    }
    println!();
    println!("Available: {}", available.join(", "));
    Ok(())
}

/// Print the list editor matrix.
pub async fn cmd_lists(
    config: &AppConfig,
    json_mode: bool,
    filter: Option<&str>,
) -> Result<(), ClassPagesError> {
    let service = ClassPagesService::from_config(config)?;
    let matrix = service
        .lists(Caller::Privileged, &SpellFilter::parse(filter.unwrap_or_default()))
        .await?;

    if json_mode {
        return print_json(&matrix);
    }

    let classes: Vec<&str> = matrix.classes.keys().map(String::as_str).collect();
    println!("{:<32} {:>5} {:<5} {}", "SPELL", "LEVEL", "SCHL", classes.join(" "));
    for row in &matrix.rows {
        let flags: Vec<String> = classes
            .iter()
            .map(|c| {
                let mark = if row.classes.get(*c).copied().unwrap_or(false) {
                    "x"
                } else {
                    "."
                };
                format!("{:^width$}", mark, width = c.len())
            })
            .collect();
        println!(
            "{:<32} {:>5} {:<5} {}",
            row.name,
            row.level.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string()),
            row.school.as_deref().unwrap_or("-"),
            flags.join(" ")
        );
    }
    println!();
    println!("{} spells", matrix.rows.len());
    Ok(())
}

/// Replace one class's list, or toggle a single spell.
pub async fn cmd_set_list(
    config: &AppConfig,
    json_mode: bool,
    class: &str,
    uuids: Vec<String>,
    add: Option<String>,
    remove: Option<String>,
) -> Result<(), ClassPagesError> {
    let service = ClassPagesService::from_config(config)?;

    let lists = match (add, remove) {
        (Some(uuid), _) => {
            service
                .toggle_spell(Caller::Privileged, class, &uuid, true)
                .await?
        }
        (None, Some(uuid)) => {
            service
                .toggle_spell(Caller::Privileged, class, &uuid, false)
                .await?
        }
        (None, None) => service.set_spell_list(Caller::Privileged, class, uuids).await?,
    };

    if json_mode {
        return print_json(&lists.list(class));
    }
    println!("'{}' now has {} spells", class, lists.list(class).len());
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create the settings database, the catalog directory and a config file.
pub fn cmd_init(
    config: &AppConfig,
    config_path: Option<&Path>,
    force: bool,
) -> Result<(), ClassPagesError> {
    if config.database.exists() {
        if !force {
            return Err(ClassPagesError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&config.database)
            .map_err(|e| ClassPagesError::IoError(format!("Remove database: {}", e)))?;
    }

    let gateway = SettingsGateway::open_persistent(&config.database)?;
    drop(gateway);
    println!("Initialized settings database at {:?}", config.database);

    std::fs::create_dir_all(&config.catalog_dir)
        .map_err(|e| ClassPagesError::IoError(format!("Create catalog directory: {}", e)))?;
    println!("Catalog directory: {:?}", config.catalog_dir);

    let config_path = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    if config_path.exists() {
        println!("Config file {:?} already exists, left unchanged", config_path);
    } else {
        std::fs::write(config_path, config.to_toml()?)
            .map_err(|e| ClassPagesError::IoError(format!("Write config: {}", e)))?;
        println!("Wrote config file {:?}", config_path);
    }

    Ok(())
}
