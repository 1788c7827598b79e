//! Project management commands.

use anyhow::{bail, Context, Result};

use crate::registry::{Metadata, MetadataValue, ProjectRecord, ProjectRegistry, STORE_FILE};
use crate::Config;

fn open_registry() -> Result<ProjectRegistry> {
    let config = Config::from_env().context("failed to resolve the base directory")?;
    Ok(ProjectRegistry::open(config))
}

/// List all registered projects.
pub fn list() -> Result<()> {
    let registry = open_registry()?;
    let names = registry.list()?;

    if names.is_empty() {
        println!("No projects yet.");
        println!("\nTo create one, run:");
        println!("  atelier create <name>");
        return Ok(());
    }

    let active_name = registry.active()?.map(|d| d.name().to_string());

    println!("Projects:\n");
    println!("{:<3} {:<24} {:<20} {:<50}", "", "NAME", "CREATED", "PATH");
    println!("{}", "-".repeat(99));

    for name in &names {
        let Some(record) = registry.get(name)? else {
            continue;
        };
        let marker = if Some(name) == active_name.as_ref() {
            "*"
        } else {
            ""
        };

        let path_display = truncate_path(&record.display_path(), 48);
        let path_status = if record.data_dir_exists() {
            path_display
        } else {
            format!("{} (missing)", path_display)
        };

        println!(
            "{:<3} {:<24} {:<20} {:<50}",
            marker,
            truncate_string(name, 22),
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            path_status
        );
    }

    println!("\n* = active project");
    println!("\nTotal: {} project(s)", names.len());

    Ok(())
}

/// Create a new project.
pub fn create(name: String, meta: Vec<String>) -> Result<()> {
    let registry = open_registry()?;
    let metadata = parse_meta(&meta)?;

    let record = registry
        .create(&name, metadata)
        .with_context(|| format!("failed to create project '{}'", name))?;

    println!("Created project '{}'", name);
    println!("Data directory: {}", record.display_path());
    Ok(())
}

/// Make a project the active one.
pub fn activate(name: String) -> Result<()> {
    let registry = open_registry()?;

    let dataset = registry
        .activate(&name)
        .with_context(|| format!("failed to activate project '{}'", name))?;

    println!("Activated project '{}'", dataset.name());
    println!("Data directory: {}", dataset.data_dir().display());
    Ok(())
}

/// Clear the active-project selection.
pub fn deactivate() -> Result<()> {
    let registry = open_registry()?;
    registry.deactivate()?;
    println!("Cleared the active project.");
    Ok(())
}

/// Copy a project, data directory included.
pub fn copy(source: String, dest: String) -> Result<()> {
    let registry = open_registry()?;

    let record = registry
        .copy(&source, &dest)
        .with_context(|| format!("failed to copy project '{}' to '{}'", source, dest))?;

    println!("Copied project '{}' to '{}'", source, dest);
    println!("Data directory: {}", record.display_path());
    Ok(())
}

/// Rename a project.
pub fn rename(old: String, new: String) -> Result<()> {
    let registry = open_registry()?;

    registry
        .rename(&old, &new)
        .with_context(|| format!("failed to rename project '{}' to '{}'", old, new))?;

    println!("Renamed project '{}' to '{}'", old, new);
    Ok(())
}

/// Delete a project and its data directory.
pub fn delete(name: String, require_empty: bool) -> Result<()> {
    let registry = open_registry()?;

    registry
        .delete(&name, require_empty)
        .with_context(|| format!("failed to delete project '{}'", name))?;

    println!("Deleted project '{}'", name);
    Ok(())
}

/// Show the active project and registry location.
pub fn status() -> Result<()> {
    let registry = open_registry()?;

    match registry.active()? {
        Some(dataset) => {
            let Some(record) = registry.get(dataset.name())? else {
                bail!("active project '{}' disappeared mid-read", dataset.name());
            };
            print_project_details("Active project", &record);
        }
        None => {
            println!("No active project.");
            println!("Use 'atelier activate <name>' to select one.");
        }
    }

    println!("\n---");
    println!(
        "Registry: {}",
        registry.config().base_dir().join(STORE_FILE).display()
    );
    println!("Total projects: {}", registry.list()?.len());

    Ok(())
}

fn print_project_details(label: &str, record: &ProjectRecord) {
    println!("{}: {}", label, record.name);
    println!("  Path: {}", record.display_path());

    if record.data_dir_exists() {
        let size = dir_size(&record.data_dir);
        println!("  Size: {}", format_bytes(size));
    } else {
        println!("  Status: PATH MISSING");
    }

    println!(
        "  Created: {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if !record.metadata.is_empty() {
        println!("  Metadata:");
        for (key, value) in &record.metadata {
            println!("    {} = {}", key, format_value(value));
        }
    }
}

/// Parse `KEY=VALUE` pairs into a metadata mapping.
fn parse_meta(pairs: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("metadata entry '{}' is not of the form KEY=VALUE", pair);
        };
        if key.is_empty() {
            bail!("metadata entry '{}' has an empty key", pair);
        }
        metadata.insert(key.to_string(), parse_value(value));
    }
    Ok(metadata)
}

/// Interpret a metadata value: bool, then integer, then float, else text.
fn parse_value(raw: &str) -> MetadataValue {
    if let Ok(b) = raw.parse::<bool>() {
        return MetadataValue::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return MetadataValue::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return MetadataValue::Float(f);
    }
    MetadataValue::Text(raw.to_string())
}

fn format_value(value: &MetadataValue) -> String {
    match value {
        MetadataValue::Bool(b) => b.to_string(),
        MetadataValue::Integer(i) => i.to_string(),
        MetadataValue::Float(f) => f.to_string(),
        MetadataValue::Text(s) => s.clone(),
        MetadataValue::Map(map) => format!("{{{} entries}}", map.len()),
    }
}

/// Calculate the total size of a directory tree.
fn dir_size(path: &std::path::Path) -> u64 {
    let mut total = 0u64;
    for entry in walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() {
            total += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    total
}

/// Format bytes in a human-readable way.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Truncate a string to a maximum length, adding "..." if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        format!("{}...", &s[..max_len - 3])
    } else {
        s[..max_len].to_string()
    }
}

/// Truncate a path to a maximum length, showing the end.
fn truncate_path(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        format!("...{}", &s[s.len() - max_len + 3..])
    } else {
        s[s.len() - max_len..].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta() {
        let meta = parse_meta(&[
            "unit=kilogram".to_string(),
            "runs=3".to_string(),
            "scale=0.5".to_string(),
            "calibrated=true".to_string(),
        ])
        .unwrap();

        assert_eq!(meta.get("unit"), Some(&MetadataValue::from("kilogram")));
        assert_eq!(meta.get("runs"), Some(&MetadataValue::Integer(3)));
        assert_eq!(meta.get("scale"), Some(&MetadataValue::Float(0.5)));
        assert_eq!(meta.get("calibrated"), Some(&MetadataValue::Bool(true)));
    }

    #[test]
    fn test_parse_meta_rejects_malformed_pairs() {
        assert!(parse_meta(&["no-equals".to_string()]).is_err());
        assert!(parse_meta(&["=value".to_string()]).is_err());
    }

    #[test]
    fn test_parse_meta_keeps_extra_equals_in_value() {
        let meta = parse_meta(&["query=a=b".to_string()]).unwrap();
        assert_eq!(meta.get("query"), Some(&MetadataValue::from("a=b")));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_path() {
        assert_eq!(truncate_path("/short/path", 20), "/short/path");
        assert_eq!(truncate_path("/very/long/path/here", 15), "...ng/path/here");
    }
}
