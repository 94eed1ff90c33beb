use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use nibble_core::models::{ExportData, non_blank};
use nibble_core::service::NibbleService;

pub(crate) fn cmd_profile(
    svc: &NibbleService,
    baby_name: Option<String>,
    clear: bool,
    json: bool,
) -> Result<()> {
    if clear {
        svc.set_baby_name(None)?;
    } else if let Some(name) = non_blank(baby_name) {
        svc.set_baby_name(Some(&name))?;
    }

    let name = svc.baby_name()?;
    if json {
        println!("{}", serde_json::json!({ "baby_name": name }));
    } else {
        match name {
            Some(name) => println!("Baby name: {name}"),
            None => println!("Baby name: (not set)"),
        }
    }
    Ok(())
}

pub(crate) fn cmd_export(svc: &NibbleService, output: Option<&Path>, json: bool) -> Result<()> {
    let data = svc.export_all()?;
    let body = serde_json::to_string_pretty(&data)?;

    let Some(path) = output else {
        println!("{body}");
        return Ok(());
    };

    fs::write(path, format!("{body}\n"))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if json {
        let value = serde_json::json!({
            "path": path.display().to_string(),
            "foods": data.foods.len(),
            "calendar_entries": data.calendar_entries.len(),
            "manual_marks": data.manual_marks.len(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!(
            "Exported {} foods, {} calendar entries and {} marks to {}",
            data.foods.len(),
            data.calendar_entries.len(),
            data.manual_marks.len(),
            path.display()
        );
    }
    Ok(())
}

pub(crate) fn cmd_import(svc: &NibbleService, file: &Path, json: bool) -> Result<()> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let data: ExportData = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a nibble export", file.display()))?;

    let summary = svc.import_all(&data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Import complete:");
        println!("  Foods:            {}", summary.foods_imported);
        println!("  Calendar entries: {}", summary.calendar_entries_imported);
        println!("  Marks:            {}", summary.manual_marks_imported);
        if summary.rows_skipped > 0 {
            println!("  Skipped:          {}", summary.rows_skipped);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_then_import_into_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");

        let source = NibbleService::new_in_memory().unwrap();
        source.seed_defaults().unwrap();
        source.set_baby_name(Some("Ada")).unwrap();
        cmd_export(&source, Some(&path), false).unwrap();

        let target = NibbleService::new_in_memory().unwrap();
        cmd_import(&target, &path, false).unwrap();
        assert_eq!(
            target.list_foods(None).unwrap().len(),
            source.list_foods(None).unwrap().len()
        );
        assert_eq!(target.baby_name().unwrap().as_deref(), Some("Ada"));
    }

    #[test]
    fn test_import_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        fs::write(&path, "{\"hello\": 1}").unwrap();

        let svc = NibbleService::new_in_memory().unwrap();
        let err = cmd_import(&svc, &path, false).unwrap_err();
        assert!(format!("{err:#}").contains("not a nibble export"));
    }
}
