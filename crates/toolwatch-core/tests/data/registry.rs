use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use toolwatch_core::{
    Error, EventBus, EventFilter, LoadMode, PersistenceError, RegistryError, RegistryEvent, Tool,
    ToolRegistry, ToolType, ToolUpdate, ToolwatchEvent,
};

fn bus() -> Arc<EventBus> {
    Arc::new(EventBus::new())
}

fn recorded_events(bus: &EventBus) -> Arc<Mutex<Vec<ToolwatchEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    bus.subscribe(EventFilter::All, move |event| {
        sink.lock().unwrap().push(event.clone());
    });
    events
}

fn sample_tool(id: u32) -> Tool {
    let mut tool = Tool::new(id, format!("Endmill {}", id), ToolType::Endmill, 6.0, 50.0)
        .with_limits(3_600.0, 1_000.0);
    tool.description = "two flute carbide".to_string();
    tool.max_rpm = 24_000;
    tool.feedrate = 800.0;
    tool
}

#[test]
fn test_save_then_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tool_database.json");

    let original = {
        let mut reg = ToolRegistry::load(&path, LoadMode::Strict, bus()).unwrap();
        reg.add(sample_tool(1)).unwrap();
        reg.add(sample_tool(2)).unwrap();
        reg.add(Tool::new(7, "V60", ToolType::Vbit, 6.35, 38.0)).unwrap();
        reg.select(2).unwrap();
        reg.record_usage(120.0, 250.0, true);
        reg.list(None).into_iter().cloned().collect::<Vec<_>>()
    };

    let reg = ToolRegistry::load(&path, LoadMode::Strict, bus()).unwrap();
    let loaded: Vec<Tool> = reg.list(None).into_iter().cloned().collect();
    assert_eq!(loaded, original);
    assert_eq!(reg.current_id(), Some(2));
    assert_eq!(reg.get(2).unwrap().spindle_on_count, 1);
}

#[test]
fn test_file_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tools.json");

    let mut reg = ToolRegistry::load(&path, LoadMode::Recover, bus()).unwrap();
    reg.add(sample_tool(4)).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["version"], "1.0");
    assert!(json["saved_at"].is_string());
    assert!(json["current_tool"].is_null());
    assert_eq!(json["tools"][0]["tool_type"], "endmill");
    assert_eq!(json["tools"][0]["tool_id"], 4);
}

#[test]
fn test_missing_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let reg = ToolRegistry::load(dir.path().join("absent.json"), LoadMode::Strict, bus()).unwrap();
    assert!(reg.is_empty());
    assert!(reg.current().is_none());
}

#[test]
fn test_corrupt_file_is_moved_aside() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tools.json");
    fs::write(&path, "{\"version\": \"1.0\", \"tools\": [").unwrap();

    let reg = ToolRegistry::load(&path, LoadMode::Recover, bus()).unwrap();
    assert!(reg.is_empty());
    assert!(!path.exists());

    let quarantined: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
        .collect();
    assert_eq!(quarantined.len(), 1);
}

#[test]
fn test_corrupt_file_strict_mode_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tools.json");
    fs::write(&path, "not json at all").unwrap();

    let err = ToolRegistry::load(&path, LoadMode::Strict, bus()).unwrap_err();
    assert!(matches!(
        err,
        Error::Persistence(PersistenceError::Corrupt { .. })
    ));
    assert!(path.exists());
}

#[test]
fn test_select_inactive_fails_without_mutation() {
    let mut reg = ToolRegistry::in_memory(bus());
    reg.add(sample_tool(1)).unwrap();
    reg.add(sample_tool(2)).unwrap();
    reg.select(1).unwrap();
    reg.update(2, &ToolUpdate::from_fields([("IS_ACTIVE", "0")]).unwrap())
        .unwrap();

    assert_eq!(
        reg.select(2).unwrap_err(),
        RegistryError::InactiveTool { tool_id: 2 }
    );
    assert_eq!(reg.current_id(), Some(1));
}

#[test]
fn test_select_worn_tool_emits_one_warning() {
    let bus = bus();
    let events = recorded_events(&bus);
    let mut reg = ToolRegistry::in_memory(bus.clone());

    let mut tool = sample_tool(5).with_limits(100.0, 0.0);
    tool.update_usage(85.0, 0.0);
    reg.add(tool).unwrap();

    let selected = reg.select(5).unwrap();
    assert_eq!(selected.tool_id, 5);

    let events = events.lock().unwrap();
    let warnings: Vec<_> = events.iter().filter(|e| e.is_warning()).collect();
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        warnings[0],
        ToolwatchEvent::Registry(RegistryEvent::WearWarning { tool_id: 5, .. })
    ));
}

#[test]
fn test_select_exhausted_tool_emits_replacement_only() {
    let bus = bus();
    let events = recorded_events(&bus);
    let mut reg = ToolRegistry::in_memory(bus.clone());

    let mut tool = sample_tool(6).with_limits(0.0, 1_000.0);
    tool.update_usage(0.0, 1_500.0);
    reg.add(tool).unwrap();
    reg.select(6).unwrap();

    let events = events.lock().unwrap();
    let warnings: Vec<_> = events.iter().filter(|e| e.is_warning()).collect();
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        warnings[0],
        ToolwatchEvent::Registry(RegistryEvent::ReplacementWarning { tool_id: 6 })
    ));
}

#[test]
fn test_distance_wear_scenario() {
    let mut reg = ToolRegistry::in_memory(bus());
    reg.add(Tool::new(1, "T1", ToolType::Endmill, 6.0, 50.0).with_limits(0.0, 1_000.0))
        .unwrap();
    reg.select(1).unwrap();

    for _ in 0..3 {
        reg.record_usage(0.0, 250.0, true);
    }
    assert!((reg.current().unwrap().wear_level - 75.0).abs() < 1e-9);

    let tool = reg.record_usage(0.0, 250.0, true).unwrap();
    assert_eq!(tool.wear_level, 100.0);
    assert!(tool.needs_replacement());
}

#[test]
fn test_export_then_import() {
    let dir = TempDir::new().unwrap();
    let export_path = dir.path().join("export.json");

    let mut source = ToolRegistry::in_memory(bus());
    source.add(sample_tool(1)).unwrap();
    source.add(sample_tool(2)).unwrap();
    assert_eq!(source.export_to(&export_path).unwrap(), 2);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&export_path).unwrap()).unwrap();
    assert!(json["exported_at"].is_string());
    assert_eq!(json["tools"].as_array().unwrap().len(), 2);

    let mut target = ToolRegistry::in_memory(bus());
    let mut existing = sample_tool(2);
    existing.name = "keep me".to_string();
    target.add(existing).unwrap();

    let summary = target.import_from(&export_path, false).unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(target.get(2).unwrap().name, "keep me");

    let summary = target.import_from(&export_path, true).unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(target.get(2).unwrap().name, "Endmill 2");
}

#[test]
fn test_import_duplicates_and_inactive_current() {
    let dir = TempDir::new().unwrap();
    let export_path = dir.path().join("export.json");

    let mut retired = sample_tool(1);
    retired.is_active = false;
    let mut duplicate = sample_tool(2);
    duplicate.name = "second copy".to_string();
    let export = serde_json::json!({
        "exported_at": "2026-03-01T08:00:00Z",
        "tools": [retired, sample_tool(2), duplicate],
    });
    fs::write(&export_path, export.to_string()).unwrap();

    let mut reg = ToolRegistry::in_memory(bus());
    reg.add(sample_tool(1)).unwrap();
    reg.select(1).unwrap();

    let summary = reg.import_from(&export_path, true).unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(reg.len(), 2);
    assert_eq!(reg.get(2).unwrap().name, "Endmill 2");

    assert!(!reg.get(1).unwrap().is_active);
    assert_eq!(reg.current_id(), None);
    assert!(reg.status().current_tool.is_none());
}

#[test]
fn test_failed_save_is_flagged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db").join("tools.json");

    let bus = bus();
    let events = recorded_events(&bus);
    let mut reg = ToolRegistry::load(&path, LoadMode::Strict, bus.clone()).unwrap();

    // A plain file where the database directory should be
    fs::write(dir.path().join("db"), "x").unwrap();

    reg.add(sample_tool(1)).unwrap();
    assert!(reg.get(1).is_some());
    assert!(reg.has_unsaved_changes());
    assert!(reg.status().unsaved_changes);
    assert!(events.lock().unwrap().iter().any(|e| matches!(
        e,
        ToolwatchEvent::Registry(RegistryEvent::SaveFailed { .. })
    )));

    fs::remove_file(dir.path().join("db")).unwrap();
    reg.save().unwrap();
    assert!(!reg.has_unsaved_changes());
    assert!(path.exists());
}
