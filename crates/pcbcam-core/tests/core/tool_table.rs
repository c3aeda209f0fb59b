use pcbcam_core::geometry::{Point, Polygon, Shape};
use pcbcam_core::{DrillTool, DrillTools, GeometryTools, Slot, Tool, ToolTableError};

fn squares(n: usize) -> Vec<Shape> {
    (0..n)
        .map(|i| Shape::Polygon(Polygon::rectangle(i as f64 * 2.0, 0.0, 1.0, 1.0)))
        .collect()
}

#[test]
fn test_removing_last_tool_keeps_geometry() {
    let mut table = GeometryTools::new();
    let geometry = squares(3);
    let id = table.insert(Tool::new(0.2, 4).with_geometry(geometry.clone()));

    let removed = table.remove(id).unwrap();
    assert!(table.is_empty());
    assert!(removed.solid_geometry.is_empty());
    assert_eq!(table.ungrouped(), geometry.as_slice());
}

#[test]
fn test_removing_one_of_many_tools_returns_its_geometry() {
    let mut table = GeometryTools::new();
    table.insert(Tool::new(0.2, 4).with_geometry(squares(1)));
    let id = table.insert(Tool::new(0.4, 4).with_geometry(squares(2)));

    let removed = table.remove(id).unwrap();
    assert_eq!(removed.solid_geometry.len(), 2);
    assert!(table.ungrouped().is_empty());
}

#[test]
fn test_drill_geometry_moves_to_ungrouped() {
    let mut table = DrillTools::new();
    let mut tool = DrillTool::new(0.8, 4);
    tool.drills.push(Point::new(1.0, 1.0));
    tool.slots.push(Slot {
        start: Point::new(0.0, 0.0),
        end: Point::new(0.0, 2.0),
    });
    table.insert(tool);
    table.remove(1).unwrap();
    assert_eq!(table.ungrouped().len(), 2);
    assert!(matches!(table.ungrouped()[0], Shape::Point(_)));
}

#[test]
fn test_json_round_trip_keeps_integer_ids_and_order() {
    let mut table = GeometryTools::new();
    table.insert(Tool::new(1.0, 4));
    table.insert(Tool::new(0.5, 4));
    table.move_to(2, 0).unwrap();

    let json = serde_json::to_string(&table).unwrap();
    assert!(json.contains("\"id\":2"));
    let back: GeometryTools = serde_json::from_str(&json).unwrap();
    assert_eq!(back.ids(), vec![2, 1]);
    assert_eq!(back, table);
}

#[test]
fn test_legacy_string_keys_are_coerced() {
    let json = r#"{
        "tools": {
            "2.0": { "diameter": 0.5 },
            "1": { "diameter": 1.0 },
            "10": { "diameter": 2.0 }
        }
    }"#;
    let table: GeometryTools = serde_json::from_str(json).unwrap();
    assert_eq!(table.ids(), vec![1, 2, 10]);
    assert_eq!(table.get(2).unwrap().diameter, 0.5);
}

#[test]
fn test_legacy_float_ids_in_list_are_coerced() {
    let json = r#"{ "tools": [ { "id": "3", "tool": { "diameter": 0.5 } },
                               { "id": 4.0, "tool": { "diameter": 0.6 } } ] }"#;
    let table: GeometryTools = serde_json::from_str(json).unwrap();
    assert_eq!(table.ids(), vec![3, 4]);
}

#[test]
fn test_non_integral_keys_are_rejected() {
    let json = r#"{ "tools": { "2.5": { "diameter": 0.5 } } }"#;
    let err = serde_json::from_str::<GeometryTools>(json).unwrap_err();
    assert!(err.to_string().contains("Invalid tool key"));

    let dup = r#"{ "tools": { "2": { "diameter": 0.5 }, "2.0": { "diameter": 0.6 } } }"#;
    assert!(serde_json::from_str::<GeometryTools>(dup).is_err());
}

#[test]
fn test_unknown_tool() {
    let mut table = DrillTools::new();
    assert_eq!(table.remove(1).unwrap_err(), ToolTableError::UnknownTool(1));
}
