// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use cityjson_lite_core::{ErrorKind, Vertex};
use cityjson_lite_processing::{
    merge_object_info, read_batch, AttributeFilter, BatchResult, Error, FlatTable,
    FlattenExporter, ReaderSettings, SettingsIssue,
};

const DISTRICT: &str = r#"{
    "type": "CityJSON",
    "version": "1.1",
    "transform": { "scale": [1.0, 1.0, 1.0], "translate": [100.0, 200.0, 0.0] },
    "CityObjects": {
        "district": {
            "type": "Building",
            "attributes": { "height": 12, "owner": "city" },
            "children": ["house"]
        },
        "house": {
            "type": "BuildingPart",
            "parents": ["district"],
            "attributes": { "owner": "me" },
            "geometry": [{
                "type": "MultiSurface",
                "lod": "2",
                "boundaries": [[[0, 1, 2]], [[1, 3, 2]]],
                "semantics": {
                    "surfaces": [{ "type": "RoofSurface" }, { "type": "WallSurface" }],
                    "values": [0, 1]
                },
                "material": { "visual": { "value": 0 } }
            }]
        },
        "tree": {
            "type": "SolitaryVegetationObject",
            "geometry": [{
                "type": "GeometryInstance",
                "template": 0,
                "boundaries": [4],
                "transformationMatrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1]
            }]
        }
    },
    "geometry-templates": {
        "templates": [{ "type": "MultiSurface", "lod": "1", "boundaries": [[[0, 1, 2]]] }],
        "vertices-templates": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
    },
    "appearance": { "materials": [{ "name": "brick" }] },
    "vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0], [1, 1, 0], [10, 20, 5]]
}"#;

const NEIGHBOUR: &str = r#"{
    "type": "CityJSON",
    "version": "1.1",
    "transform": { "scale": [1.0, 1.0, 1.0], "translate": [110.0, 195.0, 0.0] },
    "CityObjects": {
        "house": {
            "type": "Building",
            "attributes": { "roofMaterial": "tiles" },
            "geometry": [{ "type": "MultiSurface", "lod": "1", "boundaries": [[[0, 1, 2]]] }]
        },
        "shed": {
            "type": "Building",
            "geometry": [{ "type": "MultiSurface", "lod": "1", "boundaries": [[[0, 1, 2]]] }]
        }
    },
    "vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0]]
}"#;

const FUTURE_VERSION: &str = r#"{
    "type": "CityJSON",
    "version": "2.0",
    "transform": { "scale": [1.0, 1.0, 1.0], "translate": [0.0, 0.0, 0.0] },
    "CityObjects": {},
    "vertices": []
}"#;

const EDGE_CASES: &str = r#"{
    "type": "CityJSON",
    "version": "1.1",
    "transform": { "scale": [1.0, 1.0, 1.0], "translate": [0.0, 0.0, 0.0] },
    "CityObjects": {
        "flat": {
            "type": "Building",
            "attributes": { "Name": "Flat block" },
            "geometry": [{
                "type": "MultiSurface",
                "lod": "2",
                "boundaries": [[[0, 1, 2]]],
                "semantics": { "surfaces": [{ "type": "RoofSurface" }], "values": [0] }
            }]
        },
        "orphan": {
            "type": "BuildingPart",
            "parents": ["gone"],
            "attributes": { "h": 1 },
            "geometry": [{ "type": "MultiSurface", "lod": "2", "boundaries": [[[0, 1, 3]]] }]
        },
        "tree": {
            "type": "SolitaryVegetationObject",
            "geometry": [{ "type": "GeometryInstance", "template": 7, "boundaries": [0] }]
        }
    },
    "geometry-templates": {
        "templates": [{ "type": "MultiSurface", "lod": "1", "boundaries": [[[0, 1, 2]]] }],
        "vertices-templates": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
    },
    "vertices": [[0, 0, 0], [1, 0, 0], [2, 0, 0], [0, 1, 0]]
}"#;

fn rows_named(table: &FlatTable, name: &str) -> Vec<usize> {
    (0..table.len())
        .filter(|&r| table.get(r, "Name") == Some(name))
        .collect()
}

fn read_all(settings: &ReaderSettings) -> BatchResult {
    read_batch(&[DISTRICT, NEIGHBOUR, FUTURE_VERSION], settings).unwrap()
}

fn shed_origin(batch: &BatchResult) -> Vertex {
    let shed = batch.collection.get("shed").unwrap();
    shed.geo_objects()[0].surfaces[0].face.rings.outer[0]
}

#[test]
fn later_files_are_offset_from_the_first_translate() {
    let batch = read_all(&ReaderSettings::default());

    assert_eq!(batch.floating_origin, Some([100.0, 200.0, 0.0]));
    let v = shed_origin(&batch);
    assert_relative_eq!(v.x, 10.0);
    assert_relative_eq!(v.y, -5.0);
    assert_relative_eq!(v.z, 0.0);
}

#[test]
fn own_translate_keeps_absolute_coordinates() {
    let settings = ReaderSettings {
        translate: true,
        ..Default::default()
    };
    let batch = read_all(&settings);

    assert_eq!(batch.floating_origin, None);
    let v = shed_origin(&batch);
    assert_relative_eq!(v.x, 110.0);
    assert_relative_eq!(v.y, 195.0);
}

#[test]
fn invalid_file_is_dropped_and_recorded() {
    let batch = read_all(&ReaderSettings::default());

    let dropped: Vec<_> = batch.issues.iter().filter(|i| i.file == Some(2)).collect();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].kind, ErrorKind::StructuralInvalid);
    assert_eq!(dropped[0].object, None);
    assert_eq!(batch.collection.len(), 4);
}

#[test]
fn duplicate_name_keeps_the_first_object() {
    let batch = read_all(&ReaderSettings::default());

    let duplicate = batch
        .issues
        .iter()
        .find(|i| i.file == Some(1))
        .unwrap();
    assert_eq!(duplicate.object.as_deref(), Some("house"));
    assert_eq!(duplicate.kind, ErrorKind::ReferentialMissing);
    assert_eq!(batch.collection.get("house").unwrap().object_type, "BuildingPart");
}

#[test]
fn object_table_marks_inherited_values() {
    let batch = read_all(&ReaderSettings::default());
    let export = FlattenExporter::new(&batch).export();
    let objects = &export.objects;

    assert!(export.issues.is_empty());
    let names: Vec<&str> = (0..objects.len())
        .filter_map(|r| objects.get(r, "Name"))
        .collect();
    // the district has no geometry and gets no row
    assert_eq!(names, vec!["house", "tree", "shed"]);

    assert_eq!(objects.get(0, "height"), Some("12*"));
    assert_eq!(objects.get(0, "owner"), Some("me"));
    assert_eq!(objects.get(0, "Parents"), Some("district"));
    assert_eq!(objects.get(0, "Template"), Some("None"));
    assert_eq!(objects.get(2, "height"), Some("None"));
    // only the dropped duplicate had this key
    assert_eq!(objects.column("roofMaterial"), None);
}

#[test]
fn instance_is_placed_at_its_anchor() {
    let batch = read_all(&ReaderSettings::default());

    let placed = &batch.instances["tree"];
    assert_eq!(placed.lod.as_deref(), Some("1"));
    let outer = &placed.surfaces[0].face.rings.outer;
    assert_eq!(outer[0], Vertex::new(10.0, 20.0, 5.0));
    assert_eq!(outer[1], Vertex::new(11.0, 20.0, 5.0));

    let objects = FlattenExporter::new(&batch).object_table();
    assert_eq!(objects.get(1, "Template"), Some("0"));
    assert_eq!(objects.get(1, "Anchor"), Some("10, 20, 5"));
}

#[test]
fn surface_table_resolves_semantics_and_materials() {
    let batch = read_all(&ReaderSettings::default());
    let surfaces = FlattenExporter::new(&batch).surface_table();

    assert_eq!(surfaces.len(), 4);
    assert_eq!(surfaces.get(0, "type"), Some("RoofSurface"));
    assert_eq!(surfaces.get(1, "type"), Some("WallSurface"));
    assert_eq!(surfaces.get(0, "Material visual"), Some("brick"));
    assert_eq!(surfaces.get(0, "LoD"), Some("2"));
    assert_eq!(surfaces.get(2, "Name"), Some("tree"));
    assert_eq!(surfaces.get(2, "type"), Some("None"));
    assert_eq!(surfaces.get(2, "Material visual"), Some("None"));
}

#[test]
fn merged_table_carries_object_columns() {
    let batch = read_all(&ReaderSettings::default());
    let export = FlattenExporter::new(&batch).export();
    let merged = merge_object_info(&export.objects, &export.surfaces);

    assert_eq!(merged.len(), export.surfaces.len());
    assert_eq!(merged.get(1, "Object Type"), Some("BuildingPart"));
    assert_eq!(merged.get(1, "height"), Some("12*"));
    assert_eq!(merged.get(3, "Object Type"), Some("Building"));
}

#[test]
fn lod_filter_drops_objects_and_instances() {
    let settings = ReaderSettings {
        lods: vec!["2".into()],
        ..Default::default()
    };
    let batch = read_all(&settings);

    assert!(batch.collection.get("tree").unwrap().is_filtered_out);
    assert!(batch.collection.get("shed").unwrap().is_filtered_out);
    assert!(batch.instances.is_empty());

    let objects = FlattenExporter::new(&batch).object_table();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects.get(0, "Name"), Some("house"));
    assert_eq!(batch.meshes_by_lod().keys().collect::<Vec<_>>(), vec!["2"]);
}

#[test]
fn meshes_are_grouped_by_lod() {
    let batch = read_all(&ReaderSettings::default());
    let meshes = batch.meshes_by_lod();

    assert_eq!(meshes.keys().collect::<Vec<_>>(), vec!["1", "2"]);
    assert_eq!(meshes["2"].triangle_count(), 2);
    // instanced tree plus the shed
    assert_eq!(meshes["1"].triangle_count(), 2);
}

#[test]
fn attribute_filter_follows_inheritance() {
    let batch = read_all(&ReaderSettings::default());
    let filter = AttributeFilter::new(Some("height".into()), vec!["12".into()]).unwrap();

    let (selected, issues) = filter.select(&batch);
    let names: Vec<&str> = selected.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["house"]);
    assert!(issues.is_empty());

    let surfaces = FlattenExporter::new(&batch).surface_table();
    let kept = filter.filter_table(&batch, &surfaces);
    assert_eq!(kept.len(), 2);
}

#[test]
fn attribute_filter_needs_key_and_values() {
    assert!(matches!(
        AttributeFilter::new(Some("height".into()), Vec::new()),
        Err(Error::FilterInputMismatch(_))
    ));
}

#[test]
fn invalid_settings_abort_the_batch() {
    let settings = ReaderSettings {
        true_north_degrees: 15.0,
        ..Default::default()
    };
    assert!(matches!(
        read_batch(&[DISTRICT], &settings),
        Err(Error::InvalidSettings(SettingsIssue::NorthWithoutOrigin))
    ));
}

#[test]
fn geometry_with_no_built_surface_keeps_its_rows() {
    let batch = read_batch(&[EDGE_CASES], &ReaderSettings::default()).unwrap();
    let geo = &batch.collection.get("flat").unwrap().geo_objects()[0];
    assert!(geo.degraded);
    assert!(geo.surfaces.is_empty());

    let surfaces = FlattenExporter::new(&batch).surface_table();
    let rows = rows_named(&surfaces, "flat");
    assert_eq!(rows.len(), 1);
    assert_eq!(surfaces.get(rows[0], "Degraded"), Some("true"));
    assert_eq!(surfaces.get(rows[0], "type"), Some("RoofSurface"));
}

#[test]
fn missing_template_is_reported_under_lod_filter() {
    let settings = ReaderSettings {
        lods: vec!["1".into(), "2".into()],
        ..Default::default()
    };
    let batch = read_batch(&[EDGE_CASES], &settings).unwrap();

    assert!(!batch.collection.get("tree").unwrap().is_filtered_out);
    let issue = batch
        .issues
        .iter()
        .find(|i| i.object.as_deref() == Some("tree"))
        .unwrap();
    assert_eq!(issue.kind, ErrorKind::ReferentialMissing);
    assert!(issue.message.contains("template 7"));
}

#[test]
fn filter_reports_objects_with_broken_references() {
    let batch = read_batch(&[EDGE_CASES], &ReaderSettings::default()).unwrap();
    let filter = AttributeFilter::new(Some("h".into()), vec!["1".into()]).unwrap();

    let (selected, issues) = filter.select(&batch);
    assert!(selected.is_empty());
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].object.as_deref(), Some("orphan"));
    assert_eq!(issues[0].kind, ErrorKind::ReferentialMissing);

    let export = FlattenExporter::new(&batch).export();
    assert!(rows_named(&export.objects, "orphan").is_empty());
    assert_eq!(export.issues[0].object.as_deref(), Some("orphan"));
}

#[test]
fn attribute_named_like_a_column_gets_its_own_column() {
    let batch = read_batch(&[EDGE_CASES], &ReaderSettings::default()).unwrap();
    let objects = FlattenExporter::new(&batch).object_table();

    let rows = rows_named(&objects, "flat");
    assert_eq!(rows.len(), 1);
    assert_eq!(objects.get(rows[0], "Attribute Name"), Some("Flat block"));
    assert_eq!(objects.keys.iter().filter(|k| *k == "Name").count(), 1);
}
