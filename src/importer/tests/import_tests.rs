//! Tests for the staged import and its rollback guarantees

use super::*;
use crate::config::ImportConfig;
use crate::error::{EntityKind, MudataError, ViolationKind};
use crate::importer::{ImportStage, Importer, import_archive};
use crate::models::{NewDataset, Representation, TableName, XValue};
use crate::store::{Store, StoreCounts};
use crate::tags::Tags;
use crate::temporal;
use tempfile::TempDir;

fn imported_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    import_archive(&mut store, &ArchiveBuilder::standard().build()).unwrap();
    store
}

#[test]
fn test_import_creates_every_entity() {
    let mut store = MemoryStore::new();
    let summary = import_archive(&mut store, &ArchiveBuilder::standard().build()).unwrap();

    assert_eq!(summary.datasets_created, 1);
    assert_eq!(summary.locations_created, 2);
    assert_eq!(summary.params_created, 2);
    assert_eq!(summary.columns_created, 2);
    assert_eq!(summary.data_created, 3);
    assert_eq!(summary.raw_data_created, 1);
    assert_eq!(summary.total_created(), 11);
    assert_eq!(summary.total_reused(), 0);
    assert_eq!(summary.rows_read, 11);

    assert_eq!(
        store.counts(),
        StoreCounts {
            datasets: 1,
            locations: 2,
            params: 2,
            columns: 2,
            data: 4,
        }
    );

    let dataset = store.find_dataset("ecclimate").unwrap();
    assert_eq!(dataset.tags.get("source"), Some("Environment Canada"));
    let kentville = store.find_location(dataset.id, "kentville").unwrap();
    assert_eq!(kentville.tags.get("province"), Some("NS"));
    let greenwood = store.find_location(dataset.id, "greenwood").unwrap();
    assert!(greenwood.tags.is_empty());
    let column = store
        .find_column(dataset.id, TableName::Data, "value")
        .unwrap();
    assert_eq!(column.tags.get("type"), Some("numeric"));
}

#[test]
fn test_x_routing_typed_and_raw() {
    let store = imported_store();
    let typed: Vec<_> = store
        .data()
        .filter(|d| d.x.representation() == Representation::Typed)
        .collect();
    let raw: Vec<_> = store
        .data()
        .filter(|d| d.x.representation() == Representation::Raw)
        .collect();
    assert_eq!(typed.len(), 3);
    assert_eq!(raw.len(), 1);

    assert_eq!(raw[0].x, XValue::Raw("not-a-date".to_string()));
    assert_eq!(raw[0].value.as_deref(), Some("3.2"));

    let may_ninth = temporal::parse_x("2017-05-09").unwrap();
    assert!(typed.iter().any(|d| d.x == XValue::Typed(may_ninth)));
    let with_offset = typed
        .iter()
        .find(|d| d.tags.get("flag") == Some("E"))
        .unwrap();
    assert!(with_offset.x.as_point().unwrap().offset().is_some());
}

#[test]
fn test_near_miss_dates_are_stored_raw() {
    let data = "dataset,location,param,x,value,tags
ecclimate,kentville,maxtemp,17-05-09,1,{}
ecclimate,kentville,maxtemp,2017-05-09 17:25:60,2,{}
ecclimate,kentville,maxtemp,2017-05-0917:25,3,{}
";
    let mut store = MemoryStore::new();
    let summary = import_archive(
        &mut store,
        &ArchiveBuilder::standard().table("data.csv", data).build(),
    )
    .unwrap();

    assert_eq!(summary.data_created, 0);
    assert_eq!(summary.raw_data_created, 3);
    assert!(
        store
            .data()
            .any(|d| d.x == XValue::Raw("17-05-09".to_string()))
    );
}

#[test]
fn test_na_and_empty_values_are_absent() {
    let data = "dataset,location,param,x,value,tags
ecclimate,kentville,maxtemp,2017-05-09,NA,{}
ecclimate,kentville,maxtemp,2017-05-10,,{}
ecclimate,kentville,maxtemp,2017-05-11,0,{}
";
    let mut store = MemoryStore::new();
    import_archive(
        &mut store,
        &ArchiveBuilder::standard().table("data.csv", data).build(),
    )
    .unwrap();

    let mut values: Vec<_> = store.data().map(|d| d.value.clone()).collect();
    values.sort();
    assert_eq!(values, vec![None, None, Some("0".to_string())]);
}

#[test]
fn test_custom_missing_values() {
    let data = "dataset,location,param,x,value,tags
ecclimate,kentville,maxtemp,2017-05-09,-999,{}
ecclimate,kentville,maxtemp,2017-05-10,NA,{}
";
    let mut store = MemoryStore::new();
    Importer::new(&mut store)
        .with_config(ImportConfig::default().with_missing_values(["-999"]))
        .import_archive(&ArchiveBuilder::standard().table("data.csv", data).build())
        .unwrap();

    let mut values: Vec<_> = store.data().map(|d| d.value.clone()).collect();
    values.sort();
    assert_eq!(values, vec![None, Some("NA".to_string())]);
}

#[test]
fn test_reimport_fails_and_leaves_store_unchanged() {
    let mut store = imported_store();
    let before = contents(&store);

    let err = import_archive(&mut store, &ArchiveBuilder::standard().build()).unwrap_err();
    assert!(err.is_duplicate_key());
    match &err {
        MudataError::Validation { file, line, .. } => {
            assert_eq!(file, "data.csv");
            assert_eq!(*line, 2);
        }
        other => panic!("expected a data.csv validation failure, got {:?}", other),
    }

    assert_eq!(contents(&store), before);
}

#[test]
fn test_reimport_rolls_back_new_entities_from_same_run() {
    let mut store = imported_store();
    let before = contents(&store);

    let locations = format!("{}ecclimate,wolfville,{{}}\n", LOCATIONS_CSV);
    let params = format!("{}ecclimate,mintemp,{{}}\n", PARAMS_CSV);
    let columns = format!("{}ecclimate,data,x,{{}}\n", COLUMNS_CSV);
    let archive = ArchiveBuilder::standard()
        .table("locations.csv", &locations)
        .table("params.csv", &params)
        .table("columns.csv", &columns)
        .build();

    let err = import_archive(&mut store, &archive).unwrap_err();
    assert!(err.is_duplicate_key());

    let dataset = store.find_dataset("ecclimate").unwrap().id;
    assert!(store.find_location(dataset, "wolfville").is_none());
    assert!(store.find_param(dataset, "mintemp").is_none());
    assert!(store.find_column(dataset, TableName::Data, "x").is_none());
    assert_eq!(contents(&store), before);
}

#[test]
fn test_import_with_new_data_reuses_existing_entities() {
    let mut store = imported_store();
    let data = "dataset,location,param,x,value,tags
ecclimate,kentville,maxtemp,2017-06-01,25,{}
";
    let summary = import_archive(
        &mut store,
        &ArchiveBuilder::standard().table("data.csv", data).build(),
    )
    .unwrap();

    assert_eq!(summary.datasets_reused, 1);
    assert_eq!(summary.locations_reused, 2);
    assert_eq!(summary.params_reused, 2);
    assert_eq!(summary.columns_reused, 2);
    assert_eq!(summary.total_created(), 1);
    assert_eq!(store.counts().data, 5);
}

#[test]
fn test_reuse_ignores_differing_tags() {
    let mut store = imported_store();
    let locations = "dataset,location,tags
ecclimate,kentville,\"{\"\"province\"\": \"\"BC\"\"}\"
ecclimate,greenwood,
";
    let data = "dataset,location,param,x,value,tags\n";
    import_archive(
        &mut store,
        &ArchiveBuilder::standard()
            .table("locations.csv", locations)
            .table("data.csv", data)
            .build(),
    )
    .unwrap();

    let dataset = store.find_dataset("ecclimate").unwrap().id;
    let kentville = store.find_location(dataset, "kentville").unwrap();
    assert_eq!(kentville.tags.get("province"), Some("NS"));
}

#[test]
fn test_missing_params_rolls_back_earlier_stages() {
    let mut store = MemoryStore::new();
    let err = import_archive(
        &mut store,
        &ArchiveBuilder::standard().without("params.csv").build(),
    )
    .unwrap_err();

    match err {
        MudataError::MissingRequiredFile { name } => assert_eq!(name, "params.csv"),
        other => panic!("expected MissingRequiredFile, got {:?}", other),
    }
    assert_eq!(store.counts(), StoreCounts::default());
}

#[test]
fn test_failed_import_keeps_preexisting_entities() {
    let mut store = MemoryStore::new();
    store
        .create_dataset(NewDataset {
            dataset: "ecclimate".to_string(),
            tags: Tags::new(),
        })
        .unwrap();
    let before = contents(&store);

    let err = import_archive(
        &mut store,
        &ArchiveBuilder::standard().without("params.csv").build(),
    )
    .unwrap_err();
    assert!(matches!(err, MudataError::MissingRequiredFile { .. }));

    // the reused dataset survives, the locations created alongside it do not
    assert!(store.find_dataset("ecclimate").is_some());
    assert_eq!(contents(&store), before);
}

#[test]
fn test_each_missing_table_is_reported() {
    for name in [
        "datasets.csv",
        "locations.csv",
        "params.csv",
        "columns.csv",
        "data.csv",
    ] {
        let mut store = MemoryStore::new();
        let err = import_archive(&mut store, &ArchiveBuilder::standard().without(name).build())
            .unwrap_err();
        assert!(
            matches!(&err, MudataError::MissingRequiredFile { name: n } if n == name),
            "{}: {:?}",
            name,
            err
        );
        assert_eq!(store.counts(), StoreCounts::default(), "{}", name);
    }
}

#[test]
fn test_missing_required_columns_aborts() {
    let data = "dataset,location,param,x,tags\necclimate,kentville,maxtemp,2017-05-09,{}\n";
    let mut store = MemoryStore::new();
    let err = import_archive(
        &mut store,
        &ArchiveBuilder::standard().table("data.csv", data).build(),
    )
    .unwrap_err();

    match err {
        MudataError::MissingRequiredColumns { file, columns } => {
            assert_eq!(file, "data.csv");
            assert_eq!(columns, vec!["value"]);
        }
        other => panic!("expected MissingRequiredColumns, got {:?}", other),
    }
    assert_eq!(store.counts(), StoreCounts::default());
}

#[test]
fn test_malformed_row_aborts() {
    let locations = "dataset,location,tags
ecclimate,kentville,{}
ecclimate,greenwood
";
    let mut store = MemoryStore::new();
    let err = import_archive(
        &mut store,
        &ArchiveBuilder::standard()
            .table("locations.csv", locations)
            .build(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        MudataError::MalformedRow {
            line: 3,
            expected: 3,
            actual: 2,
            ..
        }
    ));
    assert_eq!(store.counts(), StoreCounts::default());
}

#[test]
fn test_unresolved_references_abort() {
    let cases = [
        (
            "locations.csv",
            "dataset,location,tags\nelsewhere,kentville,{}\n",
            EntityKind::Dataset,
        ),
        (
            "data.csv",
            "dataset,location,param,x,value,tags\necclimate,wolfville,maxtemp,2017-05-09,1,{}\n",
            EntityKind::Location,
        ),
        (
            "data.csv",
            "dataset,location,param,x,value,tags\necclimate,kentville,mintemp,2017-05-09,1,{}\n",
            EntityKind::Param,
        ),
    ];

    for (table, content, expected) in cases {
        let mut store = MemoryStore::new();
        let err = import_archive(
            &mut store,
            &ArchiveBuilder::standard().table(table, content).build(),
        )
        .unwrap_err();
        match err {
            MudataError::UnresolvedReference { kind, .. } => assert_eq!(kind, expected),
            other => panic!("expected UnresolvedReference, got {:?}", other),
        }
        assert_eq!(store.counts(), StoreCounts::default());
    }
}

#[test]
fn test_references_resolve_against_store() {
    let mut store = imported_store();
    let data = "dataset,location,param,x,value,tags
ecclimate,kentville,maxtemp,2018-01-01,-4,{}
";
    let archive = ArchiveBuilder::standard()
        .table("datasets.csv", "dataset,tags\n")
        .table("locations.csv", "dataset,location,tags\n")
        .table("params.csv", "dataset,param,tags\n")
        .table("columns.csv", "dataset,table,column,tags\n")
        .table("data.csv", data)
        .build();

    let summary = import_archive(&mut store, &archive).unwrap();
    assert_eq!(summary.data_created, 1);
    assert_eq!(summary.total_reused(), 0);
}

#[test]
fn test_invalid_entity_row_aborts_with_location() {
    let locations = "dataset,location,tags
ecclimate,kentville,{}
ecclimate,Not A Slug,{broken
";
    let mut store = MemoryStore::new();
    let err = import_archive(
        &mut store,
        &ArchiveBuilder::standard()
            .table("locations.csv", locations)
            .build(),
    )
    .unwrap_err();

    match err {
        MudataError::Validation { file, line, source } => {
            assert_eq!(file, "locations.csv");
            assert_eq!(line, 3);
            assert!(source.has("location", ViolationKind::InvalidSlug));
            assert!(source.has("tags", ViolationKind::InvalidTags));
        }
        other => panic!("expected Validation, got {:?}", other),
    }
    assert_eq!(store.counts(), StoreCounts::default());
}

#[test]
fn test_validation_line_counts_blank_lines() {
    let locations = "dataset,location,tags

ecclimate,kentville,{}


ecclimate,Not A Slug,{}
";
    let mut store = MemoryStore::new();
    let err = import_archive(
        &mut store,
        &ArchiveBuilder::standard()
            .table("locations.csv", locations)
            .build(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        MudataError::Validation { ref file, line: 6, .. } if file == "locations.csv"
    ));
}

#[test]
fn test_invalid_column_table_aborts() {
    let columns = "dataset,table,column,tags\necclimate,not_a_table,value,{}\n";
    let mut store = MemoryStore::new();
    let err = import_archive(
        &mut store,
        &ArchiveBuilder::standard().table("columns.csv", columns).build(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        MudataError::Validation { ref source, .. } if source.has("table", ViolationKind::InvalidChoice)
    ));
}

#[test]
fn test_duplicate_rows_within_one_archive_abort() {
    let data = "dataset,location,param,x,value,tags
ecclimate,kentville,maxtemp,2017-05-09 17:25 -0300,1,{}
ecclimate,kentville,maxtemp,2017-05-09 20:25,2,{}
";
    let mut store = MemoryStore::new();
    let err = import_archive(
        &mut store,
        &ArchiveBuilder::standard().table("data.csv", data).build(),
    )
    .unwrap_err();

    // same instant written with and without an offset
    assert!(err.is_duplicate_key());
    assert_eq!(store.counts(), StoreCounts::default());
}

#[test]
fn test_blank_lines_and_free_column_order() {
    let datasets = "tags,comment,dataset\n\n{},primary,ecclimate\n\n";
    let mut store = MemoryStore::new();
    let summary = import_archive(
        &mut store,
        &ArchiveBuilder::standard()
            .table("datasets.csv", datasets)
            .build(),
    )
    .unwrap();
    assert_eq!(summary.datasets_created, 1);
    assert_eq!(summary.total_data(), 4);
}

#[test]
fn test_tables_found_at_different_depths() {
    let archive = ArchiveBuilder::new()
        .file("datasets.csv", DATASETS_CSV)
        .file("a/locations.csv", LOCATIONS_CSV)
        .file("a/b/params.csv", PARAMS_CSV)
        .file("c/columns.csv", COLUMNS_CSV)
        .file("c/d/e/data.csv", DATA_CSV)
        .build();
    let mut store = MemoryStore::new();
    let summary = import_archive(&mut store, &archive).unwrap();
    assert_eq!(summary.total_created(), 11);
}

#[test]
fn test_import_directory() {
    let dir = TempDir::new().unwrap();
    ArchiveBuilder::standard().write_to(dir.path());

    let mut store = MemoryStore::new();
    let summary = Importer::new(&mut store)
        .import_directory(dir.path())
        .unwrap();
    assert_eq!(summary.total_created(), 11);
}

#[test]
fn test_import_archive_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mudata.zip");
    fs::write(&path, ArchiveBuilder::standard().build()).unwrap();

    let mut store = MemoryStore::new();
    let summary = Importer::new(&mut store)
        .import_archive_file(&path)
        .unwrap();
    assert_eq!(summary.total_data(), 4);
}

#[test]
fn test_stage_transitions() {
    let mut store = MemoryStore::new();
    let mut importer = Importer::new(&mut store);
    assert_eq!(importer.stage(), &ImportStage::Idle);

    importer
        .import_archive(&ArchiveBuilder::standard().build())
        .unwrap();
    assert_eq!(importer.stage(), &ImportStage::Committed);
    assert!(importer.stage().is_terminal());

    // terminal states do not restart
    let again = importer.import_archive(&ArchiveBuilder::standard().build());
    assert!(matches!(again, Err(MudataError::Configuration { .. })));
    assert_eq!(importer.stage(), &ImportStage::Committed);
}

#[test]
fn test_failed_import_is_aborted() {
    let mut store = MemoryStore::new();
    let mut importer = Importer::new(&mut store);
    let err = importer.import_archive(b"not a zip").unwrap_err();
    assert!(matches!(err, MudataError::Archive(_)));
    assert!(matches!(importer.stage(), ImportStage::Aborted(_)));
}
