use std::path::Path;

use mapflow_core::{
    run_stages, Contents, FileRecord, InitOptions, MapInitStage, MapWriteStage, SourceMap,
    Stage, WriteOptions,
};

fn record(path: &str, content: &str) -> FileRecord {
    FileRecord::new("/app", "/app", path, Contents::text(content))
}

#[test]
fn init_then_inline_write_over_a_batch() {
    let init = MapInitStage::new(InitOptions::default());
    let write = MapWriteStage::inline(WriteOptions::default());
    let stages: Vec<&dyn Stage> = vec![&init, &write];

    let out = run_stages(
        &stages,
        vec![record("/app/a.js", "var a;\n"), record("/app/b.js", "var b;\n")],
    )
    .unwrap();

    assert_eq!(out.len(), 2);
    for file in &out {
        assert!(file
            .contents_str()
            .unwrap()
            .contains("//# sourceMappingURL=data:application/json;charset=utf8;base64,"));
    }
}

#[test]
fn init_then_external_write_emits_pairs() {
    let init = MapInitStage::new(InitOptions::default());
    let write = MapWriteStage::external(".", WriteOptions::default());
    let stages: Vec<&dyn Stage> = vec![&init, &write];

    let out = run_stages(
        &stages,
        vec![record("/app/a.js", "var a;\n"), record("/app/b.js", "var b;\n")],
    )
    .unwrap();

    assert_eq!(out.len(), 4);
    for name in ["a.js", "a.js.map", "b.js", "b.js.map"] {
        assert!(
            out.iter().any(|f| f.path() == Path::new("/app").join(name)),
            "missing {name}"
        );
    }
}

#[test]
fn concatenated_sources_keep_their_order() {
    // a concat transform rewrote two inputs into index.js and left a map
    // whose sources list both originals
    let mut file = record("/app/index.js", "var t3;\nvar t4;\n");
    file.source_map = Some(SourceMap {
        version: 3,
        file: Some("index.js".to_string()),
        source_root: None,
        sources: vec!["test3.js".to_string(), "test4.js".to_string()],
        sources_content: Some(vec![
            Some("var t3;\n".to_string()),
            Some("var t4;\n".to_string()),
        ]),
        names: Vec::new(),
        mappings: "AAAA;ACAA".to_string(),
        pre_existing_comment: None,
    });

    let write = MapWriteStage::external(".", WriteOptions::default());
    let out = write.transform(file).unwrap();

    let map_record = out.iter().find(|f| f.path().ends_with("index.js.map")).unwrap();
    let written: SourceMap =
        serde_json::from_str(map_record.contents_str().unwrap()).unwrap();
    assert_eq!(written.sources, vec!["test3.js", "test4.js"]);
    assert_eq!(written.mappings, "AAAA;ACAA");
}

#[test]
fn loaded_inline_map_survives_to_external_write() {
    use mapflow_core::comment::encode_inline;

    let inner = serde_json::json!({
        "version": 3,
        "file": "compiled.js",
        "sources": ["original.ts"],
        "sourcesContent": ["let x: number = 1;\n"],
        "names": [],
        "mappings": "AAAA"
    });
    let content = format!(
        "var x = 1;\n//# sourceMappingURL={}\n",
        encode_inline(&inner.to_string())
    );

    let init = MapInitStage::new(InitOptions {
        load_maps: true,
        ..Default::default()
    });
    let write = MapWriteStage::external(".", WriteOptions::default());
    let stages: Vec<&dyn Stage> = vec![&init, &write];

    let out = run_stages(&stages, vec![record("/app/compiled.js", &content)]).unwrap();
    assert_eq!(out.len(), 2);

    let content_record = out
        .iter()
        .find(|f| f.path() == Path::new("/app/compiled.js"))
        .unwrap();
    // old marker replaced by the reference to the emitted map
    let text = content_record.contents_str().unwrap();
    assert!(!text.contains("data:application/json"));
    assert!(text.contains("//# sourceMappingURL=compiled.js.map"));

    let map_record = out
        .iter()
        .find(|f| f.path().extension() == Some(std::ffi::OsStr::new("map")))
        .unwrap();
    let written: SourceMap =
        serde_json::from_str(map_record.contents_str().unwrap()).unwrap();
    assert_eq!(written.sources, vec!["original.ts"]);
    assert_eq!(written.file.as_deref(), Some("compiled.js"));
    assert_eq!(written.mappings, "AAAA");
}
