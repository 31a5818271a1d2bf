use exim::codec::{CodecError, FormatCodec, MbmCodec, MbmEntry, MbmRecord, TableCodec, TableRecord};
use exim::envelope::EnvelopeError;
use exim::pipeline::{ConvertOptions, Pipeline};
use exim::resolver::{self, Invocation, Mode};
use exim::{EnvelopeLayout, EximError, FileKind, PointerWidth};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn sample_table() -> TableRecord {
    TableRecord {
        entries: vec![
            "アイウ".to_string(),
            "ア\nイ[8002]ウ".to_string(),
            String::new(),
            "[F840]エオ".to_string(),
        ],
    }
}

fn sample_mbm() -> MbmRecord {
    MbmRecord {
        entries: vec![
            MbmEntry { id: 0, text: Some("カキ\nク".to_string()) },
            MbmEntry { id: 1, text: None },
            MbmEntry { id: 2, text: Some("[8004][0001]ケ[8004][0000]".to_string()) },
        ],
    }
}

fn tagged() -> Pipeline {
    Pipeline::new(ConvertOptions { layout: EnvelopeLayout::Tagged })
}

/// Codec that passes bytes through and remembers every width it was given.
struct RecordingCodec {
    kind:   FileKind,
    widths: RefCell<Vec<PointerWidth>>,
}

impl RecordingCodec {
    fn new(kind: FileKind) -> Self {
        Self { kind, widths: RefCell::new(Vec::new()) }
    }
}

impl FormatCodec for RecordingCodec {
    type Record = Vec<u8>;

    fn kind(&self) -> FileKind { self.kind }

    fn parse(&self, data: &[u8], width: PointerWidth) -> Result<Vec<u8>, CodecError> {
        self.widths.borrow_mut().push(width);
        Ok(data.to_vec())
    }

    fn serialize(&self, record: &Vec<u8>, width: PointerWidth) -> Result<Vec<u8>, CodecError> {
        self.widths.borrow_mut().push(width);
        Ok(record.clone())
    }
}

#[test]
fn test_table_roundtrip_both_widths() {
    let dir = tempdir().unwrap();
    for width in [PointerWidth::Short, PointerWidth::Long] {
        let tbl  = dir.path().join(format!("text_{width}.tbl"));
        let json = dir.path().join(format!("text_{width}.json"));
        let back = dir.path().join(format!("back_{width}.tbl"));

        let original = TableCodec.serialize(&sample_table(), width).unwrap();
        fs::write(&tbl, &original).unwrap();

        let pipeline = Pipeline::default();
        assert_eq!(pipeline.export_file(&tbl, &json, width).unwrap(), FileKind::Table);
        assert_eq!(pipeline.import_file(&json, &back, width).unwrap(), FileKind::Table);
        assert_eq!(fs::read(&back).unwrap(), original);
    }
}

#[test]
fn test_mbm_roundtrip_tagged() {
    let dir  = tempdir().unwrap();
    let mbm  = dir.path().join("msg.MBM");
    let json = dir.path().join("msg.json");
    let back = dir.path().join("back.mbm");

    let original = MbmCodec.serialize(&sample_mbm(), PointerWidth::Short).unwrap();
    fs::write(&mbm, &original).unwrap();

    let pipeline = tagged();
    assert_eq!(pipeline.export_file(&mbm, &json, PointerWidth::Long).unwrap(), FileKind::MBM);
    assert_eq!(pipeline.import_file(&json, &back, PointerWidth::Short).unwrap(), FileKind::MBM);
    assert_eq!(fs::read(&back).unwrap(), original);
}

#[test]
fn test_tag_line_discriminates_kinds() {
    let pipeline = tagged();

    let tbl = TableCodec.serialize(&sample_table(), PointerWidth::Short).unwrap();
    let text = pipeline.export_bytes(FileKind::Table, &tbl, PointerWidth::Short).unwrap();
    let tag  = text.lines().next().unwrap();
    assert!(!tag.contains("MBM"), "table tag {tag:?} must not mention MBM");

    let mbm  = MbmCodec.serialize(&sample_mbm(), PointerWidth::Short).unwrap();
    let text = pipeline.export_bytes(FileKind::MBM, &mbm, PointerWidth::Short).unwrap();
    let tag  = text.lines().next().unwrap();
    assert!(tag.contains("MBM"), "MBM tag {tag:?} must mention MBM");
}

#[test]
fn test_tagged_body_split_across_lines() {
    let pipeline = tagged();
    let original = MbmCodec.serialize(&sample_mbm(), PointerWidth::Short).unwrap();
    let text     = pipeline.export_bytes(FileKind::MBM, &original, PointerWidth::Short).unwrap();

    // Break every body line in the middle, including inside string literals.
    let mut lines = text.lines();
    let mut split = format!("{}\n", lines.next().unwrap());
    for line in lines {
        let chars: Vec<char> = line.chars().collect();
        let (a, b) = chars.split_at(chars.len() / 2);
        split.push_str(&a.iter().collect::<String>());
        split.push('\n');
        split.push_str(&b.iter().collect::<String>());
        split.push('\n');
    }
    assert!(split.lines().count() > text.lines().count());

    let (kind, bytes) = pipeline.import_text(&split, PointerWidth::Short).unwrap();
    assert_eq!(kind, FileKind::MBM);
    assert_eq!(bytes, original);
}

#[test]
fn test_unsupported_extension_writes_nothing() {
    let dir   = tempdir().unwrap();
    let input = dir.path().join("font.nftr");
    let out   = dir.path().join("font.json");
    fs::write(&input, b"\0\0\0\0").unwrap();

    let err = Pipeline::default().export_file(&input, &out, PointerWidth::Short).unwrap_err();
    assert!(matches!(err, EximError::UnsupportedFormat { ref path } if path == &input));
    assert!(!out.exists());
}

#[test]
fn test_empty_envelope_is_malformed() {
    let err = Pipeline::default().import_text("", PointerWidth::Short).unwrap_err();
    assert!(matches!(err, EximError::MalformedEnvelope(EnvelopeError::MissingTag)));
}

#[test]
fn test_non_utf8_envelope_is_malformed() {
    let dir  = tempdir().unwrap();
    let json = dir.path().join("broken.json");
    let out  = dir.path().join("broken.tbl");
    fs::write(&json, b"exim.Table\n{\"entries\": [\"\xff\"]}\n").unwrap();

    let err = Pipeline::default().import_file(&json, &out, PointerWidth::Short).unwrap_err();
    assert!(matches!(err, EximError::MalformedEnvelope(EnvelopeError::NotUtf8(_))));
    assert!(!out.exists());
}

#[test]
fn test_payload_must_match_tag() {
    let text = "exim.Table\n{\"entries\": [{\"id\": 0, \"text\": null}]}\n";
    let err  = Pipeline::default().import_text(text, PointerWidth::Short).unwrap_err();
    assert!(matches!(
        err,
        EximError::MalformedEnvelope(EnvelopeError::PayloadShape { kind: FileKind::Table, .. })
    ));
}

#[test]
fn test_pointer_width_reaches_codec() {
    let pipeline = Pipeline::with_codecs(
        RecordingCodec::new(FileKind::Table),
        RecordingCodec::new(FileKind::MBM),
        ConvertOptions::default(),
    );

    let doc = pipeline.export_bytes(FileKind::Table, b"raw", PointerWidth::Long).unwrap();
    // Document layout records the width, so an omitted flag still means long.
    let (_, bytes) = pipeline.import_text(&doc, PointerWidth::Short).unwrap();
    assert_eq!(bytes, b"raw");

    let tagged = Pipeline::with_codecs(
        RecordingCodec::new(FileKind::Table),
        RecordingCodec::new(FileKind::MBM),
        ConvertOptions { layout: EnvelopeLayout::Tagged },
    );
    let text = tagged.export_bytes(FileKind::Table, b"raw", PointerWidth::Long).unwrap();
    tagged.import_text(&text, PointerWidth::Short).unwrap();

    assert_eq!(*doc_widths(&pipeline), [PointerWidth::Long, PointerWidth::Long]);
    // Tagged envelopes carry no width: the caller's choice is used.
    assert_eq!(*doc_widths(&tagged), [PointerWidth::Long, PointerWidth::Short]);
    assert!(pipeline.mbm_codec().widths.borrow().is_empty());
}

fn doc_widths(p: &Pipeline<RecordingCodec, RecordingCodec>) -> std::cell::Ref<'_, Vec<PointerWidth>> {
    p.table_codec().widths.borrow()
}

#[test]
fn test_pointer_width_mismatch_is_refused() {
    let dir  = tempdir().unwrap();
    let tbl  = dir.path().join("short.tbl");
    let json = dir.path().join("short.json");
    let back = dir.path().join("back.tbl");
    fs::write(&tbl, TableCodec.serialize(&sample_table(), PointerWidth::Short).unwrap()).unwrap();

    let pipeline = Pipeline::default();
    pipeline.export_file(&tbl, &json, PointerWidth::Short).unwrap();
    let err = pipeline.import_file(&json, &back, PointerWidth::Long).unwrap_err();
    assert!(matches!(
        err,
        EximError::PointerWidthMismatch { recorded: PointerWidth::Short, requested: PointerWidth::Long }
    ));
    assert!(!back.exists());
}

#[test]
fn test_wrong_width_on_export_is_detected() {
    let dir  = tempdir().unwrap();
    let tbl  = dir.path().join("long.tbl");
    let json = dir.path().join("long.json");
    fs::write(&tbl, TableCodec.serialize(&sample_table(), PointerWidth::Long).unwrap()).unwrap();

    let err = Pipeline::default().export_file(&tbl, &json, PointerWidth::Short).unwrap_err();
    assert!(matches!(err, EximError::Codec(_)));
    assert!(!json.exists());
}

#[test]
fn test_edited_translation_is_imported() {
    let dir  = tempdir().unwrap();
    let tbl  = dir.path().join("names.tbl");
    let json = dir.path().join("names.json");
    let back = dir.path().join("names_en.tbl");
    fs::write(&tbl, TableCodec.serialize(&sample_table(), PointerWidth::Short).unwrap()).unwrap();

    let pipeline = Pipeline::default();
    pipeline.export_file(&tbl, &json, PointerWidth::Short).unwrap();

    let mut doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    doc["payload"]["entries"][0] = serde_json::Value::from("Sword");
    fs::write(&json, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    pipeline.import_file(&json, &back, PointerWidth::Short).unwrap();
    let rec = TableCodec.parse(&fs::read(&back).unwrap(), PointerWidth::Short).unwrap();
    assert_eq!(rec.entries[0], "Ｓｗｏｒｄ");
    assert_eq!(rec.entries[1..], sample_table().entries[1..]);
}

#[test]
fn test_resolve_then_run_creates_output_dir() {
    let dir = tempdir().unwrap();
    let tbl = dir.path().join("in.tbl");
    let out = dir.path().join("newdir").join("out.json");
    fs::write(&tbl, TableCodec.serialize(&sample_table(), PointerWidth::Short).unwrap()).unwrap();

    let invocation = Invocation {
        export: true,
        paths:  vec![tbl.clone(), out.clone()],
        ..Invocation::default()
    };
    let resolution = resolver::resolve(&invocation).unwrap();
    assert_eq!(resolution.request.mode, Mode::Export);
    assert!(Path::new(&dir.path().join("newdir")).is_dir());

    let kind = Pipeline::default().run(&resolution.request).unwrap();
    assert_eq!(kind, FileKind::Table);
    assert!(fs::read_to_string(&out).unwrap().contains("\"kind\": \"Table\""));
}
