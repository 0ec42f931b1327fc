mod common;
use common::styled_doc;
use note_codec::legacy::{self, migrate, scan_note};
use note_codec::model::{DrawingAttachment, NoteDocument, RgbHex, StyledRun};
use note_codec::{encode, scan, LegacyDrawingMarker, NoteRecord};

fn marker(payload: &str, height: &str, color: &str) -> LegacyDrawingMarker {
    LegacyDrawingMarker {
        payload: payload.to_string(),
        height: height.to_string(),
        color: color.to_string(),
    }
}

#[test]
fn test_scan_single_marker() {
    assert_eq!(
        scan("🎨DRAWING:QUJD:200:#000000🎨"),
        vec![marker("QUJD", "200", "#000000")]
    );
}

#[test]
fn test_scan_no_markers() {
    assert!(scan("no markers here").is_empty());
    assert!(scan("").is_empty());
    assert!(scan("🎨 just a palette").is_empty());
}

#[test]
fn test_scan_multiple_markers_in_source_order() {
    let content = "first 🎨DRAWING:QQ==:10:#111111🎨🎨DRAWING:Qg==:20.5:#222222🎨 and\n\
                   later 🎨DRAWING:a+b/Yw==:30:#333333🎨";
    assert_eq!(
        scan(content),
        vec![
            marker("QQ==", "10", "#111111"),
            marker("Qg==", "20.5", "#222222"),
            marker("a+b/Yw==", "30", "#333333"),
        ]
    );
}

#[test]
fn test_scan_ignores_malformed_markers() {
    assert!(scan("🎨DRAWING:QUJD:200🎨").is_empty());
    assert!(scan("🎨DRAWING:QU:JD:200:#000000🎨").is_empty());
    assert!(scan("🎨DRAWING::200:#000000🎨").is_empty());
    assert!(scan("🎨DRAWING:QUJD:200:#000000").is_empty());

    let mixed = "🎨DRAWING:bad🎨 then 🎨DRAWING:QUJD:200:#000000🎨";
    assert_eq!(scan(mixed), vec![marker("QUJD", "200", "#000000")]);
}

#[test]
fn test_scan_note_reads_markers_from_rtf() -> anyhow::Result<()> {
    let body = "old sketch 🎨DRAWING:QUJD:120:#00FF00🎨 done";
    let rtf = encode(&NoteDocument::from_plain_text("legacy", body))?;

    let from_rtf = scan_note("old sketch", Some(&rtf));
    assert_eq!(from_rtf, vec![marker("QUJD", "120", "#00FF00")]);

    // The same marker in both places is reported once.
    let both = scan_note(body, Some(&rtf));
    assert_eq!(both.len(), 1);

    let extra = scan_note("🎨DRAWING:REVG:80:#0000FF🎨", Some(&rtf));
    assert_eq!(
        extra,
        vec![
            marker("REVG", "80", "#0000FF"),
            marker("QUJD", "120", "#00FF00"),
        ]
    );
    Ok(())
}

#[test]
fn test_marker_field_parsing_falls_back_to_defaults() {
    let good = marker("QUJD", "150", "#FF0000");
    assert_eq!(good.height_value(), 150.0);
    assert_eq!(good.color_value(), RgbHex(0xFF0000));
    assert_eq!(good.to_drawing().payload, b"ABC".to_vec());

    for height in ["abc", "-5", "0", "NaN", "inf"] {
        assert_eq!(marker("QUJD", height, "#000000").height_value(), 200.0);
    }
    assert_eq!(marker("QUJD", "10", "red").color_value(), RgbHex::BLACK);

    let corrupt = marker("!!not base64!!", "10", "#123456").to_drawing();
    assert!(corrupt.payload.is_empty());
    assert_eq!(corrupt.height, 10.0);
    assert_eq!(corrupt.stroke_color, RgbHex(0x123456));
}

#[test]
fn test_migrate_promotes_first_marker_and_strips_all() {
    let mut doc = styled_doc(
        "Sketches",
        vec![
            (
                "A ",
                StyledRun {
                    bold: true,
                    ..StyledRun::default()
                },
            ),
            ("🎨DRAWING:QUJD:150:#FF0000🎨", StyledRun::default()),
            (
                " B ",
                StyledRun {
                    italic: true,
                    ..StyledRun::default()
                },
            ),
            ("🎨DRAWING:REVG:90:#00FF00🎨", StyledRun::default()),
        ],
    );

    assert!(migrate(&mut doc));

    assert_eq!(doc.plain_text, "A  B ");
    assert!(doc.validate().is_ok());
    assert_eq!(doc.runs.len(), 2);
    assert!(doc.runs[0].bold);
    assert!(doc.runs[1].italic);
    assert_eq!((doc.runs[1].start_offset, doc.runs[1].end_offset), (2, 5));

    let drawing = doc.drawing.as_ref().expect("first marker promoted");
    assert_eq!(drawing.payload, b"ABC".to_vec());
    assert_eq!(drawing.height, 150.0);
    assert_eq!(drawing.stroke_color, RgbHex(0xFF0000));
    assert_eq!(doc.legacy_markers.len(), 2);
    assert_eq!(doc.legacy_markers[1], marker("REVG", "90", "#00FF00"));

    assert!(!migrate(&mut doc));
}

#[test]
fn test_migrate_keeps_existing_drawing() {
    let mut doc = NoteDocument::from_plain_text("t", "x🎨DRAWING:QUJD:150:#FF0000🎨");
    doc.drawing = Some(DrawingAttachment {
        payload: vec![1, 2, 3],
        ..DrawingAttachment::default()
    });

    assert!(migrate(&mut doc));
    assert_eq!(doc.plain_text, "x");
    assert_eq!(doc.drawing.as_ref().map(|d| d.payload.clone()), Some(vec![1, 2, 3]));
    assert_eq!(doc.legacy_markers.len(), 1);
}

#[test]
fn test_migrate_marker_only_body_becomes_placeholder() {
    let mut doc = NoteDocument::from_plain_text("t", "🎨DRAWING:QUJD:150:#FF0000🎨");
    assert!(legacy::migrate(&mut doc));
    assert_eq!(doc.plain_text, " ");
    assert!(doc.validate().is_ok());
    assert!(doc.has_drawing());
}

#[test]
fn test_record_load_migrates_legacy_body() {
    let record = NoteRecord {
        title: "Old note".to_string(),
        content: "Sketch 🎨DRAWING:QUJD:150:#FF0000🎨 end 🎨DRAWING:REVG:abc:nothex🎨".to_string(),
        ..NoteRecord::default()
    };

    let doc = record.to_document();

    assert_eq!(doc.title, "Old note");
    assert_eq!(doc.plain_text, "Sketch  end ");
    assert_eq!(doc.legacy_markers.len(), 2);
    let drawing = doc.drawing.expect("legacy drawing promoted");
    assert_eq!(drawing.payload, b"ABC".to_vec());
    assert_eq!(drawing.height, 150.0);

    let second = doc.legacy_markers[1].to_drawing();
    assert_eq!(second.height, 200.0);
    assert_eq!(second.stroke_color, RgbHex::BLACK);
}

#[test]
fn test_scan_note_keeps_repeats_within_one_source() -> anyhow::Result<()> {
    let body = "🎨DRAWING:QUJD:120:#00FF00🎨 twice 🎨DRAWING:QUJD:120:#00FF00🎨";
    let rtf = encode(&NoteDocument::from_plain_text("twins", body))?;

    assert_eq!(scan_note(body, None).len(), 2);
    assert_eq!(scan_note("", Some(&rtf)).len(), 2);
    assert_eq!(scan_note(body, Some(&rtf)).len(), 2);

    let mut markers = vec![marker("QUJD", "1", "#000000")];
    legacy::extend_distinct(
        &mut markers,
        vec![
            marker("QUJD", "1", "#000000"),
            marker("REVG", "2", "#000000"),
            marker("REVG", "2", "#000000"),
        ],
    );
    let payloads: Vec<&str> = markers.iter().map(|m| m.payload.as_str()).collect();
    assert_eq!(payloads, vec!["QUJD", "REVG", "REVG"]);
    Ok(())
}
