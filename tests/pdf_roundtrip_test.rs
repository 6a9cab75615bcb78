//! End-to-end tests against synthetic PDFs.

use std::cell::Cell;

use bookmarker::{
    bookmark_bytes, bookmark_file, extract_lines, scan_bytes, Bookmarker, BuildOptions, Error,
    ErrorKind, FontSizeConstraint, LevelRule, LopdfProvider, OutlineBuilder, RuleConfig,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// (font resource, size, x, baseline, text)
type TextRun<'a> = (&'a str, i64, i64, i64, &'a str);

/// Build a letter-size PDF; each page is a list of single-run lines.
fn build_pdf(pages: &[Vec<TextRun>]) -> Vec<u8> {
    let contents = pages
        .iter()
        .map(|runs| {
            let mut operations = Vec::new();
            for &(font, size, x, y, text) in runs {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec![font.into(), size.into()]));
                operations.push(Operation::new("Td", vec![x.into(), y.into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
                operations.push(Operation::new("ET", vec![]));
            }
            Content { operations }.encode().unwrap()
        })
        .collect::<Vec<_>>();
    build_pdf_from_streams(&contents)
}

/// Build a letter-size PDF from raw content streams, one per page.
fn build_pdf_from_streams(pages: &[Vec<u8>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids = Vec::new();
    for content in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.clone()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::from(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn sample_pdf() -> Vec<u8> {
    build_pdf(&[
        vec![
            ("F2", 18, 72, 700, "Chapter 1 Introduction"),
            ("F1", 14, 72, 640, "1.1 Background"),
            ("F1", 11, 72, 600, "This is ordinary body text."),
            ("F1", 14, 72, 540, "1.2 Scope"),
        ],
        vec![
            ("F2", 18, 72, 700, "Chapter 2 Methods"),
            ("F1", 11, 72, 660, "More body text follows here."),
            ("F1", 9, 300, 30, "2"),
        ],
    ])
}

fn sample_config() -> RuleConfig {
    RuleConfig::new()
        .with_level(
            1,
            LevelRule::new()
                .with_regex("Chapter")
                .unwrap()
                .with_bold(true),
        )
        .unwrap()
        .with_level(
            2,
            LevelRule::new()
                .with_regex(r"\d+\.\d+")
                .unwrap()
                .with_font_size(FontSizeConstraint::Between(13.5, 14.5)),
        )
        .unwrap()
}

/// Titles of the outline as (depth, title) in document order.
fn read_outline(data: &[u8]) -> Vec<(usize, String)> {
    let doc = Document::load_mem(data).unwrap();
    let catalog = doc.catalog().unwrap();
    let root_id = catalog.get(b"Outlines").unwrap().as_reference().unwrap();
    let root = doc.get_dictionary(root_id).unwrap();

    let mut out = Vec::new();
    walk(&doc, root, 1, &mut out);
    out
}

fn walk(doc: &Document, parent: &Dictionary, depth: usize, out: &mut Vec<(usize, String)>) {
    let mut next = parent.get(b"First").and_then(Object::as_reference).ok();
    while let Some(id) = next {
        let item = doc.get_dictionary(id).unwrap();
        let title = item.get(b"Title").unwrap().as_str().unwrap();
        out.push((depth, String::from_utf8_lossy(title).to_string()));
        walk(doc, item, depth + 1, out);
        next = item.get(b"Next").and_then(Object::as_reference).ok();
    }
}

#[test]
fn test_extract_lines_reports_font_facts() {
    let lines = extract_lines(&sample_pdf()).unwrap();
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Chapter 1 Introduction",
            "1.1 Background",
            "This is ordinary body text.",
            "1.2 Scope",
            "Chapter 2 Methods",
            "More body text follows here.",
            "2",
        ]
    );

    let chapter = &lines[0];
    assert_eq!(chapter.font_name, "Helvetica-Bold");
    assert!(chapter.is_bold);
    assert_eq!(chapter.font_size, 18.0);
    assert_eq!(chapter.page_index, 0);
    assert!((chapter.x0 - 72.0).abs() < 0.01);
    // Top edge in top-down page space
    assert!(chapter.y0 > 70.0 && chapter.y0 < 92.0);

    let body = &lines[2];
    assert!(!body.is_bold);
    assert!(body.y0 > chapter.y0);
    assert_eq!(lines[6].page_index, 1);
}

#[test]
fn test_bookmark_bytes_writes_outline_tree() {
    let result = bookmark_bytes(&sample_pdf(), &sample_config()).unwrap();
    assert_eq!(result.entry_count(), 4);

    assert_eq!(
        read_outline(&result.data),
        vec![
            (1, "Chapter 1 Introduction".to_string()),
            (2, "1.1 Background".to_string()),
            (2, "1.2 Scope".to_string()),
            (1, "Chapter 2 Methods".to_string()),
        ]
    );

    let doc = Document::load_mem(&result.data).unwrap();
    let catalog = doc.catalog().unwrap();
    assert_eq!(
        catalog.get(b"PageMode").unwrap().as_name().unwrap(),
        b"UseOutlines"
    );
}

#[test]
fn test_bookmark_targets_the_right_page() {
    let result = bookmark_bytes(&sample_pdf(), &sample_config()).unwrap();
    let pages: Vec<u32> = result.outline.iter().map(|e| e.page_number).collect();
    assert_eq!(pages, vec![1, 1, 1, 2]);

    let doc = Document::load_mem(&result.data).unwrap();
    let page_ids: Vec<_> = doc.get_pages().into_values().collect();
    let root_id = doc
        .catalog()
        .unwrap()
        .get(b"Outlines")
        .unwrap()
        .as_reference()
        .unwrap();
    let root = doc.get_dictionary(root_id).unwrap();
    let last = doc
        .get_dictionary(root.get(b"Last").unwrap().as_reference().unwrap())
        .unwrap();
    let dest = last.get(b"Dest").unwrap().as_array().unwrap();
    assert_eq!(dest[0].as_reference().unwrap(), page_ids[1]);
}

#[test]
fn test_rebookmarking_replaces_previous_outline() {
    let first = bookmark_bytes(&sample_pdf(), &sample_config()).unwrap();

    let chapters_only = RuleConfig::new()
        .with_level(1, LevelRule::new().with_regex("Chapter").unwrap())
        .unwrap();
    let second = bookmark_bytes(&first.data, &chapters_only).unwrap();

    assert_eq!(
        read_outline(&second.data),
        vec![
            (1, "Chapter 1 Introduction".to_string()),
            (1, "Chapter 2 Methods".to_string()),
        ]
    );
}

#[test]
fn test_section_without_chapter_is_hierarchy_error() {
    let sections_only = RuleConfig::new()
        .with_level(
            2,
            LevelRule::new()
                .with_font_size(FontSizeConstraint::Between(13.5, 14.5)),
        )
        .unwrap();
    let err = bookmark_bytes(&sample_pdf(), &sections_only).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HierarchyLevel);
    assert!(err.to_string().contains("1.1 Background"));
}

#[test]
fn test_no_match_is_empty_result() {
    let config = RuleConfig::new()
        .with_level(1, LevelRule::new().with_regex("Appendix").unwrap())
        .unwrap();
    let err = bookmark_bytes(&sample_pdf(), &config).unwrap_err();
    assert!(matches!(err, Error::EmptyResult));
    assert!(err.hint().is_some());
}

#[test]
fn test_keep_band_drops_page_numbers() {
    let config = RuleConfig::new()
        .with_level(
            1,
            LevelRule::new().with_font_size(FontSizeConstraint::AtLeast(1.0)),
        )
        .unwrap();
    let all = scan_bytes(&sample_pdf(), &config).unwrap();
    assert!(all.iter().any(|e| e.title == "2"));

    let banded = config.with_exclusion(bookmarker::ExclusionRule::new().with_y_band(40.0, 700.0));
    let outline = scan_bytes(&sample_pdf(), &banded).unwrap();
    assert!(outline.iter().all(|e| e.title != "2"));
}

#[test]
fn test_garbage_is_document_open_error() {
    let err = bookmark_bytes(b"PK\x03\x04 definitely a zip", &sample_config()).unwrap_err();
    assert!(matches!(err, Error::DocumentOpen(_)));
    assert_eq!(err.kind(), ErrorKind::DocumentOpen);
}

#[test]
fn test_bookmark_file_leaves_input_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thesis.pdf");
    let original = sample_pdf();
    std::fs::write(&path, &original).unwrap();

    let result = bookmark_file(&path, &sample_config()).unwrap();

    assert_eq!(result.entry_count(), 4);
    assert_eq!(std::fs::read(&path).unwrap(), original);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = bookmark_file(dir.path().join("missing.pdf"), &sample_config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_facade_reports_progress_per_page() {
    let calls = Cell::new(0);
    let last = Cell::new(0.0f32);

    let result = Bookmarker::new()
        .with_config(sample_config())
        .without_compression()
        .on_progress(|p| {
            assert!(p > last.get());
            last.set(p);
            calls.set(calls.get() + 1);
        })
        .run(&sample_pdf())
        .unwrap();

    assert_eq!(calls.get(), 2);
    assert_eq!(last.get(), 1.0);
    assert_eq!(read_outline(&result.data).len(), 4);
}

#[test]
fn test_transformed_text_reports_page_coordinates() {
    let content = b"q 1 0 0 1 100 -200 cm BT /F1 12 Tf 72 700 Td (Heading) Tj ET Q\n\
                    BT /F1 12 Tf 72 600 Td (Body) Tj ET"
        .to_vec();
    let lines = extract_lines(&build_pdf_from_streams(&[content])).unwrap();

    // The shifted heading now sits below the body line
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["Body", "Heading"]);

    let heading = &lines[1];
    assert!((heading.x0 - 172.0).abs() < 0.01);
    // Baseline 500, top edge 500 + 0.8 * 12, measured from the top of 792
    assert!((heading.y0 - 282.4).abs() < 0.01);
    assert_eq!(heading.font_size, 12.0);

    // Q restored the untransformed state
    let body = &lines[0];
    assert!((body.x0 - 72.0).abs() < 0.01);
    assert!((body.y0 - 182.4).abs() < 0.01);
}

#[test]
fn test_indent_rule_uses_transformed_position() {
    let content = b"q 1 0 0 1 100 0 cm BT /F1 12 Tf 72 700 Td (Chapter 1) Tj ET Q\n\
                    BT /F1 12 Tf 72 650 Td (Chapter 2) Tj ET"
        .to_vec();
    let config = RuleConfig::from_json_str(
        r#"{"level1": {"regex": "Chapter", "indent_range": [150, 200]}}"#,
    )
    .unwrap();

    let outline = scan_bytes(&build_pdf_from_streams(&[content]), &config).unwrap();
    let titles: Vec<&str> = outline.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Chapter 1"]);
}

/// Content stream of every page.
fn content_streams(doc: &Document) -> Vec<&Stream> {
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).unwrap();
            let id = page.get(b"Contents").unwrap().as_reference().unwrap();
            doc.get_object(id).unwrap().as_stream().unwrap()
        })
        .collect()
}

#[test]
fn test_builder_options_control_compression() {
    // Enough repetition that deflate always pays off
    let body: Vec<TextRun> = (0..30)
        .map(|i| ("F1", 11, 72, 680 - i * 20, "Body text repeated on every line."))
        .collect();
    let mut page = vec![("F2", 18, 72, 720, "Chapter 1 Introduction")];
    page.extend(body);
    let data = build_pdf(&[page]);
    let config = sample_config();

    let mut provider = LopdfProvider::load_bytes(&data).unwrap();
    let plain = OutlineBuilder::new(&config)
        .with_options(BuildOptions::new().with_compression(false))
        .build(&mut provider)
        .unwrap();
    let doc = Document::load_mem(&plain.data).unwrap();
    assert!(content_streams(&doc)
        .iter()
        .all(|s| s.dict.get(b"Filter").is_err()));

    let mut provider = LopdfProvider::load_bytes(&data).unwrap();
    let packed = OutlineBuilder::new(&config).build(&mut provider).unwrap();
    let doc = Document::load_mem(&packed.data).unwrap();
    assert!(content_streams(&doc)
        .iter()
        .all(|s| s.dict.get(b"Filter").is_ok()));
}

#[test]
fn test_corrupt_body_carries_parser_message() {
    let data = b"%PDF-1.5\n1 0 obj\n<< /Type /Catalog >>\nendobj\nstartxref\n999999\n%%EOF\n";
    let err = bookmark_bytes(data, &sample_config()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DocumentOpen);
    let Error::DocumentOpen(message) = &err else {
        panic!("unexpected error: {err:?}");
    };
    // startxref points past the end of the file
    let parser_message = lopdf::Error::Xref(lopdf::XrefError::Start).to_string();
    assert_eq!(message, &parser_message);
    assert!(err.to_string().ends_with(&parser_message));
}
