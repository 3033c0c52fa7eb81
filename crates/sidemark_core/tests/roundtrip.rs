//! End-to-end conversion tests: tree -> (text, sidecar) -> tree.

use futures_lite::future::block_on;
use pretty_assertions::assert_eq;
use sidemark_core::block_id::collect_block_ids;
use sidemark_core::document::{BlockAttrs, ImageAlignment, ImageAttrs, RawNode, TextAlign};
use sidemark_core::image::content_token;
use sidemark_core::sidecar::SpanFormat;
use sidemark_core::{Deserializer, Mark, MemoryImageStore, Node, Serialized, Serializer, Sidecar};

/// Mark order inside a text node carries no meaning; compare in a fixed order.
fn rank(mark: &Mark) -> u8 {
    match mark {
        Mark::Bold => 0,
        Mark::Italic => 1,
        Mark::Strike => 2,
        Mark::Code => 3,
        Mark::Link { .. } => 4,
        Mark::TextStyle { .. } => 5,
        Mark::Highlight { .. } => 6,
        Mark::Underline => 7,
        Mark::Superscript => 8,
        Mark::Subscript => 9,
    }
}

fn normalize(node: Node) -> Node {
    let all = |content: Vec<Node>| content.into_iter().map(normalize).collect::<Vec<_>>();
    match node {
        Node::Text(mut text) => {
            text.marks.sort_by_key(rank);
            Node::Text(text)
        }
        Node::Document { content } => Node::Document {
            content: all(content),
        },
        Node::Paragraph { attrs, content } => Node::Paragraph {
            attrs,
            content: all(content),
        },
        Node::Heading {
            level,
            attrs,
            content,
        } => Node::Heading {
            level,
            attrs,
            content: all(content),
        },
        Node::BulletList { content } => Node::BulletList {
            content: all(content),
        },
        Node::OrderedList { start, content } => Node::OrderedList {
            start,
            content: all(content),
        },
        Node::ListItem { content } => Node::ListItem {
            content: all(content),
        },
        Node::Blockquote { content } => Node::Blockquote {
            content: all(content),
        },
        other => other,
    }
}

fn save(doc: &Node, store: &MemoryImageStore) -> Serialized {
    block_on(Serializer::default().serialize(doc, store)).unwrap()
}

fn load(saved: &Serialized, store: &MemoryImageStore) -> Node {
    // Go through JSON the way a caller persisting the sidecar would.
    let sidecar = Sidecar::from_json(&saved.sidecar.to_json().unwrap()).unwrap();
    block_on(Deserializer::default().deserialize(&saved.text, &sidecar, store)).unwrap()
}

fn roundtrip(doc: &Node) -> Node {
    let store = MemoryImageStore::new();
    load(&save(doc, &store), &store)
}

fn para(id: &str, content: Vec<Node>) -> Node {
    Node::paragraph(content).with_block_id(id)
}

fn highlight(color: &str) -> Mark {
    Mark::Highlight {
        color: Some(color.to_string()),
    }
}

fn mixed_marks() -> Vec<Node> {
    vec![
        Node::text("Plain "),
        Node::styled("bold", vec![Mark::Bold]),
        Node::text(" and "),
        Node::styled("both", vec![Mark::Italic, Mark::Bold]),
        Node::text(", "),
        Node::styled("code*", vec![Mark::Code]),
        Node::text(" "),
        Node::styled(
            "link",
            vec![Mark::Link {
                href: "https://example.com/a_(b)".into(),
            }],
        ),
        Node::text(" "),
        Node::styled("gone", vec![Mark::Strike]),
        Node::text(" "),
        Node::styled(
            "red",
            vec![Mark::TextStyle {
                font_family: Some("Georgia".into()),
                font_size: Some("18px".into()),
                color: Some("#ff0000".into()),
            }],
        ),
        Node::styled(" highlighted bold", vec![highlight("yellow"), Mark::Bold]),
        Node::text(" x"),
        Node::styled("2", vec![Mark::Superscript]),
        Node::text(" H"),
        Node::styled("2", vec![Mark::Subscript]),
        Node::text("O "),
        Node::styled("under", vec![Mark::Underline, Mark::Italic]),
    ]
}

fn rich_document() -> Node {
    let mut centered = BlockAttrs::with_id("p-center");
    centered.text_align = Some(TextAlign::Center);
    centered.indent = 1;

    let mut right_heading = BlockAttrs::with_id("h-right");
    right_heading.text_align = Some(TextAlign::Right);

    let table: RawNode = serde_json::from_value(serde_json::json!({
        "type": "table",
        "content": [
            {"type": "tableRow", "content": [
                {"type": "tableHeader", "attrs": {"colspan": 1}, "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "Item", "marks": [{"type": "bold"}]}]}
                ]}
            ]},
            {"type": "tableRow", "content": [
                {"type": "tableCell", "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "Milk"}]}
                ]}
            ]}
        ]
    }))
    .unwrap();

    Node::doc(vec![
        Node::heading(1, vec![Node::text("Groceries")]).with_block_id("h1"),
        Node::Heading {
            level: 3,
            attrs: right_heading,
            content: vec![Node::styled("Aligned", vec![Mark::Italic])],
        },
        para("p-mixed", mixed_marks()),
        Node::Paragraph {
            attrs: centered,
            content: vec![Node::text("Centered and indented")],
        },
        para(
            "p-escapes",
            vec![Node::text("Costs 5*3 [approx] ~ok~ \\ done\n# not a heading\n\n2. not a list")],
        ),
        para(
            "p-unicode",
            vec![
                Node::text("Café ☕ "),
                Node::styled("naïve", vec![Mark::Underline]),
            ],
        ),
        Node::bullet_list(vec![
            Node::list_item(vec![Node::paragraph(vec![Node::text("Eggs")])]),
            Node::list_item(vec![
                para("li-bread", vec![Node::styled("Bread", vec![highlight("#ffe")])]),
                para("li-note", vec![Node::text("sourdough if possible")]),
                Node::ordered_list(
                    3,
                    vec![
                        Node::list_item(vec![Node::paragraph(vec![Node::text("rye")])]),
                        Node::list_item(vec![Node::code_block(Some("sh"), "bake --hot\n\ncool")]),
                    ],
                ),
            ]),
        ]),
        Node::blockquote(vec![
            Node::paragraph(vec![Node::text("Quoted words")]),
            para("q-styled", vec![Node::styled("loud", vec![Mark::Bold, Mark::Underline])]),
        ]),
        Node::code_block(Some("rust"), "let s = \"```\";\n```\nfn main() {}"),
        Node::HorizontalRule,
        Node::Image(ImageAttrs {
            src: "data:image/png;base64,iVBORw0KGgo=".into(),
            alt: "Receipt [scan]".into(),
            title: Some("March \"receipt\"".into()),
            width: Some(640),
            height: Some(480),
            alignment: Some(ImageAlignment::Center),
            block_id: Some("img1".into()),
        }),
        Node::image("https://example.com/cart.png", "Cart").with_block_id("img2"),
        Node::Table(table).with_block_id("t1"),
        Node::paragraph(vec![]).with_block_id("p-empty"),
    ])
}

#[test]
fn rich_document_roundtrips() {
    let doc = rich_document();
    assert_eq!(normalize(roundtrip(&doc)), normalize(doc));
}

#[test]
fn reserializing_a_loaded_document_is_stable() {
    let store = MemoryImageStore::new();
    // Top-level blocks without ids get generated ones; they must survive a reload.
    let doc = Node::doc(vec![
        Node::heading(2, vec![Node::text("No ids here")]),
        Node::paragraph(vec![Node::styled("styled", vec![highlight("green")])]),
        Node::image("data:image/gif;base64,R0lGOD", "gif"),
    ]);

    let first = save(&doc, &store);
    let loaded = load(&first, &store);
    let second = save(&loaded, &store);

    assert_eq!(second.text, first.text);
    assert_eq!(second.sidecar.spans, first.sidecar.spans);
    assert_eq!(second.sidecar.images, first.sidecar.images);
}

#[test]
fn span_offsets_match_both_directions() {
    let doc = Node::doc(vec![para(
        "p",
        vec![
            Node::styled("**", vec![Mark::Underline]),
            Node::styled("ab", vec![Mark::Bold, highlight("pink"), Mark::Italic]),
            Node::styled("cd", vec![Mark::Code, Mark::Subscript]),
            Node::styled("ef", vec![Mark::Link { href: "x".into() }, Mark::Superscript]),
        ],
    )]);
    let store = MemoryImageStore::new();
    let saved = save(&doc, &store);

    let spans = &saved.sidecar.spans["p"];
    let ranges: Vec<(usize, usize)> = spans.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(ranges, vec![(0, 2), (2, 4), (4, 6), (6, 8)]);

    assert_eq!(normalize(load(&saved, &store)), normalize(doc));
}

#[test]
fn identical_inline_images_are_stored_once() {
    let payload = "data:image/png;base64,AAAA";
    let doc = Node::doc(vec![
        Node::image(payload, "one").with_block_id("a"),
        Node::blockquote(vec![Node::image(payload, "two")]),
        Node::image("data:image/png;base64,BBBB", "other").with_block_id("b"),
    ]);
    let store = MemoryImageStore::new();
    let saved = save(&doc, &store);

    assert_eq!(store.store_calls(), 2);
    assert_eq!(store.len(), 2);
    assert_eq!(
        saved.text.matches(&format!("@img:{}", content_token(payload))).count(),
        2
    );
    assert!(!saved.text.contains("data:"));
}

#[test]
fn empty_document() {
    let store = MemoryImageStore::new();
    let saved = save(&Node::doc(vec![]), &store);
    assert_eq!(saved.text, "");
    assert!(saved.sidecar.blocks.is_empty());
    assert!(saved.sidecar.spans.is_empty());
    assert!(saved.sidecar.images.is_empty());
    assert_eq!(load(&saved, &store), Node::doc(vec![]));
}

#[test]
fn heading_levels_roundtrip_and_seven_clamps() {
    for level in 1..=6u8 {
        let doc = Node::doc(vec![
            Node::heading(level, vec![Node::text("Title")]).with_block_id("h"),
        ]);
        let store = MemoryImageStore::new();
        let saved = save(&doc, &store);
        assert_eq!(
            saved.text,
            format!("<!-- @mid:h -->\n{} Title", "#".repeat(level as usize))
        );
        assert_eq!(load(&saved, &store), doc);
    }

    let seven = Node::doc(vec![Node::heading(7, vec![Node::text("Deep")]).with_block_id("h")]);
    assert_eq!(
        roundtrip(&seven),
        Node::doc(vec![Node::heading(6, vec![Node::text("Deep")]).with_block_id("h")])
    );
}

#[test]
fn concrete_plan_scenario() {
    let doc = Node::doc(vec![
        Node::heading(2, vec![Node::text("Plan")]).with_block_id("abc123"),
        para("def456", vec![Node::styled("Buy milk", vec![highlight("yellow")])]),
    ]);
    let store = MemoryImageStore::new();
    let saved = save(&doc, &store);

    assert_eq!(
        saved.text,
        "<!-- @mid:abc123 -->\n## Plan\n\n<!-- @mid:def456 -->\nBuy milk"
    );
    assert_eq!(
        saved.sidecar.spans["def456"],
        vec![SpanFormat {
            start: 0,
            end: 8,
            background_color: Some("yellow".into()),
            ..Default::default()
        }]
    );
    let json: serde_json::Value = serde_json::from_str(&saved.sidecar.to_json().unwrap()).unwrap();
    assert_eq!(
        json["spans"]["def456"],
        serde_json::json!([{"start": 0, "end": 8, "backgroundColor": "yellow"}])
    );

    assert_eq!(load(&saved, &store), doc);
}

#[test]
fn concrete_list_scenario() {
    let store = MemoryImageStore::new();
    let doc = block_on(Deserializer::default().deserialize(
        "- Eggs\n- Bread",
        &Sidecar::new(),
        &store,
    ))
    .unwrap();
    assert_eq!(
        doc,
        Node::doc(vec![Node::bullet_list(vec![
            Node::list_item(vec![Node::paragraph(vec![Node::text("Eggs")])]),
            Node::list_item(vec![Node::paragraph(vec![Node::text("Bread")])]),
        ])])
    );
}

#[test]
fn span_ending_exactly_at_run_end_applies() {
    let mut sidecar = Sidecar::new();
    sidecar.spans.insert(
        "p".into(),
        vec![
            SpanFormat {
                start: 0,
                end: 3,
                underline: Some(true),
                ..Default::default()
            },
            SpanFormat {
                start: 4,
                end: 9,
                color: Some("blue".into()),
                ..Default::default()
            },
        ],
    );
    let store = MemoryImageStore::new();
    let doc = block_on(Deserializer::default().deserialize(
        "<!-- @mid:p -->\n**Buy** milk",
        &sidecar,
        &store,
    ))
    .unwrap();

    assert_eq!(
        doc,
        Node::doc(vec![para(
            "p",
            vec![
                Node::styled("Buy", vec![Mark::Bold, Mark::Underline]),
                Node::text(" "),
                // The span overshoots the text; the covered run still gets it.
                Node::styled(
                    "milk",
                    vec![Mark::TextStyle {
                        font_family: None,
                        font_size: None,
                        color: Some("blue".into()),
                    }]
                ),
            ]
        )])
    );
}

#[test]
fn italics_opening_with_a_space_at_line_start_roundtrip() {
    let soft = |text: &str| Node::styled(text, vec![Mark::Italic]);
    let doc = Node::doc(vec![
        Node::heading(2, vec![soft(" h")]).with_block_id("h"),
        para("p1", vec![soft(" soft"), Node::text(" tail")]),
        para(
            "p2",
            vec![
                Node::text("a\n"),
                Node::styled(" soft", vec![Mark::Italic, Mark::Underline]),
            ],
        ),
        para("p3", vec![Node::text("_x_ and *y*")]),
        Node::blockquote(vec![Node::paragraph(vec![soft(" quoted")])]),
        Node::bullet_list(vec![Node::list_item(vec![Node::paragraph(vec![soft(
            " item",
        )])])]),
    ]);

    let store = MemoryImageStore::new();
    let saved = save(&doc, &store);
    assert!(saved.text.contains("<!-- @mid:p1 -->\n_ soft_ tail"));
    assert_eq!(normalize(load(&saved, &store)), normalize(doc));
}

#[test]
fn empty_sidecars_differ_only_in_time() {
    let first = Sidecar::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = Sidecar::new();
    assert_ne!(second.meta.modified, first.meta.modified);

    let mut aligned = second.clone();
    aligned.meta = first.meta.clone();
    assert_eq!(aligned, first);
    assert_eq!(first.version, 1);
}

#[test]
fn editor_json_roundtrips_through_the_converter() {
    let json = serde_json::json!({
        "type": "doc",
        "content": [
            {"type": "heading", "attrs": {"level": 2, "blockId": "h"}, "content": [{"type": "text", "text": "Notes"}]},
            {"type": "paragraph", "attrs": {"blockId": "p", "textAlign": "justify"}, "content": [
                {"type": "text", "text": "see "},
                {"type": "text", "text": "docs", "marks": [{"type": "link", "attrs": {"href": "https://docs.rs"}}, {"type": "textStyle", "attrs": {"color": "#333"}}]}
            ]}
        ]
    });
    let doc: Node = serde_json::from_value(json.clone()).unwrap();
    let back = serde_json::to_value(roundtrip(&doc)).unwrap();
    assert_eq!(back, json);
}

#[test]
fn hand_written_markdown_opens() {
    let text = "# Title\n\nSome *text* with **bold**\nand a second line.\n\n* one\n* two\n\n> quote\n\n```\ncode\n```\n\n***";
    let store = MemoryImageStore::new();
    let doc = block_on(Deserializer::default().deserialize(text, &Sidecar::new(), &store)).unwrap();

    assert_eq!(
        doc,
        Node::doc(vec![
            Node::heading(1, vec![Node::text("Title")]),
            Node::paragraph(vec![
                Node::text("Some "),
                Node::styled("text", vec![Mark::Italic]),
                Node::text(" with "),
                Node::styled("bold", vec![Mark::Bold]),
                Node::text("\nand a second line."),
            ]),
            Node::bullet_list(vec![
                Node::list_item(vec![Node::paragraph(vec![Node::text("one")])]),
                Node::list_item(vec![Node::paragraph(vec![Node::text("two")])]),
            ]),
            Node::blockquote(vec![Node::paragraph(vec![Node::text("quote")])]),
            Node::code_block(None, "code"),
            Node::HorizontalRule,
        ])
    );
}

#[test]
fn pruning_after_a_block_is_deleted() {
    let store = MemoryImageStore::new();
    let saved = save(
        &Node::doc(vec![
            para("keep", vec![Node::styled("a", vec![Mark::Underline])]),
            para("drop", vec![Node::styled("b", vec![Mark::Underline])]),
        ]),
        &store,
    );

    // Simulate a hand edit that deletes the second block.
    let edited = saved.text.split("\n\n").next().unwrap().to_string();
    let mut sidecar = saved.sidecar.clone();
    let live = collect_block_ids(&edited);
    assert_eq!(sidecar.stale_block_ids(&live), vec!["drop".to_string()]);
    assert_eq!(sidecar.retain_blocks(&live), 1);
    assert!(sidecar.spans.contains_key("keep"));
    assert!(!sidecar.spans.contains_key("drop"));
}
