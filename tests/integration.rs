//! Integration tests: parse DTA, renumber, encode to DTB, decode back.

use dtbc::{decode, encode, parse_str, Chunk, CodecError, Delimiter, Document, Tree};

const SONG: &str = r#"
; song entry
(song_name
   (name "Song \qTitle\q")
   (artist 'The Band')
   (vocal_parts 3)
   (tuning_offset_cents -12.5)
   (preview 30000 60000)
   #ifdef HX_XBOX
   (platform xbox)
   #else
   (platform ps3)
   #endif
   (drum_solo (seqs {kick snare} [1 2 3]))
   (extra_authoring $disc_update kDataUnhandled)
   // trailing comment
)
"#;

fn collect_ids(tree: &Tree, out: &mut Vec<u32>) {
    out.push(tree.node_id);
    for sub in tree.chunks.iter().filter_map(Chunk::as_tree) {
        collect_ids(sub, out);
    }
}

fn contains_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn test_round_trip_after_renumber() {
    let mut doc = parse_str(SONG).expect("parse");
    doc.renumber_from(1);
    let bytes = encode(&doc).expect("encode");
    let back = decode(&bytes).expect("decode");

    // Strings come back with \q resolved; everything else is identical.
    let mut expected = doc.clone().into_owned();
    let song = match &mut expected.tree.chunks[0] {
        Chunk::SubTree(_, t) => t,
        other => panic!("unexpected {:?}", other),
    };
    let name = match &mut song.chunks[1] {
        Chunk::SubTree(_, t) => t,
        other => panic!("unexpected {:?}", other),
    };
    name.chunks[1] = Chunk::string("Song \"Title\"").into_owned();
    assert_eq!(back, expected);
}

#[test]
fn test_nested_example_shape_and_tags() {
    let mut doc = parse_str("(foo 'bar' 1.5 [2 3])").expect("parse");
    let expected = Tree::new(vec![Chunk::SubTree(
        Delimiter::Parens,
        Tree::new(vec![
            Chunk::symbol("foo"),
            Chunk::symbol("bar"),
            Chunk::Float(1.5),
            Chunk::SubTree(
                Delimiter::Brackets,
                Tree::new(vec![Chunk::Int(2), Chunk::Int(3)]),
            ),
        ]),
    )]);
    assert_eq!(doc.tree, expected);

    doc.renumber_from(1);
    let bytes = encode(&doc).expect("encode");
    assert!(contains_subsequence(&bytes, &0x10u32.to_le_bytes()));
    assert!(contains_subsequence(&bytes, &0x13u32.to_le_bytes()));
    assert_eq!(decode(&bytes).expect("decode"), doc);
}

#[test]
fn test_renumber_preorder_and_sequential() {
    let mut doc = parse_str(SONG).expect("parse");
    let n = doc.tree.node_count();
    let start = 40;
    let next = doc.renumber_from(start);
    assert_eq!(next as usize, start as usize + n);

    let mut ids = Vec::new();
    collect_ids(&doc.tree, &mut ids);
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(sorted, (start..start + n as u32).collect::<Vec<_>>());
    // Pre-order: visiting order equals numbering order.
    assert_eq!(ids, sorted);
}

#[test]
fn test_parent_id_below_descendants() {
    fn check(tree: &Tree) {
        for sub in tree.chunks.iter().filter_map(Chunk::as_tree) {
            let mut ids = Vec::new();
            collect_ids(sub, &mut ids);
            assert!(ids.iter().all(|&id| id > tree.node_id));
            check(sub);
        }
    }
    let mut doc = parse_str(SONG).expect("parse");
    doc.renumber_from(0);
    check(&doc.tree);
}

#[test]
fn test_fresh_parse_has_zero_ids() {
    let doc = parse_str("(a (b) [c])").expect("parse");
    let mut ids = Vec::new();
    collect_ids(&doc.tree, &mut ids);
    assert!(ids.iter().all(|&id| id == 0));
}

#[test]
fn test_byte_zero_is_copied_verbatim() {
    let mut doc = parse_str("a").expect("parse");
    doc.byte_zero = 0xAB;
    let bytes = encode(&doc).expect("encode");
    assert_eq!(bytes[0], 0xAB);
    assert_eq!(decode(&bytes).expect("decode").byte_zero, 0xAB);
}

#[test]
fn test_string_escape_in_wire_bytes() {
    let doc = parse_str(r#""he\qllo""#).expect("parse");
    let bytes = encode(&doc).expect("encode");
    let mut expected = Vec::new();
    expected.extend_from_slice(&0x12u32.to_le_bytes());
    expected.extend_from_slice(&6u32.to_le_bytes());
    expected.extend_from_slice(b"he\"llo");
    assert!(bytes.ends_with(&expected));

    let back = decode(&bytes).expect("decode");
    assert_eq!(back.tree.chunks[0], Chunk::string("he\"llo"));
}

#[test]
fn test_symbols_and_directives_are_verbatim() {
    let doc = parse_str(r"'a\qb' #define 'x\qy'").expect("parse");
    let back = decode(&encode(&doc).expect("encode")).expect("decode");
    assert_eq!(back, doc);
}

#[test]
fn test_empty_document() {
    let doc = parse_str("  ; nothing here\n").expect("parse");
    assert!(doc.tree.is_empty());
    let bytes = encode(&doc).expect("encode");
    assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(decode(&bytes).expect("decode"), Document::default());
}

#[test]
fn test_arbitrary_bytes_in_text() {
    let doc = Document::new(
        0,
        Tree::new(vec![Chunk::Symbol(vec![0u8, 0xff, b' ', b'"'].into())]),
    );
    let back = decode(&encode(&doc).expect("encode")).expect("decode");
    assert_eq!(back, doc);
}

#[test]
fn test_decode_error_is_reported_not_panicked() {
    let garbage = [0u8, 5, 0, 0, 0, 0, 0, 0x99, 0, 0, 0];
    assert!(matches!(decode(&garbage), Err(CodecError::UnknownTag { tag: 0x99, .. })));
}
