use diffnote::{
    build, patch_from_texts, AnnotatedLine, HunkHeader, LineKind, LineTable, PatchAnnotator, Slot,
};
use indoc::indoc;

fn numbers(table: &LineTable) -> Vec<(usize, usize, usize)> {
    table
        .lines()
        .map(|line| (line.index, line.base_line, line.head_line))
        .collect()
}

#[test]
fn test_table_length_matches_split_lines() {
    let cases = [
        "",
        "\n",
        " only context",
        "@@ -1,2 +1,2 @@\n a\n b\n",
        "@@ -1,1 +1,1 @@\n-a\n+b\n\n\n",
    ];
    for patch in cases {
        let table = LineTable::build(patch);
        assert_eq!(table.len(), patch.split('\n').count(), "patch: {:?}", patch);
    }
}

#[test]
fn test_empty_text_is_one_blank_context_line() {
    let table = LineTable::build("");
    assert!(!table.is_empty());
    assert_eq!(
        table.get(0),
        Some(&Slot::Line(AnnotatedLine {
            index: 0,
            base_line: 0,
            head_line: 0,
            text: String::new(),
        }))
    );
}

#[test]
fn test_header_resets_counters() {
    let patch = indoc! {"
        @@ -72,10 +72,12 @@ const convertModelsToProps = (
                 currentAttempt: childProgress.get('current_attempt'),
               } : null,
             },
        -    organization: organization ? {
        +    viewer: {"};
    let table = build(patch);

    let header = table.get(0).and_then(Slot::header).unwrap();
    assert_eq!(
        header,
        &HunkHeader {
            base_start: 72,
            base_len: 10,
            head_start: 72,
            head_len: 12,
            section: " const convertModelsToProps = (".to_string(),
        }
    );
    assert_eq!(
        numbers(&table),
        vec![(1, 72, 72), (2, 73, 73), (3, 74, 74), (4, 75, 75), (5, 76, 75)]
    );
}

#[test]
fn test_marker_rule_advances_counters() {
    let patch = indoc! {"
        @@ -5,4 +7,4 @@
         keep
        -gone
        -gone too
        +new
         keep again"};
    let table = LineTable::build(patch);
    assert_eq!(
        numbers(&table),
        vec![(1, 5, 7), (2, 6, 8), (3, 7, 8), (4, 8, 8), (5, 8, 9)]
    );

    let kinds: Vec<_> = table.lines().map(AnnotatedLine::kind).collect();
    assert_eq!(
        kinds,
        vec![
            LineKind::Context,
            LineKind::Deletion,
            LineKind::Deletion,
            LineKind::Addition,
            LineKind::Context,
        ]
    );
}

#[test]
fn test_counters_reset_at_each_header_regardless_of_prior_values() {
    let patch = indoc! {"
        @@ -1,3 +1,3 @@
         a
        -b
        +B
         c
        @@ -20,3 +20,4 @@ fn tail()
         x
        +y
         z
         w"};
    let table = LineTable::build(patch);
    assert_eq!(table.hunk_count(), 2);
    assert_eq!(
        numbers(&table),
        vec![
            (1, 1, 1),
            (2, 2, 2),
            (3, 3, 2),
            (4, 3, 3),
            (6, 20, 20),
            (7, 21, 21),
            (8, 21, 22),
            (9, 22, 23),
        ]
    );
    assert!(table.line(5).is_none());
    assert_eq!(table.headers().nth(1).unwrap().section, " fn tail()");
}

#[test]
fn test_counters_never_decrease_within_a_hunk() {
    let patch = indoc! {"
        @@ -30,6 +31,7 @@
         one
        -two
        +TWO
        +extra
         three

        -four
         five"};
    let table = LineTable::build(patch);
    let lines: Vec<_> = table.lines().collect();
    for pair in lines.windows(2) {
        assert!(pair[0].base_line <= pair[1].base_line);
        assert!(pair[0].head_line <= pair[1].head_line);
    }
}

#[test]
fn test_blank_line_without_marker_counts_as_context() {
    let table = LineTable::build("@@ -1,3 +1,3 @@\n a\n\n b");
    assert_eq!(numbers(&table), vec![(1, 1, 1), (2, 2, 2), (3, 3, 3)]);
    assert_eq!(table.line(2).unwrap().kind(), LineKind::Context);
}

#[test]
fn test_trailing_newline_yields_final_blank_line() {
    let table = LineTable::build("@@ -1,1 +1,1 @@\n-a\n+b\n");
    assert_eq!(table.len(), 4);
    let last = table.line(3).unwrap();
    assert_eq!(last.text, "");
    assert_eq!((last.base_line, last.head_line), (2, 2));
}

#[test]
fn test_lines_before_first_header_start_at_zero() {
    let table = LineTable::build(" stray\n-stray\n@@ -4,1 +4,1 @@\n x");
    assert_eq!(numbers(&table), vec![(0, 0, 0), (1, 1, 1), (3, 4, 4)]);
}

// Accepted quirk: an `@@` line without both lengths is not a header. It resets
// nothing and is counted as a context line. This documents current behavior and
// is not a promise for hunks that contain literal `@@` text.
#[test]
fn test_short_form_header_is_counted_as_context() {
    let patch = indoc! {"
        @@ -10,2 +10,2 @@
         a
        @@ -1 +1 @@
         b"};
    let table = LineTable::build(patch);
    assert_eq!(table.hunk_count(), 1);

    let quirk = table.line(2).unwrap();
    assert_eq!(quirk.text, "@@ -1 +1 @@");
    assert_eq!(quirk.kind(), LineKind::Context);
    assert_eq!((quirk.base_line, quirk.head_line), (11, 11));
    assert_eq!(
        (table.line(3).unwrap().base_line, table.line(3).unwrap().head_line),
        (12, 12)
    );
}

#[test]
fn test_header_parse_rejects_other_shapes() {
    assert!(HunkHeader::parse("@@ -1,2 +1,2 @@").is_some());
    assert!(HunkHeader::parse("@@ -1,2 +1 @@").is_none());
    assert!(HunkHeader::parse(" @@ -1,2 +1,2 @@").is_none());
    assert!(HunkHeader::parse("@@ -a,2 +1,2 @@").is_none());
    assert!(HunkHeader::parse("@@ -99999999999999999999999,1 +1,1 @@").is_none());
    assert!(HunkHeader::parse("@@ -\u{0661}\u{0662},2 +12,2 @@").is_none());
}

#[test]
fn test_counters_saturate_at_largest_start() {
    let patch = format!("@@ -{},2 +1,{} @@\n x\n-y\n+z", usize::MAX, usize::MAX);
    let table = LineTable::build(&patch);
    assert_eq!(table.hunk_count(), 1);
    assert_eq!(
        numbers(&table),
        vec![(1, usize::MAX, 1), (2, usize::MAX, 2), (3, usize::MAX, 2)]
    );

    let head_max = format!("@@ -1,1 +{},1 @@\n+a\n+b", usize::MAX);
    let table = LineTable::build(&head_max);
    assert_eq!(numbers(&table), vec![(1, 1, usize::MAX), (2, 1, usize::MAX)]);
    assert_eq!(table.render(2, 4).unwrap().lines().count(), 2);
}

#[test]
fn test_header_display_round_trips() {
    let line = "@@ -72,10 +72,12 @@ const convertModelsToProps = (";
    let header = HunkHeader::parse(line).unwrap();
    assert_eq!(header.to_string(), line);
}

#[test]
fn test_patch_from_texts_writes_full_headers() {
    let old_text = "one\ntwo\nthree\nfour\nfive\n";
    let new_text = "one\ntwo\nTHREE\nfour\nfive\nsix\n";
    let patch = patch_from_texts(old_text, new_text, 1);
    assert_eq!(
        patch,
        indoc! {"
            @@ -2,4 +2,5 @@
             two
            -three
            +THREE
             four
             five
            +six"}
    );

    let table = LineTable::build(&patch);
    assert_eq!(table.hunk_count(), 1);
    assert_eq!(table.head_line(6).unwrap(), 6);
}

#[test]
fn test_patch_from_texts_single_line_ranges_stay_parseable() {
    let patch = patch_from_texts("a\n", "b\n", 3);
    assert_eq!(patch, "@@ -1,1 +1,1 @@\n-a\n+b");
    assert_eq!(LineTable::build(&patch).hunk_count(), 1);
}

#[test]
fn test_patch_from_texts_file_creation() {
    let patch = patch_from_texts("", "new\nfile\n", 3);
    assert_eq!(patch, "@@ -0,0 +1,2 @@\n+new\n+file");
}

#[test]
fn test_patch_from_texts_identical_is_empty() {
    assert_eq!(patch_from_texts("same\n", "same\n", 3), "");
}

#[test]
fn test_annotator_from_texts() {
    let annotator = PatchAnnotator::from_texts("a\nb\nc\n", "a\nc\n", 3);
    assert_eq!(annotator.table().hunk_count(), 1);
    assert_eq!(annotator.table().line(2).unwrap().text, "-b");
    assert_eq!(annotator.head_line(3).unwrap(), 2);
}
