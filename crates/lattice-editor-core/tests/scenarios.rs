// End-to-end gesture scenarios driven through the public API. Each one
// checks the resulting tree shape, the caret, and that undo restores the
// pre-gesture snapshot exactly.

use lattice_editor_core::{
    keydown, Anchor, Block, BlockId, BlockKind, BlockSubtype, BlockTree, Caret, Editor,
    EditorConfig, Key, KeyCombo, KeyEvent, KeydownResult, RecordingTransport, SbLayout,
};
use pretty_assertions::assert_eq;

type TestEditor = Editor<RecordingTransport>;

fn make_editor() -> TestEditor {
    Editor::new(
        BlockTree::new(),
        EditorConfig::default(),
        RecordingTransport::default(),
    )
}

fn add_paragraphs(ed: &mut TestEditor, texts: &[&str]) -> Vec<BlockId> {
    let root = ed.tree.root().clone();
    texts
        .iter()
        .map(|t| {
            ed.tree
                .insert_block(Block::paragraph(*t), &Anchor::LastChildOf(root.clone()))
                .unwrap()
        })
        .collect()
}

fn build_list(
    ed: &mut TestEditor,
    subtype: BlockSubtype,
    texts: &[&str],
) -> (BlockId, Vec<BlockId>, Vec<BlockId>) {
    let root = ed.tree.root().clone();
    let list = ed
        .tree
        .insert_block(Block::list(subtype), &Anchor::LastChildOf(root))
        .unwrap();
    let mut items = Vec::new();
    let mut blocks = Vec::new();
    for (i, t) in texts.iter().enumerate() {
        let marker = match subtype {
            BlockSubtype::Ordered => format!("{}.", i + 1),
            _ => String::from("*"),
        };
        let li = ed
            .tree
            .insert_block(
                Block::list_item(subtype, marker.as_str()),
                &Anchor::LastChildOf(list.clone()),
            )
            .unwrap();
        let p = ed
            .tree
            .insert_block(Block::paragraph(*t), &Anchor::LastChildOf(li.clone()))
            .unwrap();
        items.push(li);
        blocks.push(p);
    }
    (list, items, blocks)
}

fn markers(ed: &TestEditor, list: &BlockId) -> Vec<String> {
    ed.tree
        .children(list)
        .iter()
        .map(|c| ed.tree.get(c).unwrap().marker.to_string())
        .collect()
}

// Indenting the middle item of [A, B, C] nests B under A; undo restores the
// flat list.
#[test]
fn indent_middle_item_nests_under_previous() {
    let mut ed = make_editor();
    let (list, items, blocks) = build_list(&mut ed, BlockSubtype::Unordered, &["A", "B", "C"]);
    let root = ed.tree.root().clone();
    let before = ed.tree.snapshot(&root).unwrap();

    ed.caret = Some(Caret::start_of(blocks[1].clone()));
    let r = keydown(&mut ed, &KeyEvent::plain(Key::Tab)).unwrap();
    assert_eq!(r, KeydownResult::Handled);

    assert_eq!(
        ed.tree.children(&list).to_vec(),
        vec![items[0].clone(), items[2].clone()]
    );
    let a_children = ed.tree.children(&items[0]).to_vec();
    assert_eq!(a_children.len(), 2);
    let sub = a_children[1].clone();
    assert_eq!(ed.tree.get(&sub).unwrap().kind, BlockKind::List);
    assert_eq!(ed.tree.children(&sub).to_vec(), vec![items[1].clone()]);

    ed.undo().unwrap();
    assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
}

// Deleting item 2 of an ordered 1./2./3. renumbers the survivors to 1./2.
#[test]
fn deleting_ordered_item_renumbers() {
    let mut ed = make_editor();
    let (list, items, _) = build_list(&mut ed, BlockSubtype::Ordered, &["one", "two", "three"]);
    let root = ed.tree.root().clone();
    let before = ed.tree.snapshot(&root).unwrap();

    ed.selected = vec![items[1].clone()];
    let r = keydown(&mut ed, &KeyEvent::plain(Key::Backspace)).unwrap();
    assert_eq!(r, KeydownResult::Handled);
    assert!(!ed.tree.contains(&items[1]));
    assert_eq!(markers(&ed, &list), vec!["1.", "2."]);

    ed.undo().unwrap();
    assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
}

// Enter at offset 0 of a non-empty paragraph inserts an empty paragraph
// before it; the caret stays at the start of the original block.
#[test]
fn enter_at_start_inserts_before() {
    let mut ed = make_editor();
    let ps = add_paragraphs(&mut ed, &["text"]);
    let root = ed.tree.root().clone();
    ed.caret = Some(Caret::start_of(ps[0].clone()));

    let r = keydown(&mut ed, &KeyEvent::plain(Key::Enter)).unwrap();
    assert_eq!(r, KeydownResult::Handled);

    let children = ed.tree.children(&root).to_vec();
    assert_eq!(children.len(), 2);
    assert_eq!(children[1], ps[0]);
    assert_eq!(ed.tree.get(&children[0]).unwrap().content, "");
    assert_eq!(ed.caret, Some(Caret::start_of(ps[0].clone())));
}

// Enter at the end of the last ordered item appends a fresh empty item with
// the next marker.
#[test]
fn enter_at_last_item_end_appends_next_marker() {
    let mut ed = make_editor();
    let (list, items, blocks) = build_list(&mut ed, BlockSubtype::Ordered, &["one", "two"]);
    ed.caret = Some(Caret::end_of(&ed.tree, blocks[1].clone()));

    let r = keydown(&mut ed, &KeyEvent::plain(Key::Enter)).unwrap();
    assert_eq!(r, KeydownResult::Handled);

    let children = ed.tree.children(&list).to_vec();
    assert_eq!(children.len(), 3);
    assert_eq!(&children[..2], &items[..]);
    let new_item = ed.tree.get(&children[2]).unwrap();
    assert_eq!(new_item.kind, BlockKind::ListItem);
    assert_eq!(new_item.marker, "3.");
    let new_block = ed.tree.children(&children[2]).to_vec()[0].clone();
    assert_eq!(ed.tree.get(&new_block).unwrap().content, "");
    assert_eq!(ed.caret, Some(Caret::start_of(new_block)));
}

// A super-block and a paragraph selected together merge into a new row
// super-block; undo removes the wrapper and restores both as siblings.
#[test]
fn layout_hotkey_merges_selection_into_super_block() {
    let mut ed = make_editor();
    let ps = add_paragraphs(&mut ed, &["x", "y", "plain"]);
    let root = ed.tree.root().clone();
    ed.selected = vec![ps[0].clone(), ps[1].clone()];
    keydown(
        &mut ed,
        &KeyEvent::new(KeyCombo::ctrl_alt(Key::character("c"))),
    )
    .unwrap();
    let inner_sb = ed.tree.children(&root)[0].clone();
    let before = ed.tree.snapshot(&root).unwrap();

    ed.selected = vec![inner_sb.clone(), ps[2].clone()];
    let r = keydown(
        &mut ed,
        &KeyEvent::new(KeyCombo::ctrl_alt(Key::character("r"))),
    )
    .unwrap();
    assert_eq!(r, KeydownResult::Handled);

    let outer = ed.tree.children(&root).to_vec();
    assert_eq!(outer.len(), 1);
    let sb = ed.tree.get(&outer[0]).unwrap();
    assert_eq!(sb.kind, BlockKind::SuperBlock);
    assert_eq!(sb.layout, Some(SbLayout::Row));
    assert_eq!(
        ed.tree.children(&outer[0]).to_vec(),
        vec![inner_sb.clone(), ps[2].clone()]
    );

    ed.undo().unwrap();
    assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
    assert_eq!(
        ed.tree.children(&root).to_vec(),
        vec![inner_sb, ps[2].clone()]
    );
}

// Backspace at offset 0 after a code block that lacks a trailing newline
// joins on exactly one newline.
#[test]
fn backspace_into_code_block_joins_on_single_newline() {
    let mut ed = make_editor();
    let root = ed.tree.root().clone();
    let code = ed
        .tree
        .insert_block(
            Block::code_block("fn main() {}"),
            &Anchor::LastChildOf(root.clone()),
        )
        .unwrap();
    let p = ed
        .tree
        .insert_block(Block::paragraph("after"), &Anchor::LastChildOf(root.clone()))
        .unwrap();
    let before = ed.tree.snapshot(&root).unwrap();
    ed.caret = Some(Caret::start_of(p.clone()));

    let r = keydown(&mut ed, &KeyEvent::plain(Key::Backspace)).unwrap();
    assert_eq!(r, KeydownResult::Handled);
    assert_eq!(ed.tree.get(&code).unwrap().content, "fn main() {}\nafter");
    assert!(!ed.tree.contains(&p));
    assert_eq!(ed.caret, Some(Caret::new(code.clone(), 13)));

    ed.undo().unwrap();
    assert_eq!(ed.tree.snapshot(&root).unwrap(), before);
}

// Every gesture commits a matched pair: walking the whole session back
// through undo restores each intermediate snapshot, and redo replays them.
#[test]
fn undo_walks_back_through_a_whole_session() {
    let mut ed = make_editor();
    let ps = add_paragraphs(&mut ed, &["alpha", "beta"]);
    let root = ed.tree.root().clone();

    let mut snapshots = vec![ed.tree.snapshot(&root).unwrap()];

    // Gesture 1: split "alpha" in the middle.
    ed.caret = Some(Caret::new(ps[0].clone(), 2));
    keydown(&mut ed, &KeyEvent::plain(Key::Enter)).unwrap();
    snapshots.push(ed.tree.snapshot(&root).unwrap());

    // Gesture 2: wrap "beta" in an unordered list.
    ed.caret = Some(Caret::start_of(ps[1].clone()));
    keydown(
        &mut ed,
        &KeyEvent::new(KeyCombo::ctrl_alt(Key::character("u"))),
    )
    .unwrap();
    snapshots.push(ed.tree.snapshot(&root).unwrap());

    // Gesture 3: soft break inside "alpha"'s first half.
    ed.caret = Some(Caret::new(ps[0].clone(), 1));
    keydown(&mut ed, &KeyEvent::new(KeyCombo::shift(Key::Enter))).unwrap();
    snapshots.push(ed.tree.snapshot(&root).unwrap());

    for expected in snapshots.iter().rev().skip(1) {
        assert!(ed.undo().unwrap());
        assert_eq!(&ed.tree.snapshot(&root).unwrap(), expected);
    }
    assert!(!ed.undo().unwrap());

    for expected in snapshots.iter().skip(1) {
        assert!(ed.redo().unwrap());
        assert_eq!(&ed.tree.snapshot(&root).unwrap(), expected);
    }
    assert!(!ed.redo().unwrap());
}
