//! Keydown dispatch.
//!
//! One ordered rule table instead of a branching chain: each rule is a
//! predicate plus a handler, evaluated in priority order, and the first
//! applicable rule short-circuits the rest. The ordering is load-bearing;
//! tests pin it.

use smol_str::{format_smolstr, SmolStr};
use tracing::debug;

use crate::block::{BlockData, BlockKind, BlockSubtype, SbLayout};
use crate::caret::{utf16_len, Caret, TextRange};
use crate::editor::Editor;
use crate::enter;
use crate::error::EditorError;
use crate::keymap::{Key, KeyEvent, KeydownResult, Modifiers};
use crate::list;
use crate::move_block;
use crate::navigate;
use crate::operation::{Anchor, Operation};
use crate::remove;
use crate::super_block;
use crate::transaction::Transport;

/// One dispatch rule. `applies` must be cheap; `run` owns the gesture.
pub struct Rule<T: Transport> {
    pub name: &'static str,
    pub applies: fn(&Editor<T>, &KeyEvent) -> bool,
    pub run: fn(&mut Editor<T>, &KeyEvent) -> Result<KeydownResult, EditorError>,
}

/// The rule table, in priority order.
pub fn rules<T: Transport>() -> Vec<Rule<T>> {
    vec![
        Rule {
            name: "ime-guard",
            applies: |_, ev| ev.composing,
            run: |_, _| Ok(KeydownResult::PassThrough),
        },
        Rule {
            name: "selection-nav",
            applies: |ed, ev| {
                !ed.selected.is_empty()
                    && ev.combo.modifiers == Modifiers::NONE
                    && matches!(ev.combo.key, Key::ArrowUp | Key::ArrowDown)
            },
            run: run_selection_nav,
        },
        Rule {
            name: "fold",
            applies: |ed, ev| {
                ev.combo == ed.config.keymap.fold || ev.combo == ed.config.keymap.unfold
            },
            run: run_fold,
        },
        Rule {
            name: "range-extend",
            applies: |_, ev| {
                ev.combo.modifiers == Modifiers::SHIFT
                    && matches!(ev.combo.key, Key::ArrowUp | Key::ArrowDown)
            },
            run: run_range_extend,
        },
        Rule {
            name: "undo-redo",
            applies: |ed, ev| {
                ev.combo == ed.config.keymap.undo || ev.combo == ed.config.keymap.redo
            },
            run: |ed, ev| {
                if ev.combo == ed.config.keymap.undo {
                    ed.undo()?;
                } else {
                    ed.redo()?;
                }
                Ok(KeydownResult::Handled)
            },
        },
        Rule {
            name: "enter",
            applies: |_, ev| {
                ev.combo.key == Key::Enter && ev.combo.modifiers == Modifiers::NONE
            },
            run: run_enter,
        },
        Rule {
            name: "caret-cross",
            applies: |_, ev| {
                ev.combo.modifiers == Modifiers::NONE
                    && matches!(ev.combo.key, Key::ArrowLeft | Key::ArrowRight)
            },
            run: run_caret_cross,
        },
        Rule {
            name: "backspace",
            applies: |_, ev| {
                ev.combo.key == Key::Backspace && ev.combo.modifiers == Modifiers::NONE
            },
            run: run_backspace,
        },
        Rule {
            name: "delete-forward",
            applies: |_, ev| {
                ev.combo.key == Key::Delete && ev.combo.modifiers == Modifiers::NONE
            },
            run: run_delete_forward,
        },
        Rule {
            name: "soft-break",
            applies: |_, ev| {
                ev.combo.key == Key::Enter && ev.combo.modifiers == Modifiers::SHIFT
            },
            run: run_soft_break,
        },
        Rule {
            name: "convert",
            applies: |ed, ev| {
                let k = &ed.config.keymap;
                ev.combo == k.to_paragraph
                    || ev.combo == k.to_unordered
                    || ev.combo == k.to_ordered
                    || ev.combo == k.to_task
                    || k.heading_level(&ev.combo).is_some()
            },
            run: run_convert,
        },
        Rule {
            name: "list-tab",
            applies: |ed, ev| {
                ev.combo.key == Key::Tab
                    && (ev.combo.modifiers == Modifiers::NONE
                        || ev.combo.modifiers == Modifiers::SHIFT)
                    && ed
                        .caret
                        .as_ref()
                        .and_then(|c| navigate::enclosing_list_item(&ed.tree, &c.block))
                        .is_some()
            },
            run: run_list_tab,
        },
        Rule {
            name: "move-layout",
            applies: |ed, ev| {
                let k = &ed.config.keymap;
                ev.combo == k.move_up
                    || ev.combo == k.move_down
                    || ev.combo == k.merge_row
                    || ev.combo == k.merge_col
            },
            run: run_move_layout,
        },
        Rule {
            name: "escape",
            applies: |_, ev| ev.combo.key == Key::Escape,
            run: |ed, _| {
                if ed.selected.is_empty() {
                    if let Some(c) = &ed.caret {
                        let top = navigate::top_alone_block(&ed.tree, &c.block);
                        ed.selected = vec![top];
                    }
                } else {
                    ed.selected.clear();
                }
                Ok(KeydownResult::Handled)
            },
        },
    ]
}

/// Dispatch one key event through the rule table.
pub fn keydown<T: Transport>(
    ed: &mut Editor<T>,
    event: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    for rule in rules::<T>() {
        if (rule.applies)(ed, event) {
            let result = (rule.run)(ed, event)?;
            debug!(rule = rule.name, result = ?result, "keydown");
            return Ok(result);
        }
    }
    Ok(KeydownResult::NotHandled)
}

fn run_selection_nav<T: Transport>(
    ed: &mut Editor<T>,
    ev: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    let up = ev.combo.key == Key::ArrowUp;
    let anchor = if up {
        ed.selected.first()
    } else {
        ed.selected.last()
    }
    .cloned();
    let Some(anchor) = anchor else {
        return Ok(KeydownResult::NotHandled);
    };
    let neighbor = if up {
        navigate::previous_block(&ed.tree, &anchor)
    } else {
        navigate::next_block(&ed.tree, &anchor)
    };
    if let Some(n) = neighbor {
        ed.selected = vec![navigate::top_alone_block(&ed.tree, &n)];
    }
    Ok(KeydownResult::Handled)
}

fn run_fold<T: Transport>(
    ed: &mut Editor<T>,
    ev: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    let fold = ev.combo == ed.config.keymap.fold;
    let Some(block) = ed
        .selected
        .first()
        .cloned()
        .or_else(|| ed.caret.as_ref().map(|c| c.block.clone()))
    else {
        return Ok(KeydownResult::Handled);
    };
    let target = match ed.tree.get(&block) {
        Some(b) if b.kind.is_container() || b.kind == BlockKind::Heading => Some(block.clone()),
        _ => navigate::enclosing_list_item(&ed.tree, &block),
    };
    let Some(target) = target else {
        return Ok(KeydownResult::Handled);
    };
    if ed.tree.get(&target).map(|b| b.folded).unwrap_or(false) == fold {
        return Ok(KeydownResult::Handled);
    }
    let old = ed.snapshot(&target)?;
    if let Some(b) = ed.tree.get_mut(&target) {
        b.folded = fold;
        b.touch();
    }
    let new = ed.snapshot(&target)?;
    // A caret inside the folded subtree escapes to the folded block.
    if fold {
        if let Some(c) = &ed.caret {
            if c.block != target && ed.tree.preorder(&target).contains(&c.block) {
                ed.caret = Some(Caret::start_of(target.clone()));
            }
        }
    }
    ed.update_transaction(&target, new, old)?;
    Ok(KeydownResult::Handled)
}

fn run_range_extend<T: Transport>(
    ed: &mut Editor<T>,
    ev: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    let up = ev.combo.key == Key::ArrowUp;
    if ed.selected.is_empty() {
        let Some(c) = &ed.caret else {
            return Ok(KeydownResult::NotHandled);
        };
        ed.selected = vec![navigate::top_alone_block(&ed.tree, &c.block)];
        return Ok(KeydownResult::Handled);
    }
    // The caret block anchors the range: extending against the range's
    // direction shrinks from the far end instead of growing.
    let anchor = ed
        .caret
        .as_ref()
        .map(|c| navigate::top_alone_block(&ed.tree, &c.block));
    if up {
        let shrinks = ed.selected.len() > 1
            && anchor
                .as_ref()
                .map(|a| ed.selected.last() != Some(a))
                .unwrap_or(false);
        if shrinks {
            ed.selected.pop();
        } else if let Some(first) = ed.selected.first().cloned() {
            if let Some(prev) = navigate::previous_block(&ed.tree, &first) {
                let top = navigate::top_alone_block(&ed.tree, &prev);
                if !ed.selected.contains(&top) {
                    ed.selected.insert(0, top);
                }
            }
        }
    } else {
        let shrinks = ed.selected.len() > 1
            && anchor
                .as_ref()
                .map(|a| ed.selected.first() != Some(a))
                .unwrap_or(false);
        if shrinks {
            ed.selected.remove(0);
        } else if let Some(last) = ed.selected.last().cloned() {
            if let Some(next) = navigate::next_block(&ed.tree, &last) {
                let top = navigate::top_alone_block(&ed.tree, &next);
                if !ed.selected.contains(&top) {
                    ed.selected.push(top);
                }
            }
        }
    }
    Ok(KeydownResult::Handled)
}

fn run_enter<T: Transport>(
    ed: &mut Editor<T>,
    _ev: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    let Some(c) = ed.caret.clone() else {
        // Enter on a pure block selection collapses it to a caret.
        if let Some(first) = ed.selected.first().cloned() {
            let target = navigate::last_block(&ed.tree, &first);
            ed.selected.clear();
            ed.caret = Some(Caret::end_of(&ed.tree, target));
            return Ok(KeydownResult::Handled);
        }
        return Ok(KeydownResult::NotHandled);
    };
    let range = TextRange::caret(c.clone());
    let handled = enter::enter(ed, &c.block, &range)?;
    Ok(if handled {
        KeydownResult::Handled
    } else {
        KeydownResult::NotHandled
    })
}

fn run_caret_cross<T: Transport>(
    ed: &mut Editor<T>,
    ev: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    let Some(c) = ed.caret.clone() else {
        return Ok(KeydownResult::PassThrough);
    };
    let len = ed
        .tree
        .get(&c.block)
        .map(|b| utf16_len(&b.content))
        .unwrap_or(0);
    match ev.combo.key {
        Key::ArrowLeft if c.offset == 0 => {
            if let Some(prev) = navigate::previous_block(&ed.tree, &c.block) {
                let target = navigate::last_block(&ed.tree, &prev);
                ed.caret = Some(Caret::end_of(&ed.tree, target));
                return Ok(KeydownResult::Handled);
            }
            Ok(KeydownResult::PassThrough)
        }
        Key::ArrowRight if c.offset == len => {
            if let Some(next) = navigate::next_block(&ed.tree, &c.block) {
                let target = navigate::first_block(&ed.tree, &next);
                ed.caret = Some(Caret::start_of(target));
                return Ok(KeydownResult::Handled);
            }
            Ok(KeydownResult::PassThrough)
        }
        _ => Ok(KeydownResult::PassThrough),
    }
}

fn run_backspace<T: Transport>(
    ed: &mut Editor<T>,
    _ev: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    if !ed.selected.is_empty() {
        remove::remove_selected(ed)?;
        return Ok(KeydownResult::Handled);
    }
    let Some(c) = ed.caret.clone() else {
        return Ok(KeydownResult::PassThrough);
    };
    // Mid-block character deletion belongs to the text layer.
    if c.offset != 0 {
        return Ok(KeydownResult::PassThrough);
    }
    remove::remove_block(ed, &c.block)?;
    Ok(KeydownResult::Handled)
}

fn run_delete_forward<T: Transport>(
    ed: &mut Editor<T>,
    _ev: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    if !ed.selected.is_empty() {
        remove::remove_selected(ed)?;
        return Ok(KeydownResult::Handled);
    }
    let Some(c) = ed.caret.clone() else {
        return Ok(KeydownResult::PassThrough);
    };
    let len = ed
        .tree
        .get(&c.block)
        .map(|b| utf16_len(&b.content))
        .unwrap_or(0);
    if c.offset != len {
        return Ok(KeydownResult::PassThrough);
    }
    let Some(next) = navigate::next_block(&ed.tree, &c.block) else {
        return Ok(KeydownResult::PassThrough);
    };
    let target = navigate::first_block(&ed.tree, &next);
    remove::remove_block(ed, &target)?;
    Ok(KeydownResult::Handled)
}

fn run_soft_break<T: Transport>(
    ed: &mut Editor<T>,
    _ev: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    let Some(c) = ed.caret.clone() else {
        return Ok(KeydownResult::NotHandled);
    };
    let Some(b) = ed.tree.get(&c.block) else {
        return Ok(KeydownResult::NotHandled);
    };
    if b.kind.is_container() || b.kind == BlockKind::Table {
        return Ok(KeydownResult::NotHandled);
    }
    let old = ed.snapshot(&c.block)?;
    let content = b.content.clone();
    let (before, after) = crate::caret::split_at_utf16(&content, c.offset);
    let merged = format!("{before}\n{after}");
    if let Some(b) = ed.tree.get_mut(&c.block) {
        b.content = merged;
        b.touch();
    }
    let new = ed.snapshot(&c.block)?;
    ed.caret = Some(Caret::new(c.block.clone(), c.offset + 1));
    ed.update_transaction(&c.block, new, old)?;
    Ok(KeydownResult::Handled)
}

fn run_convert<T: Transport>(
    ed: &mut Editor<T>,
    ev: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    let Some(c) = ed.caret.clone() else {
        return Ok(KeydownResult::NotHandled);
    };
    let keymap = ed.config.keymap.clone();
    if let Some(level) = keymap.heading_level(&ev.combo) {
        return to_heading(ed, &c.block, level);
    }
    if ev.combo == keymap.to_paragraph {
        return to_paragraph(ed, &c.block);
    }
    let subtype = if ev.combo == keymap.to_unordered {
        BlockSubtype::Unordered
    } else if ev.combo == keymap.to_ordered {
        BlockSubtype::Ordered
    } else {
        BlockSubtype::Task
    };
    wrap_in_list(ed, &c.block, subtype)
}

fn to_heading<T: Transport>(
    ed: &mut Editor<T>,
    block: &crate::id::BlockId,
    level: u8,
) -> Result<KeydownResult, EditorError> {
    let convertible = ed
        .tree
        .get(block)
        .map(|b| matches!(b.kind, BlockKind::Paragraph | BlockKind::Heading))
        .unwrap_or(false);
    if !convertible {
        return Ok(KeydownResult::Handled);
    }
    let old = ed.snapshot(block)?;
    if let Some(b) = ed.tree.get_mut(block) {
        b.kind = BlockKind::Heading;
        b.subtype = Some(BlockSubtype::Heading(level));
        b.touch();
    }
    let new = ed.snapshot(block)?;
    ed.update_transaction(block, new, old)?;
    Ok(KeydownResult::Handled)
}

fn to_paragraph<T: Transport>(
    ed: &mut Editor<T>,
    block: &crate::id::BlockId,
) -> Result<KeydownResult, EditorError> {
    let is_heading = ed
        .tree
        .get(block)
        .map(|b| b.kind == BlockKind::Heading)
        .unwrap_or(false);
    if !is_heading {
        return Ok(KeydownResult::Handled);
    }
    let old = ed.snapshot(block)?;
    if let Some(b) = ed.tree.get_mut(block) {
        b.kind = BlockKind::Paragraph;
        b.subtype = None;
        b.touch();
    }
    let new = ed.snapshot(block)?;
    ed.update_transaction(block, new, old)?;
    Ok(KeydownResult::Handled)
}

/// Wrap a standalone block in a one-item list, or retype the list the block
/// already lives in.
fn wrap_in_list<T: Transport>(
    ed: &mut Editor<T>,
    block: &crate::id::BlockId,
    subtype: BlockSubtype,
) -> Result<KeydownResult, EditorError> {
    if ed
        .tree
        .get(block)
        .map(|b| b.kind.is_container())
        .unwrap_or(true)
    {
        return Ok(KeydownResult::Handled);
    }
    if let Some(li) = navigate::enclosing_list_item(&ed.tree, block) {
        let Some(list) = ed.tree.parent(&li).cloned() else {
            return Ok(KeydownResult::Handled);
        };
        let old = ed.snapshot(&list)?;
        let items = ed.tree.children(&list).to_vec();
        if let Some(b) = ed.tree.get_mut(&list) {
            b.subtype = Some(subtype);
            b.touch();
        }
        for (i, item) in items.iter().enumerate() {
            if let Some(b) = ed.tree.get_mut(item) {
                b.subtype = Some(subtype);
                b.marker = match subtype {
                    BlockSubtype::Ordered => format_smolstr!("{}.", i + 1),
                    _ => SmolStr::new("*"),
                };
                if subtype != BlockSubtype::Task {
                    b.checked = false;
                }
            }
        }
        let new = ed.snapshot(&list)?;
        ed.update_transaction(&list, new, old)?;
        return Ok(KeydownResult::Handled);
    }

    let prev = ed.tree.previous_sibling(block);
    let parent = ed
        .tree
        .parent(block)
        .cloned()
        .unwrap_or_else(|| ed.tree.root().clone());
    let mut li = BlockData::new(BlockKind::ListItem);
    li.subtype = Some(subtype);
    li.marker = match subtype {
        BlockSubtype::Ordered => SmolStr::new("1."),
        _ => SmolStr::new("*"),
    };
    let li_id = li.id.clone();
    let mut list = BlockData::new(BlockKind::List);
    list.subtype = Some(subtype);
    list.children = vec![li];
    let list_id = list.id.clone();
    ed.tree.insert_data(&list, &Anchor::Before(block.clone()))?;
    ed.tree
        .move_block(block, &Anchor::LastChildOf(li_id.clone()))?;
    ed.transaction(
        vec![
            Operation::insert(list).at_slot(prev.as_ref(), &parent),
            Operation::mov(block.clone()).under(li_id),
        ],
        vec![
            Operation::mov(block.clone()).at_slot(prev.as_ref(), &parent),
            Operation::delete(list_id),
        ],
    )?;
    Ok(KeydownResult::Handled)
}

fn run_list_tab<T: Transport>(
    ed: &mut Editor<T>,
    ev: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    let Some(c) = ed.caret.clone() else {
        return Ok(KeydownResult::NotHandled);
    };
    let Some(li) = navigate::enclosing_list_item(&ed.tree, &c.block) else {
        return Ok(KeydownResult::NotHandled);
    };
    if ev.combo.modifiers == Modifiers::SHIFT {
        list::list_outdent(ed, &[li], ed.config.outdent)?;
    } else {
        list::list_indent(ed, &[li])?;
    }
    Ok(KeydownResult::Handled)
}

fn run_move_layout<T: Transport>(
    ed: &mut Editor<T>,
    ev: &KeyEvent,
) -> Result<KeydownResult, EditorError> {
    let keymap = ed.config.keymap.clone();
    if ev.combo == keymap.move_up || ev.combo == keymap.move_down {
        let Some(block) = ed
            .caret
            .as_ref()
            .map(|c| c.block.clone())
            .or_else(|| ed.selected.first().cloned())
        else {
            return Ok(KeydownResult::Handled);
        };
        if ev.combo == keymap.move_up {
            move_block::move_to_up(ed, &block)?;
        } else {
            move_block::move_to_down(ed, &block)?;
        }
        return Ok(KeydownResult::Handled);
    }
    if ed.selected.len() >= 2 {
        let layout = if ev.combo == keymap.merge_row {
            SbLayout::Row
        } else {
            SbLayout::Col
        };
        let blocks = ed.selected.clone();
        super_block::merge_to_super_block(ed, &blocks, layout)?;
    }
    Ok(KeydownResult::Handled)
}
