//! Cursor and selection editing
//!
//! An edit is planned against the current text, cursor and selection
//! without touching any storage. The layer validates the plan's result and
//! then applies it as one remove + insert splice, see
//! [`crate::TextLayer::update_text`].

use quire_core::{KeyCode, KeyEvent, Modifiers};

use crate::shaper::ShapeDirection;
use crate::utf8;

/// Text editing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEdit {
    /// Move the cursor one character visually left and clear the selection
    MoveCursorLeft,
    /// Move the cursor one character visually right and clear the selection
    MoveCursorRight,
    /// Move the cursor one character visually left, keeping the selection
    /// anchor
    ExtendSelectionLeft,
    /// Move the cursor one character visually right, keeping the selection
    /// anchor
    ExtendSelectionRight,
    /// Move the cursor to the start of the text and clear the selection
    MoveCursorLineBegin,
    /// Move the cursor to the end of the text and clear the selection
    MoveCursorLineEnd,
    /// Move the cursor to the start of the text, keeping the selection
    /// anchor
    ExtendSelectionLineBegin,
    /// Move the cursor to the end of the text, keeping the selection anchor
    ExtendSelectionLineEnd,
    /// Remove the selection, or one character before the cursor
    RemoveBeforeCursor,
    /// Remove the selection, or one character after the cursor
    RemoveAfterCursor,
    /// Replace the selection with given text, or insert it at the cursor.
    /// The cursor ends up after the inserted text.
    InsertBeforeCursor,
    /// Replace the selection with given text, or insert it at the cursor.
    /// The cursor stays before the inserted text.
    InsertAfterCursor,
}

impl TextEdit {
    /// Whether the operation takes text to insert
    pub fn accepts_text(self) -> bool {
        matches!(self, TextEdit::InsertBeforeCursor | TextEdit::InsertAfterCursor)
    }

    /// Map a key press to an editing operation
    ///
    /// Shift turns cursor movement into selection extension. Keys with
    /// Ctrl, Alt or Meta held are left to the host as shortcuts.
    pub fn from_key(event: &KeyEvent) -> Option<TextEdit> {
        if event.is_shortcut() {
            return None;
        }
        let extend = event.modifiers.contains(Modifiers::SHIFT);
        Some(match event.key {
            KeyCode::Left if extend => TextEdit::ExtendSelectionLeft,
            KeyCode::Left => TextEdit::MoveCursorLeft,
            KeyCode::Right if extend => TextEdit::ExtendSelectionRight,
            KeyCode::Right => TextEdit::MoveCursorRight,
            KeyCode::Home if extend => TextEdit::ExtendSelectionLineBegin,
            KeyCode::Home => TextEdit::MoveCursorLineBegin,
            KeyCode::End if extend => TextEdit::ExtendSelectionLineEnd,
            KeyCode::End => TextEdit::MoveCursorLineEnd,
            KeyCode::Backspace => TextEdit::RemoveBeforeCursor,
            KeyCode::Delete => TextEdit::RemoveAfterCursor,
            _ => return None,
        })
    }
}

/// A splice of the text plus the resulting cursor and selection
///
/// `insert_offset` is relative to the text after the removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EditPlan {
    pub remove_offset: u32,
    pub remove_size: u32,
    pub insert_offset: u32,
    /// Whether the insert text is spliced in
    pub insert: bool,
    pub cursor: u32,
    pub selection: u32,
    /// Raise the update state even if nothing changed
    pub force_update: bool,
}

impl EditPlan {
    fn cursor(cursor: u32, selection: u32) -> Self {
        Self {
            remove_offset: 0,
            remove_size: 0,
            insert_offset: 0,
            insert: false,
            cursor,
            selection,
            force_update: false,
        }
    }

    fn forced(mut self) -> Self {
        self.force_update = true;
        self
    }

    fn remove(begin: u32, end: u32) -> Self {
        Self {
            remove_offset: begin,
            remove_size: end - begin,
            ..Self::cursor(begin, begin)
        }
    }
}

/// Plan `edit` on `text`, `None` if it has no effect
///
/// `insert_size` is the byte length of the text to insert, used only by
/// the insert operations. `direction` decides which way the visual left and
/// right moves go.
pub(crate) fn plan_edit(
    edit: TextEdit,
    text: &[u8],
    cursor: u32,
    selection: u32,
    direction: ShapeDirection,
    insert_size: u32,
) -> Option<EditPlan> {
    let rtl = direction == ShapeDirection::RightToLeft;
    let length = text.len() as u32;
    let has_selection = cursor != selection;
    let (selection_begin, selection_end) = (cursor.min(selection), cursor.max(selection));

    let step = |forward: bool| -> Option<u32> {
        let next = if forward {
            utf8::next_char(text, cursor as usize)
        } else {
            utf8::prev_char(text, cursor as usize)
        };
        next.map(|position| position as u32)
    };

    match edit {
        TextEdit::MoveCursorLeft | TextEdit::MoveCursorRight => {
            let forward = (edit == TextEdit::MoveCursorRight) != rtl;
            match step(forward) {
                Some(position) => Some(EditPlan::cursor(position, position)),
                // Collapse a selection even if the cursor can't move
                None if has_selection => Some(EditPlan::cursor(cursor, cursor)),
                None => None,
            }
        }
        TextEdit::ExtendSelectionLeft | TextEdit::ExtendSelectionRight => {
            let forward = (edit == TextEdit::ExtendSelectionRight) != rtl;
            step(forward).map(|position| EditPlan::cursor(position, selection))
        }
        TextEdit::MoveCursorLineBegin => Some(EditPlan::cursor(0, 0).forced()),
        TextEdit::MoveCursorLineEnd => Some(EditPlan::cursor(length, length).forced()),
        TextEdit::ExtendSelectionLineBegin => Some(EditPlan::cursor(0, selection).forced()),
        TextEdit::ExtendSelectionLineEnd => Some(EditPlan::cursor(length, selection).forced()),
        TextEdit::RemoveBeforeCursor if has_selection => {
            Some(EditPlan::remove(selection_begin, selection_end))
        }
        TextEdit::RemoveBeforeCursor => {
            step(false).map(|position| EditPlan::remove(position, cursor))
        }
        TextEdit::RemoveAfterCursor if has_selection => {
            Some(EditPlan::remove(selection_begin, selection_end))
        }
        TextEdit::RemoveAfterCursor => step(true).map(|position| EditPlan::remove(cursor, position)),
        TextEdit::InsertBeforeCursor | TextEdit::InsertAfterCursor => {
            if !has_selection && insert_size == 0 {
                return None;
            }
            let position = selection_begin;
            let cursor = if edit == TextEdit::InsertBeforeCursor {
                position + insert_size
            } else {
                position
            };
            let mut plan = EditPlan::remove(selection_begin, selection_end);
            plan.insert_offset = position;
            plan.insert = true;
            plan.cursor = cursor;
            plan.selection = cursor;
            Some(plan)
        }
    }
}

/// Apply a plan to a byte buffer, the same way the layer splices its runs
pub(crate) fn splice(text: &[u8], plan: &EditPlan, insert: &[u8]) -> Vec<u8> {
    let remove_end = (plan.remove_offset + plan.remove_size) as usize;
    let mut out = Vec::with_capacity(text.len() - plan.remove_size as usize + insert.len());
    out.extend_from_slice(&text[..plan.remove_offset as usize]);
    out.extend_from_slice(&text[remove_end..]);
    if plan.insert {
        let at = plan.insert_offset as usize;
        out.splice(at..at, insert.iter().copied());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const LTR: ShapeDirection = ShapeDirection::LeftToRight;
    const RTL: ShapeDirection = ShapeDirection::RightToLeft;

    /// Apply an edit, returning the resulting text, cursor and selection
    fn edit(
        text: &[u8],
        cursor: u32,
        selection: u32,
        direction: ShapeDirection,
        edit: TextEdit,
        insert: &[u8],
    ) -> Option<(Vec<u8>, (u32, u32))> {
        plan_edit(edit, text, cursor, selection, direction, insert.len() as u32)
            .map(|plan| (splice(text, &plan, insert), (plan.cursor, plan.selection)))
    }

    #[test]
    fn test_move_cursor_direction() {
        let moved = edit(b"hello", 3, 3, LTR, TextEdit::MoveCursorLeft, b"");
        assert_eq!(moved, Some((b"hello".to_vec(), (2, 2))));

        let moved = edit(b"hello", 3, 3, RTL, TextEdit::MoveCursorLeft, b"");
        assert_eq!(moved, Some((b"hello".to_vec(), (4, 4))));

        let moved = edit(b"hello", 3, 3, RTL, TextEdit::MoveCursorRight, b"");
        assert_eq!(moved.unwrap().1, (2, 2));

        // Unspecified moves as left-to-right
        let moved = edit(b"hello", 3, 3, ShapeDirection::Unspecified, TextEdit::MoveCursorRight, b"");
        assert_eq!(moved.unwrap().1, (4, 4));
    }

    #[test]
    fn test_move_cursor_clears_selection() {
        let moved = edit(b"hello", 3, 5, LTR, TextEdit::MoveCursorLeft, b"");
        assert_eq!(moved.unwrap().1, (2, 2));
    }

    #[test]
    fn test_move_cursor_at_boundary() {
        assert_eq!(edit(b"hello", 0, 0, LTR, TextEdit::MoveCursorLeft, b""), None);
        assert_eq!(edit(b"hello", 5, 5, LTR, TextEdit::MoveCursorRight, b""), None);
        assert_eq!(edit(b"hello", 5, 5, RTL, TextEdit::MoveCursorLeft, b""), None);

        // A selection still collapses
        let moved = edit(b"hello", 0, 2, LTR, TextEdit::MoveCursorLeft, b"");
        assert_eq!(moved.unwrap().1, (0, 0));
    }

    #[test]
    fn test_move_cursor_over_invalid_utf8() {
        let moved = edit(b"b\xff\xfehnu", 3, 3, LTR, TextEdit::MoveCursorLeft, b"");
        assert_eq!(moved.unwrap().1, (2, 2));
    }

    #[test]
    fn test_extend_selection() {
        let extended = edit(b"hello", 3, 3, LTR, TextEdit::ExtendSelectionLeft, b"");
        assert_eq!(extended.unwrap().1, (2, 3));

        let extended = edit(b"hello", 2, 4, LTR, TextEdit::ExtendSelectionRight, b"");
        assert_eq!(extended.unwrap().1, (3, 4));

        let extended = edit(b"hello", 3, 1, RTL, TextEdit::ExtendSelectionLeft, b"");
        assert_eq!(extended.unwrap().1, (4, 1));

        assert_eq!(edit(b"hello", 0, 3, LTR, TextEdit::ExtendSelectionLeft, b""), None);
    }

    #[test]
    fn test_line_begin_end_always_update() {
        let plan = plan_edit(TextEdit::MoveCursorLineBegin, b"hello", 0, 0, LTR, 0).unwrap();
        assert_eq!((plan.cursor, plan.selection), (0, 0));
        assert!(plan.force_update);

        let plan = plan_edit(TextEdit::MoveCursorLineEnd, b"hello", 2, 1, RTL, 0).unwrap();
        assert_eq!((plan.cursor, plan.selection), (5, 5));

        let plan = plan_edit(TextEdit::ExtendSelectionLineBegin, b"hello", 3, 4, LTR, 0).unwrap();
        assert_eq!((plan.cursor, plan.selection), (0, 4));

        let plan = plan_edit(TextEdit::ExtendSelectionLineEnd, b"hello", 3, 1, LTR, 0).unwrap();
        assert_eq!((plan.cursor, plan.selection), (5, 1));
        assert_eq!(plan.remove_size, 0);
        assert!(!plan.insert);
    }

    #[test]
    fn test_remove() {
        let removed = edit(b"hello", 3, 3, LTR, TextEdit::RemoveBeforeCursor, b"");
        assert_eq!(removed, Some((b"helo".to_vec(), (2, 2))));

        let removed = edit(b"hello", 3, 3, LTR, TextEdit::RemoveAfterCursor, b"");
        assert_eq!(removed, Some((b"helo".to_vec(), (3, 3))));

        // Direction doesn't matter for removal
        let removed = edit(b"hello", 3, 3, RTL, TextEdit::RemoveBeforeCursor, b"");
        assert_eq!(removed, Some((b"helo".to_vec(), (2, 2))));

        assert_eq!(edit(b"hello", 0, 0, LTR, TextEdit::RemoveBeforeCursor, b""), None);
        assert_eq!(edit(b"hello", 5, 5, LTR, TextEdit::RemoveAfterCursor, b""), None);
    }

    #[test]
    fn test_remove_selection_either_way() {
        for (cursor, selection) in [(1, 4), (4, 1)] {
            for operation in [TextEdit::RemoveBeforeCursor, TextEdit::RemoveAfterCursor] {
                let removed = edit(b"hello", cursor, selection, LTR, operation, b"");
                assert_eq!(removed, Some((b"ho".to_vec(), (1, 1))));
            }
        }
    }

    #[test]
    fn test_remove_multibyte() {
        let text = "ač€".as_bytes();
        let removed = edit(text, 6, 6, LTR, TextEdit::RemoveBeforeCursor, b"");
        assert_eq!(removed, Some(("ač".as_bytes().to_vec(), (3, 3))));

        let removed = edit(text, 1, 1, LTR, TextEdit::RemoveAfterCursor, b"");
        assert_eq!(removed, Some(("a€".as_bytes().to_vec(), (1, 1))));
    }

    #[test]
    fn test_insert() {
        let inserted = edit(b"sume", 2, 2, LTR, TextEdit::InsertBeforeCursor, b"mmerti");
        assert_eq!(inserted, Some((b"summertime".to_vec(), (8, 8))));

        let inserted = edit(b"sume", 2, 2, LTR, TextEdit::InsertAfterCursor, b"mmerti");
        assert_eq!(inserted, Some((b"summertime".to_vec(), (2, 2))));

        assert_eq!(edit(b"sume", 2, 2, LTR, TextEdit::InsertBeforeCursor, b""), None);
    }

    #[test]
    fn test_insert_replaces_selection() {
        let inserted = edit(b"winter", 3, 0, LTR, TextEdit::InsertBeforeCursor, b"pos");
        assert_eq!(inserted, Some((b"poster".to_vec(), (3, 3))));

        let inserted = edit(b"winter", 0, 3, LTR, TextEdit::InsertAfterCursor, b"pos");
        assert_eq!(inserted, Some((b"poster".to_vec(), (0, 0))));

        // Empty insert with a selection only removes
        let inserted = edit(b"winter", 0, 3, LTR, TextEdit::InsertBeforeCursor, b"");
        assert_eq!(inserted, Some((b"ter".to_vec(), (0, 0))));
    }

    #[test]
    fn test_accepts_text() {
        assert!(TextEdit::InsertBeforeCursor.accepts_text());
        assert!(TextEdit::InsertAfterCursor.accepts_text());
        assert!(!TextEdit::RemoveAfterCursor.accepts_text());
        assert!(!TextEdit::MoveCursorLineEnd.accepts_text());
    }

    #[test]
    fn test_from_key() {
        let shift = Modifiers::SHIFT;
        let ctrl = Modifiers::CONTROL;

        assert_eq!(
            TextEdit::from_key(&KeyEvent::plain(KeyCode::Left)),
            Some(TextEdit::MoveCursorLeft)
        );
        assert_eq!(
            TextEdit::from_key(&KeyEvent::new(KeyCode::Right, shift)),
            Some(TextEdit::ExtendSelectionRight)
        );
        assert_eq!(
            TextEdit::from_key(&KeyEvent::new(KeyCode::Home, shift)),
            Some(TextEdit::ExtendSelectionLineBegin)
        );
        assert_eq!(
            TextEdit::from_key(&KeyEvent::plain(KeyCode::End)),
            Some(TextEdit::MoveCursorLineEnd)
        );
        assert_eq!(
            TextEdit::from_key(&KeyEvent::plain(KeyCode::Backspace)),
            Some(TextEdit::RemoveBeforeCursor)
        );
        assert_eq!(
            TextEdit::from_key(&KeyEvent::new(KeyCode::Delete, shift)),
            Some(TextEdit::RemoveAfterCursor)
        );
        assert_eq!(TextEdit::from_key(&KeyEvent::new(KeyCode::Left, ctrl)), None);
        assert_eq!(TextEdit::from_key(&KeyEvent::plain(KeyCode::Other(0x0d))), None);
    }
}
