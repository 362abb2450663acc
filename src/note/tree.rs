use std::sync::Arc;

use serde::Serialize;

use super::Note;

/// A note and the subtree of its children, as built by [Note::descendants].
#[derive(Debug, Clone)]
pub struct NoteTree {
    pub note: Arc<Note>,
    pub children: Vec<NoteTree>,
}

impl NoteTree {
    pub fn leaf(note: Arc<Note>) -> Self {
        NoteTree {
            note,
            children: Vec::new(),
        }
    }

    /// Number of notes on the longest root-to-leaf path, the root included.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(NoteTree::depth)
            .max()
            .unwrap_or(0)
    }

    /// Number of notes in the tree, the root included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(NoteTree::len).sum::<usize>()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Every note below the root in depth-first pre-order.
    pub fn descendants(&self) -> Vec<Arc<Note>> {
        let mut notes = Vec::new();
        let mut stack: Vec<&NoteTree> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            notes.push(node.note.clone());
            stack.extend(node.children.iter().rev());
        }
        notes
    }

    /// Path-only projection, for display and serialization.
    pub fn outline(&self) -> TreeOutline {
        TreeOutline {
            path: self.note.path().to_string(),
            notetype: self.note.notetype().to_string(),
            children: self.children.iter().map(NoteTree::outline).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeOutline {
    pub path: String,
    pub notetype: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeOutline>,
}

impl TreeOutline {
    /// Indented text rendering, two spaces per level.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(0, &mut out);
        out
    }

    fn render_into(&self, level: usize, out: &mut String) {
        out.push_str(&"  ".repeat(level));
        out.push_str(&self.path);
        out.push_str(&format!(" [{}]\n", self.notetype));
        for child in self.children.iter() {
            child.render_into(level + 1, out);
        }
    }
}
