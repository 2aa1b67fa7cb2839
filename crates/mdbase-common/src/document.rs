//! Persisted documents and the keyed library that owns them.

use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::error::MdbaseError;
use crate::store::KeyValueStore;

/// JSON array of every [`Document`].
pub const DOCUMENTS_KEY: &str = "md-flow-documents";
/// Id of the active document.
pub const CURRENT_DOC_KEY: &str = "md-flow-current-doc-id";
/// Markup of the active document, kept for single-document installs.
pub const LEGACY_CONTENT_KEY: &str = "md-flow-content";

pub const WELCOME_TITLE: &str = "Welcome to mdbase";
pub const RESTORED_TITLE: &str = "Restored draft";
pub const UNTITLED_TITLE: &str = "Untitled document";

/// Text found only in the old single-document default template.
const LEGACY_TEMPLATE_MARKER: &str = "Välkommen till din nya editor";
/// Legacy content at or below this many characters is not worth restoring.
const LEGACY_MIN_CHARS: usize = 50;
const TITLE_MAX_CHARS: usize = 30;

pub const WELCOME_MARKDOWN: &str = r"![mdbase Logo](logotype.png)

# Welcome to mdbase

Your new distraction-free writing space.

## 🚀 Get Started

mdbase is designed to help you focus on your writing. Here are some things you can do:

*   **Write freely** – Use Markdown shortcuts or the toolbar
*   **Format** – Select text to see options or use syntax like `**bold**` or \*\*bold\*\*
*   **Structure** – Use headings (\#) to create an automatic Outline

## ✨ Features

*   ✅ **Auto-save** – Everything is saved locally in your browser
*   ✅ **Multi-document** – Manage multiple drafts at once
*   ✅ **HTML Export** – Download your work as HTML

> [!NOTE]
> Start writing here or create a new document in the menu/sidebar to start a blank sheet.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Rich markup of the editor surface.
    #[serde(default)]
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub updated_at: u64,
}

impl Document {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: generate_id(),
            title: title.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Title shown in document lists.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A base-36 millisecond timestamp followed by a base-36 random suffix.
pub fn generate_id() -> String {
    let mut id = to_base36(now_millis());
    id.push_str(&to_base36(rand::random::<u64>()));
    id
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Title for a document: the first level-one heading, otherwise the first line of
/// text cut to 30 characters.
pub fn derive_title(first_h1: Option<&str>, plain_text: &str) -> String {
    if plain_text.trim().is_empty() {
        return UNTITLED_TITLE.to_string();
    }
    if let Some(h1) = first_h1.map(str::trim)
        && !h1.is_empty()
    {
        return h1.to_string();
    }
    let first_line = plain_text.split('\n').next().unwrap_or_default().trim();
    if first_line.is_empty() {
        return UNTITLED_TITLE.to_string();
    }
    let mut title: String = first_line.chars().take(TITLE_MAX_CHARS).collect();
    if first_line.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

/// The document list, the active pointer and the store they persist to.
#[derive(Debug)]
pub struct DocumentLibrary<S> {
    store: S,
    documents: Vec<Document>,
    active: Option<String>,
}

impl<S: KeyValueStore> DocumentLibrary<S> {
    /// Reads the list and active pointer. Call [`DocumentLibrary::load`] before use.
    pub fn open(store: S) -> Result<Self, MdbaseError> {
        let documents = match store.get(DOCUMENTS_KEY)? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)?,
            _ => Vec::new(),
        };
        let active = store.get(CURRENT_DOC_KEY)?.filter(|id| !id.is_empty());
        Ok(Self {
            store,
            documents,
            active,
        })
    }

    /// Makes sure there is at least one document and an active one.
    ///
    /// An empty library restores substantial legacy content as a draft, or gets the
    /// welcome document. `welcome_markup` renders Markdown to editor markup.
    pub fn load(
        &mut self,
        welcome_markup: impl FnOnce(&str) -> String,
    ) -> Result<&Document, MdbaseError> {
        if self.documents.is_empty() {
            let legacy = self.store.get(LEGACY_CONTENT_KEY)?.unwrap_or_default();
            let substantial = legacy.trim().chars().count() > LEGACY_MIN_CHARS;
            if substantial && !legacy.contains(LEGACY_TEMPLATE_MARKER) {
                tracing::info!(len = legacy.len(), "restoring legacy draft");
                let doc = Document::new(RESTORED_TITLE, legacy);
                self.active = Some(doc.id.clone());
                self.documents.push(doc);
            } else {
                self.push_welcome(welcome_markup);
            }
            self.persist()?;
        }

        let valid = self
            .active
            .as_deref()
            .is_some_and(|id| self.position(id).is_some());
        if !valid {
            self.active = self.documents.first().map(|d| d.id.clone());
        }
        self.active_document()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&Document> {
        self.active.as_deref().and_then(|id| self.get(id))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Inserts an empty document at the front and switches to it.
    pub fn create(&mut self, outgoing: &str) -> Result<&Document, MdbaseError> {
        let doc = Document::new("", "");
        let id = doc.id.clone();
        self.documents.insert(0, doc);
        self.switch(&id, outgoing)
    }

    /// Stores `outgoing` into the active document, then activates `id`.
    pub fn switch(&mut self, id: &str, outgoing: &str) -> Result<&Document, MdbaseError> {
        if self.position(id).is_none() {
            return Err(MdbaseError::DocumentNotFound(id.to_string()));
        }
        self.store_outgoing(outgoing);
        tracing::debug!(from = ?self.active, to = id, "switching document");
        self.active = Some(id.to_string());
        self.persist()?;
        self.active_document()
    }

    /// Deletes `id` once `confirm` agrees.
    ///
    /// Deleting the last document brings back the welcome document. Deleting the
    /// active one activates the first remaining document.
    pub fn delete(
        &mut self,
        id: &str,
        outgoing: &str,
        confirm: impl FnOnce(&Document) -> bool,
        welcome_markup: impl FnOnce(&str) -> String,
    ) -> Result<(), MdbaseError> {
        let Some(index) = self.position(id) else {
            return Err(MdbaseError::DocumentNotFound(id.to_string()));
        };
        if !confirm(&self.documents[index]) {
            return Err(MdbaseError::DeleteDeclined(id.to_string()));
        }
        self.store_outgoing(outgoing);
        self.documents.remove(index);
        tracing::info!(id, remaining = self.documents.len(), "document deleted");

        if self.documents.is_empty() {
            self.push_welcome(welcome_markup);
        } else if self.active.as_deref() == Some(id) {
            self.active = self.documents.first().map(|d| d.id.clone());
        }
        self.persist()
    }

    /// Saves the editor content and title into the active document and persists.
    pub fn save_active(&mut self, content: &str, title: String) -> Result<(), MdbaseError> {
        if let Some(index) = self.active.as_deref().and_then(|id| self.position(id)) {
            let doc = &mut self.documents[index];
            doc.content = content.to_string();
            doc.title = title;
            doc.updated_at = now_millis();
        }
        self.persist()
    }

    /// Writes the list, the active pointer and the legacy content key.
    pub fn persist(&mut self) -> Result<(), MdbaseError> {
        let list = serde_json::to_string(&self.documents)?;
        self.store.set(DOCUMENTS_KEY, list)?;
        self.store
            .set(CURRENT_DOC_KEY, self.active.clone().unwrap_or_default())?;
        let legacy = self.active().map(|d| d.content.clone()).unwrap_or_default();
        self.store.set(LEGACY_CONTENT_KEY, legacy)?;
        tracing::trace!(documents = self.documents.len(), "library persisted");
        Ok(())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.documents.iter().position(|d| d.id == id)
    }

    fn store_outgoing(&mut self, outgoing: &str) {
        if let Some(index) = self.active.as_deref().and_then(|id| self.position(id)) {
            self.documents[index].content = outgoing.to_string();
        }
    }

    fn push_welcome(&mut self, welcome_markup: impl FnOnce(&str) -> String) {
        let doc = Document::new(WELCOME_TITLE, welcome_markup(WELCOME_MARKDOWN));
        self.active = Some(doc.id.clone());
        self.documents.push(doc);
    }

    fn active_document(&self) -> Result<&Document, MdbaseError> {
        self.active()
            .ok_or_else(|| MdbaseError::DocumentNotFound(self.active.clone().unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn welcome(md: &str) -> String {
        format!("<p>{}</p>", md.len())
    }

    fn loaded(store: MemoryStore) -> DocumentLibrary<MemoryStore> {
        let mut library = DocumentLibrary::open(store).unwrap();
        library.load(welcome).unwrap();
        library
    }

    #[test]
    fn empty_store_gets_welcome_document() {
        let library = loaded(MemoryStore::new());
        assert_eq!(library.documents().len(), 1);
        let active = library.active().unwrap();
        assert_eq!(active.title, WELCOME_TITLE);
        assert_eq!(active.content, welcome(WELCOME_MARKDOWN));
        assert_eq!(
            library.store().get(CURRENT_DOC_KEY).unwrap().as_deref(),
            Some(active.id.as_str())
        );
    }

    #[test]
    fn substantial_legacy_content_is_restored() {
        let mut store = MemoryStore::new();
        let legacy = format!("<p>{}</p>", "draft ".repeat(20));
        store.set(LEGACY_CONTENT_KEY, legacy.clone()).unwrap();
        let library = loaded(store);
        let active = library.active().unwrap();
        assert_eq!(active.title, RESTORED_TITLE);
        assert_eq!(active.content, legacy);
    }

    #[test]
    fn old_default_template_is_not_restored() {
        let mut store = MemoryStore::new();
        let legacy = format!("<h1>{LEGACY_TEMPLATE_MARKER}</h1>{}", "x".repeat(80));
        store.set(LEGACY_CONTENT_KEY, legacy).unwrap();
        assert_eq!(loaded(store).active().unwrap().title, WELCOME_TITLE);

        let mut store = MemoryStore::new();
        store.set(LEGACY_CONTENT_KEY, "<p>short</p>".into()).unwrap();
        assert_eq!(loaded(store).active().unwrap().title, WELCOME_TITLE);
    }

    #[test]
    fn stale_active_pointer_falls_back_to_first() {
        let mut library = loaded(MemoryStore::new());
        let first = library.active_id().unwrap().to_string();
        library.store.set(CURRENT_DOC_KEY, "missing".into()).unwrap();
        let mut reopened = DocumentLibrary::open(library.store).unwrap();
        assert_eq!(reopened.load(welcome).unwrap().id, first);
    }

    #[test]
    fn create_inserts_at_front_and_keeps_outgoing_content() {
        let mut library = loaded(MemoryStore::new());
        let welcome_id = library.active_id().unwrap().to_string();
        let created = library.create("<p>edited</p>").unwrap().id.clone();
        assert_eq!(library.documents()[0].id, created);
        assert_eq!(library.documents()[0].content, "");
        assert_eq!(library.get(&welcome_id).unwrap().content, "<p>edited</p>");
        assert_eq!(library.active_id(), Some(created.as_str()));
    }

    #[test]
    fn switch_to_unknown_document_fails() {
        let mut library = loaded(MemoryStore::new());
        assert!(matches!(
            library.switch("nope", ""),
            Err(MdbaseError::DocumentNotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn declined_delete_keeps_document() {
        let mut library = loaded(MemoryStore::new());
        let id = library.active_id().unwrap().to_string();
        let result = library.delete(&id, "", |_| false, welcome);
        assert!(matches!(result, Err(MdbaseError::DeleteDeclined(_))));
        assert!(library.get(&id).is_some());
    }

    #[test]
    fn deleting_active_activates_first_remaining() {
        let mut library = loaded(MemoryStore::new());
        let welcome_id = library.active_id().unwrap().to_string();
        let created = library.create("").unwrap().id.clone();
        library.delete(&created, "", |_| true, welcome).unwrap();
        assert_eq!(library.active_id(), Some(welcome_id.as_str()));
    }

    #[test]
    fn deleting_last_document_recreates_welcome() {
        let mut library = loaded(MemoryStore::new());
        let id = library.active_id().unwrap().to_string();
        library.delete(&id, "", |_| true, welcome).unwrap();
        assert_eq!(library.documents().len(), 1);
        assert_ne!(library.active_id(), Some(id.as_str()));
        assert_eq!(library.active().unwrap().title, WELCOME_TITLE);
    }

    #[test]
    fn save_active_writes_legacy_key() {
        let mut library = loaded(MemoryStore::new());
        library
            .save_active("<h1>Notes</h1>", derive_title(Some("Notes"), "Notes"))
            .unwrap();
        assert_eq!(library.active().unwrap().title, "Notes");
        assert_eq!(
            library.store().get(LEGACY_CONTENT_KEY).unwrap().as_deref(),
            Some("<h1>Notes</h1>")
        );
        let reopened = DocumentLibrary::open(library.store.clone()).unwrap();
        assert_eq!(reopened.documents()[0].title, "Notes");
    }

    #[test]
    fn titles() {
        assert_eq!(derive_title(Some("  Heading "), "Heading\nbody"), "Heading");
        assert_eq!(derive_title(None, "   "), UNTITLED_TITLE);
        assert_eq!(derive_title(Some(""), "short line\nmore"), "short line");
        assert_eq!(
            derive_title(None, "This first line is definitely longer than thirty"),
            "This first line is definitely ..."
        );
    }

    #[test]
    fn ids_are_base36() {
        let id = generate_id();
        assert!(id.len() > 8);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(36), "10");
    }
}
