//! Per-buffer tree cache.
//!
//! Parsing always happens outside the store's locks; only the swap of the new
//! `Arc<BufferEntry>` is done under a short write lock, so readers never wait on a parse.

use crate::engine::{ParseEngine, ParsedTree};
use crate::error::{Error, Result};
use crate::query::SymbolQuery;
use crate::registry::GrammarRegistry;
use buffer_trees::navigator::smallest_node_covering;
use buffer_trees::{
    BufferId, ByteRange, ChangeNotifier, Edit, NodeInfo, PatternSet, StructuralCommand,
    SubscriptionId, Symbol, SyntaxTree, TextChange, describe_node, display_root, execute,
    render_tree, symbols,
};
use buffer_trees_lang::Settings;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Store behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Run the consistency checks (replayed changes, re-entrant updates).
    pub debug: bool,
    /// Keep at most this many trees, evicting the least recently updated.
    pub max_cached_trees: Option<usize>,
}

impl StoreOptions {
    /// Options taken from user settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            debug: settings.debug,
            max_cached_trees: settings.max_cached_trees,
        }
    }
}

/// One tracked buffer.
#[derive(Debug)]
pub struct BufferEntry {
    buffer: BufferId,
    grammar: String,
    parsed: ParsedTree,
    updated_at: Instant,
    generation: u64,
}

impl BufferEntry {
    /// Buffer id.
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Grammar the buffer was parsed with.
    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    /// Current tree.
    pub fn tree(&self) -> &Arc<SyntaxTree> {
        self.parsed.tree()
    }

    /// Parser output backing the tree.
    pub fn parsed(&self) -> &ParsedTree {
        &self.parsed
    }

    /// Source text the tree was parsed from.
    pub fn source(&self) -> &str {
        self.parsed.source()
    }

    /// Source length in bytes.
    pub fn source_len(&self) -> usize {
        self.tree().source_len()
    }

    /// When the tree was installed.
    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }
}

/// Live syntax trees keyed by buffer id.
///
/// One writer per buffer at a time is the caller's responsibility; different buffers may be
/// updated concurrently from different threads.
pub struct BufferTreeStore {
    registry: RwLock<Arc<GrammarRegistry>>,
    entries: RwLock<HashMap<BufferId, Arc<BufferEntry>>>,
    notifier: ChangeNotifier,
    options: StoreOptions,
    notifying: Mutex<HashSet<BufferId>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for BufferTreeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferTreeStore")
            .field("buffers", &self.entries.read().len())
            .field("options", &self.options)
            .finish()
    }
}

impl BufferTreeStore {
    /// Create a store with default options.
    pub fn new(registry: Arc<GrammarRegistry>) -> Self {
        Self::with_options(registry, StoreOptions::default())
    }

    /// Create a store with explicit options.
    pub fn with_options(registry: Arc<GrammarRegistry>, options: StoreOptions) -> Self {
        Self {
            registry: RwLock::new(registry),
            entries: RwLock::new(HashMap::new()),
            notifier: ChangeNotifier::new(),
            options,
            notifying: Mutex::new(HashSet::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Options the store was created with.
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Current grammar registry.
    pub fn registry(&self) -> Arc<GrammarRegistry> {
        Arc::clone(&self.registry.read())
    }

    /// Parse `source` from scratch and make it the buffer's tree, replacing any previous entry.
    pub fn track(&self, buffer: BufferId, grammar: &str, source: &[u8]) -> Result<Arc<SyntaxTree>> {
        self.check_reentrant(buffer)?;
        let registry = self.registry();
        let parsed = ParseEngine::new(&registry)
            .parse(grammar, source)
            .inspect_err(|err| tracing::warn!(%buffer, grammar, %err, "track failed"))?;

        tracing::debug!(%buffer, grammar, bytes = source.len(), "tracking buffer");
        Ok(self.install(buffer, grammar, parsed))
    }

    /// Apply `edit` to the buffer's tree and re-parse `new_source` incrementally.
    pub fn update(
        &self,
        buffer: BufferId,
        edit: &Edit,
        new_source: &[u8],
    ) -> Result<Arc<SyntaxTree>> {
        self.check_reentrant(buffer)?;
        let entry = self.entry(buffer).ok_or(Error::UntrackedBuffer(buffer))?;
        let registry = self.registry();
        let parsed = ParseEngine::new(&registry)
            .reparse(Some(entry.parsed()), Some(edit), entry.grammar(), new_source)
            .inspect_err(|err| tracing::warn!(%buffer, %err, "update failed, keeping stale tree"))?;

        tracing::debug!(
            %buffer,
            grammar = entry.grammar(),
            bytes = new_source.len(),
            incremental = true,
            "updated buffer"
        );
        Ok(self.install(buffer, entry.grammar(), parsed))
    }

    /// Apply editor changes, in order, to the stored source and re-parse `new_source` once.
    ///
    /// In debug mode the replayed changes must reproduce `new_source` exactly.
    pub fn update_with_changes(
        &self,
        buffer: BufferId,
        changes: &[TextChange],
        new_source: &[u8],
    ) -> Result<Arc<SyntaxTree>> {
        self.check_reentrant(buffer)?;
        let entry = self.entry(buffer).ok_or(Error::UntrackedBuffer(buffer))?;
        let (edits, replayed) = ParseEngine::edits_for_changes(entry.source(), changes)?;
        if self.options.debug && replayed.as_bytes() != new_source {
            tracing::warn!(%buffer, "replayed changes do not match the new source");
            return Err(Error::EditMismatch(buffer));
        }

        let registry = self.registry();
        let parsed = ParseEngine::new(&registry)
            .reparse_with_edits(Some(entry.parsed()), &edits, entry.grammar(), new_source)
            .inspect_err(|err| tracing::warn!(%buffer, %err, "update failed, keeping stale tree"))?;

        tracing::debug!(
            %buffer,
            grammar = entry.grammar(),
            bytes = new_source.len(),
            changes = changes.len(),
            incremental = !edits.is_empty(),
            "updated buffer"
        );
        Ok(self.install(buffer, entry.grammar(), parsed))
    }

    /// The buffer's current tree. Never parses.
    pub fn get(&self, buffer: BufferId) -> Option<Arc<SyntaxTree>> {
        self.entries
            .read()
            .get(&buffer)
            .map(|entry| Arc::clone(entry.tree()))
    }

    /// The buffer's full entry.
    pub fn entry(&self, buffer: BufferId) -> Option<Arc<BufferEntry>> {
        self.entries.read().get(&buffer).cloned()
    }

    /// Stop tracking a buffer. Returns `false` if it was not tracked.
    pub fn untrack(&self, buffer: BufferId) -> bool {
        let removed = self.entries.write().remove(&buffer).is_some();
        if removed {
            tracing::debug!(%buffer, "untracked buffer");
        }
        removed
    }

    /// Snapshot of every tracked tree.
    pub fn all(&self) -> HashMap<BufferId, Arc<SyntaxTree>> {
        self.entries
            .read()
            .iter()
            .map(|(buffer, entry)| (*buffer, Arc::clone(entry.tree())))
            .collect()
    }

    /// The stored tree if it was parsed from `source` with `grammar`, otherwise a fresh
    /// [`track`](Self::track).
    pub fn get_or_track(
        &self,
        buffer: BufferId,
        grammar: &str,
        source: &[u8],
    ) -> Result<Arc<SyntaxTree>> {
        if let Some(entry) = self.entry(buffer)
            && entry.grammar() == grammar
            && entry.source().as_bytes() == source
        {
            return Ok(Arc::clone(entry.tree()));
        }
        self.track(buffer, grammar, source)
    }

    /// Tracked buffer ids, sorted.
    pub fn tracked_buffer_ids(&self) -> Vec<BufferId> {
        let mut ids: Vec<BufferId> = self.entries.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Swap in a new registry and untrack buffers whose grammar it cannot load.
    ///
    /// Returns the untracked buffer ids, sorted.
    pub fn set_registry(&self, registry: Arc<GrammarRegistry>) -> Vec<BufferId> {
        let mut removed: Vec<BufferId> = {
            let mut entries = self.entries.write();
            let stale: Vec<BufferId> = entries
                .values()
                .filter(|entry| registry.grammar_for(entry.grammar()).is_err())
                .map(|entry| entry.buffer())
                .collect();
            for buffer in &stale {
                entries.remove(buffer);
            }
            stale
        };
        *self.registry.write() = registry;

        removed.sort_unstable();
        for buffer in &removed {
            tracing::debug!(%buffer, "untracked buffer after registry change");
        }
        removed
    }

    /// Register a change observer.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(BufferId) + Send + Sync + 'static,
    {
        self.notifier.subscribe(observer)
    }

    /// Remove a change observer.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// The store's change notifier.
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Symbols matched by `patterns` in the buffer's tree.
    pub fn symbols(&self, buffer: BufferId, patterns: &PatternSet) -> Result<Vec<Symbol>> {
        let tree = self.require(buffer)?;
        Ok(symbols::extract(&tree, patterns))
    }

    /// Symbols captured by `query` in the buffer.
    pub fn query_symbols(&self, buffer: BufferId, query: &SymbolQuery) -> Result<Vec<Symbol>> {
        let entry = self.entry(buffer).ok_or(Error::UntrackedBuffer(buffer))?;
        query.run(entry.parsed())
    }

    /// Symbols captured by `query` inside the nodes spanning `ranges`.
    pub fn query_symbols_in(
        &self,
        buffer: BufferId,
        query: &SymbolQuery,
        ranges: &[ByteRange],
    ) -> Result<Vec<Symbol>> {
        let entry = self.entry(buffer).ok_or(Error::UntrackedBuffer(buffer))?;
        query.run_within(entry.parsed(), ranges)
    }

    /// Run a structural selection command against the buffer's tree.
    pub fn navigate(
        &self,
        buffer: BufferId,
        command: &StructuralCommand,
        ranges: &[ByteRange],
    ) -> Result<Vec<ByteRange>> {
        let tree = self.require(buffer)?;
        Ok(execute(&tree, command, ranges)?)
    }

    /// Render the buffer's tree, or the part around `range`.
    pub fn render(&self, buffer: BufferId, range: Option<ByteRange>) -> Result<String> {
        let tree = self.require(buffer)?;
        let node = match range {
            Some(range) => display_root(smallest_node_covering(&tree, range)?),
            None => tree.root(),
        };
        Ok(render_tree(node))
    }

    /// Describe the node covering `range` and its equal-sized ancestors.
    pub fn node_info(&self, buffer: BufferId, range: ByteRange) -> Result<Vec<NodeInfo>> {
        let tree = self.require(buffer)?;
        Ok(describe_node(smallest_node_covering(&tree, range)?))
    }

    fn require(&self, buffer: BufferId) -> Result<Arc<SyntaxTree>> {
        self.get(buffer).ok_or(Error::UntrackedBuffer(buffer))
    }

    fn check_reentrant(&self, buffer: BufferId) -> Result<()> {
        if self.options.debug && self.notifying.lock().contains(&buffer) {
            tracing::warn!(%buffer, "update from inside its own change notification");
            return Err(Error::ReentrantUpdate(buffer));
        }
        Ok(())
    }

    fn install(&self, buffer: BufferId, grammar: &str, parsed: ParsedTree) -> Arc<SyntaxTree> {
        let tree = Arc::clone(parsed.tree());
        let entry = Arc::new(BufferEntry {
            buffer,
            grammar: grammar.to_string(),
            parsed,
            updated_at: Instant::now(),
            generation: self.generation.fetch_add(1, Ordering::Relaxed),
        });

        let evicted = {
            let mut entries = self.entries.write();
            entries.insert(buffer, entry);
            self.evict(&mut entries, buffer)
        };
        for id in evicted {
            tracing::debug!(buffer = %id, "evicted least recently updated tree");
        }

        self.notify(buffer);
        tree
    }

    fn evict(
        &self,
        entries: &mut HashMap<BufferId, Arc<BufferEntry>>,
        keep: BufferId,
    ) -> Vec<BufferId> {
        let Some(max) = self.options.max_cached_trees else {
            return Vec::new();
        };
        let excess = entries.len().saturating_sub(max.max(1));
        if excess == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<(u64, BufferId)> = entries
            .values()
            .filter(|entry| entry.buffer != keep)
            .map(|entry| (entry.generation, entry.buffer))
            .collect();
        candidates.sort_unstable();

        candidates
            .into_iter()
            .take(excess)
            .map(|(_, buffer)| {
                entries.remove(&buffer);
                buffer
            })
            .collect()
    }

    fn notify(&self, buffer: BufferId) {
        if !self.options.debug {
            self.notifier.notify(buffer);
            return;
        }

        let _guard = NotifyingGuard::enter(&self.notifying, buffer);
        self.notifier.notify(buffer);
    }
}

struct NotifyingGuard<'a> {
    set: &'a Mutex<HashSet<BufferId>>,
    buffer: BufferId,
    inserted: bool,
}

impl<'a> NotifyingGuard<'a> {
    fn enter(set: &'a Mutex<HashSet<BufferId>>, buffer: BufferId) -> Self {
        let inserted = set.lock().insert(buffer);
        Self {
            set,
            buffer,
            inserted,
        }
    }
}

impl Drop for NotifyingGuard<'_> {
    fn drop(&mut self) {
        if self.inserted {
            self.set.lock().remove(&self.buffer);
        }
    }
}
