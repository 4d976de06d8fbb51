//! Symbol values and host-driven resolution.
//!
//! The resolver owns the symbol map seeded from the document (declared
//! symbols unresolved, constants pre-filled). Overlays evaluate against it
//! directly; when a caller wants missing symbols filled in, prompting runs as
//! a serialized queue through a host-implemented sink: one symbol at a time,
//! discovery order, each symbol at most once per pass, completion callbacks
//! fired when the queue drains.

use std::collections::VecDeque;

use floe_model::expr::SymbolMap;
use floe_model::{Expr, GraphDocument, NodeKind, traverse};
use rustc_hash::FxHashMap;

/// Host-side prompt surface (a dialog, a console read, a test stub). The host
/// answers by calling [`SymbolResolver::provide`].
pub trait SymbolPrompt {
    fn prompt(&mut self, symbol: &str);
}

pub type ResolutionCallback = Box<dyn FnOnce(&SymbolMap)>;

#[derive(Default)]
pub struct SymbolResolver {
    symbols: SymbolMap,
    queue: VecDeque<String>,
    callbacks: Vec<ResolutionCallback>,
}

impl SymbolResolver {
    /// Seeds from the document tree: declared symbols start unresolved
    /// (nested documents included, since a symbol their mapping table leaves
    /// untouched passes through to this scope), constants start resolved.
    pub fn new(doc: &GraphDocument) -> Self {
        let mut symbols = SymbolMap::default();
        traverse::walk_documents(doc, &mut |d| {
            for name in d.symbols.keys() {
                symbols.entry(name.clone()).or_insert(None);
            }
        });
        for (name, value) in &doc.constants {
            symbols.insert(name.clone(), Some(*value));
        }
        Self {
            symbols,
            queue: VecDeque::new(),
            callbacks: Vec::new(),
        }
    }

    pub fn symbols(&self) -> &SymbolMap {
        &self.symbols
    }

    pub fn define(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.symbols.insert(name.into(), value);
    }

    /// Evaluation without prompting; `None` marks an unknown result.
    pub fn evaluate(&self, expr: &Expr) -> Option<f64> {
        expr.evaluate(&self.symbols)
    }

    /// Evaluates once all free symbols are resolved, prompting for the ones
    /// that are not. The callback fires immediately when nothing is missing.
    pub fn evaluate_or_prompt(
        &mut self,
        expr: &Expr,
        prompter: &mut dyn SymbolPrompt,
        done: ResolutionCallback,
    ) {
        let missing: Vec<String> = expr
            .free_symbols()
            .into_iter()
            .filter(|s| self.symbols.get(s).copied().flatten().is_none())
            .filter(|s| !self.queue.contains(s))
            .collect();

        if missing.is_empty() && self.queue.is_empty() {
            done(&self.symbols);
            return;
        }

        let was_idle = self.queue.is_empty();
        self.queue.extend(missing);
        self.callbacks.push(done);
        if was_idle && let Some(front) = self.queue.front() {
            let front = front.clone();
            prompter.prompt(&front);
        }
    }

    /// Host answer for the symbol currently at the front of the queue.
    /// `None` records the symbol as explicitly unresolvable for this pass.
    pub fn provide(&mut self, name: &str, value: Option<f64>, prompter: &mut dyn SymbolPrompt) {
        self.symbols.insert(name.to_string(), value);
        if self.queue.front().is_some_and(|front| front == name) {
            self.queue.pop_front();
        }
        if let Some(next) = self.queue.front() {
            let next = next.clone();
            prompter.prompt(&next);
        } else {
            for cb in self.callbacks.drain(..) {
                cb(&self.symbols);
            }
        }
    }
}

/// Symbol maps for every (possibly nested) graph, keyed by graph id. Nested
/// documents see parent symbols remapped through their symbol-mapping table;
/// parent symbols not locally overridden pass through, and nested constants
/// apply on top.
pub fn graph_symbol_maps(doc: &GraphDocument, base: &SymbolMap) -> FxHashMap<i64, SymbolMap> {
    let mut out = FxHashMap::default();
    collect_graph_symbols(doc, base, &mut out);
    out
}

fn collect_graph_symbols(
    doc: &GraphDocument,
    parent: &SymbolMap,
    out: &mut FxHashMap<i64, SymbolMap>,
) {
    if out.contains_key(&doc.graph_id) {
        return;
    }
    let mut map = parent.clone();
    for (name, value) in &doc.constants {
        map.insert(name.clone(), Some(*value));
    }
    out.insert(doc.graph_id, map.clone());

    for state in &doc.states {
        for node in &state.nodes {
            if let NodeKind::NestedGraph {
                document,
                symbol_mapping,
            } = &node.kind
            {
                let mut inner = map.clone();
                for (inner_name, expr_text) in symbol_mapping {
                    let value = Expr::parse(expr_text).ok().and_then(|e| e.evaluate(&map));
                    inner.insert(inner_name.clone(), value);
                }
                collect_graph_symbols(document, &inner, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct PromptLog {
        asked: Vec<String>,
    }

    impl SymbolPrompt for PromptLog {
        fn prompt(&mut self, symbol: &str) {
            self.asked.push(symbol.to_string());
        }
    }

    #[test]
    fn prompts_each_unresolved_symbol_once_in_discovery_order() {
        let mut resolver = SymbolResolver::default();
        resolver.define("K", Some(4.0));
        let expr = Expr::parse("N * M + N + K").unwrap();

        let mut prompter = PromptLog::default();
        let result = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&result);
        resolver.evaluate_or_prompt(
            &expr,
            &mut prompter,
            Box::new(move |symbols| {
                *slot.borrow_mut() = Expr::parse("N * M + N + K").unwrap().evaluate(symbols);
            }),
        );

        assert_eq!(prompter.asked, vec!["N"]);
        resolver.provide("N", Some(3.0), &mut prompter);
        assert_eq!(prompter.asked, vec!["N", "M"]);
        resolver.provide("M", Some(2.0), &mut prompter);

        // 3*2 + 3 + 4
        assert_eq!(*result.borrow(), Some(13.0));
    }

    #[test]
    fn completes_immediately_when_everything_is_resolved() {
        let mut resolver = SymbolResolver::default();
        resolver.define("N", Some(8.0));
        let expr = Expr::parse("N / 2").unwrap();
        let mut prompter = PromptLog::default();
        let fired = Rc::new(RefCell::new(false));
        let slot = Rc::clone(&fired);
        resolver.evaluate_or_prompt(&expr, &mut prompter, Box::new(move |_| *slot.borrow_mut() = true));
        assert!(prompter.asked.is_empty());
        assert!(*fired.borrow());
    }

    #[test]
    fn declining_a_symbol_still_drains_the_queue() {
        let mut resolver = SymbolResolver::default();
        let expr = Expr::parse("N + 1").unwrap();
        let mut prompter = PromptLog::default();
        let fired = Rc::new(RefCell::new(false));
        let slot = Rc::clone(&fired);
        resolver.evaluate_or_prompt(&expr, &mut prompter, Box::new(move |_| *slot.borrow_mut() = true));
        resolver.provide("N", None, &mut prompter);
        assert!(*fired.borrow());
        assert_eq!(resolver.evaluate(&expr), None);
    }

    #[test]
    fn resolver_seeding_reaches_nested_declarations() {
        use floe_model::{Node, State};
        let inner_doc = GraphDocument {
            graph_id: 1,
            symbols: [("Q".to_string(), Default::default())].into_iter().collect(),
            ..Default::default()
        };
        let mut state = State::default();
        state.nodes.push(Node::new(
            "nest",
            NodeKind::NestedGraph {
                document: Box::new(inner_doc),
                symbol_mapping: Default::default(),
            },
        ));
        state.scope_of.push(None);
        let mut doc = GraphDocument::default();
        doc.symbols.insert("N".to_string(), Default::default());
        doc.constants.insert("K".to_string(), 2.0);
        doc.states.push(state);

        let resolver = SymbolResolver::new(&doc);
        assert_eq!(resolver.symbols().get("N").copied(), Some(None));
        assert_eq!(resolver.symbols().get("Q").copied(), Some(None));
        assert_eq!(resolver.symbols().get("K").copied().flatten(), Some(2.0));
    }

    #[test]
    fn nested_graphs_remap_parent_symbols() {
        use floe_model::{Node, State};
        let inner_doc = GraphDocument {
            graph_id: 1,
            ..Default::default()
        };
        let mut mapping = indexmap::IndexMap::new();
        mapping.insert("M".to_string(), "N * 2".to_string());
        let mut state = State::default();
        state.nodes.push(Node::new(
            "nest",
            NodeKind::NestedGraph {
                document: Box::new(inner_doc),
                symbol_mapping: mapping,
            },
        ));
        state.scope_of.push(None);
        let mut doc = GraphDocument::default();
        doc.states.push(state);

        let mut base = SymbolMap::default();
        base.insert("N".to_string(), Some(5.0));
        let maps = graph_symbol_maps(&doc, &base);

        let inner = &maps[&1];
        assert_eq!(inner.get("M").copied().flatten(), Some(10.0));
        // Unmapped parent symbols pass through.
        assert_eq!(inner.get("N").copied().flatten(), Some(5.0));
    }
}
