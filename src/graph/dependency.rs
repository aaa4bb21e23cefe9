//! DependencyGraph - trigger → dependents edges between model properties
//!
//! Performance notes:
//! - Arc<str> names shared with the schema and emitted events
//! - FxHashMap for faster hashing (non-crypto)
//! - SmallVec: most triggers feed 0-4 dependents
//!
//! Registration rejects cycles up front:
//! - `CycleCheck::Direct`: self-dependency or `A ← B` while `B ← A` exists
//! - `CycleCheck::Full`: any edge whose dependent already reaches the trigger

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::debug;

use crate::config::CycleCheck;
use crate::error::{check_name, BinderyError, Result};

/// Stack-allocated dependents: most triggers have 0-4 of them
pub type DependentVec = SmallVec<[Arc<str>; 4]>;

/// Graph of property dependencies
///
/// Dependents of a trigger keep registration order and appear at most once.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// trigger -> dependents, in registration order
    dependents: FxHashMap<Arc<str>, DependentVec>,
    /// Triggers in first-registration order (deterministic traversal)
    triggers: Vec<Arc<str>>,
    cycle_check: CycleCheck,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cycle_check(cycle_check: CycleCheck) -> Self {
        Self {
            cycle_check,
            ..Self::default()
        }
    }

    pub fn cycle_check(&self) -> CycleCheck {
        self.cycle_check
    }

    /// Declare that `dependent` must be notified whenever any of `triggers` changes
    ///
    /// All triggers are validated before any edge is added: a rejected call
    /// leaves the graph untouched.
    pub fn add_dependency<I>(&mut self, dependent: &str, triggers: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        check_name(dependent)?;
        let dependent = self.intern(dependent);

        let mut staged: Vec<Arc<str>> = Vec::new();
        for trigger in triggers {
            let trigger = trigger.as_ref();
            check_name(trigger)?;
            self.check_edge(trigger, &dependent)?;
            if !staged.iter().any(|t| t.as_ref() == trigger) {
                staged.push(self.intern(trigger));
            }
        }

        for trigger in staged {
            debug!(trigger = %trigger, dependent = %dependent, "Registering dependency");
            self.insert_edge(trigger, Arc::clone(&dependent));
        }

        Ok(())
    }

    /// Dependents registered for `trigger` (empty when none)
    #[inline]
    pub fn dependents_of(&self, trigger: &str) -> &[Arc<str>] {
        static EMPTY: &[Arc<str>] = &[];
        self.dependents
            .get(trigger)
            .map_or(EMPTY, SmallVec::as_slice)
    }

    /// Every property reachable from `trigger`, breadth-first, each once
    ///
    /// `trigger` itself is never included, even when a cycle leads back to it.
    pub fn transitive_dependents(&self, trigger: &str) -> Vec<Arc<str>> {
        let mut result = Vec::new();
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();

        visited.insert(trigger);
        queue.push_back(trigger);

        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents_of(current) {
                if visited.insert(dependent.as_ref()) {
                    result.push(Arc::clone(dependent));
                    queue.push_back(dependent.as_ref());
                }
            }
        }

        result
    }

    /// Check if a change of `from` can reach `to` (BFS)
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }

        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();

        queue.push_back(from);
        visited.insert(from);

        while let Some(current) = queue.pop_front() {
            for neighbor in self.dependents_of(current) {
                if neighbor.as_ref() == to {
                    return true;
                }
                if visited.insert(neighbor.as_ref()) {
                    queue.push_back(neighbor.as_ref());
                }
            }
        }

        false
    }

    /// Whether `dependent` is registered under `trigger`
    pub fn contains_edge(&self, trigger: &str, dependent: &str) -> bool {
        self.dependents_of(trigger)
            .iter()
            .any(|d| d.as_ref() == dependent)
    }

    /// Triggers in first-registration order
    pub fn triggers(&self) -> impl Iterator<Item = &Arc<str>> {
        self.triggers.iter()
    }

    /// Number of trigger → dependent edges
    pub fn edge_count(&self) -> usize {
        self.dependents.values().map(SmallVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Find a cycle left in the graph, using DFS with three-color marking.
    ///
    /// Only reachable under `CycleCheck::Direct`, which lets longer loops
    /// through. Returns the loop as `a → b → … → a`.
    pub fn find_cycle(&self) -> Option<Vec<Arc<str>>> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn dfs(
            node: &Arc<str>,
            graph: &DependencyGraph,
            colors: &mut FxHashMap<Arc<str>, Color>,
            stack: &mut Vec<Arc<str>>,
        ) -> Option<Vec<Arc<str>>> {
            colors.insert(Arc::clone(node), Color::Gray);
            stack.push(Arc::clone(node));

            for neighbor in graph.dependents_of(node) {
                match colors.get(neighbor).copied().unwrap_or(Color::White) {
                    Color::Gray => {
                        let start = stack.iter().position(|x| x == neighbor).unwrap_or(0);
                        let mut cycle = stack[start..].to_vec();
                        cycle.push(Arc::clone(neighbor));
                        return Some(cycle);
                    }
                    Color::White => {
                        if let Some(cycle) = dfs(neighbor, graph, colors, stack) {
                            return Some(cycle);
                        }
                    }
                    Color::Black => {}
                }
            }

            stack.pop();
            colors.insert(Arc::clone(node), Color::Black);
            None
        }

        let mut colors: FxHashMap<Arc<str>, Color> = FxHashMap::default();
        let mut stack: Vec<Arc<str>> = Vec::new();

        for trigger in &self.triggers {
            if colors.get(trigger).is_none() {
                if let Some(cycle) = dfs(trigger, self, &mut colors, &mut stack) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    /// Reject the edge `trigger → dependent` if it closes a loop
    fn check_edge(&self, trigger: &str, dependent: &str) -> Result<()> {
        let loops = trigger == dependent
            || match self.cycle_check {
                CycleCheck::Direct => self.contains_edge(dependent, trigger),
                CycleCheck::Full => self.has_path(dependent, trigger),
            };

        if loops {
            return Err(BinderyError::DependencyCycle {
                trigger: trigger.to_string(),
                dependent: dependent.to_string(),
            });
        }
        Ok(())
    }

    fn insert_edge(&mut self, trigger: Arc<str>, dependent: Arc<str>) {
        if !self.dependents.contains_key(&trigger) {
            self.triggers.push(Arc::clone(&trigger));
        }
        let dependents = self.dependents.entry(trigger).or_default();
        if !dependents.contains(&dependent) {
            dependents.push(dependent);
        }
    }

    /// Reuse the graph's existing Arc for `name` when there is one
    fn intern(&self, name: &str) -> Arc<str> {
        if let Some((key, _)) = self.dependents.get_key_value(name) {
            return Arc::clone(key);
        }
        self.dependents
            .values()
            .flat_map(|deps| deps.iter())
            .find(|d| d.as_ref() == name)
            .cloned()
            .unwrap_or_else(|| Arc::from(name))
    }
}
