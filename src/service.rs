//! Task service: the layer between the presentation and the store.
//!
//! Holds the owner's tasks both flat (store order) and as a forest, and
//! rebuilds both from the store after every mutation. Every failure is
//! reported to the notifier as a destructive notification and returned to the
//! caller.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::db::resolve_task_identifier;
use crate::error::{Error, Result};
use crate::hierarchy::{build_hierarchy, find_node, flatten, would_create_cycle};
use crate::notify::{Notification, Notifier};
use crate::priority::top_urgent;
use crate::reminder::due_reminders;
use crate::store::{NewTask, TaskPatch, TaskStore};
use crate::task::{Task, TaskForm, TaskNode};

pub struct TaskService<S, N> {
    store: S,
    notifier: N,
    owner: String,
    flat: Vec<Task>,
    tree: Vec<TaskNode>,
}

impl<S: TaskStore, N: Notifier> TaskService<S, N> {
    pub fn new(store: S, notifier: N, owner: impl Into<String>) -> Self {
        TaskService {
            store,
            notifier,
            owner: owner.into(),
            flat: Vec::new(),
            tree: Vec::new(),
        }
    }

    /// Create the service and fetch the owner's tasks.
    pub fn load(store: S, notifier: N, owner: impl Into<String>) -> Result<Self> {
        let mut service = TaskService::new(store, notifier, owner);
        service.fetch()?;
        Ok(service)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Root tasks with nested subtasks, siblings in manual order.
    pub fn tasks(&self) -> &[TaskNode] {
        &self.tree
    }

    /// All tasks in store order.
    pub fn flat(&self) -> &[Task] {
        &self.flat
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.flat.iter().find(|t| t.id == id)
    }

    pub fn find_node(&self, id: &str) -> Option<&TaskNode> {
        find_node(&self.tree, id)
    }

    /// Resolve a user-typed ID, ID prefix or title.
    pub fn resolve(&self, identifier: &str) -> Result<String> {
        resolve_task_identifier(identifier, &self.flat)
    }

    pub fn fetch(&mut self) -> Result<()> {
        let result = self.reload();
        self.settle(result, "Failed to load tasks")
    }

    pub fn create(&mut self, form: TaskForm, parent: Option<&str>) -> Result<Task> {
        let result = self.try_create(form, parent);
        self.settle(result, "Failed to create task")
    }

    pub fn update(&mut self, id: &str, form: TaskForm) -> Result<Task> {
        let result = self.try_update(id, form);
        self.settle(result, "Failed to update task")
    }

    /// Move a task under `parent`, or to the root level with `None`.
    pub fn set_parent(&mut self, id: &str, parent: Option<&str>) -> Result<Task> {
        let result = self.try_set_parent(id, parent);
        self.settle(result, "Failed to move task")
    }

    /// Flip completion. Returns the new state.
    pub fn toggle_complete(&mut self, id: &str) -> Result<bool> {
        let result = self.try_toggle_complete(id);
        self.settle(result, "Failed to update task")
    }

    /// Delete a task and its subtree. Returns the removed IDs.
    pub fn delete(&mut self, id: &str) -> Result<Vec<String>> {
        let result = self.try_delete(id);
        self.settle(result, "Failed to delete task")
    }

    /// Give siblings the manual order of `ids`.
    pub fn reorder(&mut self, ids: &[String]) -> Result<()> {
        let result = self.try_reorder(ids);
        self.settle(result, "Failed to reorder tasks")
    }

    /// Move a task to position `index` within its sibling group.
    pub fn move_to(&mut self, id: &str, index: usize) -> Result<()> {
        let result = self.sibling_order_with(id, index).and_then(|ids| self.try_reorder(&ids));
        self.settle(result, "Failed to reorder tasks")
    }

    pub fn urgent(&self, today: NaiveDate, n: usize) -> Vec<&Task> {
        top_urgent(&self.tree, today, n)
    }

    /// Send due-today and due-tomorrow reminders. Returns how many were sent.
    pub fn remind(&mut self, today: NaiveDate) -> usize {
        let reminders = due_reminders(&self.tree, today);
        let count = reminders.len();
        for n in reminders {
            self.notifier.notify(n);
        }
        count
    }

    fn settle<T>(&mut self, result: Result<T>, failure: &str) -> Result<T> {
        if let Err(e) = &result {
            warn!(error = %e, owner = %self.owner, "{failure}");
            self.notifier.notify(Notification::error(failure));
        }
        result
    }

    fn reload(&mut self) -> Result<()> {
        let records = self.store.list_by_owner(&self.owner)?;
        self.flat = records.into_iter().map(Task::from).collect();
        self.tree = build_hierarchy(&self.flat);
        Ok(())
    }

    fn require(&self, id: &str) -> Result<&Task> {
        self.find(id).ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    /// Order index that places a task last among the children of `parent`.
    fn next_order(&self, parent: Option<&str>) -> i64 {
        self.flat
            .iter()
            .filter(|t| t.parent.as_deref() == parent)
            .map(|t| t.order)
            .max()
            .map_or(0, |m| m + 1)
    }

    fn try_create(&mut self, form: TaskForm, parent: Option<&str>) -> Result<Task> {
        let title = form.validated_title()?;
        let inherited = match parent {
            Some(pid) => {
                let p = self.require(pid)?;
                Some((p.due, p.weight))
            }
            None => None,
        };
        let due = form.due.or(inherited.and_then(|(due, _)| due));
        let weight = form.weight.or(inherited.map(|(_, w)| w)).unwrap_or_default();

        let new = NewTask {
            user_id: self.owner.clone(),
            title: title.clone(),
            description: form.stored_description(),
            due_date: due,
            weight: weight.into(),
            parent_task_id: parent.map(str::to_string),
            order_position: self.next_order(parent),
        };
        let record = self.store.create(new)?;
        self.reload()?;

        let suffix = if parent.is_some() { " as a subtask" } else { "" };
        self.notifier.notify(Notification::info(
            "Task created successfully!",
            format!("\"{title}\" has been added{suffix}."),
        ));
        Ok(Task::from(record))
    }

    fn try_update(&mut self, id: &str, form: TaskForm) -> Result<Task> {
        self.require(id)?;
        let title = form.validated_title()?;
        let patch = TaskPatch {
            title: Some(title.clone()),
            description: Some(form.stored_description()),
            due_date: Some(form.due),
            weight: form.weight.map(i64::from),
            ..Default::default()
        };
        let record = self.store.update(id, patch)?;
        self.reload()?;

        self.notifier.notify(Notification::info(
            "Task updated successfully!",
            format!("\"{title}\" has been updated."),
        ));
        Ok(Task::from(record))
    }

    fn try_set_parent(&mut self, id: &str, parent: Option<&str>) -> Result<Task> {
        self.require(id)?;
        if let Some(pid) = parent {
            self.require(pid)?;
            if would_create_cycle(&self.flat, id, pid) {
                return Err(Error::CycleDetected { task: id.to_string(), parent: pid.to_string() });
            }
        }
        let patch = TaskPatch {
            parent_task_id: Some(parent.map(str::to_string)),
            order_position: Some(self.next_order(parent)),
            ..Default::default()
        };
        let record = self.store.update(id, patch)?;
        self.reload()?;
        Ok(Task::from(record))
    }

    fn try_toggle_complete(&mut self, id: &str) -> Result<bool> {
        let task = self.require(id)?.clone();
        let done = !task.completed;
        self.store.update(id, TaskPatch::completed(done))?;

        // The task itself is already written; reload even if an ancestor fails.
        let cascade = if done { self.complete_finished_ancestors(&task) } else { Ok(()) };
        let reloaded = self.reload();
        cascade?;
        reloaded?;
        Ok(done)
    }

    /// Completing the last open child completes the parent, up the chain.
    /// Stops at the first task already visited, so cyclic links terminate.
    fn complete_finished_ancestors(&mut self, task: &Task) -> Result<()> {
        let mut completed: HashSet<String> = HashSet::from([task.id.clone()]);
        let mut cur = task.parent.clone();
        while let Some(pid) = cur {
            if completed.contains(&pid) {
                warn!(task = %pid, "parent links form a cycle, stopping auto-complete");
                break;
            }
            let Some(parent) = self.flat.iter().find(|t| t.id == pid) else {
                break;
            };
            if parent.completed {
                break;
            }
            let all_done = self
                .flat
                .iter()
                .filter(|t| t.parent.as_deref() == Some(pid.as_str()))
                .all(|t| t.completed || completed.contains(&t.id));
            if !all_done {
                break;
            }
            let next = parent.parent.clone();
            self.store.update(&pid, TaskPatch::completed(true))?;
            info!(task = %pid, "all subtasks done, parent completed");
            completed.insert(pid);
            cur = next;
        }
        Ok(())
    }

    fn try_delete(&mut self, id: &str) -> Result<Vec<String>> {
        let title = self.require(id)?.title.clone();
        let removed = self.store.delete(id)?;
        self.reload()?;

        self.notifier.notify(Notification::info(
            "Task deleted",
            format!("\"{title}\" has been removed."),
        ));
        Ok(removed)
    }

    fn try_reorder(&mut self, ids: &[String]) -> Result<()> {
        let mut parents = HashSet::new();
        for id in ids {
            parents.insert(self.require(id)?.parent.clone());
        }
        if parents.len() > 1 {
            return Err(Error::NotSiblings);
        }
        for (position, id) in ids.iter().enumerate() {
            self.store.update_order(id, position as i64)?;
        }
        self.reload()
    }

    /// Current sibling order of `id`'s group with `id` moved to `index`.
    fn sibling_order_with(&self, id: &str, index: usize) -> Result<Vec<String>> {
        let parent = self.require(id)?.parent.clone();
        let mut ids: Vec<String> = self
            .flat
            .iter()
            .filter(|t| t.parent == parent && t.id != id)
            .map(|t| t.id.clone())
            .collect();
        ids.insert(index.min(ids.len()), id.to_string());
        Ok(ids)
    }

    /// Pre-order view of the forest.
    pub fn flattened(&self) -> Vec<&Task> {
        flatten(&self.tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::JsonStore;
    use crate::fields::Weight;
    use crate::notify::Variant;
    use crate::db::Database;
    use crate::task::fixtures::date;
    use crate::task::TaskRecord;

    #[derive(Default)]
    struct Recorder(Vec<Notification>);

    impl Notifier for Recorder {
        fn notify(&mut self, n: Notification) {
            self.0.push(n);
        }
    }

    struct FailingStore;

    impl TaskStore for FailingStore {
        fn create(&mut self, _: NewTask) -> Result<TaskRecord> {
            Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "offline")))
        }
        fn update(&mut self, _: &str, _: TaskPatch) -> Result<TaskRecord> {
            Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "offline")))
        }
        fn delete(&mut self, _: &str) -> Result<Vec<String>> {
            Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "offline")))
        }
        fn list_by_owner(&self, _: &str) -> Result<Vec<TaskRecord>> {
            Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "offline")))
        }
        fn update_order(&mut self, _: &str, _: i64) -> Result<()> {
            Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "offline")))
        }
    }

    /// Delegates to a `JsonStore` but fails every `update` after the first `allowed`.
    struct FlakyStore {
        inner: JsonStore,
        allowed: usize,
    }

    impl TaskStore for FlakyStore {
        fn create(&mut self, new: NewTask) -> Result<TaskRecord> {
            self.inner.create(new)
        }
        fn update(&mut self, id: &str, patch: TaskPatch) -> Result<TaskRecord> {
            if self.allowed == 0 {
                return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
            }
            self.allowed -= 1;
            self.inner.update(id, patch)
        }
        fn delete(&mut self, id: &str) -> Result<Vec<String>> {
            self.inner.delete(id)
        }
        fn list_by_owner(&self, owner: &str) -> Result<Vec<TaskRecord>> {
            self.inner.list_by_owner(owner)
        }
        fn update_order(&mut self, id: &str, position: i64) -> Result<()> {
            self.inner.update_order(id, position)
        }
    }

    fn record(id: &str, parent: Option<&str>) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            user_id: "me".to_string(),
            title: id.to_string(),
            description: None,
            due_date: None,
            weight: 3,
            parent_task_id: parent.map(str::to_string),
            completed: false,
            order_position: 0,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    fn service(dir: &tempfile::TempDir) -> TaskService<JsonStore, Recorder> {
        let store = JsonStore::open(dir.path().join("tasks.json")).unwrap();
        TaskService::load(store, Recorder::default(), "me").unwrap()
    }

    fn form(title: &str) -> TaskForm {
        TaskForm::titled(title)
    }

    #[test]
    fn test_create_root_and_subtask_builds_tree() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        let root = svc.create(form("Plan trip"), None).unwrap();
        let child = svc.create(form("Book flights"), Some(&root.id)).unwrap();

        assert_eq!(svc.tasks().len(), 1);
        assert_eq!(svc.tasks()[0].subtasks[0].id(), child.id);
        assert_eq!(root.weight, Weight::Three);
        let last = svc.notifier().0.last().unwrap();
        assert_eq!(last.title, "Task created successfully!");
        assert_eq!(last.description, "\"Book flights\" has been added as a subtask.");
    }

    #[test]
    fn test_subtask_inherits_due_and_weight_when_unset() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        let mut parent_form = form("Release");
        parent_form.due = Some(date(2026, 11, 1));
        parent_form.weight = Some(Weight::Five);
        let parent = svc.create(parent_form, None).unwrap();

        let inherited = svc.create(form("Changelog"), Some(&parent.id)).unwrap();
        assert_eq!(inherited.due, Some(date(2026, 11, 1)));
        assert_eq!(inherited.weight, Weight::Five);

        let mut own = form("Tag build");
        own.weight = Some(Weight::One);
        let own = svc.create(own, Some(&parent.id)).unwrap();
        assert_eq!(own.weight, Weight::One);
        assert_eq!(own.due, Some(date(2026, 11, 1)));
        assert_eq!(own.order, 1);
    }

    #[test]
    fn test_create_rejects_blank_title_and_unknown_parent() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        assert!(matches!(svc.create(form("  "), None), Err(Error::EmptyTitle)));
        assert!(matches!(svc.create(form("x"), Some("ghost")), Err(Error::TaskNotFound(_))));
        let errors: Vec<_> = svc.notifier().0.iter().filter(|n| n.variant == Variant::Destructive).collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].description, "Failed to create task");
        assert!(svc.tasks().is_empty());
    }

    #[test]
    fn test_update_replaces_editable_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        let t = svc.create(form("Draft"), None).unwrap();
        let mut edit = form("Final");
        edit.description = "ready to send".into();
        edit.weight = Some(Weight::Four);
        let updated = svc.update(&t.id, edit).unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.description, "ready to send");
        assert_eq!(updated.weight, Weight::Four);
        assert_eq!(svc.find(&t.id).unwrap().title, "Final");
    }

    #[test]
    fn test_completing_last_child_completes_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        let top = svc.create(form("top"), None).unwrap().id;
        let mid = svc.create(form("mid"), Some(&top)).unwrap().id;
        let a = svc.create(form("a"), Some(&mid)).unwrap().id;
        let b = svc.create(form("b"), Some(&mid)).unwrap().id;

        assert!(svc.toggle_complete(&a).unwrap());
        assert!(!svc.find(&mid).unwrap().completed);

        assert!(svc.toggle_complete(&b).unwrap());
        assert!(svc.find(&mid).unwrap().completed);
        assert!(svc.find(&top).unwrap().completed);

        // Reopening a child leaves the parent alone.
        assert!(!svc.toggle_complete(&b).unwrap());
        assert!(svc.find(&mid).unwrap().completed);
    }

    #[test]
    fn test_completing_task_in_parent_cycle_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let db = Database { tasks: vec![record("a", Some("b")), record("b", Some("a"))] };
        db.save(&path).unwrap();

        let mut svc = TaskService::load(JsonStore::open(&path).unwrap(), Recorder::default(), "me").unwrap();
        assert!(svc.toggle_complete("a").unwrap());
        assert!(svc.find("a").unwrap().completed);
        assert!(svc.find("b").unwrap().completed);
    }

    #[test]
    fn test_failed_parent_completion_still_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let (parent, child) = {
            let mut svc = service(&dir);
            let parent = svc.create(form("parent"), None).unwrap().id;
            let child = svc.create(form("child"), Some(&parent)).unwrap().id;
            (parent, child)
        };

        let store = FlakyStore { inner: JsonStore::open(&path).unwrap(), allowed: 1 };
        let mut svc = TaskService::load(store, Recorder::default(), "me").unwrap();
        assert!(matches!(svc.toggle_complete(&child), Err(Error::Io(_))));
        assert!(svc.find(&child).unwrap().completed);
        assert!(!svc.find(&parent).unwrap().completed);
        assert_eq!(svc.notifier().0.last().unwrap().variant, Variant::Destructive);
    }

    #[test]
    fn test_delete_cascades_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        let root = svc.create(form("root"), None).unwrap().id;
        let child = svc.create(form("child"), Some(&root)).unwrap().id;
        svc.create(form("grandchild"), Some(&child)).unwrap();
        svc.create(form("keep"), None).unwrap();

        let removed = svc.delete(&root).unwrap();
        assert_eq!(removed.len(), 3);
        assert_eq!(svc.flat().len(), 1);
        assert_eq!(svc.notifier().0.last().unwrap().description, "\"root\" has been removed.");
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        let a = svc.create(form("a"), None).unwrap().id;
        let b = svc.create(form("b"), Some(&a)).unwrap().id;
        let c = svc.create(form("c"), None).unwrap().id;

        assert!(matches!(svc.set_parent(&a, Some(&b)), Err(Error::CycleDetected { .. })));
        assert!(matches!(svc.set_parent(&a, Some(&a)), Err(Error::CycleDetected { .. })));

        svc.set_parent(&c, Some(&b)).unwrap();
        assert_eq!(svc.find_node(&b).unwrap().subtasks[0].id(), c);
        svc.set_parent(&b, None).unwrap();
        assert_eq!(svc.tasks().len(), 2);
    }

    #[test]
    fn test_reorder_and_move_within_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        let x = svc.create(form("x"), None).unwrap().id;
        let y = svc.create(form("y"), None).unwrap().id;
        let z = svc.create(form("z"), None).unwrap().id;
        let sub = svc.create(form("sub"), Some(&x)).unwrap().id;

        svc.reorder(&[z.clone(), x.clone(), y.clone()]).unwrap();
        let roots: Vec<&str> = svc.tasks().iter().map(|n| n.id()).collect();
        assert_eq!(roots, vec![z.as_str(), x.as_str(), y.as_str()]);
        assert_eq!(svc.find(&z).unwrap().order, 0);

        svc.move_to(&y, 0).unwrap();
        let roots: Vec<&str> = svc.tasks().iter().map(|n| n.id()).collect();
        assert_eq!(roots, vec![y.as_str(), z.as_str(), x.as_str()]);

        svc.move_to(&y, 99).unwrap();
        assert_eq!(svc.tasks().last().unwrap().id(), y);

        assert!(matches!(svc.reorder(&[x, sub]), Err(Error::NotSiblings)));
    }

    #[test]
    fn test_urgent_and_reminders() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        let today = date(2026, 10, 19);
        let root = svc.create(form("root"), None).unwrap().id;
        let mut hot = form("hot");
        hot.due = Some(today);
        svc.create(hot, Some(&root)).unwrap();
        let mut later = form("later");
        later.due = Some(date(2026, 10, 20));
        svc.create(later, None).unwrap();

        let urgent: Vec<&str> = svc.urgent(today, 5).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(urgent, vec!["hot", "later", "root"]);
        assert_eq!(svc.flattened().len(), 3);

        assert_eq!(svc.remind(today), 2);
        let titles: Vec<&str> = svc.notifier().0.iter().rev().take(2).map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["1 task due tomorrow", "1 task due today!"]);
    }

    #[test]
    fn test_resolve_by_title_and_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        let t = svc.create(form("Water plants"), None).unwrap();
        assert_eq!(svc.resolve("water plants").unwrap(), t.id);
        assert_eq!(svc.resolve(&t.id[..8]).unwrap(), t.id);
    }

    #[test]
    fn test_store_failures_become_notifications() {
        let mut svc = TaskService::new(FailingStore, Recorder::default(), "me");
        assert!(matches!(svc.fetch(), Err(Error::Io(_))));
        assert_eq!(svc.notifier().0[0].description, "Failed to load tasks");
        assert_eq!(svc.notifier().0[0].variant, Variant::Destructive);
        assert!(TaskService::load(FailingStore, Recorder::default(), "me").is_err());
    }

    #[test]
    fn test_owners_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let mut alice = TaskService::load(JsonStore::open(&path).unwrap(), Recorder::default(), "alice").unwrap();
        alice.create(form("alice's"), None).unwrap();
        let bob = TaskService::load(JsonStore::open(&path).unwrap(), Recorder::default(), "bob").unwrap();
        assert!(bob.tasks().is_empty());
        assert_eq!(bob.owner(), "bob");
    }
}
