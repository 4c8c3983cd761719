use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use scriptkit_core::registry::{self, split_args, Module};
use scriptkit_core::report::final_status;
use scriptkit_core::CommandRunner;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Focus {
    Categories,
    Modules,
    Actions,
}

pub struct App {
    categories: Vec<String>,
    modules_by_category: BTreeMap<String, Vec<Module>>,
    category_index: usize,
    module_index: usize,
    action_index: usize,
    focus: Focus,
    status: String,
    /// Argument lines edited in this session, keyed by module id and action.
    overrides: HashMap<(String, String), String>,
    /// Buffer of the argument line being edited, if any.
    editing: Option<String>,
}

impl App {
    pub fn new(modules: Vec<Module>) -> Self {
        let mut map: BTreeMap<String, Vec<Module>> = BTreeMap::new();
        for module in modules {
            map.entry(module.category.clone()).or_default().push(module);
        }
        for modules in map.values_mut() {
            modules.sort_by(|a, b| a.name.cmp(&b.name));
        }

        let categories = map.keys().cloned().collect::<Vec<_>>();

        let mut app = Self {
            categories,
            modules_by_category: map,
            category_index: 0,
            module_index: 0,
            action_index: 0,
            focus: Focus::Categories,
            status: String::from("Ready. Use Tab to switch panels."),
            overrides: HashMap::new(),
            editing: None,
        };
        app.clamp_indices();
        app
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn category_index(&self) -> usize {
        self.category_index
    }

    pub fn module_index(&self) -> usize {
        self.module_index
    }

    pub fn action_index(&self) -> usize {
        self.action_index
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn current_modules(&self) -> Vec<&Module> {
        self.categories
            .get(self.category_index)
            .and_then(|category| self.modules_by_category.get(category))
            .map(|modules| modules.iter().collect())
            .unwrap_or_default()
    }

    pub fn current_module(&self) -> Option<&Module> {
        self.current_modules().get(self.module_index).copied()
    }

    /// `(name, argument line)` pairs of the selected module, edits applied.
    pub fn current_actions(&self) -> Vec<(String, String)> {
        self.current_module()
            .map(|module| {
                module
                    .actions
                    .iter()
                    .map(|(name, args)| {
                        let key = (module.id.clone(), name.clone());
                        let args = self.overrides.get(&key).unwrap_or(args);
                        (name.clone(), args.clone())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn focus_next(&mut self) {
        self.cycle_focus(1);
    }

    pub fn focus_prev(&mut self) {
        let back = self.panels().len() - 1;
        self.cycle_focus(back);
    }

    pub fn move_up(&mut self) {
        self.move_by(-1);
    }

    pub fn move_down(&mut self) {
        self.move_by(1);
    }

    /// Start editing the argument line of the selected action.
    pub fn begin_edit(&mut self) {
        if self.focus != Focus::Actions {
            self.status = String::from("Select an action to edit its arguments.");
            return;
        }
        if let Some((_, args)) = self.current_actions().get(self.action_index) {
            self.editing = Some(args.clone());
        }
    }

    pub fn edit_push(&mut self, ch: char) {
        if let Some(buffer) = &mut self.editing {
            buffer.push(ch);
        }
    }

    pub fn edit_pop(&mut self) {
        if let Some(buffer) = &mut self.editing {
            buffer.pop();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Keep the edited line for the selected action.
    pub fn commit_edit(&mut self) {
        let Some(buffer) = self.editing.take() else {
            return;
        };
        let Some(module) = self.current_module() else {
            return;
        };
        let module_id = module.id.clone();
        if let Some((name, _)) = self.current_actions().get(self.action_index) {
            self.status = format!("Arguments for {module_id} {name} updated.");
            self.overrides.insert((module_id, name.clone()), buffer);
        }
    }

    /// Run the selected action as a subprocess and show its final status.
    pub fn activate(&mut self, runner: &dyn CommandRunner, bin_dir: Option<&Path>) {
        if self.focus != Focus::Actions {
            self.status = String::from("Select an action and press Enter to run it.");
            return;
        }
        let Some(module) = self.current_module() else {
            self.status = String::from("No module selected.");
            return;
        };
        let Some((name, line)) = self.current_actions().get(self.action_index).cloned() else {
            self.status = String::from("No actions available for this module.");
            return;
        };

        let program = module.resolve_command(bin_dir).to_string_lossy().into_owned();
        let module_id = module.id.clone();
        tracing::debug!(module = %module_id, action = %name, "running action");

        self.status = match runner.run(&program, &split_args(&line)) {
            Ok(output) => match final_status(&output.stdout) {
                Some((tag, message)) => format!("{module_id}: {tag} {message}"),
                None if output.success() => format!("{module_id}: {name} finished"),
                None => match output.status {
                    Some(code) => format!("{module_id}: [ERROR] exited with status {code}"),
                    None => format!("{module_id}: [ERROR] terminated by signal"),
                },
            },
            Err(err) => format!("{module_id}: [ERROR] {err}"),
        };
    }

    /// Panels with something to select, in tab order.
    fn panels(&self) -> Vec<Focus> {
        let mut panels = vec![Focus::Categories];
        if !self.current_modules().is_empty() {
            panels.push(Focus::Modules);
        }
        if self.current_module().is_some_and(|m| !m.actions.is_empty()) {
            panels.push(Focus::Actions);
        }
        panels
    }

    fn cycle_focus(&mut self, steps: usize) {
        let panels = self.panels();
        let at = panels.iter().position(|p| *p == self.focus).unwrap_or(0);
        self.focus = panels[(at + steps) % panels.len()];
    }

    fn move_by(&mut self, delta: isize) {
        let (index, len) = match self.focus {
            Focus::Categories => (self.category_index, self.categories.len()),
            Focus::Modules => (self.module_index, self.current_modules().len()),
            Focus::Actions => (self.action_index, self.current_actions().len()),
        };
        let Some(target) = index.checked_add_signed(delta).filter(|i| *i < len) else {
            return;
        };
        match self.focus {
            Focus::Categories => {
                self.category_index = target;
                self.module_index = 0;
                self.action_index = 0;
            }
            Focus::Modules => {
                self.module_index = target;
                self.action_index = 0;
            }
            Focus::Actions => self.action_index = target,
        }
        self.clamp_indices();
    }

    fn clamp_indices(&mut self) {
        self.category_index = self.category_index.min(self.categories.len().saturating_sub(1));
        self.module_index = self.module_index.min(self.current_modules().len().saturating_sub(1));
        let actions = self.current_module().map_or(0, |m| m.actions.len());
        self.action_index = self.action_index.min(actions.saturating_sub(1));
    }
}

/// Builtins plus manifests from `modules_dir`; a broken manifest directory
/// falls back to the builtins alone.
pub fn load_modules(modules_dir: &Path) -> (Vec<Module>, Option<String>) {
    match registry::Registry::new(modules_dir.to_path_buf()).modules() {
        Ok(modules) => (modules, None),
        Err(err) => (
            registry::builtin_modules(),
            Some(format!("Failed to load modules from {}: {err}", modules_dir.display())),
        ),
    }
}
