use crate::builtin::NotRecognized;
use crate::command::{CommandFactory, CommandInfo, ExecutableCommand};

/// Stateless factory for a built-in command type `T`.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A command line split into its dispatch key and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    /// Lower-cased first token.
    pub key: String,
    pub args: Vec<&'a str>,
}

impl<'a> Invocation<'a> {
    /// Split a line on whitespace; there is no quoting.
    ///
    /// Returns `None` for a blank line.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let key = tokens.next()?.to_lowercase();
        Some(Self {
            key,
            args: tokens.collect(),
        })
    }
}

/// Ordered set of command factories with a catch-all for unknown names.
///
/// Factories are asked in registration order; the first that recognizes the dispatch key
/// wins. See [`Default`] for the built-in set.
pub struct CommandRegistry {
    factories: Vec<Box<dyn CommandFactory>>,
    catalog: Vec<CommandInfo>,
}

impl CommandRegistry {
    /// Create a registry with a custom set of command factories.
    pub fn new(factories: Vec<Box<dyn CommandFactory>>) -> Self {
        let catalog = factories.iter().filter_map(|f| f.describe()).collect();
        Self { factories, catalog }
    }

    /// Add a factory after the existing ones.
    pub fn register(&mut self, factory: Box<dyn CommandFactory>) {
        if let Some(info) = factory.describe() {
            self.catalog.push(info);
        }
        self.factories.push(factory);
    }

    /// Described commands in registration order.
    pub fn catalog(&self) -> &[CommandInfo] {
        &self.catalog
    }

    /// Resolve an invocation to a runnable command.
    ///
    /// Never fails: a key nobody claims yields the not-recognized response.
    pub fn resolve(&self, invocation: &Invocation<'_>) -> Box<dyn ExecutableCommand> {
        for factory in &self.factories {
            if let Some(cmd) = factory.try_create(&invocation.key, &invocation.args) {
                return cmd;
            }
        }
        tracing::debug!(key = %invocation.key, "no command registered, using fallback");
        Box::new(NotRecognized {
            name: invocation.key.clone(),
        })
    }
}

impl Default for CommandRegistry {
    /// Create a registry with the built-ins, in the order `help` lists them:
    /// `help`, `clear`, `echo`, `time`, `date`, `ver`, `dir`, `color`.
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Help>::default()),
            Box::new(Factory::<Clear>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Time>::default()),
            Box::new(Factory::<Date>::default()),
            Box::new(Factory::<Ver>::default()),
            Box::new(Factory::<Dir>::default()),
            Box::new(Factory::<Color>::default()),
        ])
    }
}
