use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use lasso::{Rodeo, Spur};

use crate::value::Value;

static ARENA_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Handle to one environment frame inside an [`Environments`] arena.
///
/// Handles remember the arena that created them; every other arena rejects
/// them with [`EnvError::Foreign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId {
    arena: u64,
    index: usize,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    #[error("unbound name: {0}")]
    Unbound(Box<str>),
    #[error("environment {env:?} belongs to another arena")]
    Foreign { env: EnvId },
}

impl EnvError {
    pub fn unbound(name: impl AsRef<str>) -> Self {
        Self::Unbound(Box::from(name.as_ref()))
    }
}

/// Arena of environment frames.
///
/// Each frame maps names to values and may point at an enclosing frame. Frames
/// live as long as the arena, so a parent always outlives its children.
#[derive(Debug)]
pub struct Environments {
    id: u64,
    interner: Rodeo,
    frames: Vec<Frame>,
}

#[derive(Debug)]
struct Frame {
    parent: Option<EnvId>,
    values: HashMap<Spur, Value>,
}

impl Default for Environments {
    fn default() -> Self {
        Self::new()
    }
}

impl Environments {
    pub fn new() -> Self {
        Self {
            id: ARENA_COUNTER.fetch_add(1, Ordering::Relaxed),
            interner: Rodeo::default(),
            frames: vec![],
        }
    }

    /// Creates an empty frame with no parent
    pub fn root(&mut self) -> EnvId {
        self.insert(None)
    }

    /// Creates an empty frame enclosed by `parent`
    pub fn push(&mut self, parent: EnvId) -> Result<EnvId, EnvError> {
        self.frame(parent)?;
        Ok(self.insert(Some(parent)))
    }

    pub fn parent(&self, env: EnvId) -> Result<Option<EnvId>, EnvError> {
        Ok(self.frame(env)?.parent)
    }

    /// Creates or replaces a binding in `env` itself, never in an ancestor.
    /// Returns the value it replaced.
    pub fn define(
        &mut self,
        env: EnvId,
        name: impl AsRef<str>,
        value: Value,
    ) -> Result<Option<Value>, EnvError> {
        self.frame(env)?;
        let key = self.interner.get_or_intern(name.as_ref());
        Ok(self.frame_mut(env)?.values.insert(key, value))
    }

    /// Overwrites the binding of the nearest frame that has `name`, returning
    /// the previous value.
    pub fn assign(
        &mut self,
        env: EnvId,
        name: impl AsRef<str>,
        value: Value,
    ) -> Result<Value, EnvError> {
        let name = name.as_ref();
        let (owner, key) = self
            .resolve_key(env, name)?
            .ok_or_else(|| EnvError::unbound(name))?;
        self.frame_mut(owner)?
            .values
            .insert(key, value)
            .ok_or_else(|| EnvError::unbound(name))
    }

    pub fn lookup(&self, env: EnvId, name: impl AsRef<str>) -> Result<&Value, EnvError> {
        let name = name.as_ref();
        let (owner, key) = self
            .resolve_key(env, name)?
            .ok_or_else(|| EnvError::unbound(name))?;
        self.frame(owner)?
            .values
            .get(&key)
            .ok_or_else(|| EnvError::unbound(name))
    }

    /// Foreign handles bind nothing.
    pub fn is_defined(&self, env: EnvId, name: impl AsRef<str>) -> bool {
        self.resolve(env, name).is_ok_and(|owner| owner.is_some())
    }

    /// The nearest frame, starting at `env` and walking outward, that binds `name`
    pub fn resolve(&self, env: EnvId, name: impl AsRef<str>) -> Result<Option<EnvId>, EnvError> {
        Ok(self
            .resolve_key(env, name.as_ref())?
            .map(|(owner, _)| owner))
    }

    /// The local bindings of `env`, sorted by name
    pub fn bindings(&self, env: EnvId) -> Result<Vec<(&str, &Value)>, EnvError> {
        let mut bindings = self
            .frame(env)?
            .values
            .iter()
            .map(|(key, value)| (self.interner.resolve(key), value))
            .collect::<Vec<_>>();
        bindings.sort_unstable_by_key(|(name, _)| *name);
        Ok(bindings)
    }

    fn insert(&mut self, parent: Option<EnvId>) -> EnvId {
        let id = EnvId {
            arena: self.id,
            index: self.frames.len(),
        };
        self.frames.push(Frame {
            parent,
            values: HashMap::default(),
        });
        id
    }

    fn resolve_key(&self, env: EnvId, name: &str) -> Result<Option<(EnvId, Spur)>, EnvError> {
        let mut frame = self.frame(env)?;
        // a name that was never interned cannot be bound anywhere
        let Some(key) = self.interner.get(name) else {
            return Ok(None);
        };
        let mut current = env;
        loop {
            if frame.values.contains_key(&key) {
                return Ok(Some((current, key)));
            }
            match frame.parent {
                Some(parent) => {
                    current = parent;
                    frame = self.frame(parent)?;
                }
                None => return Ok(None),
            }
        }
    }

    fn frame(&self, env: EnvId) -> Result<&Frame, EnvError> {
        if env.arena != self.id {
            return Err(EnvError::Foreign { env });
        }
        self.frames.get(env.index).ok_or(EnvError::Foreign { env })
    }

    fn frame_mut(&mut self, env: EnvId) -> Result<&mut Frame, EnvError> {
        if env.arena != self.id {
            return Err(EnvError::Foreign { env });
        }
        self.frames
            .get_mut(env.index)
            .ok_or(EnvError::Foreign { env })
    }
}

#[cfg(test)]
mod tests {
    use super::{EnvError, Environments};
    use crate::value::Value;
    use assert2::{assert, check, let_assert};

    #[test]
    fn define_is_local() {
        let mut envs = Environments::new();
        let global = envs.root();
        let_assert!(Ok(local) = envs.push(global));

        check!(envs.define(global, "x", Value::Integer(1)) == Ok(None));
        check!(envs.define(local, "x", Value::Integer(2)) == Ok(None));

        check!(envs.lookup(local, "x") == Ok(&Value::Integer(2)));
        check!(envs.lookup(global, "x") == Ok(&Value::Integer(1)));
        check!(envs.define(local, "x", Value::Integer(3)) == Ok(Some(Value::Integer(2))));
    }

    #[test]
    fn lookup_walks_outward() {
        let mut envs = Environments::new();
        let global = envs.root();
        let_assert!(Ok(middle) = envs.push(global));
        let_assert!(Ok(inner) = envs.push(middle));

        check!(envs.define(global, "g", Value::Integer(7)).is_ok());
        check!(envs.lookup(inner, "g") == Ok(&Value::Integer(7)));
        check!(envs.resolve(inner, "g") == Ok(Some(global)));
        check!(envs.parent(inner) == Ok(Some(middle)));
        check!(envs.parent(global) == Ok(None));
        // children are invisible to their parents
        check!(envs.define(inner, "i", Value::Integer(1)).is_ok());
        check!(envs.lookup(global, "i") == Err(EnvError::unbound("i")));
    }

    #[test]
    fn assign_overwrites_nearest_binding() {
        let mut envs = Environments::new();
        let global = envs.root();
        let_assert!(Ok(local) = envs.push(global));

        check!(envs.define(global, "x", Value::Integer(1)).is_ok());
        let_assert!(Ok(previous) = envs.assign(local, "x", Value::Integer(5)));
        check!(previous == Value::Integer(1));
        check!(envs.lookup(global, "x") == Ok(&Value::Integer(5)));
        // nothing was created locally
        check!(envs.bindings(local) == Ok(vec![]));
    }

    #[test]
    fn assign_to_unbound_fails() {
        let mut envs = Environments::new();
        let global = envs.root();
        let other = envs.root();
        check!(envs.define(other, "x", Value::Integer(1)).is_ok());

        check!(envs.assign(global, "x", Value::Integer(5)) == Err(EnvError::unbound("x")));
        check!(envs.assign(global, "never", Value::Integer(5)).is_err());
        check!(!envs.is_defined(global, "x"));
    }

    #[test]
    fn is_defined_probes_without_failing() {
        let mut envs = Environments::new();
        let global = envs.root();
        let_assert!(Ok(local) = envs.push(global));
        check!(envs.define(global, "x", Value::name("y")).is_ok());

        check!(envs.is_defined(local, "x"));
        check!(!envs.is_defined(local, "y"));
    }

    #[test]
    fn bindings_are_sorted() {
        let mut envs = Environments::new();
        let global = envs.root();
        check!(envs.define(global, "b", Value::Integer(2)).is_ok());
        check!(envs.define(global, "a", Value::Integer(1)).is_ok());
        assert!(
            envs.bindings(global) == Ok(vec![("a", &Value::Integer(1)), ("b", &Value::Integer(2))])
        );
    }

    #[test]
    fn handles_from_other_arenas_are_rejected() {
        let mut big = Environments::new();
        big.root();
        let foreign = big.root();

        let mut small = Environments::new();
        let root = small.root();
        check!(small.define(root, "x", Value::Integer(1)).is_ok());

        // same index as `root`, still not ours
        let lone = Environments::new().root();
        check!(small.lookup(lone, "x") == Err(EnvError::Foreign { env: lone }));

        check!(small.lookup(foreign, "x") == Err(EnvError::Foreign { env: foreign }));
        check!(small.define(foreign, "y", Value::Integer(2)) == Err(EnvError::Foreign { env: foreign }));
        check!(small.assign(foreign, "x", Value::Integer(2)).is_err());
        check!(small.push(foreign).is_err());
        check!(small.parent(foreign).is_err());
        check!(small.bindings(foreign).is_err());
        check!(!small.is_defined(foreign, "x"));
        // nothing leaked into our own frame
        check!(small.bindings(root) == Ok(vec![("x", &Value::Integer(1))]));
    }
}
