use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::value::Value;

/// A single scope in the parent-linked environment chain. The outermost
/// environment (globals) has no enclosing scope.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(undefined(name, line))
        }
    }

    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(undefined(name, line))
        }
    }

    /// Read a binding exactly `distance` hops up the chain. The resolver
    /// guarantees the binding exists there.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        match Self::ancestor(env, distance) {
            Some(scope) => {
                let scope = scope.borrow();
                scope.values.get(name).cloned().ok_or_else(|| undefined(name, line))
            }
            None => Err(undefined(name, line)),
        }
    }

    /// Write a binding exactly `distance` hops up the chain.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<(), RuntimeError> {
        match Self::ancestor(env, distance) {
            Some(scope) => {
                scope.borrow_mut().values.insert(name.to_string(), value);
                Ok(())
            }
            None => Err(undefined(name, line)),
        }
    }

    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = env.clone();

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }
}

fn undefined(name: &str, line: usize) -> RuntimeError {
    RuntimeError::new(line, RuntimeErrorKind::UndefinedVariable(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_get() {
        let mut env = Environment::new();
        env.define("position", Value::Number(7.0));

        assert_eq!(env.get("position", 1), Ok(Value::Number(7.0)));
    }

    #[test]
    fn get_undefined() {
        let env = Environment::new();

        assert!(matches!(
            env.get("missing", 3),
            Err(RuntimeError {
                kind: RuntimeErrorKind::UndefinedVariable(_),
                line: 3,
            })
        ));
    }

    #[test]
    fn get_from_enclosing() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("radius", Value::Number(2.0));

        let child = Environment::with_enclosing(globals.clone());

        assert_eq!(child.get("radius", 1), Ok(Value::Number(2.0)));
    }

    #[test]
    fn assign_writes_to_declaring_scope() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("volume", Value::Number(11.0));

        let mut child = Environment::with_enclosing(globals.clone());
        child.assign("volume", Value::Number(0.0), 1).unwrap();

        assert_eq!(globals.borrow().get("volume", 1), Ok(Value::Number(0.0)));
    }

    #[test]
    fn assign_to_undeclared() {
        let mut env = Environment::new();

        assert!(env.assign("ghost", Value::Nil, 2).is_err());
    }

    #[test]
    fn get_at_walks_the_chain() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Bool(true));

        let middle = Rc::new(RefCell::new(Environment::with_enclosing(globals)));
        middle.borrow_mut().define("a", Value::Bool(false));

        let inner = Rc::new(RefCell::new(Environment::with_enclosing(middle)));

        assert_eq!(
            Environment::get_at(&inner, 1, "a", 1),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            Environment::get_at(&inner, 2, "a", 1),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn assign_at_targets_one_frame() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("x", Value::Number(1.0));

        let inner = Rc::new(RefCell::new(Environment::with_enclosing(globals.clone())));
        inner.borrow_mut().define("x", Value::Number(2.0));

        Environment::assign_at(&inner, 1, "x", Value::Number(9.0), 1).unwrap();

        assert_eq!(globals.borrow().get("x", 1), Ok(Value::Number(9.0)));
        assert_eq!(
            Environment::get_at(&inner, 0, "x", 1),
            Ok(Value::Number(2.0))
        );
    }
}
