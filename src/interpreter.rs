use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, ExprId, Literal, Method, Stmt};
use crate::environment::Environment;
use crate::error::{Reporter, RuntimeError, RuntimeErrorKind};
use crate::token::{Token, TokenType};
use crate::value::{LoxClass, LoxFunction, LoxInstance, Value};

/// Non-local control transfer raised by statement execution. `return` and
/// `break` unwind through enclosing frames until the owning construct
/// catches them; runtime errors unwind to the top-level entry.
#[derive(Debug)]
pub enum Interrupt {
    Break { line: usize },
    Return(Value),
    Failure(RuntimeError),
}

impl From<RuntimeError> for Interrupt {
    fn from(error: RuntimeError) -> Self {
        Interrupt::Failure(error)
    }
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    // Resolution side-table: expression id -> environment hops. Written once
    // per id by the resolver, read-only afterwards.
    locals: HashMap<ExprId, usize>,
    out: Rc<RefCell<dyn Write>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(io::stdout())))
    }

    /// An interpreter whose `print` output goes to the given sink.
    pub fn with_output(out: Rc<RefCell<dyn Write>>) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: clock_native,
            },
        );

        Interpreter {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Record the scope distance for a resolved expression. Called by the
    /// resolver; first write wins.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local: id={}, depth={}", id, depth);

        self.locals.entry(id).or_insert(depth);
    }

    /// Read a global binding, mainly for tests inspecting program results.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name, 0).ok()
    }

    pub fn interpret(&mut self, statements: &[Stmt], reporter: &mut Reporter) {
        info!("Interpreting {} statement(s)", statements.len());

        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}

                Err(Interrupt::Failure(error)) => {
                    reporter.runtime_error(&error);
                    return;
                }

                // `return`/`break` at top level are rejected statically.
                Err(_) => return,
            }
        }
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Interrupt> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                let _ = writeln!(self.out.borrow_mut(), "{}", value);

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    match self.execute(body) {
                        Ok(()) => {}
                        Err(Interrupt::Break { .. }) => break,
                        Err(other) => return Err(other),
                    }
                }

                Ok(())
            }

            Stmt::Break(token) => Err(Interrupt::Break { line: token.line }),

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(Interrupt::Return(value))
            }

            Stmt::Function { name, function } => {
                let function = LoxFunction {
                    name: Some(name.lexeme.clone()),
                    declaration: function.clone(),
                    closure: self.environment.clone(),
                    is_initializer: false,
                };

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Execute `statements` with `environment` as the current scope,
    /// restoring the previous scope on every exit path.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<(), Interrupt> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(());

        for statement in statements {
            result = self.execute(statement);

            if result.is_err() {
                break;
            }
        }

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Method],
    ) -> Result<(), Interrupt> {
        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => {
                let line = match expr {
                    Expr::Variable { name, .. } => name.line,
                    _ => name.line,
                };

                match self.evaluate(expr)? {
                    Value::Class(class) => Some(class),
                    _ => {
                        return Err(Interrupt::Failure(RuntimeError::new(
                            line,
                            RuntimeErrorKind::SuperclassNotClass,
                        )))
                    }
                }
            }

            None => None,
        };

        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // Methods close over an extra scope holding `super` when there is a
        // superclass; otherwise over the declaring scope directly.
        let defining_env = match &superclass_value {
            Some(class) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));
                environment
                    .borrow_mut()
                    .define("super", Value::Class(class.clone()));
                environment
            }

            None => self.environment.clone(),
        };

        let mut instance_methods = HashMap::new();
        let mut statics = HashMap::new();

        for method in methods {
            let is_initializer = !method.is_class && method.name.lexeme == "init";

            let function = Rc::new(LoxFunction {
                name: Some(method.name.lexeme.clone()),
                declaration: method.function.clone(),
                closure: defining_env.clone(),
                is_initializer,
            });

            if method.is_class {
                statics.insert(method.name.lexeme.clone(), function);
            } else {
                instance_methods.insert(method.name.lexeme.clone(), function);
            }
        }

        let class = Rc::new(LoxClass {
            name: name.lexeme.clone(),
            superclass: superclass_value,
            methods: instance_methods,
            statics,
        });

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(class), name.line)?;

        Ok(())
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Nil => Value::Nil,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                match operator.token_type {
                    TokenType::OR if is_truthy(&left_val) => Ok(left_val),
                    TokenType::AND if !is_truthy(&left_val) => Ok(left_val),
                    _ => self.evaluate(right),
                }
            }

            Expr::Ternary {
                condition,
                if_true,
                if_false,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.evaluate(if_true)
                } else {
                    self.evaluate(if_false)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(distance) => Environment::assign_at(
                        &self.environment,
                        *distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,

                    None => self.globals.borrow_mut().assign(
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                match callee_val {
                    Value::NativeFunction { arity, func, .. } => {
                        check_arity(arity, args.len(), paren.line)?;

                        Ok(func(&args))
                    }

                    Value::Function(function) => {
                        check_arity(function.arity(), args.len(), paren.line)?;

                        function.call(self, args, paren.line)
                    }

                    Value::Class(class) => {
                        check_arity(class.arity(), args.len(), paren.line)?;

                        self.instantiate(class, args, paren.line)
                    }

                    _ => Err(RuntimeError::new(paren.line, RuntimeErrorKind::NotCallable)),
                }
            }

            Expr::Get { object, name } => {
                let object_val = self.evaluate(object)?;

                match object_val {
                    Value::Instance(instance) => {
                        if let Some(value) = instance.borrow().field(&name.lexeme) {
                            return Ok(value);
                        }

                        let method = instance.borrow().class().find_method(&name.lexeme);

                        match method {
                            Some(method) => Ok(Value::Function(Rc::new(
                                method.bind(Value::Instance(instance.clone())),
                            ))),

                            None => Err(RuntimeError::new(
                                name.line,
                                RuntimeErrorKind::UndefinedProperty(name.lexeme.clone()),
                            )),
                        }
                    }

                    // Static methods are reached through the class value.
                    Value::Class(class) => match class.find_static(&name.lexeme) {
                        Some(method) => Ok(Value::Function(Rc::new(
                            method.bind(Value::Class(class.clone())),
                        ))),

                        None => Err(RuntimeError::new(
                            name.line,
                            RuntimeErrorKind::UndefinedProperty(name.lexeme.clone()),
                        )),
                    },

                    _ => Err(RuntimeError::new(
                        name.line,
                        RuntimeErrorKind::PropertyOnNonInstance,
                    )),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object_val = self.evaluate(object)?;

                match object_val {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;

                        instance.borrow_mut().set_field(&name.lexeme, value.clone());

                        Ok(value)
                    }

                    _ => Err(RuntimeError::new(
                        name.line,
                        RuntimeErrorKind::FieldOnNonInstance,
                    )),
                }
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::Function(declaration) => Ok(Value::Function(Rc::new(LoxFunction {
                name: None,
                declaration: declaration.clone(),
                closure: self.environment.clone(),
                is_initializer: false,
            }))),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value, RuntimeError> {
        let value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(RuntimeError::new(
                    operator.line,
                    RuntimeErrorKind::UnaryOperandNotNumber,
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            _ => unreachable!("Invalid unary operator"),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, RuntimeError> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                // String concatenation stringifies the other operand.
                (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b))),

                (a, Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),

                _ => Err(RuntimeError::new(
                    operator.line,
                    RuntimeErrorKind::AddOperands,
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, left_val, right_val)?;

                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, left_val, right_val)?;

                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = number_operands(operator, left_val, right_val)?;

                if b == 0.0 {
                    return Err(RuntimeError::new(
                        operator.line,
                        RuntimeErrorKind::DivisionByZero,
                    ));
                }

                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, left_val, right_val)?;

                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, left_val, right_val)?;

                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, left_val, right_val)?;

                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, left_val, right_val)?;

                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            _ => unreachable!("Invalid binary operator"),
        }
    }

    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &Token,
        method: &Token,
    ) -> Result<Value, RuntimeError> {
        let distance = match self.locals.get(&id) {
            Some(distance) => *distance,
            None => {
                return Err(RuntimeError::new(
                    keyword.line,
                    RuntimeErrorKind::UndefinedVariable("super".to_string()),
                ))
            }
        };

        let superclass = match Environment::get_at(
            &self.environment,
            distance,
            "super",
            keyword.line,
        )? {
            Value::Class(class) => class,
            _ => {
                return Err(RuntimeError::new(
                    keyword.line,
                    RuntimeErrorKind::SuperclassNotClass,
                ))
            }
        };

        // `this` lives exactly one scope inside the `super` scope.
        let object = Environment::get_at(&self.environment, distance - 1, "this", keyword.line)?;

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(object)))),

            None => Err(RuntimeError::new(
                method.line,
                RuntimeErrorKind::UndefinedProperty(method.lexeme.clone()),
            )),
        }
    }

    fn instantiate(
        &mut self,
        class: Rc<LoxClass>,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        let instance = Rc::new(RefCell::new(LoxInstance::new(class.clone())));

        if let Some(initializer) = class.find_method("init") {
            initializer
                .bind(Value::Instance(instance.clone()))
                .call(self, arguments, line)?;
        }

        Ok(Value::Instance(instance))
    }

    fn look_up_variable(&mut self, name: &Token, id: ExprId) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(distance) => {
                Environment::get_at(&self.environment, *distance, &name.lexeme, name.line)
            }

            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }
}

/// `nil` and `false` are falsey; everything else is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

fn number_operands(
    operator: &Token,
    left: Value,
    right: Value,
) -> Result<(f64, f64), RuntimeError> {
    let Value::Number(a) = left else {
        return Err(RuntimeError::new(
            operator.line,
            RuntimeErrorKind::LeftOperandNotNumber,
        ));
    };

    let Value::Number(b) = right else {
        return Err(RuntimeError::new(
            operator.line,
            RuntimeErrorKind::RightOperandNotNumber,
        ));
    };

    Ok((a, b))
}

fn check_arity(expected: usize, got: usize, line: usize) -> Result<(), RuntimeError> {
    if expected != got {
        return Err(RuntimeError::new(
            line,
            RuntimeErrorKind::Arity { expected, got },
        ));
    }

    Ok(())
}

fn clock_native(_args: &[Value]) -> Value {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64();

    Value::Number(timestamp)
}
