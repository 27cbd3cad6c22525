use crate::ast::{Expr, FunctionDecl, Literal, Stmt};

/// Renders syntax trees in a parenthesized prefix form, one statement per
/// line. Used by the `--ast` flag and the parser tests.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(literal) => match literal {
                Literal::Nil => "nil".to_string(),

                Literal::Bool(b) => b.to_string(),

                Literal::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }

                Literal::String(s) => s.to_string(),
            },

            Expr::Variable { name, .. } => name.lexeme.to_string(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }

            Expr::Grouping(inner) => format!("(group {})", self.print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, self.print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                self.print(left),
                self.print(right)
            ),

            Expr::Ternary {
                condition,
                if_true,
                if_false,
            } => format!(
                "(?: {} {} {})",
                self.print(condition),
                self.print(if_true),
                self.print(if_false)
            ),

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut rendered = format!("(call {}", self.print(callee));

                for argument in arguments {
                    rendered.push(' ');
                    rendered.push_str(&self.print(argument));
                }

                rendered.push(')');
                rendered
            }

            Expr::Get { object, name } => {
                format!("(get {} {})", self.print(object), name.lexeme)
            }

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(set {} {} {})",
                self.print(object),
                name.lexeme,
                self.print(value)
            ),

            Expr::This { .. } => "this".to_string(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::Function(function) => self.print_function("fun", function),
        }
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", self.print(expr)),

            Stmt::Print(expr) => format!("(print {})", self.print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => format!("(var {} {})", name.lexeme, self.print(expr)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => {
                let mut rendered = String::from("(block");

                for statement in statements {
                    rendered.push(' ');
                    rendered.push_str(&self.print_stmt(statement));
                }

                rendered.push(')');
                rendered
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),

                None => format!(
                    "(if {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => {
                format!("(while {} {})", self.print(condition), self.print_stmt(body))
            }

            Stmt::Break(_) => "(break)".to_string(),

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("(return {})", self.print(expr)),
                None => "(return)".to_string(),
            },

            Stmt::Function { name, function } => {
                self.print_function(&format!("fun {}", name.lexeme), function)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut rendered = format!("(class {}", name.lexeme);

                if let Some(Expr::Variable {
                    name: superclass_name,
                    ..
                }) = superclass
                {
                    rendered.push_str(&format!(" (< {})", superclass_name.lexeme));
                }

                for method in methods {
                    rendered.push(' ');
                    let label = if method.is_class {
                        format!("class {}", method.name.lexeme)
                    } else {
                        method.name.lexeme.to_string()
                    };
                    rendered.push_str(&self.print_function(&label, &method.function));
                }

                rendered.push(')');
                rendered
            }
        }
    }

    fn print_function(&self, label: &str, function: &FunctionDecl) -> String {
        let mut rendered = format!("({} (", label);

        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                rendered.push(' ');
            }
            rendered.push_str(&param.lexeme);
        }

        rendered.push(')');

        for statement in &function.body {
            rendered.push(' ');
            rendered.push_str(&self.print_stmt(statement));
        }

        rendered.push(')');
        rendered
    }
}
