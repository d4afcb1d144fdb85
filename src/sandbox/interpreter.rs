//! Tree-walking interpreter with a wall-clock deadline and a step budget
//!
//! A fresh [`Bindings`] is built for every evaluation; nothing survives
//! between runs.

use std::time::{Duration, Instant};

use super::errors::{SandboxError, SandboxResult};
use super::parser::{BinaryOp, Expr, Stmt, UnaryOp};
use super::value::ScriptValue;

/// The only names a script can see.
#[derive(Debug, Clone)]
pub struct Bindings {
    pub input: ScriptValue,
    pub component: ScriptValue,
    pub valid: ScriptValue,
}

impl Bindings {
    pub fn new(input: ScriptValue, component: ScriptValue) -> Self {
        Self {
            input,
            component,
            valid: ScriptValue::Bool(true),
        }
    }

    fn get(&self, name: &str) -> SandboxResult<ScriptValue> {
        match name {
            "input" => Ok(self.input.clone()),
            "component" => Ok(self.component.clone()),
            "valid" => Ok(self.valid.clone()),
            "undefined" => Ok(ScriptValue::Undefined),
            "NaN" => Ok(ScriptValue::Number(f64::NAN)),
            "Infinity" => Ok(ScriptValue::Number(f64::INFINITY)),
            other => Err(SandboxError::UndefinedBinding(other.to_string())),
        }
    }

    fn set(&mut self, name: &str, value: ScriptValue) -> SandboxResult<()> {
        match name {
            "input" => self.input = value,
            "component" => self.component = value,
            "valid" => self.valid = value,
            other => return Err(SandboxError::UndefinedBinding(other.to_string())),
        }
        Ok(())
    }
}

pub struct Interpreter {
    bindings: Bindings,
    deadline: Instant,
    timeout_ms: u64,
    steps: u64,
    max_steps: u64,
}

impl Interpreter {
    pub fn new(bindings: Bindings, timeout_ms: u64, max_steps: u64) -> Self {
        Self {
            bindings,
            deadline: Instant::now() + Duration::from_millis(timeout_ms),
            timeout_ms,
            steps: 0,
            max_steps,
        }
    }

    /// Runs the program and returns the final bindings.
    pub fn run(mut self, program: &[Stmt]) -> SandboxResult<Bindings> {
        self.exec_block(program)?;
        Ok(self.bindings)
    }

    fn tick(&mut self) -> SandboxResult<()> {
        self.steps += 1;
        if self.steps > self.max_steps {
            return Err(SandboxError::StepLimit(self.max_steps));
        }
        if Instant::now() >= self.deadline {
            return Err(SandboxError::Timeout(self.timeout_ms));
        }
        Ok(())
    }

    fn exec_block(&mut self, statements: &[Stmt]) -> SandboxResult<()> {
        for statement in statements {
            self.exec(statement)?;
        }
        Ok(())
    }

    fn exec(&mut self, statement: &Stmt) -> SandboxResult<()> {
        self.tick()?;
        match statement {
            Stmt::Assign(name, expr) => {
                let value = self.eval(expr)?;
                self.bindings.set(name, value)
            }
            Stmt::Expr(expr) => self.eval(expr).map(|_| ()),
            Stmt::If(condition, then, otherwise) => {
                if self.eval(condition)?.is_truthy() {
                    self.exec_block(then)
                } else {
                    self.exec_block(otherwise)
                }
            }
        }
    }

    fn eval(&mut self, expr: &Expr) -> SandboxResult<ScriptValue> {
        self.tick()?;
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => self.bindings.get(name),
            Expr::Member(object, property) => {
                let object = self.eval(object)?;
                get_property(&object, property)
            }
            Expr::Index(object, index) => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                get_property(&object, &index.to_display_string())
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => ScriptValue::Bool(!value.is_truthy()),
                    UnaryOp::Negate => ScriptValue::Number(-value.to_number()),
                    UnaryOp::Plus => ScriptValue::Number(value.to_number()),
                    UnaryOp::Typeof => ScriptValue::String(value.type_name().to_string()),
                })
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Conditional(condition, then, otherwise) => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }
}

fn get_property(object: &ScriptValue, property: &str) -> SandboxResult<ScriptValue> {
    match object {
        ScriptValue::Undefined | ScriptValue::Null => Err(SandboxError::Type(format!(
            "Cannot read properties of {} (reading '{}')",
            object.to_display_string(),
            property
        ))),
        ScriptValue::String(s) => Ok(match property {
            "length" => ScriptValue::Number(s.chars().count() as f64),
            index => index
                .parse::<usize>()
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map_or(ScriptValue::Undefined, |c| ScriptValue::String(c.to_string())),
        }),
        ScriptValue::Array(items) => Ok(match property {
            "length" => ScriptValue::Number(items.len() as f64),
            index => index
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .map_or(ScriptValue::Undefined, ScriptValue::from_json),
        }),
        ScriptValue::Object(map) => Ok(map
            .get(property)
            .map_or(ScriptValue::Undefined, ScriptValue::from_json)),
        ScriptValue::Bool(_) | ScriptValue::Number(_) => Ok(ScriptValue::Undefined),
    }
}

fn binary(op: BinaryOp, left: &ScriptValue, right: &ScriptValue) -> ScriptValue {
    use ScriptValue::{Bool, Number, String as Str};
    match op {
        BinaryOp::Add => match (left, right) {
            (Str(_), _) | (_, Str(_)) => {
                Str(format!("{}{}", left.to_display_string(), right.to_display_string()))
            }
            _ => Number(left.to_number() + right.to_number()),
        },
        BinaryOp::Sub => Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Bool(left.loose_equals(right)),
        BinaryOp::NotEq => Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Bool(!left.strict_equals(right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            Bool(compare(op, left, right))
        }
        // Short-circuit operators are handled before operands are evaluated.
        BinaryOp::And | BinaryOp::Or => Bool(false),
    }
}

fn compare(op: BinaryOp, left: &ScriptValue, right: &ScriptValue) -> bool {
    let ordering = match (left, right) {
        (ScriptValue::String(a), ScriptValue::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => false,
    }
}
