//! Dynamic value types
//!
//! Deferred values carry dynamically typed results. A `Value` is whatever a
//! producer settles a deferred with, or whatever a reaction hands on to the
//! next link of a chain.

use crate::deferred::Deferred;
use crate::error::Result;
use rustc_hash::FxHashMap as HashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Type alias for native function implementations
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value>>;

/// A dynamically typed value
#[derive(Clone)]
pub enum Value {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Shared property bag
    Object(Rc<RefCell<Object>>),
    /// Callable native function
    Function(NativeFunction),
    /// A deferred value
    Deferred(Deferred),
}

impl Value {
    /// Borrow the native function behind a callable value
    pub fn as_function(&self) -> Option<&NativeFunction> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Borrow the deferred behind a deferred value
    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            Value::Deferred(deferred) => Some(deferred),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(true) => "true".to_string(),
            Value::Boolean(false) => "false".to_string(),
            Value::Number(n) => {
                if n.is_nan() {
                    "NaN".to_string()
                } else if n.is_infinite() {
                    if *n > 0.0 {
                        "Infinity".to_string()
                    } else {
                        "-Infinity".to_string()
                    }
                } else if *n == 0.0 {
                    "0".to_string()
                } else {
                    format!("{}", n)
                }
            }
            Value::String(s) => s.clone(),
            Value::Object(obj) => {
                let obj = obj.borrow();
                match (obj.get_property("name"), obj.get_property("message")) {
                    (Some(name), Some(message)) => format!("{}: {}", name, message),
                    _ => "[object Object]".to_string(),
                }
            }
            Value::Function(func) => format!("function {}() {{ [native code] }}", func.name),
            Value::Deferred(_) => "[object Deferred]".to_string(),
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() || b.is_nan() {
                    false
                } else {
                    a == b
                }
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(&a.func, &b.func),
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Create a new object value
    pub fn new_object() -> Value {
        Value::Object(Rc::new(RefCell::new(Object::new())))
    }

    /// Create a new object value with properties
    pub fn new_object_with_properties(properties: HashMap<String, Value>) -> Value {
        Value::Object(Rc::new(RefCell::new(Object { properties })))
    }

    /// Create an error object carrying `name` and `message`
    pub fn new_error(name: &str, message: &str) -> Value {
        let mut properties = HashMap::default();
        properties.insert("name".to_string(), Value::String(name.to_string()));
        properties.insert("message".to_string(), Value::String(message.to_string()));
        Value::new_object_with_properties(properties)
    }

    /// Create a native function value
    pub fn new_function<F>(name: &str, func: F) -> Value
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Value::Function(NativeFunction::new(name, func))
    }

    /// Get property from object
    pub fn get_property(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(obj) => obj.borrow().get_property(key),
            _ => None,
        }
    }

    /// Set property on object
    pub fn set_property(&self, key: &str, value: Value) -> bool {
        match self {
            Value::Object(obj) => {
                obj.borrow_mut().set_property(key, value);
                true
            }
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Object(obj) => match obj.try_borrow() {
                Ok(obj) => match (obj.get_property("name"), obj.get_property("message")) {
                    (Some(name), Some(message)) => write!(f, "{}: {}", name, message),
                    _ => write!(f, "{{...}}"),
                },
                Err(_) => write!(f, "{{<borrowed>}}"),
            },
            Value::Function(func) => write!(f, "[Native: {}]", func.name),
            Value::Deferred(deferred) => write!(f, "{:?}", deferred),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_js_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Deferred> for Value {
    fn from(deferred: Deferred) -> Self {
        Value::Deferred(deferred)
    }
}

impl From<NativeFunction> for Value {
    fn from(func: NativeFunction) -> Self {
        Value::Function(func)
    }
}

/// Property bag behind `Value::Object`
#[derive(Clone, Default)]
pub struct Object {
    /// Properties
    pub properties: HashMap<String, Value>,
}

impl Object {
    /// Create an empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an own property
    pub fn get_property(&self, key: &str) -> Option<Value> {
        self.properties.get(key).cloned()
    }

    /// Set an own property
    pub fn set_property(&mut self, key: &str, value: Value) {
        self.properties.insert(key.to_string(), value);
    }
}

/// A named native function
#[derive(Clone)]
pub struct NativeFunction {
    /// Function name, for display
    pub name: String,
    /// Implementation
    pub func: NativeFn,
}

impl NativeFunction {
    /// Wrap a closure as a native function
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Self {
            name: name.to_string(),
            func: Rc::new(func),
        }
    }

    /// Invoke the function
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Native: {}]", self.name)
    }
}
