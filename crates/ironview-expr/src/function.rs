//! Function registry
//!
//! Every function a view expression may call is registered here with its
//! declared return type and implementation. A return type of `Any` marks a
//! generic function whose output type cannot be known statically.

use chrono::{NaiveDate, NaiveDateTime};
use hashbrown::HashMap;
use ironview_common::{Error, GeometryKind, LogicalType, Result, Srid, Value};
use std::fmt;
use std::sync::Arc;

/// Name of the explicit conversion function: `convert(expr, 'TypeName')`.
/// Its output type is read from the second, literal argument.
pub const EXPLICIT_CONVERT: &str = "convert";

/// Name of the function attaching a spatial reference code to a geometry
pub const SET_SRID: &str = "setsrid";

type ScalarImpl = fn(&[Value]) -> Result<Value>;

/// A registered scalar function
#[derive(Clone)]
pub struct FunctionDef {
    /// Function name (lowercase)
    pub name: String,
    /// Declared return type
    pub return_type: LogicalType,
    /// Minimum number of arguments
    pub min_args: usize,
    /// Maximum number of arguments, None when variadic
    pub max_args: Option<usize>,
    implementation: ScalarImpl,
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

impl FunctionDef {
    pub fn new(
        name: &str,
        return_type: LogicalType,
        min_args: usize,
        max_args: Option<usize>,
        implementation: ScalarImpl,
    ) -> Self {
        FunctionDef {
            name: name.to_lowercase(),
            return_type,
            min_args,
            max_args,
            implementation,
        }
    }

    /// Validate an argument count against this signature
    pub fn check_arity(&self, count: usize) -> Result<()> {
        let too_many = self.max_args.map_or(false, |max| count > max);
        if count < self.min_args || too_many {
            return Err(Error::InvalidArguments(format!(
                "{}() does not accept {} arguments",
                self.name, count
            )));
        }
        Ok(())
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        (self.implementation)(args)
    }
}

/// Case-insensitive name -> function lookup
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<FunctionDef>>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = FunctionRegistry::new();
        let geometry = LogicalType::Geometry(GeometryKind::Any);
        registry.register(FunctionDef::new("concat", LogicalType::Varchar, 1, None, concat));
        registry.register(FunctionDef::new("upper", LogicalType::Varchar, 1, Some(1), upper));
        registry.register(FunctionDef::new("lower", LogicalType::Varchar, 1, Some(1), lower));
        registry.register(FunctionDef::new("trim", LogicalType::Varchar, 1, Some(1), trim));
        registry.register(FunctionDef::new("length", LogicalType::Integer, 1, Some(1), length));
        registry.register(FunctionDef::new("coalesce", LogicalType::Any, 1, None, coalesce));
        registry.register(FunctionDef::new(EXPLICIT_CONVERT, LogicalType::Any, 2, Some(2), convert));
        registry.register(FunctionDef::new(
            "envelope",
            LogicalType::Geometry(GeometryKind::Polygon),
            1,
            Some(1),
            envelope,
        ));
        registry.register(FunctionDef::new(SET_SRID, geometry, 2, Some(2), set_srid));
        registry.register(FunctionDef::new("x", LogicalType::Double, 1, Some(1), point_x));
        registry.register(FunctionDef::new("y", LogicalType::Double, 1, Some(1), point_y));
        registry
    }

    /// Register or replace a function
    pub fn register(&mut self, function: FunctionDef) {
        self.functions
            .insert(function.name.clone(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<Arc<FunctionDef>> {
        self.functions.get(&name.to_lowercase()).cloned()
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<FunctionDef>> {
        self.get(name)
            .ok_or_else(|| Error::FunctionNotFound(name.to_string()))
    }
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn concat(args: &[Value]) -> Result<Value> {
    let result: String = args.iter().map(value_to_string).collect();
    Ok(Value::Varchar(result))
}

fn map_string(args: &[Value], f: impl Fn(&str) -> String) -> Result<Value> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Varchar(s) => Ok(Value::Varchar(f(s))),
        other => Ok(Value::Varchar(f(&other.to_string()))),
    }
}

fn upper(args: &[Value]) -> Result<Value> {
    map_string(args, |s| s.to_uppercase())
}

fn lower(args: &[Value]) -> Result<Value> {
    map_string(args, |s| s.to_lowercase())
}

fn trim(args: &[Value]) -> Result<Value> {
    map_string(args, |s| s.trim().to_string())
}

fn length(args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        v => Ok(Value::Integer(value_to_string(v).chars().count() as i32)),
    }
}

fn coalesce(args: &[Value]) -> Result<Value> {
    Ok(args
        .iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null))
}

fn convert(args: &[Value]) -> Result<Value> {
    let target = match &args[1] {
        Value::Varchar(name) => name.parse::<LogicalType>()?,
        other => {
            return Err(Error::InvalidArguments(format!(
                "{}() expects a type name, got {}",
                EXPLICIT_CONVERT, other
            )))
        }
    };
    cast_value(&args[0], &target)
}

fn envelope(args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Geometry(g) => Ok(g
            .envelope()
            .map(|env| {
                let mut out = env.to_geometry();
                out.srid = g.srid;
                Value::Geometry(out)
            })
            .unwrap_or(Value::Null)),
        other => Err(Error::TypeMismatch {
            expected: "GEOMETRY".to_string(),
            got: other.logical_type().to_string(),
        }),
    }
}

fn set_srid(args: &[Value]) -> Result<Value> {
    let code = args[1].as_i64().ok_or_else(|| {
        Error::InvalidArguments(format!("{}() expects an integer code", SET_SRID))
    })?;
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Geometry(g) => {
            let code = i32::try_from(code).map_err(|_| {
                Error::InvalidArguments(format!("{}() code {} is out of range", SET_SRID, code))
            })?;
            Ok(Value::Geometry(g.clone().with_srid(Srid(code))))
        }
        other => Err(Error::TypeMismatch {
            expected: "GEOMETRY".to_string(),
            got: other.logical_type().to_string(),
        }),
    }
}

fn point_coord(args: &[Value], pick: fn(f64, f64) -> f64) -> Result<Value> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Geometry(g) => match &g.shape {
            ironview_common::Shape::Point(c) => Ok(Value::Double(pick(c.x, c.y))),
            _ => Ok(Value::Null),
        },
        other => Err(Error::TypeMismatch {
            expected: "POINT".to_string(),
            got: other.logical_type().to_string(),
        }),
    }
}

fn point_x(args: &[Value]) -> Result<Value> {
    point_coord(args, |x, _| x)
}

fn point_y(args: &[Value]) -> Result<Value> {
    point_coord(args, |_, y| y)
}

fn invalid_cast(val: &Value, target: &LogicalType) -> Error {
    Error::InvalidCast {
        from: val.logical_type().to_string(),
        to: target.to_string(),
    }
}

/// Half-open ranges of floats that truncate into each integer type
const INTEGER_RANGE: (f64, f64) = (i32::MIN as f64, i32::MAX as f64 + 1.0);
const BIGINT_RANGE: (f64, f64) = (i64::MIN as f64, i64::MAX as f64);

fn truncate_float(f: f64, (min, max): (f64, f64), target: &LogicalType) -> Result<f64> {
    let t = f.trunc();
    if t.is_nan() || t < min || t >= max {
        return Err(Error::Overflow {
            operation: format!("cast to {}", target),
        });
    }
    Ok(t)
}

/// Cast a value to the target type
pub fn cast_value(val: &Value, target: &LogicalType) -> Result<Value> {
    if val.is_null() {
        return Ok(Value::Null);
    }

    match target {
        LogicalType::Boolean => {
            let b = match val {
                Value::Boolean(b) => *b,
                Value::Integer(i) => *i != 0,
                Value::BigInt(i) => *i != 0,
                Value::Varchar(s) => s.eq_ignore_ascii_case("true") || s == "1",
                _ => return Err(invalid_cast(val, target)),
            };
            Ok(Value::Boolean(b))
        }
        LogicalType::Integer => {
            let i = match val {
                Value::Integer(i) => *i,
                Value::BigInt(i) => i32::try_from(*i).map_err(|_| Error::Overflow {
                    operation: "cast to INTEGER".to_string(),
                })?,
                Value::Float(f) => truncate_float(f64::from(*f), INTEGER_RANGE, target)? as i32,
                Value::Double(f) => truncate_float(*f, INTEGER_RANGE, target)? as i32,
                Value::Boolean(b) => i32::from(*b),
                Value::Varchar(s) => s.trim().parse().map_err(|_| invalid_cast(val, target))?,
                _ => return Err(invalid_cast(val, target)),
            };
            Ok(Value::Integer(i))
        }
        LogicalType::BigInt => {
            let i = match val {
                Value::Integer(i) => *i as i64,
                Value::BigInt(i) => *i,
                Value::Float(f) => truncate_float(f64::from(*f), BIGINT_RANGE, target)? as i64,
                Value::Double(f) => truncate_float(*f, BIGINT_RANGE, target)? as i64,
                Value::Boolean(b) => i64::from(*b),
                Value::Varchar(s) => s.trim().parse().map_err(|_| invalid_cast(val, target))?,
                _ => return Err(invalid_cast(val, target)),
            };
            Ok(Value::BigInt(i))
        }
        LogicalType::Float | LogicalType::Double => {
            let f = match val {
                Value::Varchar(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| invalid_cast(val, target))?,
                other => other.as_f64().ok_or_else(|| invalid_cast(val, target))?,
            };
            if *target == LogicalType::Float {
                Ok(Value::Float(f as f32))
            } else {
                Ok(Value::Double(f))
            }
        }
        LogicalType::Varchar => Ok(Value::Varchar(val.to_string())),
        LogicalType::Date => match val {
            Value::Date(d) => Ok(Value::Date(*d)),
            Value::Timestamp(ts) => Ok(Value::Date(ts.date())),
            Value::Varchar(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| invalid_cast(val, target)),
            _ => Err(invalid_cast(val, target)),
        },
        LogicalType::Timestamp => match val {
            Value::Timestamp(ts) => Ok(Value::Timestamp(*ts)),
            Value::Date(d) => d
                .and_hms_opt(0, 0, 0)
                .map(Value::Timestamp)
                .ok_or_else(|| invalid_cast(val, target)),
            Value::Varchar(s) => NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S")
                .map(Value::Timestamp)
                .map_err(|_| invalid_cast(val, target)),
            _ => Err(invalid_cast(val, target)),
        },
        LogicalType::Geometry(kind) => match val {
            Value::Geometry(g) if *kind == GeometryKind::Any || g.kind() == *kind => {
                Ok(Value::Geometry(g.clone()))
            }
            _ => Err(invalid_cast(val, target)),
        },
        LogicalType::Any | LogicalType::Unknown => Ok(val.clone()),
        LogicalType::Null => Err(invalid_cast(val, target)),
    }
}
