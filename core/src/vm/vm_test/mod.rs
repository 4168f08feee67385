pub(super) use crate::{
    fault::{Fault, FaultKind, fault_of},
    program::{NativeRegistry, NativeUnit, Param, Program, ProgramSource},
    rt::{Runtime, RuntimeConfig},
    val::{RefType, RefVal, Type, Val},
    vm::{Context, ControlStack, Dispatcher, StackFrame},
};
pub(super) use serde_json::json;

fn value_of(ctx: &mut Context) -> anyhow::Result<Vec<Val>> {
    let i = ctx.int_argument(0)?;
    Ok(vec![Val::from(i.to_string())])
}

fn first_only(_ctx: &mut Context) -> anyhow::Result<Vec<Val>> {
    Ok(vec![Val::Int(7)])
}

fn too_many(_ctx: &mut Context) -> anyhow::Result<Vec<Val>> {
    Ok(vec![Val::Int(1), Val::Int(2)])
}

fn explode(_ctx: &mut Context) -> anyhow::Result<Vec<Val>> {
    Err(anyhow::anyhow!("host exploded"))
}

fn array_len(ctx: &mut Context) -> anyhow::Result<Vec<Val>> {
    match ctx.argument(0)? {
        Val::Ref(RefVal::Array(a)) => Ok(vec![Val::Int(a.read().len() as i64)]),
        other => Err(anyhow::anyhow!("not an array: {other}")),
    }
}

fn upper(ctx: &mut Context) -> anyhow::Result<Val> {
    Ok(Val::from(ctx.string_argument(0)?.to_uppercase()))
}

fn property(ctx: &mut Context) -> anyhow::Result<Vec<Val>> {
    let key = ctx.string_argument(0)?;
    Ok(vec![Val::from(ctx.property(key).unwrap_or_default().to_string())])
}

/// Natives under package `test`.
pub(super) fn natives() -> NativeRegistry {
    let mut reg = NativeRegistry::new();
    let units = [
        NativeUnit::function("test", "valueOf", vec![Param::new("i", Type::Int)], vec![Type::String], value_of),
        NativeUnit::function("test", "firstOnly", vec![], vec![Type::Int, Type::Int, Type::json()], first_only),
        NativeUnit::function("test", "tooMany", vec![], vec![Type::Int], too_many),
        NativeUnit::function("test", "explode", vec![], vec![], explode),
        NativeUnit::function(
            "test",
            "len",
            vec![Param::new("a", Type::array_of(Type::Any))],
            vec![Type::Int],
            array_len,
        ),
        NativeUnit::type_mapper("test", "upper", Type::String, Type::String, upper),
        NativeUnit::function("test", "property", vec![Param::new("k", Type::String)], vec![Type::String], property),
    ];
    for unit in units {
        reg.register(unit).unwrap();
    }
    reg
}

pub(super) fn source(v: serde_json::Value) -> ProgramSource {
    serde_json::from_value(v).unwrap()
}

pub(super) fn load(v: serde_json::Value) -> Program {
    Program::load(source(v), &natives()).unwrap()
}

pub(super) fn runtime(v: serde_json::Value) -> Runtime {
    Runtime::new(load(v), RuntimeConfig::default()).unwrap()
}

/// Loads `program`, invokes `name` and returns its results.
pub(super) fn run(v: serde_json::Value, name: &str, args: Vec<Val>) -> anyhow::Result<Vec<Val>> {
    runtime(v).invoke(name, args)
}

// Tree builders for programs written as JSON

pub(super) fn int(i: i64) -> serde_json::Value {
    json!({ "int": i })
}

pub(super) fn var(name: &str) -> serde_json::Value {
    json!({ "var": name })
}

pub(super) fn bin(op: &str, lhs: serde_json::Value, rhs: serde_json::Value) -> serde_json::Value {
    json!({ "binary": { "op": op, "lhs": lhs, "rhs": rhs } })
}

pub(super) fn call(callee: &str, args: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "call": { "callee": callee, "args": args } })
}

pub(super) fn define(name: &str, ty: &str, init: serde_json::Value) -> serde_json::Value {
    json!({ "var": { "name": name, "type": ty, "init": init } })
}

pub(super) fn assign(name: &str, value: serde_json::Value) -> serde_json::Value {
    json!({ "assign": { "targets": [{ "var": name }], "value": value } })
}

pub(super) fn ret(values: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "return": values })
}

pub(super) fn func(
    name: &str,
    params: serde_json::Value,
    returns: serde_json::Value,
    body: Vec<serde_json::Value>,
) -> serde_json::Value {
    json!({ "name": name, "params": params, "returns": returns, "body": body })
}

pub(super) fn person_struct() -> serde_json::Value {
    json!({ "name": "Person", "fields": [
        { "name": "name", "type": "string" },
        { "name": "address", "type": "Address" }
    ]})
}

pub(super) fn address_struct() -> serde_json::Value {
    json!({ "name": "Address", "fields": [{ "name": "city", "type": "string" }] })
}

mod dispatch;
mod frames;
mod native;
mod null_values;
