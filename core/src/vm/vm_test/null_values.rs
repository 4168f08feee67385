use super::*;

fn field(base: serde_json::Value, name: &str) -> serde_json::Value {
    json!({ "field": { "base": base, "name": name } })
}

fn index(base: serde_json::Value, i: serde_json::Value) -> serde_json::Value {
    json!({ "index": { "base": base, "index": i } })
}

fn new_person(name: &str) -> serde_json::Value {
    json!({ "struct": { "name": "Person", "fields": [["name", { "str": name }]] } })
}

fn echo_connector() -> serde_json::Value {
    json!({
        "name": "Echo",
        "params": [{ "name": "prefix", "type": "string" }],
        "actions": [func(
            "say",
            json!([{ "name": "msg", "type": "string" }]),
            json!(["string"]),
            vec![ret(vec![bin("+", field(var("self"), "prefix"), var("msg"))])],
        )]
    })
}

#[test]
fn null_equals_null_of_same_type() {
    let program = json!({ "functions": [func("f", json!([]), json!(["boolean", "boolean"]), vec![
        json!({ "var": { "name": "a", "type": "json" } }),
        json!({ "var": { "name": "b", "type": "json" } }),
        ret(vec![bin("==", var("a"), var("b")), bin("==", var("a"), json!("null"))]),
    ])]});
    assert_eq!(run(program, "f", vec![]).unwrap(), vec![Val::Bool(true), Val::Bool(true)]);
}

#[test]
fn null_versus_value_is_unequal() {
    let program = json!({ "functions": [func("f", json!([]), json!(["boolean"]), vec![
        define("j", "json", json!({ "json": { "a": 1 } })),
        ret(vec![bin("==", var("j"), json!("null"))]),
    ])]});
    assert_eq!(run(program, "f", vec![]).unwrap(), vec![Val::Bool(false)]);
}

#[test]
fn reference_return_may_be_null() {
    let program = json!({
        "structs": [person_struct(), address_struct()],
        "functions": [func("getPerson", json!([]), json!(["Person"]), vec![ret(vec![json!("null")])])]
    });
    let out = run(program, "getPerson", vec![]).unwrap();
    assert_eq!(out.len(), 1);
    assert!(out[0].is_null());
    assert_eq!(out[0].ty(), Type::structure("Person"));
}

#[test]
fn indexing_a_null_array_names_the_variable() {
    let program = json!({ "functions": [func("f", json!([]), json!(["string"]), vec![
        json!({ "var": { "name": "fruits", "type": "string[]" } }),
        ret(vec![index(var("fruits"), int(0))]),
    ])]});
    let err = run(program, "f", vec![]).unwrap_err();
    assert_eq!(err.to_string(), "variable 'fruits' is null");
    assert!(matches!(fault_of(&err), Some(Fault::NullReference(_))));
}

#[test]
fn null_field_names_the_field() {
    let program = json!({
        "structs": [person_struct(), address_struct()],
        "functions": [func("f", json!([]), json!(["string"]), vec![
            define("p", "Person", new_person("Ann")),
            ret(vec![field(field(var("p"), "address"), "city")]),
        ])]
    });
    let err = run(program, "f", vec![]).unwrap_err();
    assert_eq!(err.to_string(), "field 'address' is null");
}

#[test]
fn action_on_null_connector() {
    let program = json!({
        "connectors": [echo_connector()],
        "functions": [func("f", json!([]), json!(["string"]), vec![
            json!({ "var": { "name": "e", "type": "connector Echo" } }),
            ret(vec![json!({ "action": { "connector": var("e"), "action": "say", "args": [{ "str": "hi" }] } })]),
        ])]
    });
    let err = run(program, "f", vec![]).unwrap_err();
    assert_eq!(err.to_string(), "connector argument value is null");
}

#[test]
fn action_on_live_connector() {
    let program = json!({
        "connectors": [echo_connector()],
        "functions": [func("f", json!([]), json!(["string"]), vec![
            define("e", "connector Echo", json!({ "connector": { "name": "Echo", "args": [{ "str": "> " }] } })),
            ret(vec![json!({ "action": { "connector": var("e"), "action": "say", "args": [{ "str": "hi" }] } })]),
        ])]
    });
    assert_eq!(run(program, "f", vec![]).unwrap(), vec![Val::str("> hi")]);
}

#[test]
fn arrays_keep_per_element_nullability() {
    let null_checks = (0..5).map(|i| bin("==", index(var("ps"), int(i)), json!("null"))).collect::<Vec<_>>();
    let program = json!({
        "structs": [person_struct(), address_struct()],
        "functions": [func("f", json!([]), json!(["boolean[]"]), vec![
            define("ps", "Person[]", json!({ "array": { "elem": "Person", "items": [
                new_person("a"), "null", "null", new_person("b"), "null"
            ]}})),
            ret(vec![json!({ "array": { "elem": "boolean", "items": null_checks } })]),
        ])]
    });
    let out = run(program, "f", vec![]).unwrap();
    assert_eq!(out[0].to_json(), json!([false, true, true, false, true]));
}

#[test]
fn map_stored_null_differs_from_absent_key() {
    let program = json!({ "functions": [
        func("stored", json!([]), json!(["boolean"]), vec![
            define("m", "map", json!({ "map": [] })),
            json!({ "assign": { "targets": [{ "index": { "base": var("m"), "index": { "str": "a" } } }], "value": "null" } }),
            ret(vec![bin("==", index(var("m"), json!({ "str": "a" })), json!("null"))]),
        ]),
        func("absent", json!([]), json!(["any"]), vec![
            define("m", "map", json!({ "map": [] })),
            ret(vec![index(var("m"), json!({ "str": "b" }))]),
        ]),
    ]});
    let rt = runtime(program);
    assert_eq!(rt.invoke("stored", vec![]).unwrap(), vec![Val::Bool(true)]);
    let err = rt.invoke("absent", vec![]).unwrap_err();
    assert_eq!(err.to_string(), "key 'b' not found");
}

#[test]
fn casting_null_value_yields_typed_null() {
    let program = json!({ "functions": [func("f", json!([]), json!(["map"]), vec![
        json!({ "var": { "name": "j", "type": "json" } }),
        ret(vec![json!({ "cast": { "expr": var("j"), "to": "map" } })]),
    ])]});
    let out = run(program, "f", vec![]).unwrap();
    assert!(out[0].is_null());
    assert_eq!(out[0].ty(), Type::map());
}

#[test]
fn null_passed_to_native_requiring_value() {
    let program = json!({ "functions": [func("f", json!([]), json!(["int"]), vec![
        json!({ "var": { "name": "xs", "type": "int[]" } }),
        ret(vec![call("test:len", vec![var("xs")])]),
    ])]});
    let err = run(program, "f", vec![]).unwrap_err();
    assert_eq!(err.to_string(), "argument 0 is null");
}

#[test]
fn null_in_value_slot_never_loads_with_checker() {
    let program = load(json!({ "functions": [func("f", json!([]), json!([]), vec![
        define("i", "int", json!("null")),
    ])]}));
    let err = Runtime::new(program, RuntimeConfig::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "function 'f': incompatible types: 'null' cannot be assigned to 'int'"
    );
}

fn unchecked(v: serde_json::Value) -> Runtime {
    Runtime::new(
        load(v),
        RuntimeConfig {
            check_semantics: false,
            ..RuntimeConfig::default()
        },
    )
    .unwrap()
}

#[test]
fn null_never_lands_in_a_value_slot() {
    let rt = unchecked(json!({ "functions": [
        func("local", json!([]), json!(["int"]), vec![
            define("a", "any", json!("null")),
            define("x", "int", var("a")),
            ret(vec![var("x")]),
        ]),
        func("from_map", json!([]), json!(["int"]), vec![
            define("m", "map", json!({ "map": [["a", "null"]] })),
            ret(vec![index(var("m"), json!({ "str": "a" }))]),
        ]),
    ]}));
    for name in ["local", "from_map"] {
        let err = rt.invoke(name, vec![]).unwrap_err();
        assert_eq!(fault_of(&err).map(Fault::kind), Some(FaultKind::Defect), "{name}");
        assert_eq!(err.to_string(), "analyzer defect: null stored into a 'int' slot");
    }
}

#[test]
fn null_through_any_array_alias_is_refused() {
    let program = json!({ "functions": [func("f", json!([]), json!(["int"]), vec![
        define("ys", "int[]", json!({ "array": { "elem": "int", "items": [int(1)] } })),
        define("zs", "any[]", var("ys")),
        json!({ "assign": { "targets": [{ "index": { "base": var("zs"), "index": int(0) } }], "value": "null" } }),
        ret(vec![index(var("ys"), int(0))]),
    ])]});
    let err = run(program, "f", vec![]).unwrap_err();
    assert_eq!(fault_of(&err).map(Fault::kind), Some(FaultKind::Defect));
    assert_eq!(err.to_string(), "analyzer defect: null stored into a 'int' slot");
}
