use super::*;
use crate::program::CallableUnit;
use crate::vm::{ExecState, Interpreter};

fn fact_program() -> serde_json::Value {
    json!({ "functions": [func(
        "fact",
        json!([{ "name": "n", "type": "int" }]),
        json!(["int"]),
        vec![
            json!({ "if": { "cond": bin("<=", var("n"), int(1)), "then": [ret(vec![int(1)])] } }),
            ret(vec![bin("*", var("n"), call("fact", vec![bin("-", var("n"), int(1))]))]),
        ],
    )]})
}

#[test]
fn undefined_callable_is_a_lookup_fault() {
    let program = load(json!({}));
    let mut ctx = Context::new(8);
    let err = Dispatcher::new(&program).call_named(&mut ctx, "nope", vec![]).unwrap_err();
    assert_eq!(err.to_string(), "undefined function 'nope'");
    assert_eq!(fault_of(&err).map(Fault::kind), Some(FaultKind::Lookup));

    let record = ctx.fault().unwrap();
    assert_eq!(record.fault, Some(Fault::UndefinedCallable("nope".to_string())));
    assert!(record.trace.is_empty());
}

#[test]
fn unresolved_call_inside_body_faults_at_call_time() {
    let program = load(json!({ "functions": [func("f", json!([]), json!([]), vec![
        json!({ "expr": call("missing", vec![]) }),
    ])]}));
    let rt = Runtime::new(
        program,
        RuntimeConfig {
            check_semantics: false,
            ..RuntimeConfig::default()
        },
    )
    .unwrap();
    let err = rt.invoke("f", vec![]).unwrap_err();
    assert_eq!(fault_of(&err).map(Fault::kind), Some(FaultKind::Lookup));
}

#[test]
fn arity_mismatch_on_invoke() {
    let rt = runtime(fact_program());
    let err = rt.invoke("fact", vec![]).unwrap_err();
    assert_eq!(err.to_string(), "function 'fact' expects 1 argument(s), got 0");
}

#[test]
fn fault_unwinds_every_frame() {
    let program = load(json!({ "functions": [
        func("inner", json!([]), json!([]), vec![json!({ "expr": call("test:explode", vec![]) })]),
        func("outer", json!([]), json!([]), vec![json!({ "expr": call("inner", vec![]) })]),
    ]}));
    let mut ctx = Context::new(8);
    let err = Dispatcher::new(&program).call_named(&mut ctx, "outer", vec![]).unwrap_err();
    assert_eq!(err.to_string(), "host exploded");
    assert_eq!(ctx.stack().depth(), 0);

    let record = ctx.take_fault().unwrap();
    assert_eq!(record.message, "host exploded");
    assert_eq!(record.trace, vec!["outer", "inner", "test:explode"]);
}

#[test]
fn runaway_recursion_overflows_the_control_stack() {
    let program = load(json!({ "functions": [func("spin", json!([]), json!([]), vec![
        json!({ "expr": call("spin", vec![]) }),
    ])]}));
    let rt = Runtime::new(
        program,
        RuntimeConfig {
            max_call_depth: 16,
            ..RuntimeConfig::default()
        },
    )
    .unwrap();
    let err = rt.invoke("spin", vec![]).unwrap_err();
    assert_eq!(fault_of(&err), Some(&Fault::StackOverflow { depth: 16 }));
}

#[test]
fn runtime_is_reusable_after_a_fault() {
    let rt = runtime(json!({ "functions": [func(
        "div",
        json!([{ "name": "a", "type": "int" }, { "name": "b", "type": "int" }]),
        json!(["int"]),
        vec![ret(vec![bin("/", var("a"), var("b"))])],
    )]}));
    assert!(rt.invoke("div", vec![Val::Int(1), Val::Int(0)]).is_err());
    assert_eq!(rt.invoke("div", vec![Val::Int(9), Val::Int(3)]).unwrap(), vec![Val::Int(3)]);
}

#[test]
fn concurrent_invocations_share_one_program() {
    let rt = runtime(fact_program());
    std::thread::scope(|s| {
        let handles = (1..=8)
            .map(|n| {
                let rt = &rt;
                s.spawn(move || rt.invoke("fact", vec![Val::Int(n)]).unwrap())
            })
            .collect::<Vec<_>>();
        let mut expected = 1;
        for (n, h) in (1..=8).zip(handles) {
            expected *= n;
            assert_eq!(h.join().unwrap(), vec![Val::Int(expected)]);
        }
    });
}

#[test]
fn runtime_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Runtime>();
    assert_send_sync::<Program>();
}

#[test]
fn interpreter_reports_its_state() {
    let program = load(json!({ "functions": [
        func("ok", json!([]), json!(["int"]), vec![ret(vec![int(1)])]),
        func("bad", json!([]), json!(["int"]), vec![ret(vec![bin("/", int(1), int(0))])]),
    ]}));
    let dispatcher = Dispatcher::new(&program);

    for (name, state) in [("ok", ExecState::Returned), ("bad", ExecState::Faulted)] {
        let unit = program.resolve(name).unwrap();
        let CallableUnit::Function(f) = unit else {
            panic!("{name} should be interpreted");
        };
        let (slots, temps) = unit.frame_shape().unwrap();
        let mut ctx = Context::new(8);
        ctx.stack_mut()
            .push(StackFrame::new(name.into(), &slots, vec![], temps, &f.sig.returns).unwrap())
            .unwrap();

        let mut interp = Interpreter::new(dispatcher, f);
        assert_eq!(interp.state(), ExecState::Running);
        let _ = interp.run(&mut ctx);
        assert_eq!(interp.state(), state);
    }
}

#[test]
fn bare_names_resolve_within_the_package() {
    let rt = runtime(json!({
        "package": "demo",
        "functions": [func("one", json!([]), json!(["int"]), vec![ret(vec![int(1)])])]
    }));
    assert_eq!(rt.invoke("one", vec![]).unwrap(), vec![Val::Int(1)]);
    assert_eq!(rt.invoke("demo:one", vec![]).unwrap(), vec![Val::Int(1)]);
    assert!(rt.invoke("other:one", vec![]).is_err());
}

#[test]
fn declared_frame_sizes_must_match_layout() {
    let mut def = func("f", json!([{ "name": "a", "type": "int" }]), json!([]), vec![]);
    def["stack_frame_size"] = json!(3);
    let err = Program::load(source(json!({ "functions": [def] })), &natives()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Attempt to overwrite stack frame size of 'f'. current: 3, new: 1"
    );

    // one staged argument needs one temp slot
    let mut def = func("g", json!([]), json!([]), vec![json!({ "expr": call("test:valueOf", vec![int(1)]) })]);
    def["temp_frame_size"] = json!(2);
    let err = Program::load(source(json!({ "functions": [def] })), &natives()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Attempt to overwrite temp frame size of 'g'. current: 2, new: 1"
    );
}

#[test]
fn matching_declared_frame_sizes_load() {
    let mut def = func("f", json!([{ "name": "a", "type": "int" }]), json!(["int"]), vec![ret(vec![var("a")])]);
    def["stack_frame_size"] = json!(1);
    def["temp_frame_size"] = json!(0);
    let rt = runtime(json!({ "functions": [def] }));
    assert_eq!(rt.invoke("f", vec![Val::Int(4)]).unwrap(), vec![Val::Int(4)]);
}

#[test]
fn program_loads_from_yaml() {
    let yaml = r#"
package: demo
functions:
  - name: greet
    params:
      - { name: who, type: string }
    returns: [string]
    body:
      - return:
          - binary:
              op: "+"
              lhs: { str: "hello " }
              rhs: { var: who }
"#;
    let program = Program::from_yaml_str(yaml, &natives()).unwrap();
    let rt = Runtime::new(program, RuntimeConfig::default()).unwrap();
    assert_eq!(rt.invoke("greet", vec![Val::str("ann")]).unwrap(), vec![Val::str("hello ann")]);
}

#[test]
fn trace_calls_does_not_change_results() {
    let rt = Runtime::new(
        load(fact_program()),
        RuntimeConfig {
            trace_calls: true,
            ..RuntimeConfig::default()
        },
    )
    .unwrap();
    assert_eq!(rt.invoke("fact", vec![Val::Int(5)]).unwrap(), vec![Val::Int(120)]);
}

#[test]
fn invoke_checks_argument_types() {
    let rt = runtime(json!({ "functions": [func(
        "id",
        json!([{ "name": "i", "type": "int" }]),
        json!(["int"]),
        vec![ret(vec![var("i")])],
    )]}));

    let err = rt.invoke("id", vec![Val::null(RefType::Json)]).unwrap_err();
    assert_eq!(err.to_string(), "function 'id' argument 0 expects 'int', got 'null'");
    assert!(matches!(fault_of(&err), Some(Fault::ArgumentType { index: 0, .. })));

    let err = rt.invoke("id", vec![Val::str("7")]).unwrap_err();
    assert_eq!(err.to_string(), "function 'id' argument 0 expects 'int', got 'string'");

    assert_eq!(rt.invoke("id", vec![Val::Int(7)]).unwrap(), vec![Val::Int(7)]);
}

#[test]
fn null_of_any_reference_type_binds_to_reference_params() {
    let rt = runtime(json!({ "functions": [func(
        "id",
        json!([{ "name": "j", "type": "xml" }]),
        json!(["xml"]),
        vec![ret(vec![var("j")])],
    )]}));
    let out = rt.invoke("id", vec![Val::null(RefType::Json)]).unwrap();
    assert!(out[0].is_null());
    assert_eq!(out[0].ty(), Type::xml());
}

#[test]
fn native_gets_no_wrongly_typed_argument() {
    let program = load(json!({}));
    let err = crate::rt::invoke(&program, "test:valueOf", vec![Val::Bool(true)]).unwrap_err();
    assert_eq!(err.to_string(), "function 'test:valueOf' argument 0 expects 'int', got 'boolean'");
}
