use super::*;

#[test]
fn value_of_returns_string() {
    let program = load(json!({}));
    let out = crate::rt::invoke(&program, "test:valueOf", vec![Val::Int(5)]).unwrap();
    assert_eq!(out, vec![Val::str("5")]);
}

#[test]
fn native_called_from_interpreted_code() {
    let program = json!({ "functions": [func("f", json!([]), json!(["string"]), vec![
        ret(vec![bin("+", call("test:valueOf", vec![int(4)]), call("test:valueOf", vec![int(2)]))]),
    ])]});
    assert_eq!(run(program, "f", vec![]).unwrap(), vec![Val::str("42")]);
}

#[test]
fn fewer_results_leave_defaults() {
    let program = load(json!({}));
    let out = crate::rt::invoke(&program, "test:firstOnly", vec![]).unwrap();
    assert_eq!(out[0], Val::Int(7));
    assert_eq!(out[1], Val::Int(0));
    assert!(out[2].is_null());
}

#[test]
fn extra_results_are_a_wiring_defect() {
    let program = load(json!({}));
    let err = crate::rt::invoke(&program, "test:tooMany", vec![]).unwrap_err();
    let fault = fault_of(&err).unwrap();
    assert_eq!(fault.kind(), FaultKind::Defect);
    assert!(fault.to_string().contains("returned 2 value(s), declares 1"));
}

#[test]
fn type_mapper_writes_slot_zero() {
    let program = load(json!({}));
    let out = crate::rt::invoke(&program, "test:upper", vec![Val::str("abc")]).unwrap();
    assert_eq!(out, vec![Val::str("ABC")]);
}

#[test]
fn host_fault_propagates_unchanged() {
    let program = json!({ "functions": [
        func("inner", json!([]), json!([]), vec![json!({ "expr": call("test:explode", vec![]) })]),
        func("outer", json!([]), json!([]), vec![json!({ "expr": call("inner", vec![]) })]),
    ]});
    let err = run(program, "outer", vec![]).unwrap_err();
    assert_eq!(err.to_string(), "host exploded");
    assert!(fault_of(&err).is_none());
}

#[test]
fn native_reads_context_properties() {
    let rt = runtime(json!({}));
    let out = rt
        .invoke_with("test:property", vec![Val::str("user")], |ctx| {
            ctx.set_property("user", "ann");
        })
        .unwrap();
    assert_eq!(out, vec![Val::str("ann")]);
}

#[test]
fn argument_index_out_of_range() {
    let program = load(json!({}));
    let mut ctx = Context::new(8);
    let unit = program.resolve("test:valueOf").unwrap();
    let frame = StackFrame::new("test:valueOf".into(), &[Type::Int], vec![Val::Int(1)], 0, &[Type::String]).unwrap();
    ctx.stack_mut().push(frame).unwrap();
    assert_eq!(
        ctx.argument(1).unwrap_err(),
        Fault::ArgumentOutOfRange { index: 1, count: 1 }
    );
    Dispatcher::new(&program).dispatch(&mut ctx, unit).unwrap();
    assert_eq!(ctx.frame().unwrap().returns(), &[Val::str("1")]);
}

#[test]
fn native_units_carry_constants() {
    let unit = NativeUnit::function("test", "half", vec![], vec![Type::Float], |_| Ok(vec![Val::Float(2.5)]))
        .with_constant("HALF", Val::Float(2.5));
    assert_eq!(unit.constants.len(), 1);
    assert_eq!(unit.constants[0].name, "HALF");
    assert!(!unit.is_type_mapper());
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut reg = natives();
    let err = reg
        .register(NativeUnit::function("test", "valueOf", vec![], vec![], |_| Ok(vec![])))
        .unwrap_err();
    assert_eq!(err.kind(), FaultKind::Defect);
    assert_eq!(err.to_string(), "native unit 'test:valueOf' registered twice");
}
