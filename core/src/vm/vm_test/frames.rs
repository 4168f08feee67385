use super::*;
use crate::program::FrameSize;

fn frame(args: Vec<Val>, slots: &[Type], temps: usize, returns: &[Type]) -> StackFrame {
    StackFrame::new("f".into(), slots, args, temps, returns).unwrap()
}

#[test]
fn slot_access_outside_frame_faults() {
    let mut f = frame(vec![Val::Int(1)], &[Type::Int, Type::String], 0, &[]);
    assert_eq!(f.get(0).unwrap(), &Val::Int(1));
    assert_eq!(f.get(1).unwrap(), &Val::str(""));
    assert_eq!(
        f.get(2).unwrap_err(),
        Fault::SlotOutOfRange {
            area: "stack",
            index: 2,
            len: 2
        }
    );
    assert!(f.set(5, Val::Int(0)).is_err());
}

#[test]
fn arguments_are_range_and_null_checked() {
    let f = frame(
        vec![Val::Int(1), Val::null(RefType::Json)],
        &[Type::Int, Type::json(), Type::Int],
        0,
        &[],
    );
    assert_eq!(f.argument(0).unwrap(), &Val::Int(1));
    assert_eq!(f.argument(1).unwrap_err().to_string(), "argument 1 is null");
    assert!(f.nullable_argument(1).unwrap().is_null());
    // slot 2 is a local, not an argument
    assert_eq!(f.argument(2).unwrap_err(), Fault::ArgumentOutOfRange { index: 2, count: 2 });
}

#[test]
fn return_slots_start_at_defaults() {
    let mut f = frame(vec![], &[], 0, &[Type::Int, Type::Float, Type::Bool, Type::String, Type::xml()]);
    assert_eq!(&f.returns()[..4], &[Val::Int(0), Val::Float(0.0), Val::Bool(false), Val::str("")]);
    assert!(f.returns()[4].is_null());
    assert_eq!(f.returns()[4].ty(), Type::xml());

    f.set_return(1, Val::Float(1.5)).unwrap();
    let err = f.set_return(5, Val::Int(0)).unwrap_err();
    assert_eq!(err.kind(), FaultKind::Defect);
}

#[test]
fn temps_are_staged_and_taken_once() {
    let mut f = frame(vec![], &[], 2, &[]);
    f.set_temp(1, Val::Int(3)).unwrap();
    assert_eq!(f.take_temp(1).unwrap(), Val::Int(3));
    assert_eq!(f.take_temp(1).unwrap_err().kind(), FaultKind::Defect);
    assert_eq!(
        f.set_temp(2, Val::Int(0)).unwrap_err(),
        Fault::SlotOutOfRange {
            area: "temp",
            index: 2,
            len: 2
        }
    );
}

#[test]
fn too_many_arguments_for_frame() {
    let err = StackFrame::new("f".into(), &[Type::Int], vec![Val::Int(1), Val::Int(2)], 0, &[]).unwrap_err();
    assert_eq!(err.kind(), FaultKind::Defect);
}

#[test]
fn temp_frame_size_same_value_twice_is_fine() {
    let mut size = FrameSize::default();
    size.set_temp("f", 3).unwrap();
    size.set_temp("f", 3).unwrap();
    assert_eq!(size.get(), Some(3));
}

#[test]
fn temp_frame_size_conflict_is_a_wiring_defect() {
    let mut size = FrameSize::default();
    size.set_temp("f", 3).unwrap();
    let err = size.set_temp("f", 4).unwrap_err();
    assert_eq!(err.kind(), FaultKind::Defect);
    assert_eq!(err.to_string(), "Attempt to overwrite temp frame size of 'f'. current: 3, new: 4");
}

#[test]
fn temp_frame_size_zero_may_be_raised() {
    let mut size = FrameSize::default();
    size.set_temp("f", 0).unwrap();
    size.set_temp("f", 2).unwrap();
    assert_eq!(size.get(), Some(2));
}

#[test]
fn stack_frame_size_is_write_once() {
    let mut size = FrameSize::default();
    assert_eq!(size.get(), None);
    size.set_once("f", 4).unwrap();
    size.set_once("f", 4).unwrap();
    assert!(size.set_once("f", 5).is_err());
    assert_eq!(size, FrameSize::Set(4));
}

#[test]
fn control_stack_is_lifo() {
    let mut stack = ControlStack::new(4);
    assert_eq!(stack.current().unwrap_err(), Fault::EmptyStack);
    assert_eq!(stack.pop().unwrap_err(), Fault::EmptyStack);

    stack.push(StackFrame::new("a".into(), &[], vec![], 0, &[]).unwrap()).unwrap();
    stack.push(StackFrame::new("b".into(), &[], vec![], 0, &[]).unwrap()).unwrap();
    assert_eq!(stack.current().unwrap().unit(), "b");
    assert_eq!(stack.trace(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(stack.pop().unwrap().unit(), "b");
    assert_eq!(stack.depth(), 1);
}

#[test]
fn control_stack_depth_is_bounded() {
    let mut stack = ControlStack::new(1);
    stack.push(StackFrame::new("a".into(), &[], vec![], 0, &[]).unwrap()).unwrap();
    let err = stack.push(StackFrame::new("b".into(), &[], vec![], 0, &[]).unwrap()).unwrap_err();
    assert_eq!(err, Fault::StackOverflow { depth: 1 });
}

#[test]
fn context_keeps_first_fault() {
    let mut ctx = Context::new(4);
    ctx.record_fault(&anyhow::anyhow!("first"));
    ctx.record_fault(&anyhow::Error::from(Fault::EmptyStack));
    let record = ctx.fault().unwrap();
    assert_eq!(record.message, "first");
    assert!(record.fault.is_none());
    assert!(ctx.take_fault().is_some());
    assert!(ctx.fault().is_none());
}

#[test]
fn context_without_frame() {
    let mut ctx = Context::new(4);
    assert_eq!(ctx.argument(0).unwrap_err(), Fault::EmptyStack);
    assert_eq!(ctx.set_return(0, Val::Int(1)).unwrap_err(), Fault::EmptyStack);
    assert_eq!(ctx.property("missing"), None);
    ctx.set_property("k", "v");
    assert_eq!(ctx.property("k"), Some("v"));
}

#[test]
fn typed_argument_readers() {
    let mut ctx = Context::new(4);
    let args = vec![Val::Int(3), Val::Float(0.5), Val::Bool(true)];
    ctx.stack_mut()
        .push(StackFrame::new("f".into(), &[Type::Int, Type::Float, Type::Bool], args, 0, &[]).unwrap())
        .unwrap();
    assert_eq!(ctx.int_argument(0).unwrap(), 3);
    assert_eq!(ctx.float_argument(1).unwrap(), 0.5);
    assert!(ctx.bool_argument(2).unwrap());

    let err = ctx.int_argument(2).unwrap_err();
    assert_eq!(err.to_string(), "analyzer defect: argument 2 is 'boolean', expected 'int'");
    assert_eq!(fault_of(&err).map(Fault::kind), Some(FaultKind::Defect));
}
