// Tests for the host binding API: direct stack access, registration of constants and
// native functions, running named functions, and captured interpreter output.

use emforth::{ForthError, ForthState, Keyword, Token, compile, eval};
use std::{
    cell::RefCell,
    io::{self, Write},
    rc::Rc,
};

/// A shared output sink so the tests can read back what a script printed.
#[derive(Clone, Default)]
struct Sink(Rc<RefCell<Vec<u8>>>);

impl Sink {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn state_with_sink() -> (ForthState, Sink) {
    let mut state = ForthState::default();
    let sink = Sink::default();

    state.set_output(Box::new(sink.clone()));

    (state, sink)
}

#[test]
fn push_and_pop_are_lifo() {
    let mut state = ForthState::default();

    for value in 1..=5 {
        state.push(value).unwrap();
    }

    assert_eq!(state.depth(), 5);

    for value in (1..=5).rev() {
        assert_eq!(state.pop().unwrap(), value);
    }

    assert_eq!(state.depth(), 0);
    assert!(matches!(state.pop(), Err(ForthError::StackUnderflow)));
}

#[test]
fn compiled_programs_expose_their_token_stream() {
    let code = compile("1 2 +").unwrap();

    assert_eq!(
        code.tokens(),
        &[Token::Number(1), Token::Number(2), Token::Op(Keyword::Plus)]
    );
}

#[test]
fn eval_reports_a_range_past_the_program() {
    let mut state = ForthState::default();
    let code = compile("1 2 +").unwrap();

    let result = eval(&mut state, &code, 0, code.len() + 1);

    assert!(matches!(
        result,
        Err(ForthError::PositionOutOfBounds { position: 3 })
    ));
}

#[test]
fn counted_loop_prints_each_index() {
    let (mut state, sink) = state_with_sink();
    let code = compile(": count 0 5 do i . loop ; count").unwrap();

    state.run(&code).unwrap();

    assert_eq!(sink.text(), "0 1 2 3 4 ");
}

#[test]
fn dot_string_emit_and_cr_print() {
    let (mut state, sink) = state_with_sink();
    let code = compile(".\" total:\" 72 emit 105 emit cr").unwrap();

    state.run(&code).unwrap();

    assert_eq!(sink.text(), "total:Hi\n");
}

#[test]
fn run_function_before_the_defining_run_is_not_found() {
    let mut state = ForthState::default();
    let code = compile(": later 42 ;").unwrap();

    // The definition hasn't executed yet, so the dictionary has no binding.
    assert!(!state.run_function(&code, "later").unwrap());

    state.run(&code).unwrap();

    assert!(state.run_function(&code, "later").unwrap());
    assert_eq!(state.pop().unwrap(), 42);
}

#[test]
fn run_function_executes_only_the_named_body() {
    let mut state = ForthState::default();
    let code = compile(": test 5 3 > if 111 else 222 then ;").unwrap();

    state.run(&code).unwrap();

    assert!(state.run_function(&code, "test").unwrap());
    assert_eq!(state.stack(), &[111]);
}

#[test]
fn host_constants_act_like_script_constants() {
    let mut state = ForthState::default();

    state.define_constant("limit", 10).unwrap();

    // A script level rebinding of the same name never shadows the host one.
    let code = compile("99 constant limit limit limit +").unwrap();
    state.run(&code).unwrap();

    assert_eq!(state.stack(), &[20]);
}

#[test]
fn native_functions_read_and_write_the_data_stack() {
    let mut state = ForthState::default();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let recorded = seen.clone();
    state
        .define_native(
            "record",
            Rc::new(move |state: &mut ForthState| {
                let value = state.pop()?;
                recorded.borrow_mut().push(value);
                state.push(value * 2)
            }),
        )
        .unwrap();

    let code = compile("21 record").unwrap();
    state.run(&code).unwrap();

    assert_eq!(*seen.borrow(), vec![21]);
    assert_eq!(state.pop().unwrap(), 42);
}

#[test]
fn native_failures_propagate_to_the_host() {
    let mut state = ForthState::default();

    state
        .define_native(
            "explode",
            Rc::new(|_: &mut ForthState| {
                Err(ForthError::Io {
                    message: "boom".to_string(),
                })
            }),
        )
        .unwrap();

    let code = compile("1 explode 2").unwrap();
    let result = state.run(&code);

    assert!(matches!(result, Err(ForthError::Io { .. })));

    // The failure aborted the run before the trailing push.
    assert_eq!(state.stack(), &[1]);
}

#[test]
fn natives_may_reenter_the_evaluator() {
    let mut state = ForthState::default();
    let code = compile(": helper 1 + ;").unwrap();

    let helper_code = code.clone();
    state
        .define_native(
            "call-helper",
            Rc::new(move |state: &mut ForthState| {
                state.run_function(&helper_code, "helper")?;
                Ok(())
            }),
        )
        .unwrap();

    state.run(&code).unwrap();

    state.push(41).unwrap();
    let call = compile("call-helper").unwrap();
    state.run(&call).unwrap();

    assert_eq!(state.pop().unwrap(), 42);
}

#[test]
fn the_native_table_has_a_fixed_capacity() {
    let mut state = ForthState::new(8, 8, 8, 8, 1);

    state
        .define_native("one", Rc::new(|_: &mut ForthState| Ok(())))
        .unwrap();

    let result = state.define_native("two", Rc::new(|_: &mut ForthState| Ok(())));
    assert!(matches!(result, Err(ForthError::NativeTableFull)));
}

#[test]
fn the_dictionary_has_a_fixed_capacity() {
    let mut state = ForthState::new(8, 8, 8, 1, 8);

    state.define_constant("one", 1).unwrap();

    let result = state.define_constant("two", 2);
    assert!(matches!(result, Err(ForthError::DictionaryFull)));
}

#[test]
fn programs_with_owned_text_can_be_cloned_and_dropped() {
    let code = compile(": greet .\" hello\" ; greet").unwrap();
    let copy = code.clone();

    assert_eq!(copy.len(), code.len());

    drop(code);

    // The clone still works after the original is released.
    let (mut state, sink) = state_with_sink();
    state.run(&copy).unwrap();
    assert_eq!(sink.text(), "hello");
}

#[test]
fn states_are_independent() {
    let code = compile("variable x 5 x !").unwrap();

    let mut first = ForthState::default();
    let mut second = ForthState::default();

    first.run(&code).unwrap();
    second.run(&code).unwrap();

    // Writing through one state never touches the other.
    let update = compile("9 x !").unwrap();
    first.run(&update).unwrap();

    let read = compile("x @").unwrap();
    first.run(&read).unwrap();
    second.run(&read).unwrap();

    assert_eq!(first.pop().unwrap(), 9);
    assert_eq!(second.pop().unwrap(), 5);
}
