use arbtest::arbtest;
use assert2::{assert, check, let_assert};
use valvm::{
    compile, eval_source, evaluate, parse_expression, Code, EnvError, Environments, Error,
    Expression, Instruction, Interpreter, InterpreterMode, Poll, RuntimeError, Value,
};

fn compile_source(source: &str) -> Code {
    let_assert!(Ok(expression) = parse_expression(source));
    let_assert!(Ok(code) = compile(&expression));
    code
}

#[test]
fn literal_compiles_to_one_load() {
    arbtest(|u| {
        let value: i64 = u.arbitrary()?;
        let_assert!(Ok(expression) = parse_expression(&value.to_string()));
        check!(expression == Expression::constant(value));
        let_assert!(Ok(code) = compile(&expression));
        assert!(code.instructions() == [Instruction::load_const(value)]);
        Ok(())
    });
}

#[test]
fn binder_stores_and_leaves_nothing() {
    let code = compile_source("(val x 5)");
    assert!(code.instructions() == [Instruction::load_const(5), Instruction::store_name("x")]);

    let mut envs = Environments::new();
    let root = envs.root();
    check!(evaluate(&code, &mut envs, root) == Ok(Value::Empty));
    check!(envs.lookup(root, "x") == Ok(&Value::Integer(5)));
}

#[test]
fn literal_conditional() {
    let code = compile_source("(if 1 2 3)");
    assert!(
        code.instructions()
            == [
                Instruction::load_const(1),
                Instruction::relative_jump_if_true(2),
                Instruction::load_const(3),
                Instruction::relative_jump(1),
                Instruction::load_const(2),
            ]
    );

    let mut envs = Environments::new();
    let root = envs.root();
    check!(evaluate(&code, &mut envs, root) == Ok(Value::Integer(2)));
}

#[test]
fn branch_follows_runtime_condition() {
    let code = compile_source("(if cond 2 3)");
    arbtest(|u| {
        let cond: i64 = u.arbitrary()?;
        let mut envs = Environments::new();
        let root = envs.root();
        assert!(envs.define(root, "cond", Value::Integer(cond)).is_ok());
        let expected = if cond != 0 { 2 } else { 3 };
        assert!(evaluate(&code, &mut envs, root) == Ok(Value::Integer(expected)));
        Ok(())
    });
}

#[test]
fn condition_bound_in_parent_frame() {
    let code = compile_source("(if cond 2 3)");
    let mut envs = Environments::new();
    let root = envs.root();
    let_assert!(Ok(local) = envs.push(root));
    check!(envs.define(root, "cond", Value::Integer(0)).is_ok());
    check!(evaluate(&code, &mut envs, local) == Ok(Value::Integer(3)));
}

#[test]
fn unbound_name_produces_no_value() {
    let code = compile_source("(val x y)");
    let mut envs = Environments::new();
    let root = envs.root();
    check!(
        evaluate(&code, &mut envs, root)
            == Err(RuntimeError::Environment(EnvError::unbound("y")))
    );
    check!(!envs.is_defined(root, "x"));
}

#[test]
fn empty_code_has_no_result() {
    let mut envs = Environments::new();
    let root = envs.root();
    check!(evaluate(&Code::default(), &mut envs, root) == Ok(Value::Empty));
}

#[test]
fn fresh_environments_do_not_share_bindings() {
    let code = compile_source("(val x 5)");
    let mut envs = Environments::new();
    let first = envs.root();
    let second = envs.root();

    check!(evaluate(&code, &mut envs, first).is_ok());
    check!(envs.is_defined(first, "x"));
    check!(!envs.is_defined(second, "x"));

    // a separate arena is just as isolated
    let mut other = Environments::new();
    let root = other.root();
    check!(evaluate(&compile_source("x"), &mut other, root).is_err());
}

#[test]
fn eval_source_threads_one_environment() {
    let mut envs = Environments::new();
    let root = envs.root();
    check!(eval_source("(val a 6) (val b 7) (* a b)", &mut envs, root) == Ok(Value::Integer(42)));
    check!(eval_source("a", &mut envs, root) == Ok(Value::Integer(6)));
    check!(eval_source("", &mut envs, root) == Ok(Value::Empty));

    let_assert!(Err(Error::Compile(_)) = eval_source("(lambda x x)", &mut envs, root));
    let_assert!(Err(Error::Parse(_)) = eval_source("(val a", &mut envs, root));
    let_assert!(Err(err) = eval_source("(val c 1) nope", &mut envs, root));
    check!(err.to_string() == "runtime error: unbound name: nope");
    // expressions before the failure still took effect
    check!(envs.lookup(root, "c") == Ok(&Value::Integer(1)));
}

#[test]
fn bounded_run_resumes() {
    let code = compile_source("(+ (* 2 3) (- 10 4))");
    let mut envs = Environments::new();
    let root = envs.root();
    let mut interpreter = Interpreter::new(&code);

    check!(interpreter.run(&mut envs, root, 3) == Ok(Poll::Pending));
    check!(interpreter.mode() == InterpreterMode::Running);
    check!(interpreter.program_counter() == 3);

    check!(interpreter.run(&mut envs, root, 100) == Ok(Poll::Ready(Value::Integer(12))));
    check!(interpreter.mode() == InterpreterMode::Result);
}

#[test]
fn handles_do_not_cross_arenas() {
    let mut first = Environments::new();
    let foreign = first.root();
    let mut second = Environments::new();
    let root = second.root();
    check!(eval_source("(val x 1)", &mut second, root).is_ok());

    let_assert!(
        Err(Error::Runtime(RuntimeError::Environment(EnvError::Foreign { .. }))) =
            eval_source("x", &mut second, foreign)
    );
    check!(evaluate(&compile_source("(val x 2)"), &mut second, foreign).is_err());
    check!(second.lookup(root, "x") == Ok(&Value::Integer(1)));
    check!(!first.is_defined(foreign, "x"));
}
