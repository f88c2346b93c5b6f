//! PLC interpreter: executes a semantically valid AST with a simple
//! tree-walking evaluator, driving the program from its `main/0` entry
//! point.

pub mod flow;
pub mod interpreter;

pub use interpreter::Interpreter;

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use plc_environment::Value;
    use plc_lexer::Lexer;
    use plc_parser::Parser;
    use plc_syntax::ast::Source;
    use plc_syntax::error::Error;
    use std::str::FromStr;

    fn parse(input: &str) -> Source {
        let tokens = Lexer::new(input).tokenize().expect("Lexing should succeed");
        Parser::new(tokens).parse_source().expect("Parsing should succeed")
    }

    /// The full pipeline: lex, parse, analyze, interpret.
    fn run_program(input: &str) -> Result<Value, Error> {
        let source = parse(input);
        plc_analyzer::analyze(&source)?;
        Interpreter::new().run(&source)
    }

    /// Interpret without the analyzer, for behavior only observable on
    /// programs the analyzer would reject.
    fn run_unanalyzed(input: &str) -> Result<Value, Error> {
        Interpreter::new().run(&parse(input))
    }

    fn expect_int(input: &str, expected: i64) {
        match run_program(input) {
            Ok(value) => assert_eq!(value, Value::Integer(expected.into()), "Program: {}", input),
            Err(e) => panic!("Program failed: {}\nInput: {}", e, input),
        }
    }

    fn expect_error(input: &str, fragment: &str) {
        match run_program(input) {
            Ok(v) => panic!("Expected runtime error, got {:?} for: {}", v, input),
            Err(e) => assert!(
                e.msg.contains(fragment),
                "Expected '{}' in error '{}' for: {}",
                fragment,
                e.msg,
                input
            ),
        }
    }

    #[test]
    fn minimal_program_returns_zero() {
        expect_int("FUN main(): Integer DO RETURN 0; END", 0);
    }

    #[test]
    fn globals_are_readable_and_writable() {
        // a mutable global incremented from main
        expect_int(
            "VAR x: Integer = 1; FUN main(): Integer DO x = x + 2; RETURN x; END",
            3,
        );
    }

    #[test]
    fn uninitialized_globals_hold_nil() {
        // NIL is not the Integer 0
        expect_int(
            "VAR x: Integer; FUN main(): Integer DO IF x == 0 DO RETURN 1; END RETURN 0; END",
            0,
        );
    }

    #[test]
    fn immutable_globals_reject_writes() {
        expect_error(
            "VAL x: Integer = 1; FUN main(): Integer DO x = 2; RETURN x; END",
            "not mutable",
        );
    }

    #[test]
    fn string_concatenation() {
        // "a" + 1 concatenates through the display forms
        expect_int(
            "FUN main(): Integer DO LET s = \"a\" + 1; IF s == \"a1\" DO RETURN 0; END RETURN 9; END",
            0,
        );
        expect_int(
            "FUN main(): Integer DO LET s = 1 + \"a\"; IF s == \"1a\" DO RETURN 0; END RETURN 9; END",
            0,
        );
        expect_int(
            "FUN main(): Integer DO LET s = 'c' + \"s\"; IF s == \"cs\" DO RETURN 0; END RETURN 9; END",
            0,
        );
    }

    #[test]
    fn return_unwinds_out_of_nested_blocks() {
        // a RETURN inside the then block leaves the function
        expect_int("FUN main(): Integer DO IF TRUE DO RETURN 1; END END", 1);
        expect_int(
            "FUN main(): Integer DO WHILE TRUE DO IF TRUE DO RETURN 7; END END RETURN 0; END",
            7,
        );
    }

    #[test]
    fn function_body_without_return_yields_nil() {
        expect_int(
            "FUN noop() DO print(0); END \
             FUN main(): Integer DO noop(); RETURN 0; END",
            0,
        );
    }

    #[test]
    fn list_elements_can_be_read_and_written() {
        // write then read an element
        expect_int(
            "LIST xs: Integer = [1, 2, 3]; FUN main(): Integer DO xs[1] = 9; RETURN xs[1]; END",
            9,
        );
        expect_int(
            "LIST xs: Integer = [1, 2, 3]; FUN main(): Integer DO RETURN xs[0] + xs[2]; END",
            4,
        );
    }

    #[test]
    fn list_reads_are_bounds_checked() {
        expect_error(
            "LIST xs: Integer = [1, 2, 3]; FUN main(): Integer DO RETURN xs[3]; END",
            "out of range",
        );
        expect_error(
            "LIST xs: Integer = [1]; FUN main(): Integer DO xs[0 - 1] = 2; RETURN 0; END",
            "out of range",
        );
    }

    #[test]
    fn lists_compare_structurally() {
        expect_int(
            "LIST xs: Integer = [1, 2]; LIST ys: Integer = [1, 2]; LIST zs: Integer = [2, 1]; \
             FUN main(): Integer DO \
                IF xs == ys && xs != zs DO RETURN 1; END RETURN 0; \
             END",
            1,
        );
    }

    #[test]
    fn arithmetic_operations() {
        expect_int("FUN main(): Integer DO RETURN 2 + 3 * 4; END", 14);
        // subtraction really subtracts
        expect_int("FUN main(): Integer DO RETURN 5 - 3; END", 2);
        expect_int("FUN main(): Integer DO RETURN (2 + 3) * 4; END", 20);
    }

    #[test]
    fn integer_division_truncates_toward_zero() {
        expect_int("FUN main(): Integer DO RETURN 7 / 2; END", 3);
        expect_int("FUN main(): Integer DO RETURN (0 - 7) / 2; END", -3);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        expect_error("FUN main(): Integer DO RETURN 1 / 0; END", "Division by zero");
        expect_error(
            "FUN main(): Integer DO LET d = 1.0 / 0.0; RETURN 0; END",
            "Division by zero",
        );
    }

    #[test]
    fn decimal_division_rounds_half_to_even() {
        // 7.5 / 2.0 = 3.75, rounded at the left operand's scale: 3.8
        expect_int(
            "FUN main(): Integer DO LET d = 7.5 / 2.0; IF d == 3.8 DO RETURN 1; END RETURN 0; END",
            1,
        );
        // 2.5 / 2.0 = 1.25, the tie goes to the even digit: 1.2
        expect_int(
            "FUN main(): Integer DO LET d = 2.5 / 2.0; IF d == 1.2 DO RETURN 1; END RETURN 0; END",
            1,
        );
        // non-terminating quotients are rounded, not rejected
        expect_int(
            "FUN main(): Integer DO LET d = 1.0 / 3.0; IF d == 0.3 DO RETURN 1; END RETURN 0; END",
            1,
        );
    }

    #[test]
    fn exponentiation() {
        expect_int("FUN main(): Integer DO RETURN 2 ^ 8; END", 256);
        expect_int("FUN main(): Integer DO RETURN 2 ^ 0; END", 1);
        expect_int("FUN main(): Integer DO RETURN (0 - 2) ^ 3; END", -8);
        expect_int(
            "FUN main(): Integer DO LET d = 1.5 ^ 2; IF d == 2.25 DO RETURN 1; END RETURN 0; END",
            1,
        );
        expect_error(
            "FUN main(): Integer DO RETURN 2 ^ (0 - 1); END",
            "Negative exponent",
        );
    }

    #[test]
    fn comparisons() {
        expect_int(
            "FUN main(): Integer DO IF 2 <= 3 && 3 >= 3 && 1 < 2 && 2 > 1 DO RETURN 1; END RETURN 0; END",
            1,
        );
        // strings order lexically, characters by code point
        expect_int(
            "FUN main(): Integer DO IF \"apple\" < \"banana\" && 'a' < 'b' DO RETURN 1; END RETURN 0; END",
            1,
        );
        expect_int(
            "FUN main(): Integer DO IF 1.5 < 2.0 DO RETURN 1; END RETURN 0; END",
            1,
        );
    }

    #[test]
    fn equality_is_structural() {
        expect_int(
            "FUN main(): Integer DO IF 1 == 1 && 'a' != 'b' DO RETURN 1; END RETURN 0; END",
            1,
        );
    }

    #[test]
    fn short_circuit_skips_undefined_callees() {
        // the right operand would fail lookup if it were evaluated
        let result = run_unanalyzed(
            "FUN main(): Integer DO IF FALSE && missing() DO RETURN 1; END RETURN 0; END",
        );
        assert_eq!(result.unwrap(), Value::Integer(0.into()));
        let result = run_unanalyzed(
            "FUN main(): Integer DO IF TRUE || missing() DO RETURN 1; END RETURN 0; END",
        );
        assert_eq!(result.unwrap(), Value::Integer(1.into()));
        // without short-circuiting the lookup failure surfaces
        assert!(run_unanalyzed(
            "FUN main(): Integer DO IF TRUE && missing() DO RETURN 1; END RETURN 0; END"
        )
        .is_err());
    }

    #[test]
    fn conditions_must_be_booleans_at_runtime() {
        assert!(run_unanalyzed("FUN main(): Integer DO IF 1 DO RETURN 1; END RETURN 0; END")
            .unwrap_err()
            .msg
            .contains("Expected a Boolean"));
        assert!(run_unanalyzed("FUN main(): Integer DO WHILE 1 DO END RETURN 0; END")
            .unwrap_err()
            .msg
            .contains("Expected a Boolean"));
    }

    #[test]
    fn while_loops_accumulate() {
        expect_int(
            "VAR i: Integer = 0; VAR sum: Integer = 0; \
             FUN main(): Integer DO \
                WHILE i < 5 DO sum = sum + i; i = i + 1; END \
                RETURN sum; \
             END",
            10,
        );
    }

    #[test]
    fn while_iterations_get_fresh_scopes() {
        // the declaration would collide with itself if the scope were reused
        expect_int(
            "VAR i: Integer = 0; \
             FUN main(): Integer DO \
                WHILE i < 3 DO LET t = i; i = t + 1; END \
                RETURN i; \
             END",
            3,
        );
    }

    #[test]
    fn switch_runs_exactly_one_arm() {
        let program = |cond: i32| {
            format!(
                "VAR hits: Integer = 0; \
                 FUN main(): Integer DO \
                    SWITCH {} \
                    CASE 1: hits = hits + 1; \
                    CASE 2: hits = hits + 10; \
                    DEFAULT hits = hits + 100; \
                    END \
                    RETURN hits; \
                 END",
                cond
            )
        };
        assert_eq!(run_program(&program(1)).unwrap(), Value::Integer(1.into()));
        assert_eq!(run_program(&program(2)).unwrap(), Value::Integer(10.into()));
        assert_eq!(run_program(&program(9)).unwrap(), Value::Integer(100.into()));
    }

    #[test]
    fn switch_compares_by_value_equality() {
        expect_int(
            "FUN main(): Integer DO \
                SWITCH 'b' CASE 'a': RETURN 1; CASE 'b': RETURN 2; DEFAULT RETURN 0; END \
             END",
            2,
        );
    }

    #[test]
    fn functions_call_each_other_and_recurse() {
        expect_int(
            "FUN fact(n: Integer): Integer DO \
                IF n <= 1 DO RETURN 1; END \
                RETURN n * fact(n - 1); \
             END \
             FUN main(): Integer DO RETURN fact(5); END",
            120,
        );
        // forward references resolve because registration precedes main
        expect_int(
            "FUN even(n: Integer): Boolean DO IF n == 0 DO RETURN TRUE; END RETURN odd(n - 1); END \
             FUN odd(n: Integer): Boolean DO IF n == 0 DO RETURN FALSE; END RETURN even(n - 1); END \
             FUN main(): Integer DO IF even(10) DO RETURN 1; END RETURN 0; END",
            1,
        );
    }

    #[test]
    fn functions_overload_by_arity() {
        expect_int(
            "FUN pick(): Integer DO RETURN 1; END \
             FUN pick(n: Integer): Integer DO RETURN n; END \
             FUN main(): Integer DO RETURN pick() + pick(41); END",
            42,
        );
    }

    #[test]
    fn callee_locals_do_not_leak_into_the_caller() {
        // g's parameter frame hangs off the root, so f's local is invisible
        let result = run_unanalyzed(
            "FUN g(): Integer DO RETURN hidden; END \
             FUN f(): Integer DO LET hidden = 1; RETURN g(); END \
             FUN main(): Integer DO RETURN f(); END",
        );
        assert!(result.unwrap_err().msg.contains("Undefined variable 'hidden'"));
    }

    #[test]
    fn arguments_evaluate_left_to_right() {
        expect_int(
            "VAR trace: Integer = 0; \
             FUN note(n: Integer): Integer DO trace = trace * 10 + n; RETURN n; END \
             FUN pair(a: Integer, b: Integer): Integer DO RETURN trace; END \
             FUN main(): Integer DO RETURN pair(note(1), note(2)); END",
            12,
        );
    }

    #[test]
    fn logarithm_builtin() {
        expect_int(
            "FUN main(): Integer DO \
                LET l = logarithm(1.0); \
                IF l == 0.0 DO RETURN 1; END RETURN 0; \
             END",
            1,
        );
        expect_error(
            "FUN main(): Integer DO LET l = logarithm(0.0); RETURN 0; END",
            "non-positive",
        );
    }

    #[test]
    fn converter_builtin() {
        expect_int(
            "FUN main(): Integer DO \
                LET s = converter(10, 2); \
                IF s == \"1010\" DO RETURN 1; END RETURN 0; \
             END",
            1,
        );
        expect_int(
            "FUN main(): Integer DO \
                LET s = converter(0, 2); \
                IF s == \"0\" DO RETURN 1; END RETURN 0; \
             END",
            1,
        );
        expect_int(
            "FUN main(): Integer DO \
                LET s = converter(255, 8); \
                IF s == \"377\" DO RETURN 1; END RETURN 0; \
             END",
            1,
        );
    }

    #[test]
    fn scope_is_restored_after_errors() {
        let source = parse("FUN main(): Integer DO RETURN 1 / 0; END");
        let mut interpreter = Interpreter::new();
        let before = interpreter.current_scope();
        assert!(interpreter.run(&source).is_err());
        assert_eq!(interpreter.current_scope(), before);
    }

    #[test]
    fn decimal_results_keep_value_equality() {
        let result = run_program(
            "FUN main(): Integer DO LET d = 0.1 + 0.2; IF d == 0.3 DO RETURN 1; END RETURN 0; END",
        );
        // BigDecimal addition is exact, unlike binary floating point
        assert_eq!(result.unwrap(), Value::Integer(1.into()));
        assert_eq!(
            BigDecimal::from_str("0.3").unwrap(),
            BigDecimal::from_str("0.30").unwrap()
        );
    }
}
