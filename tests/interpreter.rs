mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use rlox::error::{Diagnostics, LoxError};
    use rlox::interpreter::Interpreter;
    use rlox::parser::Parser;
    use rlox::resolver::Resolver;
    use rlox::scanner;
    use rlox::value::Value;

    /// Capture sink for `print` output.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run a program end to end, returning its printed output and the
    /// interpreter's result. Panics on static errors — fixtures for those
    /// use [`static_errors`] instead.
    fn run(source: &str) -> (String, Result<(), LoxError>) {
        let mut diags = Diagnostics::new();
        let tokens = scanner::scan(source.as_bytes(), &mut diags);
        let statements = Parser::new(&tokens).parse(&mut diags);

        Resolver::new().check(&statements, &mut diags);

        assert!(
            !diags.had_error(),
            "static errors in fixture: {:?}",
            diags.iter().map(|e| e.to_string()).collect::<Vec<_>>()
        );

        let sink = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(sink.clone()));
        let result = interpreter.interpret(&statements);

        let output = String::from_utf8(sink.0.borrow().clone()).unwrap();

        (output, result)
    }

    /// Output of a program expected to succeed.
    fn output(source: &str) -> String {
        let (out, result) = run(source);

        assert!(result.is_ok(), "runtime error: {:?}", result);

        out
    }

    /// Runtime error message of a program expected to fail.
    fn runtime_error(source: &str) -> String {
        let (_, result) = run(source);

        match result {
            Err(err @ LoxError::Runtime { .. }) => err.to_string(),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    /// Static diagnostics of a program that must not reach execution.
    fn static_errors(source: &str) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let tokens = scanner::scan(source.as_bytes(), &mut diags);
        let statements = Parser::new(&tokens).parse(&mut diags);

        Resolver::new().check(&statements, &mut diags);

        diags
    }

    // ───────────────────── expressions & operators ─────────────────────

    #[test]
    fn arithmetic_follows_precedence() {
        assert_eq!(output("print 1 + 2 * 3;"), "7\n");
        assert_eq!(output("print (1 + 2) * 3;"), "9\n");
        assert_eq!(output("print 10 - 4 / 2;"), "8\n");
    }

    #[test]
    fn numbers_print_without_trailing_fraction() {
        assert_eq!(output("print 3.0;"), "3\n");
        assert_eq!(output("print 2.5;"), "2.5\n");
        assert_eq!(output("print -0.5 + 1;"), "0.5\n");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(output("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn mixed_plus_is_a_type_error() {
        let msg = runtime_error("print \"foo\" + 1;");

        assert!(msg.contains("'+'"), "message should name the operator: {}", msg);
    }

    #[test]
    fn comparison_requires_numbers() {
        assert_eq!(output("print 1 < 2;"), "true\n");
        assert_eq!(output("print 2 <= 2;"), "true\n");

        let msg = runtime_error("print \"a\" < \"b\";");
        assert!(msg.contains("'<'"));
    }

    #[test]
    fn unary_minus_requires_a_number() {
        assert_eq!(output("print -(3);"), "-3\n");

        let msg = runtime_error("print -\"three\";");
        assert!(msg.contains("'-'"));
    }

    #[test]
    fn equality_never_raises_and_crosses_variants_as_unequal() {
        assert_eq!(output("print 1 == 1;"), "true\n");
        assert_eq!(output("print 1 == \"1\";"), "false\n");
        assert_eq!(output("print nil == nil;"), "true\n");
        assert_eq!(output("print nil == false;"), "false\n");
        assert_eq!(output("print \"a\" != \"b\";"), "true\n");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error_not_a_crash() {
        let msg = runtime_error("print 1 / 0;");

        assert!(msg.contains("Division by zero"));
    }

    #[test]
    fn truthiness_only_nil_and_false_are_falsy() {
        // 0 and "" are truthy.
        assert_eq!(output("if (0) print \"a\"; else print \"b\";"), "a\n");
        assert_eq!(output("if (\"\") print \"a\"; else print \"b\";"), "a\n");
        assert_eq!(output("if (nil) print \"a\"; else print \"b\";"), "b\n");
        assert_eq!(output("if (false) print \"a\"; else print \"b\";"), "b\n");
    }

    #[test]
    fn logicals_return_the_deciding_operand() {
        assert_eq!(output("print \"hi\" or 2;"), "hi\n");
        assert_eq!(output("print nil or \"yes\";"), "yes\n");
        assert_eq!(output("print nil and 1;"), "nil\n");
        assert_eq!(output("print 1 and 2;"), "2\n");
    }

    #[test]
    fn logicals_short_circuit_side_effects() {
        let src = "\
            var n = 0;\n\
            fun bump() { n = n + 1; return true; }\n\
            false and bump();\n\
            true or bump();\n\
            print n;";

        assert_eq!(output(src), "0\n");
    }

    // ─────────────────────── variables & scoping ───────────────────────

    #[test]
    fn var_without_initializer_is_nil() {
        assert_eq!(output("var a; print a;"), "nil\n");
    }

    #[test]
    fn assignment_is_an_expression_yielding_the_value() {
        assert_eq!(output("var a = 1; print a = 2;"), "2\n");
    }

    #[test]
    fn assignment_to_undeclared_name_is_an_error() {
        let msg = runtime_error("missing = 1;");

        assert!(msg.contains("Undefined variable 'missing'"));
    }

    #[test]
    fn reading_an_undefined_variable_is_an_error() {
        let msg = runtime_error("print missing;");

        assert!(msg.contains("Undefined variable 'missing'"));
    }

    #[test]
    fn inner_blocks_shadow_without_overwriting() {
        let src = "\
            var a = \"outer\";\n\
            {\n\
              var a = \"inner\";\n\
              print a;\n\
            }\n\
            print a;";

        assert_eq!(output(src), "inner\nouter\n");
    }

    #[test]
    fn block_locals_do_not_leak() {
        let msg = runtime_error("{ var hidden = 1; } print hidden;");

        assert!(msg.contains("Undefined variable 'hidden'"));
    }

    #[test]
    fn assignment_in_inner_scope_mutates_outer_binding() {
        assert_eq!(output("var a = 1; { a = 2; } print a;"), "2\n");
    }

    // ────────────────────────── control flow ───────────────────────────

    #[test]
    fn while_loop_runs_until_condition_falsifies() {
        let src = "var i = 0; while (i < 3) { print i; i = i + 1; }";

        assert_eq!(output(src), "0\n1\n2\n");
    }

    #[test]
    fn for_loop_desugar_executes_correctly() {
        let src = "for (var i = 0; i < 3; i = i + 1) print i;";

        assert_eq!(output(src), "0\n1\n2\n");
    }

    #[test]
    fn for_initializer_scope_ends_with_the_loop() {
        let msg = runtime_error("for (var i = 0; i < 1; i = i + 1) {} print i;");

        assert!(msg.contains("Undefined variable 'i'"));
    }

    // ──────────────────── functions, returns, closures ─────────────────

    #[test]
    fn function_call_and_return_value() {
        let src = "fun add(a, b) { return a + b; } print add(1, 2);";

        assert_eq!(output(src), "3\n");
    }

    #[test]
    fn function_without_return_yields_nil() {
        assert_eq!(output("fun noop() {} print noop();"), "nil\n");
    }

    #[test]
    fn return_unwinds_through_loops_to_the_call_boundary() {
        let src = "\
            fun firstOverTen() {\n\
              var i = 0;\n\
              while (true) {\n\
                if (i > 10) return i;\n\
                i = i + 1;\n\
              }\n\
            }\n\
            print firstOverTen();";

        assert_eq!(output(src), "11\n");
    }

    #[test]
    fn arity_mismatch_is_a_runtime_error() {
        let msg = runtime_error("fun f(a) {} f(1, 2);");

        assert!(msg.contains("Expected 1 arguments but got 2"));
    }

    #[test]
    fn calling_a_non_callable_is_an_error() {
        let msg = runtime_error("\"not a function\"();");

        assert!(msg.contains("Can only call functions and classes"));
    }

    #[test]
    fn closures_capture_the_defining_environment() {
        let src = "\
            fun makeCounter() {\n\
              var i = 0;\n\
              fun inc() { i = i + 1; return i; }\n\
              return inc;\n\
            }\n\
            var c = makeCounter();\n\
            print c();\n\
            print c();";

        assert_eq!(output(src), "1\n2\n");
    }

    #[test]
    fn independent_counters_have_independent_state() {
        let src = "\
            fun makeCounter() {\n\
              var i = 0;\n\
              fun inc() { i = i + 1; return i; }\n\
              return inc;\n\
            }\n\
            var a = makeCounter();\n\
            var b = makeCounter();\n\
            print a();\n\
            print a();\n\
            print b();";

        assert_eq!(output(src), "1\n2\n1\n");
    }

    #[test]
    fn closure_sees_the_lexical_scope_not_the_call_site() {
        let src = "\
            var greeting = \"global\";\n\
            fun show() { print greeting; }\n\
            {\n\
              var greeting = \"local\";\n\
              show();\n\
            }";

        assert_eq!(output(src), "global\n");
    }

    #[test]
    fn return_at_top_level_is_a_static_error() {
        let diags = static_errors("return 1;");

        assert_eq!(diags.len(), 1);
        assert!(diags
            .iter()
            .next()
            .unwrap()
            .to_string()
            .contains("Cannot return from top-level code"));
    }

    // ─────────────────────── classes & instances ───────────────────────

    #[test]
    fn class_values_and_instances_print_by_name() {
        assert_eq!(output("class Cake {} print Cake;"), "Cake\n");
        assert_eq!(output("class Cake {} print Cake();"), "Cake instance\n");
    }

    #[test]
    fn fields_are_per_instance_and_mutable() {
        let src = "\
            class Box {}\n\
            var a = Box();\n\
            var b = Box();\n\
            a.contents = \"coins\";\n\
            b.contents = \"dust\";\n\
            print a.contents;\n\
            print b.contents;";

        assert_eq!(output(src), "coins\ndust\n");
    }

    #[test]
    fn methods_bind_this_to_the_receiver() {
        let src = "\
            class Cake {\n\
              taste() { print \"The \" + this.flavor + \" cake is delicious!\"; }\n\
            }\n\
            var cake = Cake();\n\
            cake.flavor = \"chocolate\";\n\
            cake.taste();";

        assert_eq!(output(src), "The chocolate cake is delicious!\n");
    }

    #[test]
    fn bound_methods_remember_their_receiver() {
        let src = "\
            class Speaker {\n\
              speak() { print this.word; }\n\
            }\n\
            var s = Speaker();\n\
            s.word = \"hello\";\n\
            var m = s.speak;\n\
            m();";

        assert_eq!(output(src), "hello\n");
    }

    #[test]
    fn fields_shadow_methods_of_the_same_name() {
        let src = "\
            class C {\n\
              label() { return \"method\"; }\n\
            }\n\
            var c = C();\n\
            c.label = \"field\";\n\
            print c.label;";

        assert_eq!(output(src), "field\n");
    }

    #[test]
    fn init_constructs_the_instance() {
        let src = "\
            class Point {\n\
              init(x, y) { this.x = x; this.y = y; }\n\
            }\n\
            var p = Point(1, 2);\n\
            print p.x + p.y;";

        assert_eq!(output(src), "3\n");
    }

    #[test]
    fn bare_return_in_init_yields_the_receiver() {
        // The bare `return` cuts the body short, and calling `init`
        // explicitly evaluates to the same instance.
        let src = "\
            class C {\n\
              init() { this.x = 1; return; this.x = 2; }\n\
            }\n\
            var c = C();\n\
            print c.x;\n\
            print c.init() == c;";

        assert_eq!(output(src), "1\ntrue\n");
    }

    #[test]
    fn constructor_arity_is_checked() {
        let msg = runtime_error("class Point { init(x, y) {} } Point(1);");

        assert!(msg.contains("Expected 2 arguments but got 1"));
    }

    #[test]
    fn undefined_property_is_a_runtime_error() {
        let msg = runtime_error("class C {} print C().missing;");

        assert!(msg.contains("Undefined property 'missing'"));
    }

    #[test]
    fn property_access_on_non_instance_is_an_error() {
        let msg = runtime_error("print 1.foo;");

        assert!(msg.contains("Only instances have properties"));
    }

    #[test]
    fn inherited_methods_resolve_up_the_chain() {
        let src = "\
            class A { greet() { return \"A\"; } }\n\
            class B < A {}\n\
            print B().greet();";

        assert_eq!(output(src), "A\n");
    }

    #[test]
    fn super_calls_the_superclass_method_on_the_receiver() {
        let src = "\
            class A { greet() { return \"A\"; } }\n\
            class B < A { greet() { return super.greet() + \"B\"; } }\n\
            print B().greet();";

        assert_eq!(output(src), "AB\n");
    }

    #[test]
    fn super_resolves_from_the_defining_class_not_the_runtime_class() {
        // C inherits B's test(); super inside it must still start above A's
        // subclass B, calling A's method, not loop on B's.
        let src = "\
            class A { method() { print \"A method\"; } }\n\
            class B < A {\n\
              method() { print \"B method\"; }\n\
              test() { super.method(); }\n\
            }\n\
            class C < B {}\n\
            C().test();";

        assert_eq!(output(src), "A method\n");
    }

    #[test]
    fn superclass_must_be_a_class_value() {
        let msg = runtime_error("var NotAClass = \"so not\"; class Sub < NotAClass {}");

        assert!(msg.contains("Superclass must be a class"));
    }

    #[test]
    fn super_outside_a_subclass_is_a_static_error() {
        let diags = static_errors("class A { m() { super.m(); } }");

        assert_eq!(diags.len(), 1);
        assert!(diags
            .iter()
            .next()
            .unwrap()
            .to_string()
            .contains("'super' in a class with no superclass"));
    }

    #[test]
    fn this_outside_a_class_is_a_static_error() {
        let diags = static_errors("print this;");

        assert_eq!(diags.len(), 1);
        assert!(diags
            .iter()
            .next()
            .unwrap()
            .to_string()
            .contains("'this' outside of a class"));
    }

    #[test]
    fn returning_a_value_from_init_is_a_static_error() {
        let diags = static_errors("class C { init() { return 1; } }");

        assert_eq!(diags.len(), 1);
        assert!(diags
            .iter()
            .next()
            .unwrap()
            .to_string()
            .contains("Cannot return a value from an initializer"));
    }

    // ───────────────────── failure-semantics details ────────────────────

    #[test]
    fn output_before_a_runtime_error_is_kept() {
        let (out, result) = run("print \"before\"; print missing;");

        assert_eq!(out, "before\n");
        assert!(result.is_err());
    }

    #[test]
    fn runtime_errors_carry_the_source_line() {
        let (_, result) = run("var a = 1;\nprint a + \"s\";");

        match result {
            Err(LoxError::Runtime { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn return_escaping_to_the_top_level_reports_its_line() {
        // Run without the validity pass, as an embedding host might.
        let mut diags = Diagnostics::new();
        let tokens = scanner::scan(b"print 1;\nreturn 2;", &mut diags);
        let statements = Parser::new(&tokens).parse(&mut diags);

        assert!(!diags.had_error());

        let sink = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(sink.clone()));

        match interpreter.interpret(&statements) {
            Err(LoxError::Runtime { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn hosts_can_predefine_global_bindings() {
        let mut diags = Diagnostics::new();
        let tokens = scanner::scan(b"print answer;", &mut diags);
        let statements = Parser::new(&tokens).parse(&mut diags);

        assert!(!diags.had_error());

        let sink = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(sink.clone()));

        interpreter
            .globals()
            .borrow_mut()
            .define("answer", Value::Number(42.0));

        interpreter.interpret(&statements).unwrap();

        assert_eq!(String::from_utf8(sink.0.borrow().clone()).unwrap(), "42\n");
    }
}
