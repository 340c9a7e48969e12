mod parser_tests {
    use rlox::ast::{Expr, Stmt};
    use rlox::ast_printer::AstPrinter;
    use rlox::error::{Diagnostics, LoxError};
    use rlox::parser::Parser;
    use rlox::scanner;
    use rlox::token::Token;

    /// Parse `source` as a single expression and render it in prefix form.
    fn printed(source: &str) -> String {
        let mut diags = Diagnostics::new();
        let tokens: Vec<Token> = scanner::scan(source.as_bytes(), &mut diags);

        assert!(!diags.had_error(), "lexical errors in fixture");

        let expr = Parser::new(&tokens)
            .parse_expression()
            .expect("fixture should parse");

        AstPrinter::print(&expr)
    }

    /// Parse `source` as a program, returning the statements and the
    /// collected diagnostics.
    fn parse_program(source: &str) -> (Vec<String>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let tokens: Vec<Token> = scanner::scan(source.as_bytes(), &mut diags);

        let statements = Parser::new(&tokens).parse(&mut diags);

        // Statements only survive this function as debug strings; tests on
        // tree shape parse inline instead.
        let shapes: Vec<String> = statements.iter().map(|s| format!("{:?}", s)).collect();

        (shapes, diags)
    }

    #[test]
    fn factor_binds_tighter_than_term() {
        assert_eq!(printed("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
    }

    #[test]
    fn comparison_binds_looser_than_term() {
        assert_eq!(printed("1 + 2 < 3 - 4"), "(< (+ 1.0 2.0) (- 3.0 4.0))");
    }

    #[test]
    fn equality_is_lowest_binary_level() {
        assert_eq!(printed("1 < 2 == true"), "(== (< 1.0 2.0) true)");
    }

    #[test]
    fn binary_operators_fold_left() {
        assert_eq!(printed("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
    }

    #[test]
    fn unary_is_right_associative() {
        assert_eq!(printed("!!true"), "(! (! true))");
        assert_eq!(printed("-1 - 2"), "(- (- 1.0) 2.0)");
    }

    #[test]
    fn grouping_overrides_precedence() {
        assert_eq!(printed("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
    }

    #[test]
    fn logical_or_is_looser_than_and() {
        assert_eq!(printed("a or b and c"), "(or a (and b c))");
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(printed("a = b = 1"), "(= a (= b 1.0))");
    }

    #[test]
    fn call_and_property_suffixes_chain_left_to_right() {
        assert_eq!(printed("a.b(c).d"), "(. (call (. a b) c) d)");
        assert_eq!(printed("f()()"), "(call (call f))");
    }

    #[test]
    fn property_assignment_parses_as_set() {
        assert_eq!(printed("o.x = 1"), "(.= o x 1.0)");
    }

    #[test]
    fn super_access_parses() {
        assert_eq!(printed("super.cook"), "(super cook)");
    }

    #[test]
    fn invalid_assignment_target_is_a_parse_error() {
        let (_, diags) = parse_program("1 = 2;");

        assert_eq!(diags.len(), 1);

        let err = diags.iter().next().unwrap();
        assert!(err.to_string().contains("Invalid assignment target"));
        assert!(matches!(err, LoxError::Parse { line: 1, .. }));
    }

    #[test]
    fn recovery_surfaces_multiple_errors_with_correct_lines() {
        let source = "var = 1;\nprint 2;\nvar = 3;";
        let (shapes, diags) = parse_program(source);

        // Both bad declarations are reported in one pass, and the good
        // statement in between still parses.
        assert_eq!(diags.len(), 2);

        let lines: Vec<usize> = diags
            .iter()
            .map(|err| match err {
                LoxError::Parse { line, .. } => *line,
                other => panic!("expected parse error, got {}", other),
            })
            .collect();

        assert_eq!(lines, vec![1, 3]);
        assert_eq!(shapes.len(), 1);
        assert!(shapes[0].starts_with("Print"));
    }

    #[test]
    fn parameter_list_is_capped_at_255() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        let (_, diags) = parse_program(&source);

        assert_eq!(diags.len(), 1);

        let err = diags.iter().next().unwrap();
        assert!(matches!(err, LoxError::Parse { .. }));
        assert!(err.to_string().contains("255"), "message: {}", err);
    }

    #[test]
    fn argument_list_is_capped_at_255() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let (_, diags) = parse_program(&source);

        assert_eq!(diags.len(), 1);

        let err = diags.iter().next().unwrap();
        assert!(matches!(err, LoxError::Parse { .. }));
        assert!(err.to_string().contains("255"), "message: {}", err);
    }

    #[test]
    fn missing_semicolon_is_reported() {
        let (_, diags) = parse_program("print 1");

        assert_eq!(diags.len(), 1);
        assert!(diags
            .iter()
            .next()
            .unwrap()
            .to_string()
            .contains("Expected ';'"));
    }

    #[test]
    fn for_desugars_to_while_in_a_block() {
        let mut diags = Diagnostics::new();
        let tokens = scanner::scan(
            b"for (var i = 0; i < 3; i = i + 1) print i;",
            &mut diags,
        );
        let statements = Parser::new(&tokens).parse(&mut diags);

        assert!(!diags.had_error());
        assert_eq!(statements.len(), 1);

        // { var i = 0; while (i < 3) { print i; i = i + 1; } }
        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected desugared block, got {:?}", statements[0]);
        };

        assert_eq!(outer.len(), 2);
        assert!(matches!(outer[0], Stmt::Var { .. }));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while loop, got {:?}", outer[1]);
        };

        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected loop body block, got {:?}", body);
        };

        assert!(matches!(inner[0], Stmt::Print(_)));
        assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn for_without_clauses_gets_a_true_condition() {
        let mut diags = Diagnostics::new();
        let tokens = scanner::scan(b"for (;;) print 1;", &mut diags);
        let statements = Parser::new(&tokens).parse(&mut diags);

        assert!(!diags.had_error());

        // No initializer and no increment: the while is the whole statement.
        let Stmt::While { condition, body } = &statements[0] else {
            panic!("expected bare while, got {:?}", statements[0]);
        };

        assert_eq!(AstPrinter::print(condition), "true");
        assert!(matches!(body.as_ref(), Stmt::Print(_)));
    }

    #[test]
    fn class_declaration_with_superclass_and_methods() {
        let mut diags = Diagnostics::new();
        let tokens = scanner::scan(
            b"class B < A { one() { return 1; } two() { return 2; } }",
            &mut diags,
        );
        let statements = Parser::new(&tokens).parse(&mut diags);

        assert!(!diags.had_error());

        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &statements[0]
        else {
            panic!("expected class declaration, got {:?}", statements[0]);
        };

        assert_eq!(name.lexeme, "B");
        assert_eq!(superclass.map(|t| t.lexeme), Some("A"));
        assert_eq!(methods.len(), 2);
        assert!(matches!(methods[0], Stmt::Function { .. }));
    }

    #[test]
    fn function_declaration_parses_params_and_body() {
        let mut diags = Diagnostics::new();
        let tokens = scanner::scan(b"fun add(a, b) { return a + b; }", &mut diags);
        let statements = Parser::new(&tokens).parse(&mut diags);

        assert!(!diags.had_error());

        let Stmt::Function { name, params, body } = &statements[0] else {
            panic!("expected function declaration, got {:?}", statements[0]);
        };

        assert_eq!(name.lexeme, "add");
        assert_eq!(params.len(), 2);
        assert_eq!(body.len(), 1);
        assert!(matches!(body[0], Stmt::Return { .. }));
    }
}
