use super::*;
use crate::builder::build_sql;
use crate::error::BuildError;
use crate::value::Value;

#[test]
fn extraction_preserves_order() {
    let (sql, args) = extract_placeholders("a = #{x.Y} AND b = #{z}");
    assert_eq!(sql, "a = ? AND b = ?");
    assert_eq!(args, vec!["x.Y".to_string(), "z".to_string()]);
}

#[test]
fn extraction_is_idempotent() {
    let (once, _) = extract_placeholders("id IN (#{a}, #{ b }) OR name = #{user.name}");
    let (twice, args) = extract_placeholders(&once);
    assert_eq!(once, twice);
    assert!(args.is_empty());
}

#[test]
fn extraction_trims_expressions_and_leaves_unterminated_markers() {
    let (sql, args) = extract_placeholders("a = #{ id } AND b = #{oops");
    assert_eq!(sql, "a = ? AND b = #{oops");
    assert_eq!(args, vec!["id".to_string()]);
}

#[test]
fn stmt_stores_extracted_form() {
    let stmt = Stmt::new("name = #{name}");
    assert_eq!(stmt.text(), "name = ?");
    assert_eq!(stmt.args(), ["name"]);
    assert!(Stmt::new("   ").is_empty());
}

#[test]
fn prepared_stmt_binds_given_expressions() {
    let stmt = Stmt::prepared("id = ? AND tenant = ?", vec!["id".into(), "tenant".into()]);
    let scope = Scope::new().bind("id", 3).bind("tenant", "acme");

    let built = build_sql(&[StatementNode::Simple(stmt)], &scope).unwrap();
    assert_eq!(built.sql, "id = ? AND tenant = ?");
    assert_eq!(built.args, vec![Value::Int(3), Value::from("acme")]);

    let leftover = Stmt::prepared("id = #{id}", vec![]);
    assert!(matches!(
        build_sql(&[StatementNode::Simple(leftover)], &scope),
        Err(BuildError::UnresolvedPlaceholder(_))
    ));
}

#[test]
fn resolve_template_splices_values() {
    let scope = Scope::new().bind("id", 12).bind("user", {
        let mut m = std::collections::BTreeMap::new();
        m.insert("name".to_string(), Value::from("ann"));
        m
    });
    assert_eq!(resolve_template("user:id:#{id}", &scope).unwrap(), "user:id:12");
    assert_eq!(
        resolve_template("user:#{ user.name }:#{id}", &scope).unwrap(),
        "user:ann:12"
    );
    assert_eq!(resolve_template("plain", &scope).unwrap(), "plain");
}

#[test]
fn resolve_template_rejects_unknown_arguments() {
    let scope = Scope::new().bind("id", 12);
    assert_eq!(
        resolve_template("user:#{uid}", &scope).unwrap_err(),
        BuildError::UnresolvedArgument("uid".into())
    );
}

#[test]
fn guards_evaluate_against_scope() {
    let scope = Scope::new()
        .bind("name", "ann")
        .bind("empty", "")
        .bind("nothing", Value::Null);

    assert!(Guard::truthy("name").eval(&scope));
    assert!(!Guard::truthy("empty").eval(&scope));
    assert!(Guard::present("empty").eval(&scope));
    assert!(!Guard::present("nothing").eval(&scope));
    assert!(!Guard::present("missing").eval(&scope));
    assert!((!Guard::present("missing")).eval(&scope));
    assert!(Guard::All(vec![Guard::truthy("name"), Guard::Const(true)]).eval(&scope));
    assert!(Guard::Any(vec![Guard::truthy("empty"), Guard::present("name")]).eval(&scope));
}

#[test]
fn choose_is_first_match() {
    let choose = Choose::new()
        .when(false, "a = #{a}")
        .when(true, "b = #{b}")
        .when(true, "c = #{c}")
        .otherwise("1 = 1");
    let picked = choose.select(&Scope::new()).unwrap();
    assert_eq!(picked.text(), "b = ?");
}

#[test]
fn choose_falls_back_to_otherwise_or_nothing() {
    let scope = Scope::new();
    let with_default = Choose::new().when(false, "a = 1").otherwise("b = 2");
    assert_eq!(with_default.select(&scope).unwrap().text(), "b = 2");

    let without = Choose::new().when(false, "a = 1");
    assert!(without.select(&scope).is_none());

    let empty_default = Choose::new().when(false, "a = 1").otherwise("");
    assert!(empty_default.select(&scope).is_none());
}

#[test]
fn if_chain_selects_every_true_branch() {
    let chain = BranchCond::IfChain(vec![
        IfStmt::new(true, "a = 1"),
        IfStmt::new(false, "b = 2"),
        IfStmt::new(true, "c = 3"),
    ]);
    let texts: Vec<&str> = chain.select(&Scope::new()).iter().map(|s| s.text()).collect();
    assert_eq!(texts, vec!["a = 1", "c = 3"]);
}
