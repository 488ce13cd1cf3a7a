//! Structural statement recognition
//!
//! Parses a bundle with swc and tags each top-level statement with the role
//! it plays in a module bundle: runtime bootstrap, module definition, trailing
//! invocation, empty, or anything else.

mod patterns;
mod range;
mod script;

use swc_core::common::Spanned;
use swc_core::ecma::ast::{BlockStmtOrExpr, CallExpr, Callee, Expr, Lit, Pat, Stmt, UnaryOp};
use swc_core::ecma::visit::VisitWith;
use tracing::debug;

pub use patterns::{
    find_dev_guard, find_invocations, find_object_literal, Invocation, LiteralValue,
    ObjectLiteral,
};
pub use range::ByteRange;
pub use script::ParseError;

use patterns::{numeric_invocation, InvocationCollector, ObjectArgFinder};
use script::{parse_script, SpanMap};

/// Callee name of a module-definition statement
pub const DEFINE_CALLEE: &str = "__d";

/// Callee names accepted for numeric module invocations
pub const REQUIRE_CALLEES: &[&str] = &["require", "__r"];

/// Callee whose object argument describes an asset
pub const ASSET_REGISTRATION: &str = "registerAsset";

/// A top-level statement of the bundle
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Full statement text, trailing semicolon included
    pub range: ByteRange,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// Runtime bootstrap code (polyfills, require implementation)
    Bootstrap,
    /// `__d(...)` module definition
    Definition(Definition),
    /// `require(<id>)` statement that starts a module
    Invocation(Invocation),
    Empty,
    /// Anything else, including text the parser rejected
    Other,
}

/// What a definition call carries
///
/// Ranges are absolute offsets into the recognized source.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    /// Positional arguments of the call
    pub args: Vec<ArgNode>,
    /// Numeric invocations inside the factory, in source order
    pub invocations: Vec<Invocation>,
    /// Object passed to the asset registration call inside the factory
    pub asset_literal: Option<ObjectLiteral>,
}

/// A typed positional argument of a definition call
#[derive(Debug, Clone, PartialEq)]
pub enum ArgNode {
    Function {
        params: Vec<String>,
        /// The function body, braces included
        body: ByteRange,
        range: ByteRange,
    },
    Number {
        raw: String,
        range: ByteRange,
    },
    Str {
        value: String,
        range: ByteRange,
    },
    Array {
        elements: Vec<ArgNode>,
        range: ByteRange,
    },
    Null(ByteRange),
    Other(ByteRange),
}

impl ArgNode {
    pub fn range(&self) -> ByteRange {
        match self {
            ArgNode::Function { range, .. }
            | ArgNode::Number { range, .. }
            | ArgNode::Str { range, .. }
            | ArgNode::Array { range, .. } => *range,
            ArgNode::Null(range) | ArgNode::Other(range) => *range,
        }
    }

    /// Short description used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            ArgNode::Function { .. } => "function",
            ArgNode::Number { .. } => "number",
            ArgNode::Str { .. } => "string",
            ArgNode::Array { .. } => "array",
            ArgNode::Null(_) => "null",
            ArgNode::Other(_) => "expression",
        }
    }
}

/// Turns bundle text into typed top-level statements
pub trait StatementRecognizer: Send + Sync {
    fn recognize(&self, source: &str) -> Result<Vec<Statement>, ParseError>;
}

/// Default recognizer built on the swc script parser
///
/// Text the parser rejects does not stop recognition: the first line that
/// cannot be parsed is reported as a [`StatementKind::Other`] statement and
/// parsing resumes on the line after it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptRecognizer;

impl StatementRecognizer for ScriptRecognizer {
    fn recognize(&self, source: &str) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        let mut start = 0;

        while start < source.len() {
            let err = match parse_script(&source[start..], start) {
                Ok(parsed) => {
                    statements.extend(classify_all(source, &parsed.script.body, parsed.spans));
                    break;
                }
                Err(err) => err,
            };

            // longest run of whole lines before the error that still parses
            let at = err.range.start.clamp(start, source.len());
            let mut cut = line_start(source, at, start);
            let prefix = loop {
                match parse_script(&source[start..cut], start) {
                    Ok(parsed) => break parsed,
                    Err(_) => cut = line_start(source, cut.saturating_sub(1), start),
                }
            };
            statements.extend(classify_all(source, &prefix.script.body, prefix.spans));

            // only the first rejected line is dropped, the rest is retried
            let bad_end = line_end(source, cut);
            let bad = trim_range(source, ByteRange::new(cut, bad_end));
            if !bad.is_empty() {
                debug!("Cannot parse {}: {}", bad, err.message);
                statements.push(Statement {
                    range: bad,
                    kind: StatementKind::Other,
                });
            }
            start = bad_end.max(start + 1);
            while !source.is_char_boundary(start) {
                start += 1;
            }
        }

        Ok(statements)
    }
}

/// Offset of the line holding `pos`, never before `floor`
fn line_start(source: &str, pos: usize, floor: usize) -> usize {
    source[..pos]
        .rfind('\n')
        .map_or(0, |newline| newline + 1)
        .max(floor)
}

/// Offset just past the line break ending the line that holds `pos`
fn line_end(source: &str, pos: usize) -> usize {
    source[pos..]
        .find('\n')
        .map_or(source.len(), |newline| pos + newline + 1)
}

fn trim_range(source: &str, range: ByteRange) -> ByteRange {
    let text = range.slice(source);
    let start = range.start + (text.len() - text.trim_start().len());
    let end = range.end - (text.len() - text.trim_end().len());
    ByteRange::new(start, end.max(start))
}

fn classify_all(source: &str, body: &[Stmt], spans: SpanMap) -> Vec<Statement> {
    body.iter()
        .map(|stmt| Statement {
            range: spans.range(stmt.span()),
            kind: classify(stmt, source, spans),
        })
        .collect()
}

fn classify(stmt: &Stmt, source: &str, spans: SpanMap) -> StatementKind {
    let expr = match stmt {
        Stmt::Empty(_) => return StatementKind::Empty,
        Stmt::Expr(expr_stmt) => &*expr_stmt.expr,
        _ => return StatementKind::Other,
    };

    if let Expr::Call(call) = expr {
        if callee_name(call) == Some(DEFINE_CALLEE) {
            return StatementKind::Definition(definition(call, source, spans));
        }
        if call.args.len() == 1 {
            if let Some(invocation) = numeric_invocation(call, spans) {
                return StatementKind::Invocation(invocation);
            }
        }
    }

    if is_iife(expr) {
        StatementKind::Bootstrap
    } else {
        StatementKind::Other
    }
}

fn callee_name(call: &CallExpr) -> Option<&str> {
    match &call.callee {
        Callee::Expr(callee) => match &**callee {
            Expr::Ident(ident) => Some(&*ident.sym),
            _ => None,
        },
        _ => None,
    }
}

/// `(function(..){..})(..)`, `(function(..){..}(..))` or the minified `!function(..){..}(..)`
fn is_iife(expr: &Expr) -> bool {
    match expr {
        Expr::Paren(paren) => is_iife(&paren.expr),
        Expr::Unary(unary) if unary.op == UnaryOp::Bang => is_iife(&unary.arg),
        Expr::Call(call) => matches!(&call.callee, Callee::Expr(callee) if is_function(callee)),
        _ => false,
    }
}

fn is_function(expr: &Expr) -> bool {
    match expr {
        Expr::Paren(paren) => is_function(&paren.expr),
        Expr::Fn(_) | Expr::Arrow(_) => true,
        _ => false,
    }
}

fn definition(call: &CallExpr, source: &str, spans: SpanMap) -> Definition {
    let args = call
        .args
        .iter()
        .map(|arg| match arg.spread {
            Some(_) => ArgNode::Other(spans.range(arg.span())),
            None => arg_node(&arg.expr, source, spans),
        })
        .collect();

    let mut invocations = InvocationCollector::new(spans);
    let mut assets = ObjectArgFinder::new(ASSET_REGISTRATION, source, spans);
    if let Some(factory) = call.args.first() {
        factory.expr.visit_with(&mut invocations);
        factory.expr.visit_with(&mut assets);
    }

    Definition {
        args,
        invocations: invocations.found,
        asset_literal: assets.finish(),
    }
}

fn arg_node(expr: &Expr, source: &str, spans: SpanMap) -> ArgNode {
    let range = spans.range(expr.span());
    match expr {
        Expr::Fn(function) => match &function.function.body {
            Some(body) => ArgNode::Function {
                params: function
                    .function
                    .params
                    .iter()
                    .filter_map(|param| binding_name(&param.pat))
                    .collect(),
                body: spans.range(body.span),
                range,
            },
            None => ArgNode::Other(range),
        },
        Expr::Arrow(arrow) => ArgNode::Function {
            params: arrow.params.iter().filter_map(binding_name).collect(),
            body: match &*arrow.body {
                BlockStmtOrExpr::BlockStmt(block) => spans.range(block.span),
                BlockStmtOrExpr::Expr(body) => spans.range(body.span()),
            },
            range,
        },
        Expr::Lit(Lit::Num(_)) => ArgNode::Number {
            raw: range.slice(source).to_string(),
            range,
        },
        Expr::Lit(Lit::Str(s)) => ArgNode::Str {
            value: s.value.to_string(),
            range,
        },
        Expr::Lit(Lit::Null(_)) => ArgNode::Null(range),
        Expr::Array(array) => ArgNode::Array {
            elements: array
                .elems
                .iter()
                .flatten()
                .map(|element| arg_node(&element.expr, source, spans))
                .collect(),
            range,
        },
        _ => ArgNode::Other(range),
    }
}

fn binding_name(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(binding) => Some(binding.id.sym.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<&'static str> {
        ScriptRecognizer
            .recognize(src)
            .unwrap()
            .iter()
            .map(|s| match s.kind {
                StatementKind::Bootstrap => "bootstrap",
                StatementKind::Definition(_) => "definition",
                StatementKind::Invocation(_) => "invocation",
                StatementKind::Empty => "empty",
                StatementKind::Other => "other",
            })
            .collect()
    }

    fn definition_of(statement: &Statement) -> &Definition {
        match &statement.kind {
            StatementKind::Definition(definition) => definition,
            other => panic!("expected definition, found {other:?}"),
        }
    }

    #[test]
    fn test_classifies_bundle_statements() {
        let src = r#"(function(global) { global.__DEV__ = true; })(typeof global !== 'undefined' ? global : this);
!function(e){e.x=1}(this);
__d(function(global, require, module, exports) { require(2); }, 1, null, "a.js");
;
var stray = 1;
require(1);"#;
        assert_eq!(
            kinds(src),
            vec!["bootstrap", "bootstrap", "definition", "empty", "other", "invocation"]
        );
    }

    #[test]
    fn test_statement_ranges_include_semicolon() {
        let src = "  require(0);\nrequire(1)";
        let statements = ScriptRecognizer.recognize(src).unwrap();
        assert_eq!(statements[0].range.slice(src), "require(0);");
        assert_eq!(statements[1].range.slice(src), "require(1)");
        assert_eq!(
            statements[1].kind,
            StatementKind::Invocation(Invocation {
                target: 1,
                range: ByteRange::new(14, 24)
            })
        );
    }

    #[test]
    fn test_newline_splits_unterminated_statements() {
        let src = "__d(function(){}, 0, null, \"a\")\n__d(function(){}, 1, null, \"b\")";
        assert_eq!(kinds(src), vec!["definition", "definition"]);
    }

    #[test]
    fn test_unterminated_invocation_before_bootstrap() {
        let src = "__d(function(){}, 1, null, \"react-native-implementation\")\n\
                   require(1)\n\
                   !function(e){e.x=1}(this)";
        assert_eq!(kinds(src), vec!["definition", "invocation", "bootstrap"]);
    }

    #[test]
    fn test_regex_literal_in_factory() {
        let src = "__d(function(g,r,m,e){if(e)/[)']/.test(m)&&r()},1,null,\
                   \"react-native-implementation\");\nrequire(1);";
        let statements = ScriptRecognizer.recognize(src).unwrap();
        assert_eq!(statements.len(), 2);
        let definition = definition_of(&statements[0]);
        assert!(matches!(&definition.args[3], ArgNode::Str { value, .. }
            if value == "react-native-implementation"));
        assert!(definition.invocations.is_empty());
        assert!(matches!(
            statements[1].kind,
            StatementKind::Invocation(Invocation { target: 1, .. })
        ));
    }

    #[test]
    fn test_definition_arguments_are_typed() {
        let src = r#"__d(function(global, require) { return 1; }, 12, [3, 4], "lib/x.js");"#;
        let statements = ScriptRecognizer.recognize(src).unwrap();
        let args = &definition_of(&statements[0]).args;
        assert_eq!(args.len(), 4);
        match &args[0] {
            ArgNode::Function { params, body, .. } => {
                assert_eq!(params, &vec!["global".to_string(), "require".to_string()]);
                assert_eq!(body.slice(src), "{ return 1; }");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            args[1],
            ArgNode::Number {
                raw: "12".to_string(),
                range: ByteRange::new(45, 47)
            }
        );
        assert!(matches!(&args[2], ArgNode::Array { elements, .. } if elements.len() == 2));
        assert!(matches!(&args[3], ArgNode::Str { value, .. } if value == "lib/x.js"));
    }

    #[test]
    fn test_factory_invocations_and_asset() {
        let src = r#"__d(function(g, require, module) { var a = require(3); module.exports = require(7).registerAsset({"name":"icon","scales":[1]}); }, 4, null, "icon.png");"#;
        let statements = ScriptRecognizer.recognize(src).unwrap();
        let definition = definition_of(&statements[0]);
        let targets: Vec<usize> = definition.invocations.iter().map(|i| i.target).collect();
        assert_eq!(targets, vec![3, 7]);
        assert_eq!(definition.invocations[0].range.slice(src), "require(3)");
        let literal = definition.asset_literal.as_ref().unwrap();
        assert_eq!(literal.range.slice(src), r#"{"name":"icon","scales":[1]}"#);
    }

    #[test]
    fn test_arrow_factory() {
        let src = r#"__d((global, require) => { require(1); }, 2, null, "b.js");"#;
        let statements = ScriptRecognizer.recognize(src).unwrap();
        let definition = definition_of(&statements[0]);
        assert!(matches!(
            &definition.args[0],
            ArgNode::Function { params, .. } if params.len() == 2
        ));
        assert_eq!(definition.invocations.len(), 1);
    }

    #[test]
    fn test_rejected_line_is_skipped() {
        let src = "__d(function(){}, 1, null, \"a.js\");\n\
                   __d(function(){ , 1);\n\
                   __d(function(){}, 2, null, \"b.js\");\n\
                   require(1);";
        let statements = ScriptRecognizer.recognize(src).unwrap();
        assert_eq!(kinds(src), vec!["definition", "other", "definition", "invocation"]);
        assert_eq!(statements[1].range.slice(src), "__d(function(){ , 1);");
    }

    #[test]
    fn test_unclosed_statement_at_end_of_input() {
        let src = "require(0);\n__d(function(){\nrequire(1);";
        let statements = ScriptRecognizer.recognize(src).unwrap();
        assert_eq!(kinds(src), vec!["invocation", "other", "invocation"]);
        assert_eq!(statements[1].range.slice(src), "__d(function(){");
    }
}
